//! Persisted credentials: auth token, refresh token and the last-known user.

use serde::{Deserialize, Serialize};

use super::database::Database;
use crate::error::Result;

pub const AUTH_TOKEN_KEY: &str = "sprintraffle:auth_token";
pub const REFRESH_TOKEN_KEY: &str = "sprintraffle:refresh_token";
pub const USER_KEY: &str = "sprintraffle:user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    User,
    Advertiser,
}

fn default_multiplier() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default = "default_multiplier")]
    pub raffle_multiplier: f64,
}

#[derive(Debug)]
pub struct CredentialStore {
    db: Database,
}

impl CredentialStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn open() -> Result<Self> {
        Ok(Self::new(Database::open()?))
    }

    pub fn auth_token(&self) -> Result<Option<String>> {
        Ok(self.db.kv_get(AUTH_TOKEN_KEY)?)
    }

    pub fn set_auth_token(&self, token: &str) -> Result<()> {
        Ok(self.db.kv_set(AUTH_TOKEN_KEY, token)?)
    }

    pub fn remove_auth_token(&self) -> Result<()> {
        Ok(self.db.kv_delete(AUTH_TOKEN_KEY)?)
    }

    pub fn refresh_token(&self) -> Result<Option<String>> {
        Ok(self.db.kv_get(REFRESH_TOKEN_KEY)?)
    }

    pub fn set_refresh_token(&self, token: &str) -> Result<()> {
        Ok(self.db.kv_set(REFRESH_TOKEN_KEY, token)?)
    }

    pub fn remove_refresh_token(&self) -> Result<()> {
        Ok(self.db.kv_delete(REFRESH_TOKEN_KEY)?)
    }

    /// Last-known user. A corrupt entry reads as absent.
    pub fn user(&self) -> Result<Option<User>> {
        let Some(raw) = self.db.kv_get(USER_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!(error = %e, "stored user is unreadable, ignoring");
                Ok(None)
            }
        }
    }

    pub fn set_user(&self, user: &User) -> Result<()> {
        let json = serde_json::to_string(user)?;
        Ok(self.db.kv_set(USER_KEY, &json)?)
    }

    pub fn remove_user(&self) -> Result<()> {
        Ok(self.db.kv_delete(USER_KEY)?)
    }

    /// Remove token, refresh token and user together.
    pub fn clear_auth(&self) -> Result<()> {
        self.remove_auth_token()?;
        self.remove_refresh_token()?;
        self.remove_user()?;
        Ok(())
    }

    /// Both a user and a token are stored.
    pub fn is_authenticated(&self) -> Result<bool> {
        Ok(self.user()?.is_some() && self.auth_token()?.is_some())
    }
}
