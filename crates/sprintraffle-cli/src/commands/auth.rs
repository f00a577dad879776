use clap::Subcommand;
use serde_json::json;
use sprintraffle_core::{CredentialStore, User};

use super::{print_json, CliResult};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store an access token obtained from the backend
    SetToken {
        token: String,
        /// Refresh token used when the access token expires
        #[arg(long)]
        refresh: Option<String>,
        /// Signed-in user as JSON (id, email, name, surname, role, raffleMultiplier)
        #[arg(long)]
        user: Option<String>,
    },
    /// Show what is stored
    Status,
    /// Remove all stored credentials
    Logout,
}

pub fn run(action: AuthAction) -> CliResult {
    let store = CredentialStore::open()?;
    match action {
        AuthAction::SetToken {
            token,
            refresh,
            user,
        } => {
            // Parse first so a bad profile leaves the store untouched.
            let user = user
                .map(|raw| serde_json::from_str::<User>(&raw))
                .transpose()?;
            store.set_auth_token(&token)?;
            if let Some(refresh) = refresh {
                store.set_refresh_token(&refresh)?;
            }
            if let Some(user) = user {
                store.set_user(&user)?;
            }
            println!("ok");
        }
        AuthAction::Status => {
            let user = store.user()?;
            print_json(&json!({
                "authenticated": store.is_authenticated()?,
                "hasToken": store.auth_token()?.is_some(),
                "hasRefreshToken": store.refresh_token()?.is_some(),
                "user": user,
            }))?;
        }
        AuthAction::Logout => {
            store.clear_auth()?;
            println!("logged out");
        }
    }
    Ok(())
}
