//! Display language for user-facing strings (day names, alert text).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Tr,
}

const DAYS_EN: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const DAYS_TR: [&str; 7] = [
    "Pazar",
    "Pazartesi",
    "Salı",
    "Çarşamba",
    "Perşembe",
    "Cuma",
    "Cumartesi",
];

impl Locale {
    /// Day names indexed Sunday = 0 .. Saturday = 6.
    pub fn day_names(self) -> &'static [&'static str; 7] {
        match self {
            Locale::En => &DAYS_EN,
            Locale::Tr => &DAYS_TR,
        }
    }

    pub fn error_title(self) -> &'static str {
        match self {
            Locale::En => "Error",
            Locale::Tr => "Hata",
        }
    }

    pub fn dismiss_label(self) -> &'static str {
        match self {
            Locale::En => "OK",
            Locale::Tr => "Tamam",
        }
    }

    pub fn generic_error(self) -> &'static str {
        match self {
            Locale::En => "Something went wrong. Please try again.",
            Locale::Tr => "Bir hata oluştu. Lütfen tekrar deneyin.",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::En => write!(f, "en"),
            Locale::Tr => write!(f, "tr"),
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "tr" => Ok(Locale::Tr),
            other => Err(format!("unsupported locale: {other}")),
        }
    }
}
