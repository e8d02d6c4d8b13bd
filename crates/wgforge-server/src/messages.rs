//! User-facing messages
//!
//! Error strings returned to API callers. They never carry internal detail;
//! the cause goes to the log instead.

use serde::Deserialize;
use std::str::FromStr;

/// Response language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// Persian
    #[default]
    Fa,
    /// English
    En,
}

impl Locale {
    /// Requested country is not in the range table
    pub fn invalid_country(&self) -> &'static str {
        match self {
            Locale::Fa => "کشور نامعتبر است.",
            Locale::En => "Invalid country.",
        }
    }

    /// The config could not be published
    pub fn store_failed(&self) -> &'static str {
        match self {
            Locale::Fa => "ذخیره در گیت‌هاب ناموفق بود.",
            Locale::En => "Saving the config failed.",
        }
    }

    /// Request body is not the expected JSON
    pub fn invalid_request(&self) -> &'static str {
        match self {
            Locale::Fa => "درخواست نامعتبر است.",
            Locale::En => "Invalid request.",
        }
    }

    /// Anything else
    pub fn internal_error(&self) -> &'static str {
        match self {
            Locale::Fa => "خطای داخلی سرور.",
            Locale::En => "Internal server error.",
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fa" => Ok(Locale::Fa),
            "en" => Ok(Locale::En),
            _ => Err(format!("unsupported locale: {}", s)),
        }
    }
}
