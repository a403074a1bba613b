use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a fresh opaque record id.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Public-page slug form of a username: lowercase, only `[a-z0-9_-]` kept.
pub fn normalize_username(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect()
}

/// Host platform the app core is embedded in.
///
/// The web build has no native purchase module, so entitlement runs in
/// trial-only mode there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Native,
    Web,
}

impl Platform {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "ios" | "android" => Some(Self::Native),
            "web" => Some(Self::Web),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "native"),
            Self::Web => write!(f, "web"),
        }
    }
}
