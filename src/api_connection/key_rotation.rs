use dotenv::dotenv;
use std::env;

/// Environment variable prefix for API credentials: `GEMINI_API_KEY_1`
/// through `GEMINI_API_KEY_8`.
pub const CREDENTIAL_ENV_PREFIX: &str = "GEMINI_API_KEY_";
pub const MAX_CREDENTIAL_SLOTS: usize = 8;

const PLACEHOLDER_KEY: &str = "your-api-key-here";

/// Round-robin failover cursor over an ordered list of API credentials.
///
/// The list is fixed at construction; only the cursor moves. `advance` wraps
/// circularly so the gateway can bound its retry loop by `len()`.
#[derive(Debug, Clone)]
pub struct CredentialRotator {
    keys: Vec<String>,
    cursor: usize,
}

impl CredentialRotator {
    pub fn new(keys: Vec<String>) -> Self {
        CredentialRotator { keys, cursor: 0 }
    }

    /// Loads credentials from the numbered environment variables, skipping
    /// unset slots and placeholder values.
    pub fn from_env() -> Self {
        dotenv().ok();
        let mut keys = Vec::new();
        for slot in 1..=MAX_CREDENTIAL_SLOTS {
            if let Ok(key) = env::var(format!("{}{}", CREDENTIAL_ENV_PREFIX, slot)) {
                let key = key.trim().to_string();
                if !key.is_empty() && key != PLACEHOLDER_KEY {
                    keys.push(key);
                }
            }
        }
        CredentialRotator::new(keys)
    }

    /// The credential the cursor points at, or `None` when no credentials
    /// are configured.
    pub fn current(&self) -> Option<&str> {
        self.keys.get(self.cursor).map(String::as_str)
    }

    /// Moves the cursor forward circularly and returns the new current
    /// credential.
    pub fn advance(&mut self) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + 1) % self.keys.len();
        self.current()
    }

    /// Returns the cursor to the first credential.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
