//! Secret configuration values
//!
//! Values wrapped in [`SecretString`] are zeroed on drop, print as
//! `Secret([REDACTED])` and must be read through `expose_secret()`.

use secrecy::{CloneableSecret, DebugSecret, Secret};
use serde::{Deserialize, Deserializer};
use zeroize::Zeroize;

/// String that can live inside a [`Secret`]
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    /// True for an empty or whitespace-only value
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

pub type SecretString = Secret<SecretValue>;

#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let secret = secret_string("audit-key".to_string());
        assert_eq!(secret.expose_secret().as_ref(), "audit-key");
        assert!(!format!("{secret:?}").contains("audit-key"));
    }

    #[test]
    fn test_blank_values() {
        assert!(secret_string("  ".to_string()).expose_secret().is_blank());
        assert!(!secret_string("k".to_string()).expose_secret().is_blank());
    }

    #[test]
    fn test_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Section {
            key: SecretString,
        }

        let section: Section = toml::from_str(r#"key = "from-file""#).unwrap();
        assert_eq!(section.key.expose_secret().as_ref(), "from-file");
    }
}
