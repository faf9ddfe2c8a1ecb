//! Token claims.

use serde::{Deserialize, Serialize};

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,

    /// Issuer.
    #[serde(default)]
    pub iss: Option<String>,

    /// Expiration time (as Unix timestamp).
    pub exp: i64,

    /// Issued at (as Unix timestamp).
    #[serde(default)]
    pub iat: Option<i64>,

    /// User's username.
    #[serde(default)]
    pub preferred_username: Option<String>,

    /// User's group, matched against ACL rule names.
    #[serde(default)]
    pub group: Option<String>,
}

impl Claims {
    /// Get the group the user belongs to, defaulting to an empty group.
    pub fn group(&self) -> &str {
        self.group.as_deref().unwrap_or("")
    }

    /// Get the username for display and logging.
    pub fn username(&self) -> &str {
        self.preferred_username.as_deref().unwrap_or(&self.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_claims() -> Claims {
        Claims {
            sub: "usr_1".to_string(),
            iss: None,
            exp: 0,
            iat: None,
            preferred_username: None,
            group: None,
        }
    }

    #[test]
    fn test_group_defaults_to_empty() {
        let claims = base_claims();
        assert_eq!(claims.group(), "");

        let claims = Claims {
            group: Some("administrator".to_string()),
            ..base_claims()
        };
        assert_eq!(claims.group(), "administrator");
    }

    #[test]
    fn test_username_falls_back_to_sub() {
        let claims = base_claims();
        assert_eq!(claims.username(), "usr_1");

        let claims = Claims {
            preferred_username: Some("admin".to_string()),
            ..base_claims()
        };
        assert_eq!(claims.username(), "admin");
    }

    #[test]
    fn test_claims_roundtrip_with_missing_optionals() {
        let claims: Claims =
            serde_json::from_str(r#"{"sub": "usr_2", "exp": 123}"#).unwrap();
        assert_eq!(claims.sub, "usr_2");
        assert_eq!(claims.exp, 123);
        assert!(claims.group.is_none());
    }
}
