//! User data models.

use serde::{Deserialize, Serialize};

use crate::jsonapi::Resource;

/// JSON:API resource type for users.
pub const RESOURCE_TYPE: &str = "users";

/// User entity as stored.
///
/// Serde here is the storage codec: the hash must round-trip through the
/// store. Clients only ever see [`UserAttributes`], which omits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub password_hash: String,
    pub group: String,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Wire attributes (safe to return to clients).
    pub fn attributes(&self) -> UserAttributes {
        UserAttributes {
            username: self.username.clone(),
            group: self.group.clone(),
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
        }
    }

    /// JSON:API resource object for this user.
    pub fn resource(&self) -> Resource<UserAttributes> {
        Resource::new(RESOURCE_TYPE, self.id.clone(), self.attributes())
    }
}

/// Public user attributes. The password never leaves the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAttributes {
    pub username: String,
    pub group: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Attributes accepted when creating a user. All three are required.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub group: String,
}

/// Attributes accepted when updating a user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub group: Option<String>,
}

/// User list query parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub group: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: "usr_1".to_string(),
            username: "admin".to_string(),
            password_hash: "$2b$04$secret".to_string(),
            group: "administrator".to_string(),
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            updated_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_user_round_trips_through_storage_codec() {
        let value = serde_json::to_value(sample_user()).unwrap();
        assert_eq!(value["_id"], "usr_1");
        assert_eq!(value["password_hash"], "$2b$04$secret");

        let back: User = serde_json::from_value(value).unwrap();
        assert_eq!(back.id, "usr_1");
        assert_eq!(back.password_hash, "$2b$04$secret");
    }

    #[test]
    fn test_resource_shape() {
        let resource = sample_user().resource();
        assert_eq!(resource.kind, "users");
        assert_eq!(resource.id, "usr_1");
        assert_eq!(resource.attributes.group, "administrator");

        let value = serde_json::to_value(&resource).unwrap();
        assert!(value["attributes"].get("password").is_none());
        assert!(value["attributes"].get("password_hash").is_none());
    }

    #[test]
    fn test_create_request_requires_all_fields() {
        let err = serde_json::from_str::<CreateUserRequest>(
            r#"{"username": "a", "password": "b"}"#,
        );
        assert!(err.is_err());

        let ok = serde_json::from_str::<CreateUserRequest>(
            r#"{"username": "a", "password": "b", "group": "c"}"#,
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_update_request_fields_are_optional() {
        let update = serde_json::from_str::<UpdateUserRequest>(r#"{"group": "staff"}"#).unwrap();
        assert!(update.username.is_none());
        assert!(update.password.is_none());
        assert_eq!(update.group.as_deref(), Some("staff"));
    }
}
