//! User service for business logic.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{info, instrument};

use super::models::{CreateUserRequest, UpdateUserRequest, User, UserListQuery};
use super::store::{UserPatch, UserStore};

/// Service for user management operations.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    /// Create a new user service on the given store.
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Generate a new user ID.
    fn generate_id() -> String {
        format!("usr_{}", nanoid::nanoid!(12))
    }

    /// Create a new user with validation.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User> {
        if !is_valid_username(&request.username) {
            bail!(
                "Invalid username format. Must be 3-50 alphanumeric characters, underscores, or hyphens."
            );
        }

        if request.group.trim().is_empty() {
            bail!("Invalid group: must not be empty.");
        }

        if request.password.len() < 6 {
            bail!("Password must be at least 6 characters.");
        }

        if self
            .store
            .get_by_username(&request.username)
            .await?
            .is_some()
        {
            bail!("Username '{}' is already taken.", request.username);
        }

        let now = chrono::Utc::now().to_rfc3339();
        let user = User {
            id: Self::generate_id(),
            username: request.username,
            password_hash: hash_password(&request.password)?,
            group: request.group.trim().to_string(),
            created_at: now.clone(),
            updated_at: now,
        };

        let user = self.store.insert(user).await?;
        info!(user_id = %user.id, username = %user.username, "Created new user");

        Ok(user)
    }

    /// Get a user by ID.
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.store.get(id).await
    }

    /// Get a user by username.
    #[instrument(skip(self))]
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.store.get_by_username(username).await
    }

    /// List users with optional filters.
    #[instrument(skip(self))]
    pub async fn list_users(&self, query: &UserListQuery) -> Result<Vec<User>> {
        self.store.list(query).await
    }

    /// Update a user.
    #[instrument(skip(self, request))]
    pub async fn update_user(&self, id: &str, request: UpdateUserRequest) -> Result<User> {
        if let Some(ref username) = request.username {
            if !is_valid_username(username) {
                bail!("Invalid username format.");
            }
            // Check if new username is available (excluding current user)
            if let Some(existing) = self.store.get_by_username(username).await? {
                if existing.id != id {
                    bail!("Username '{}' is already taken.", username);
                }
            }
        }

        if let Some(ref group) = request.group {
            if group.trim().is_empty() {
                bail!("Invalid group: must not be empty.");
            }
        }

        let password_hash = match request.password {
            Some(password) => {
                if password.len() < 6 {
                    bail!("Password must be at least 6 characters.");
                }
                Some(hash_password(&password)?)
            }
            None => None,
        };

        let patch = UserPatch {
            username: request.username,
            password_hash,
            group: request.group.map(|g| g.trim().to_string()),
        };

        let user = self
            .store
            .update(id, patch)
            .await?
            .with_context(|| format!("User not found: {}", id))?;
        info!(user_id = %user.id, "Updated user");

        Ok(user)
    }

    /// Delete a user.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        if !self.store.delete(id).await? {
            bail!("User not found: {}", id);
        }

        info!(user_id = %id, "Deleted user");
        Ok(())
    }

    /// Count all users.
    #[instrument(skip(self))]
    pub async fn count_users(&self) -> Result<u64> {
        self.store.count().await
    }

    /// Verify user credentials.
    #[instrument(skip(self, password))]
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = self.store.get_by_username(username).await?;

        match user {
            Some(user) if verify_password(password, &user.password_hash)? => Ok(Some(user)),
            _ => Ok(None),
        }
    }
}

/// Validate username format.
fn is_valid_username(username: &str) -> bool {
    let len = username.len();
    if !(3..=50).contains(&len) {
        return false;
    }

    username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Hash a password using bcrypt.
fn hash_password(password: &str) -> Result<String> {
    // Use a lower cost factor for development speed
    let cost = if cfg!(debug_assertions) { 4 } else { 10 };
    bcrypt::hash(password, cost).context("Failed to hash password")
}

/// Verify a password against a bcrypt hash.
fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).context("Failed to verify password")
}

#[cfg(test)]
mod tests {
    use super::super::store::MemoryUserStore;
    use super::*;

    fn test_service() -> UserService {
        UserService::new(Arc::new(MemoryUserStore::new()))
    }

    fn create_request(username: &str, group: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            password: "secret123".to_string(),
            group: group.to_string(),
        }
    }

    #[test]
    fn test_is_valid_username() {
        assert!(is_valid_username("user"));
        assert!(is_valid_username("user_name"));
        assert!(is_valid_username("user-name"));
        assert!(is_valid_username("user123"));
        assert!(!is_valid_username("ab")); // too short
        assert!(!is_valid_username("user@name")); // invalid char
        assert!(!is_valid_username("user name")); // space
    }

    #[test]
    fn test_password_hashing() {
        let password = "test_password";
        let hash = hash_password(password).unwrap();
        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let service = test_service();

        let user = service
            .create_user(create_request("alice", "staff"))
            .await
            .unwrap();
        assert!(user.id.starts_with("usr_"));
        assert_eq!(user.username, "alice");
        assert_eq!(user.group, "staff");
        // Stored as a hash, never the raw password
        assert_ne!(user.password_hash, "secret123");

        let fetched = service.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, user.id);

        let by_name = service
            .get_user_by_username("alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.id, user.id);
    }

    #[tokio::test]
    async fn test_create_user_validation() {
        let service = test_service();

        let err = service
            .create_user(CreateUserRequest {
                username: "ab".to_string(),
                password: "secret123".to_string(),
                group: "staff".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid username"));

        let err = service
            .create_user(CreateUserRequest {
                username: "alice".to_string(),
                password: "short".to_string(),
                group: "staff".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at least 6 characters"));

        let err = service
            .create_user(CreateUserRequest {
                username: "alice".to_string(),
                password: "secret123".to_string(),
                group: "   ".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("group"));
    }

    #[tokio::test]
    async fn test_create_duplicate_username() {
        let service = test_service();

        service
            .create_user(create_request("alice", "staff"))
            .await
            .unwrap();
        let err = service
            .create_user(create_request("alice", "administrator"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already taken"));
    }

    #[tokio::test]
    async fn test_update_user() {
        let service = test_service();
        let user = service
            .create_user(create_request("alice", "staff"))
            .await
            .unwrap();

        let updated = service
            .update_user(
                &user.id,
                UpdateUserRequest {
                    group: Some("administrator".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.group, "administrator");
        assert_eq!(updated.username, "alice");

        // Updating the password re-hashes it
        let updated = service
            .update_user(
                &user.id,
                UpdateUserRequest {
                    password: Some("newsecret".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(
            service
                .verify_credentials("alice", "newsecret")
                .await
                .unwrap()
                .is_some()
        );
        assert_ne!(updated.password_hash, user.password_hash);
    }

    #[tokio::test]
    async fn test_update_username_conflict() {
        let service = test_service();
        service
            .create_user(create_request("alice", "staff"))
            .await
            .unwrap();
        let bob = service
            .create_user(create_request("bob", "staff"))
            .await
            .unwrap();

        let err = service
            .update_user(
                &bob.id,
                UpdateUserRequest {
                    username: Some("alice".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already taken"));

        // Re-asserting your own username is fine
        let ok = service
            .update_user(
                &bob.id,
                UpdateUserRequest {
                    username: Some("bob".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_delete_user() {
        let service = test_service();
        let user = service
            .create_user(create_request("alice", "staff"))
            .await
            .unwrap();

        service.delete_user(&user.id).await.unwrap();
        assert!(service.get_user(&user.id).await.unwrap().is_none());

        let err = service.delete_user(&user.id).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let service = test_service();
        service
            .create_user(create_request("alice", "staff"))
            .await
            .unwrap();

        let user = service
            .verify_credentials("alice", "secret123")
            .await
            .unwrap();
        assert!(user.is_some());

        let user = service
            .verify_credentials("alice", "wrong")
            .await
            .unwrap();
        assert!(user.is_none());

        let user = service
            .verify_credentials("nobody", "secret123")
            .await
            .unwrap();
        assert!(user.is_none());
    }
}
