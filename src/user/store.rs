//! User persistence seam.
//!
//! `UserStore` is the contract the service layer talks to. Production runs on
//! MongoDB; the in-memory backend serves dev mode and the test suite.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

use super::models::{User, UserListQuery};

/// Field changes applied by a store update. Passwords arrive pre-hashed.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub group: Option<String>,
}

impl UserPatch {
    /// Whether the patch changes anything.
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password_hash.is_none() && self.group.is_none()
    }
}

/// Storage backend for user documents.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user.
    async fn insert(&self, user: User) -> Result<User>;

    /// Get a user by ID.
    async fn get(&self, id: &str) -> Result<Option<User>>;

    /// Get a user by username.
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// List users with optional filters, newest first.
    async fn list(&self, query: &UserListQuery) -> Result<Vec<User>>;

    /// Apply a patch. Returns the updated user, or None when absent.
    async fn update(&self, id: &str, patch: UserPatch) -> Result<Option<User>>;

    /// Delete a user. Returns whether a document was removed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Count all users.
    async fn count(&self) -> Result<u64>;
}

const DEFAULT_LIST_LIMIT: i64 = 100;

/// In-memory store for dev mode and tests.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<String, User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: User) -> Result<User> {
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn get(&self, id: &str) -> Result<Option<User>> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.username == username)
            .map(|entry| entry.value().clone()))
    }

    async fn list(&self, query: &UserListQuery) -> Result<Vec<User>> {
        let search = query.search.as_deref().map(str::to_lowercase);

        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|entry| {
                if let Some(ref group) = query.group {
                    if &entry.group != group {
                        return false;
                    }
                }
                if let Some(ref needle) = search {
                    if !entry.username.to_lowercase().contains(needle) {
                        return false;
                    }
                }
                true
            })
            .map(|entry| entry.value().clone())
            .collect();

        // Newest first; RFC 3339 timestamps order lexicographically.
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).max(0) as usize;

        Ok(users.into_iter().skip(offset).take(limit).collect())
    }

    async fn update(&self, id: &str, patch: UserPatch) -> Result<Option<User>> {
        let Some(mut entry) = self.users.get_mut(id) else {
            return Ok(None);
        };

        if let Some(username) = patch.username {
            entry.username = username;
        }
        if let Some(password_hash) = patch.password_hash {
            entry.password_hash = password_hash;
        }
        if let Some(group) = patch.group {
            entry.group = group;
        }
        entry.updated_at = chrono::Utc::now().to_rfc3339();

        Ok(Some(entry.value().clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.users.remove(id).is_some())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.users.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_user(id: &str, username: &str, group: &str, created_at: &str) -> User {
        User {
            id: id.to_string(),
            username: username.to_string(),
            password_hash: "hash".to_string(),
            group: group.to_string(),
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_get_delete() {
        let store = MemoryUserStore::new();
        let user = make_user("usr_1", "admin", "administrator", "2026-01-01T00:00:00+00:00");

        store.insert(user.clone()).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        let fetched = store.get("usr_1").await.unwrap().unwrap();
        assert_eq!(fetched.username, "admin");

        let by_name = store.get_by_username("admin").await.unwrap().unwrap();
        assert_eq!(by_name.id, "usr_1");

        assert!(store.delete("usr_1").await.unwrap());
        assert!(!store.delete("usr_1").await.unwrap());
        assert!(store.get("usr_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_patch() {
        let store = MemoryUserStore::new();
        store
            .insert(make_user("usr_1", "alice", "staff", "2026-01-01T00:00:00+00:00"))
            .await
            .unwrap();

        let updated = store
            .update(
                "usr_1",
                UserPatch {
                    group: Some("administrator".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.username, "alice");
        assert_eq!(updated.group, "administrator");
        assert_ne!(updated.updated_at, "2026-01-01T00:00:00+00:00");

        let missing = store
            .update("usr_404", UserPatch::default())
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_list_filters_and_order() {
        let store = MemoryUserStore::new();
        store
            .insert(make_user("usr_1", "alice", "staff", "2026-01-01T00:00:00+00:00"))
            .await
            .unwrap();
        store
            .insert(make_user("usr_2", "bob", "staff", "2026-01-02T00:00:00+00:00"))
            .await
            .unwrap();
        store
            .insert(make_user("usr_3", "carol", "administrator", "2026-01-03T00:00:00+00:00"))
            .await
            .unwrap();

        let all = store.list(&UserListQuery::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        // Newest first
        assert_eq!(all[0].id, "usr_3");

        let staff = store
            .list(&UserListQuery {
                group: Some("staff".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(staff.len(), 2);

        let search = store
            .list(&UserListQuery {
                search: Some("BO".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].username, "bob");

        let page = store
            .list(&UserListQuery {
                limit: Some(1),
                offset: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "usr_2");
    }
}
