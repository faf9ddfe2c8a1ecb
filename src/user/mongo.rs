//! MongoDB-backed user store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Client, Collection, IndexModel,
    bson::doc,
    error::{ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
};
use tracing::{debug, instrument};

use super::models::{User, UserListQuery};
use super::store::{UserPatch, UserStore};

const COLLECTION: &str = "users";
const DEFAULT_LIST_LIMIT: i64 = 100;

/// User store backed by a MongoDB collection.
#[derive(Clone)]
pub struct MongoUserStore {
    collection: Collection<User>,
}

impl MongoUserStore {
    /// Connect to MongoDB and ensure the collection indexes.
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .context("connecting to MongoDB")?;
        let collection = client.database(database).collection::<User>(COLLECTION);

        let store = Self { collection };
        store.ensure_indexes().await?;

        debug!(database, collection = COLLECTION, "MongoDB store ready");
        Ok(store)
    }

    /// Build a store on an existing collection handle.
    pub fn with_collection(collection: Collection<User>) -> Self {
        Self { collection }
    }

    async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        self.collection
            .create_index(index)
            .await
            .context("creating unique username index")?;

        Ok(())
    }
}

fn is_duplicate_key_error(err: &mongodb::error::Error) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref write_error)) => write_error.code == 11000,
        ErrorKind::Command(ref command_error) => command_error.code == 11000,
        _ => false,
    }
}

/// Escape regex metacharacters so search terms match literally.
fn regex_escape(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if !c.is_ascii_alphanumeric() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl UserStore for MongoUserStore {
    #[instrument(skip(self, user), fields(username = %user.username))]
    async fn insert(&self, user: User) -> Result<User> {
        match self.collection.insert_one(&user).await {
            Ok(_) => Ok(user),
            Err(err) if is_duplicate_key_error(&err) => {
                anyhow::bail!("Username '{}' is already taken.", user.username)
            }
            Err(err) => Err(err).context("Failed to insert user"),
        }
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Option<User>> {
        self.collection
            .find_one(doc! { "_id": id })
            .await
            .context("Failed to fetch user")
    }

    #[instrument(skip(self))]
    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        self.collection
            .find_one(doc! { "username": username })
            .await
            .context("Failed to fetch user by username")
    }

    #[instrument(skip(self))]
    async fn list(&self, query: &UserListQuery) -> Result<Vec<User>> {
        let mut filter = doc! {};

        if let Some(ref group) = query.group {
            filter.insert("group", group.as_str());
        }

        if let Some(ref search) = query.search {
            filter.insert(
                "username",
                doc! { "$regex": regex_escape(search), "$options": "i" },
            );
        }

        let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).max(0);
        let offset = query.offset.unwrap_or(0).max(0) as u64;

        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": -1, "_id": -1 })
            .skip(offset)
            .limit(limit)
            .await
            .context("Failed to list users")?;

        cursor
            .try_collect()
            .await
            .context("Failed to drain user cursor")
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: &str, patch: UserPatch) -> Result<Option<User>> {
        let mut set = doc! { "updated_at": chrono::Utc::now().to_rfc3339() };

        if let Some(username) = patch.username {
            set.insert("username", username);
        }
        if let Some(password_hash) = patch.password_hash {
            set.insert("password_hash", password_hash);
        }
        if let Some(group) = patch.group {
            set.insert("group", group);
        }

        match self
            .collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await
        {
            Ok(user) => Ok(user),
            Err(err) if is_duplicate_key_error(&err) => {
                anyhow::bail!("Username is already taken.")
            }
            Err(err) => Err(err).context("Failed to update user"),
        }
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<bool> {
        let result = self
            .collection
            .delete_one(doc! { "_id": id })
            .await
            .context("Failed to delete user")?;

        Ok(result.deleted_count > 0)
    }

    #[instrument(skip(self))]
    async fn count(&self) -> Result<u64> {
        self.collection
            .count_documents(doc! {})
            .await
            .context("Failed to count users")
    }
}
