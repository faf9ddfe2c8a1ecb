//! User management module.
//!
//! Provides the user model, the persistence seam with its MongoDB and
//! in-memory backends, and the service layer carrying validation, password
//! hashing, and credential verification.

mod models;
mod mongo;
mod service;
mod store;

pub use models::{
    CreateUserRequest, RESOURCE_TYPE, UpdateUserRequest, User, UserAttributes, UserListQuery,
};
pub use mongo::MongoUserStore;
pub use service::UserService;
pub use store::{MemoryUserStore, UserPatch, UserStore};
