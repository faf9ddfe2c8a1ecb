//! Application state shared across handlers.

use std::sync::Arc;

use crate::acl::AclPolicy;
use crate::auth::AuthState;
use crate::user::UserService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// User service for user management.
    pub users: Arc<UserService>,
    /// Authentication state.
    pub auth: AuthState,
    /// Access control policy for the users resource.
    pub acl: Arc<AclPolicy>,
}

impl AppState {
    /// Create new application state.
    pub fn new(users: UserService, auth: AuthState) -> Self {
        Self {
            users: Arc::new(users),
            auth,
            acl: Arc::new(AclPolicy::users()),
        }
    }
}
