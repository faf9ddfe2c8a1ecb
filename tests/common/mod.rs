//! Test utilities and common setup.

use std::sync::Arc;

use axum::Router;
use rosterd::api;
use rosterd::auth::{AuthConfig, AuthState, DevUser};
use rosterd::user::{CreateUserRequest, MemoryUserStore, UserService};

/// Create a test AuthConfig with a JWT secret for testing.
fn test_auth_config() -> AuthConfig {
    let mut config = AuthConfig::default();
    // Set a JWT secret for tests (required for token generation)
    config.jwt_secret = Some("test-secret-for-integration-tests-minimum-32-chars".to_string());
    config
}

/// A seeded application plus tokens for both seeded accounts.
pub struct TestContext {
    pub app: Router,
    pub admin_id: String,
    pub admin_token: String,
    pub member_id: String,
    pub member_token: String,
}

/// Create a test application backed by the in-memory store, seeded with an
/// administrator and a regular member.
pub async fn test_context() -> TestContext {
    let store = Arc::new(MemoryUserStore::new());
    let service = UserService::new(store);

    let admin = service
        .create_user(CreateUserRequest {
            username: "admin".to_string(),
            password: "adminpassword".to_string(),
            group: "administrator".to_string(),
        })
        .await
        .unwrap();

    let member = service
        .create_user(CreateUserRequest {
            username: "bob".to_string(),
            password: "memberpassword".to_string(),
            group: "staff".to_string(),
        })
        .await
        .unwrap();

    let auth_state = AuthState::new(test_auth_config());
    let admin_token = auth_state
        .generate_token(&admin.id, &admin.username, &admin.group)
        .unwrap();
    let member_token = auth_state
        .generate_token(&member.id, &member.username, &member.group)
        .unwrap();

    let state = api::AppState::new(service, auth_state);

    TestContext {
        app: api::create_router(state),
        admin_id: admin.id,
        admin_token,
        member_id: member.id,
        member_token,
    }
}

/// Create a test application in dev mode with a configured dev user.
pub async fn test_app_dev_mode() -> Router {
    let mut config = test_auth_config();
    config.dev_mode = true;
    config.dev_users = vec![DevUser {
        id: "dev".to_string(),
        username: "dev".to_string(),
        group: "administrator".to_string(),
        password_hash: bcrypt::hash("devpassword123", 4).unwrap(),
    }];

    let store = Arc::new(MemoryUserStore::new());
    let service = UserService::new(store);
    let state = api::AppState::new(service, AuthState::new(config));

    api::create_router(state)
}
