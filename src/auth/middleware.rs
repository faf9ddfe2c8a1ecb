//! Authentication middleware.

use axum::{
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{AuthConfig, AuthError, Claims, DevUser};

/// Extract a Bearer token from an Authorization header value.
fn bearer_token_from_header(header_value: &str) -> Result<&str, AuthError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(AuthError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidAuthHeader);
    }

    let token = parts.next().ok_or(AuthError::InvalidAuthHeader)?;
    if token.is_empty() {
        return Err(AuthError::InvalidAuthHeader);
    }

    if parts.next().is_some() {
        return Err(AuthError::InvalidAuthHeader);
    }

    Ok(token)
}

fn token_from_cookie_header<'a>(cookie_header: &'a str, cookie_name: &str) -> Option<&'a str> {
    cookie_header.split(';').map(str::trim).find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        if name.trim() == cookie_name {
            Some(value.trim())
        } else {
            None
        }
    })
}

/// Authentication state shared across handlers.
#[derive(Clone)]
pub struct AuthState {
    config: Arc<AuthConfig>,
    decoding_key: Option<DecodingKey>,
}

impl AuthState {
    /// Create new auth state from config.
    /// Resolves `env:VAR_NAME` syntax in jwt_secret at construction time.
    pub fn new(mut config: AuthConfig) -> Self {
        if let Ok(Some(resolved)) = config.resolve_jwt_secret() {
            config.jwt_secret = Some(resolved);
        }

        let decoding_key = config
            .jwt_secret
            .as_ref()
            .map(|s| DecodingKey::from_secret(s.as_bytes()));

        Self {
            config: Arc::new(config),
            decoding_key,
        }
    }

    /// Check if dev mode is enabled.
    pub fn is_dev_mode(&self) -> bool {
        self.config.dev_mode
    }

    /// Get dev users.
    pub fn dev_users(&self) -> &[DevUser] {
        &self.config.dev_users
    }

    /// Get allowed CORS origins from config.
    pub fn allowed_origins(&self) -> &[String] {
        &self.config.allowed_origins
    }

    /// Validate credentials in dev mode.
    pub fn validate_dev_credentials(&self, username: &str, password: &str) -> Option<&DevUser> {
        if !self.config.dev_mode {
            return None;
        }

        self.config
            .dev_users
            .iter()
            .find(|u| (u.id == username || u.username == username) && u.verify_password(password))
    }

    /// Validate a bearer token.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        // Dev tokens are prefixed with "dev:" and resolve to configured users
        if self.config.dev_mode {
            if let Some(user_id) = token.strip_prefix("dev:") {
                return self.dev_user_claims(user_id);
            }
        }

        let decoding_key = self
            .decoding_key
            .as_ref()
            .ok_or_else(|| AuthError::Internal("no JWT secret configured".to_string()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.required_spec_claims.clear();

        let token_data = decode::<Claims>(token, decoding_key, &validation).map_err(|e| {
            warn!("Token validation failed: {:?}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }

    /// Get claims for a dev user.
    fn dev_user_claims(&self, user_id: &str) -> Result<Claims, AuthError> {
        let user = self
            .config
            .dev_users
            .iter()
            .find(|u| u.id == user_id)
            .ok_or(AuthError::UserNotFound)?;

        Ok(Claims {
            sub: user.id.clone(),
            iss: Some("dev".to_string()),
            exp: Utc::now().timestamp() + self.config.token_ttl_secs,
            iat: Some(Utc::now().timestamp()),
            preferred_username: Some(user.username.clone()),
            group: Some(user.group.clone()),
        })
    }

    /// Generate a token for a dev user.
    pub fn generate_dev_token(&self, user: &DevUser) -> Result<String, AuthError> {
        self.generate_token(&user.id, &user.username, &user.group)
    }

    /// Generate a signed token for any user.
    pub fn generate_token(
        &self,
        user_id: &str,
        username: &str,
        group: &str,
    ) -> Result<String, AuthError> {
        use jsonwebtoken::{EncodingKey, Header, encode};

        let secret = self
            .config
            .jwt_secret
            .as_ref()
            .ok_or_else(|| AuthError::Internal("no JWT secret configured".to_string()))?;

        let claims = Claims {
            sub: user_id.to_string(),
            iss: Some("rosterd".to_string()),
            exp: Utc::now().timestamp() + self.config.token_ttl_secs,
            iat: Some(Utc::now().timestamp()),
            preferred_username: Some(username.to_string()),
            group: Some(group.to_string()),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Token lifetime in seconds, for cookie expiry.
    pub fn token_ttl_secs(&self) -> i64 {
        self.config.token_ttl_secs
    }
}

/// Authenticated user extracted from request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// User claims.
    pub claims: Claims,
}

impl CurrentUser {
    /// Get the user ID.
    pub fn id(&self) -> &str {
        &self.claims.sub
    }

    /// Get the user's group.
    pub fn group(&self) -> &str {
        self.claims.group()
    }

    /// Get the username.
    pub fn username(&self) -> &str {
        self.claims.username()
    }
}

/// Extract authentication from request.
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(AuthError::MissingAuthHeader)
    }
}

/// Authentication middleware.
///
/// Validates bearer tokens and injects `CurrentUser` into request extensions.
/// Supports multiple auth methods in priority order:
/// 1. Authorization: Bearer <token> header
/// 2. auth_token cookie
/// 3. X-Dev-User header (dev mode only)
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    // Allow cookie-based auth for browser clients.
    let cookie_token = req
        .headers()
        .get(axum::http::header::COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|cookie_header| token_from_cookie_header(cookie_header, "auth_token"));

    let claims = if let Some(header) = auth_header {
        let token = bearer_token_from_header(header)?;
        auth.validate_token(token)?
    } else if let Some(token) = cookie_token {
        auth.validate_token(token)?
    } else if auth.is_dev_mode() {
        if let Some(user_id) = req
            .headers()
            .get("X-Dev-User")
            .and_then(|h| h.to_str().ok())
        {
            debug!("Using dev user: {}", user_id);
            auth.validate_token(&format!("dev:{}", user_id))?
        } else {
            return Err(AuthError::MissingAuthHeader);
        }
    } else {
        return Err(AuthError::MissingAuthHeader);
    };

    let user = CurrentUser { claims };
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
