//! User resource handlers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{info, instrument};

use crate::acl::Action;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::auth::CurrentUser;
use crate::jsonapi::{Document, JsonApi, NewResource, Resource};
use crate::user::{
    CreateUserRequest, RESOURCE_TYPE, UpdateUserRequest, UserAttributes, UserListQuery,
};

/// Check the policy for the requested action, or reject with 403.
fn authorize(
    state: &AppState,
    user: &CurrentUser,
    target_id: Option<&str>,
    action: Action,
) -> Result<(), ApiError> {
    if state
        .acl
        .allows(user.id(), user.group(), target_id, action)
    {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "Group '{}' may not {} this resource",
            user.group(),
            action
        )))
    }
}

/// Reject documents whose resource type is not `users`.
fn check_resource_type(kind: &str) -> Result<(), ApiError> {
    if kind == RESOURCE_TYPE {
        Ok(())
    } else {
        Err(ApiError::conflict(format!(
            "Unsupported resource type '{}', expected '{}'",
            kind, RESOURCE_TYPE
        )))
    }
}

/// Create a user.
#[instrument(skip(state, user, body), fields(requester = %user.id()))]
pub async fn create_user(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<Document<NewResource<CreateUserRequest>>>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    authorize(&state, &user, None, Action::Create)?;

    let Json(document) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    check_resource_type(&document.data.kind)?;

    if document.data.id.is_some() {
        return Err(ApiError::forbidden(
            "Client-generated ids are not supported",
        ));
    }

    let created = state.users.create_user(document.data.attributes).await?;
    info!(user_id = %created.id, requester = %user.id(), "User created via API");

    Ok((
        StatusCode::CREATED,
        JsonApi(Document::new(created.resource())),
    ))
}

/// List users.
#[instrument(skip(state, user), fields(requester = %user.id()))]
pub async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<UserListQuery>,
) -> ApiResult<JsonApi<Document<Vec<Resource<UserAttributes>>>>> {
    authorize(&state, &user, None, Action::Read)?;

    let users = state.users.list_users(&query).await?;
    let resources: Vec<Resource<UserAttributes>> =
        users.iter().map(|u| u.resource()).collect();

    Ok(JsonApi(Document::new(resources)))
}

/// Get a single user.
#[instrument(skip(state, user), fields(requester = %user.id()))]
pub async fn get_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<String>,
) -> ApiResult<JsonApi<Document<Resource<UserAttributes>>>> {
    authorize(&state, &user, Some(&user_id), Action::Read)?;

    state
        .users
        .get_user(&user_id)
        .await?
        .map(|u| JsonApi(Document::new(u.resource())))
        .ok_or_else(|| ApiError::not_found(format!("User {} not found", user_id)))
}

/// Update a user.
#[instrument(skip(state, user, body), fields(requester = %user.id()))]
pub async fn update_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<String>,
    body: Result<Json<Document<NewResource<UpdateUserRequest>>>, JsonRejection>,
) -> ApiResult<JsonApi<Document<Resource<UserAttributes>>>> {
    authorize(&state, &user, Some(&user_id), Action::Update)?;

    let Json(document) = body.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    check_resource_type(&document.data.kind)?;

    if let Some(ref body_id) = document.data.id {
        if body_id != &user_id {
            return Err(ApiError::conflict(
                "Resource id does not match the request URL",
            ));
        }
    }

    let updated = state
        .users
        .update_user(&user_id, document.data.attributes)
        .await?;
    info!(user_id = %updated.id, requester = %user.id(), "User updated via API");

    Ok(JsonApi(Document::new(updated.resource())))
}

/// Delete a user.
#[instrument(skip(state, user), fields(requester = %user.id()))]
pub async fn delete_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<String>,
) -> ApiResult<StatusCode> {
    authorize(&state, &user, Some(&user_id), Action::Delete)?;

    state.users.delete_user(&user_id).await?;
    info!(user_id = %user_id, requester = %user.id(), "User deleted via API");

    Ok(StatusCode::NO_CONTENT)
}
