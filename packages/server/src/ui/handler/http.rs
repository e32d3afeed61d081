//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};

use crate::{
    domain::{AuthError, AuthenticatedUser, GroupId, PersistenceError, ResolverError},
    infrastructure::dto::http::{
        ErrorResponse, OnlineMemberDto, OnlineMembersResponse, OnlineUserDto, OnlineUsersResponse,
        UpdateStatusRequest, UpdateStatusResponse,
    },
    ui::state::AppState,
    usecase::{UpdateStatusError, UpdateStatusUseCase},
};

/// Error returned by API handlers, rendered as `{"error": "..."}`
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(AuthError),
    Forbidden(String),
    BadRequest(String),
    Internal(String),
    BadGateway(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::Unauthorized(e) => (StatusCode::UNAUTHORIZED, e.to_string()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            Self::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        Self::Unauthorized(e)
    }
}

impl From<PersistenceError> for ApiError {
    fn from(e: PersistenceError) -> Self {
        tracing::warn!(error = %e, "Persistence failure in HTTP handler");
        Self::Internal(e.to_string())
    }
}

impl From<ResolverError> for ApiError {
    fn from(e: ResolverError) -> Self {
        tracing::warn!(error = %e, "Group lookup failure in HTTP handler");
        Self::BadGateway(e.to_string())
    }
}

impl From<UpdateStatusError> for ApiError {
    fn from(e: UpdateStatusError) -> Self {
        match e {
            UpdateStatusError::InvalidStatus(e) => Self::BadRequest(e.to_string()),
            UpdateStatusError::Persistence(e) => e.into(),
        }
    }
}

/// Validate the `Authorization: Bearer <token>` header
fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthenticatedUser, ApiError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .unwrap_or_default();
    Ok(state.verifier.validate(token)?)
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Every online user, ordered by id
pub async fn get_online_users(State(state): State<Arc<AppState>>) -> Json<OnlineUsersResponse> {
    let data = state
        .registry
        .snapshot()
        .await
        .iter()
        .map(OnlineUserDto::from)
        .collect();
    Json(OnlineUsersResponse {
        success: true,
        data,
    })
}

/// Online members of a group the caller belongs to
pub async fn get_group_online_members(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(group_id): Path<u64>,
) -> Result<Json<OnlineMembersResponse>, ApiError> {
    let caller = authenticate(&state, &headers)?;
    let group_id = GroupId::new(group_id).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let members = state.groups.member_ids(group_id).await?;
    if !members.contains(&caller.user_id) {
        tracing::warn!(user_id = %caller.user_id, %group_id, "Non-member requested group presence");
        return Err(ApiError::Forbidden(
            "you are not a member of this group".to_string(),
        ));
    }

    let online_members: Vec<OnlineMemberDto> = state
        .registry
        .snapshot()
        .await
        .iter()
        .filter(|entry| members.contains(&entry.user_id))
        .map(OnlineMemberDto::from)
        .collect();
    let count = online_members.len();
    Ok(Json(OnlineMembersResponse {
        online_members,
        count,
    }))
}

/// Change the caller's presence status
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>, ApiError> {
    let caller = authenticate(&state, &headers)?;
    let usecase = UpdateStatusUseCase::new(state.registry.clone());
    let status = usecase.execute(caller.user_id, &request.status).await?;
    Ok(Json(UpdateStatusResponse {
        success: true,
        status: status.as_str().to_string(),
    }))
}
