//! 管理员权限检查中间件
//!
//! 按 profiles.user_role 判定，需位于认证中间件之后

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn require_admin(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(user) = request.extensions().get::<AuthUser>().copied() else {
        return ApiError::Unauthorized("未认证".to_string()).into_response();
    };

    match state.access.is_admin(user.user_id).await {
        Ok(true) => next.run(request).await,
        Ok(false) => {
            warn!(user_id = %user.user_id, "Non-admin user attempted admin route");
            ApiError::Forbidden("需要管理员权限".to_string()).into_response()
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}
