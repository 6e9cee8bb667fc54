//! API 错误类型定义
//!
//! 将领域错误映射为 HTTP 状态码和统一错误响应体

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use munda_core::MundaError;

/// API 错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("未认证: {0}")]
    Unauthorized(String),

    #[error("禁止访问: {0}")]
    Forbidden(String),

    #[error("参数验证失败: {0}")]
    Validation(String),

    #[error(transparent)]
    Domain(#[from] MundaError),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Domain(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Domain(e) => match e {
                MundaError::Validation(_) => StatusCode::BAD_REQUEST,
                MundaError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                MundaError::InsufficientCredits { .. }
                | MundaError::InsufficientXp { .. }
                | MundaError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Domain(e) => e.error_code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Domain(e) if !e.is_business_error() => {
                tracing::error!(error = %e, code = e.error_code(), "请求处理失败");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn all_error_variants() -> Vec<(ApiError, StatusCode, &'static str)> {
        vec![
            (ApiError::Unauthorized("no token".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (ApiError::Forbidden("admin only".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (ApiError::Validation("name".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (MundaError::GangNotFound(Uuid::nil()).into(), StatusCode::NOT_FOUND, "GANG_NOT_FOUND"),
            (
                MundaError::FighterEquipmentNotFound(Uuid::nil()).into(),
                StatusCode::NOT_FOUND,
                "FIGHTER_EQUIPMENT_NOT_FOUND",
            ),
            (
                MundaError::TerritoryNotFound(Uuid::nil()).into(),
                StatusCode::NOT_FOUND,
                "TERRITORY_NOT_FOUND",
            ),
            (
                MundaError::InsufficientCredits { required: 50, available: 10 }.into(),
                StatusCode::CONFLICT,
                "INSUFFICIENT_CREDITS",
            ),
            (
                MundaError::InsufficientXp { required: 6, available: 2 }.into(),
                StatusCode::CONFLICT,
                "INSUFFICIENT_XP",
            ),
            (MundaError::Conflict("dup".into()).into(), StatusCode::CONFLICT, "CONFLICT"),
            (
                MundaError::PermissionDenied("not yours".into()).into(),
                StatusCode::FORBIDDEN,
                "PERMISSION_DENIED",
            ),
            (MundaError::Validation("bad".into()).into(), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (
                MundaError::Cache("down".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "CACHE_ERROR",
            ),
            (
                MundaError::Internal("oops".into()).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ]
    }

    #[test]
    fn test_all_variants_status_and_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            assert_eq!(error.status_code(), expected_status, "{expected_code}");
            assert_eq!(error.error_code(), expected_code);
        }
    }

    #[tokio::test]
    async fn test_into_response_body_structure() {
        let response = ApiError::from(MundaError::InsufficientCredits {
            required: 50,
            available: 10,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "INSUFFICIENT_CREDITS");
        assert!(body["error"].as_str().unwrap().contains("50"));
    }

    #[tokio::test]
    async fn test_system_error_hides_details() {
        let response = ApiError::from(MundaError::Internal("secret stack trace".into())).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(!body["error"].as_str().unwrap().contains("secret"));
    }
}
