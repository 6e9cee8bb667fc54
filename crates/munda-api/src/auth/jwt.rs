//! JWT Token 校验
//!
//! 访问令牌由外部身份服务以 HS256 签发，`sub` 为用户 UUID

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use munda_shared::config::AuthConfig;

use crate::error::ApiError;

/// JWT Claims（Token 载荷）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// 用户 ID
    pub sub: String,
    pub aud: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// 已认证用户，由认证中间件注入请求扩展
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    audience: String,
    issuer: Option<String>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            audience: config.jwt_audience.clone(),
            issuer: config.jwt_issuer.clone(),
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        }
    }

    /// 签发 Token，供本地调试和测试使用
    pub fn generate_token(&self, user_id: Uuid, expires_in_secs: i64) -> Result<String, ApiError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            aud: self.audience.clone(),
            iss: self.issuer.clone(),
            email: None,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(expires_in_secs)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Unauthorized(format!("JWT 生成失败: {}", e)))
    }

    /// 验证 Token 并解析出用户
    pub fn verify_token(&self, token: &str) -> Result<AuthUser, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.audience]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthorized("Token 已过期".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidAudience => {
                    ApiError::Unauthorized("Token audience 不匹配".to_string())
                }
                _ => ApiError::Unauthorized(format!("Token 验证失败: {}", e)),
            },
        )?;

        let user_id = Uuid::parse_str(&token_data.claims.sub)
            .map_err(|_| ApiError::Unauthorized("Token 中的用户 ID 无效".to_string()))?;

        Ok(AuthUser { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_audience: "authenticated".to_string(),
            jwt_issuer: None,
        }
    }

    #[test]
    fn test_generate_and_verify_token() {
        let manager = JwtManager::new(&config());
        let user_id = Uuid::new_v4();

        let token = manager.generate_token(user_id, 3600).unwrap();
        let user = manager.verify_token(&token).unwrap();
        assert_eq!(user.user_id, user_id);
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let issuer = JwtManager::new(&AuthConfig {
            jwt_audience: "anon".to_string(),
            ..config()
        });
        let token = issuer.generate_token(Uuid::new_v4(), 3600).unwrap();

        let result = JwtManager::new(&config()).verify_token(&token);
        assert!(matches!(result, Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new(&config());
        let token = manager.generate_token(Uuid::new_v4(), -3600).unwrap();
        assert!(manager.verify_token(&token).is_err());
    }

    #[test]
    fn test_invalid_token() {
        let manager = JwtManager::new(&config());
        assert!(manager.verify_token("invalid.token.here").is_err());
    }
}
