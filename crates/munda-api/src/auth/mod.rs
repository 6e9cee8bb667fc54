//! 认证模块
//!
//! 校验外部签发的 JWT 访问令牌

mod jwt;

pub use jwt::{AuthUser, Claims, JwtManager};
