//! 中间件模块
//!
//! 提供认证和管理员权限检查中间件

mod auth;
mod permission;

pub use auth::auth_middleware;
pub use permission::require_admin;
