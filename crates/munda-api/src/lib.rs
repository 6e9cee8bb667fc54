//! Munda Manager REST API
//!
//! 将 munda-core 的帮派管理服务暴露为 HTTP 接口。
//!
//! ## 模块结构
//!
//! - `auth`: JWT 校验
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 领域错误到 HTTP 响应的映射
//! - `handlers`: HTTP 请求处理器
//! - `middleware`: 认证与管理员校验
//! - `routes`: 路由配置
//! - `state`: 应用状态
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 数据验证：validator
//! - 序列化：serde (camelCase)

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use dto::{ApiResponse, PageResponse, PaginationParams};
pub use error::{ApiError, Result};
pub use state::AppState;
