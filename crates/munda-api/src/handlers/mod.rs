//! HTTP 请求处理器模块
//!
//! 每个处理器只做参数校验和结果包装，业务规则在 munda-core 服务层

pub mod admin;
pub mod campaign;
pub mod catalog;
pub mod custom;
pub mod equipment;
pub mod fighter;
pub mod gang;
pub mod health;
pub mod vehicle;
