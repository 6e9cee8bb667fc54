//! Munda Manager 核心库
//!
//! 帮派、战士、装备、载具与战役的领域模型和业务规则。
//!
//! ## 核心功能
//!
//! - **帮派管理**：创建、修改、删除帮派，维护资金与评分
//! - **战士管理**：招募、状态变更、进阶、伤病
//! - **装备交易**：购买、出售、仓库转移，含异兽装备
//! - **载具管理**：载具、乘员指派、损伤与维修
//! - **战役管理**：成员、帮派、领地与资源
//! - **帮派日志**：每次变动写入审计日志
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `rating`: 评分规则
//! - `repository`: 数据库仓储层
//! - `service`: 业务服务层

pub mod error;
pub mod models;
pub mod rating;
pub mod repository;
pub mod service;

pub use error::{MundaError, Result};
pub use models::*;
pub use rating::{FighterStatus, RatingDelta};
pub use repository::{
    AccessRepository, CampaignRepository, CatalogRepository, CustomContentRepository,
    EffectRepository, EquipmentRepository, FighterRepository, GangLogRepository, GangRepository,
    RatingRepository, SkillRepository, VehicleRepository,
};
pub use service::{
    Access, AccessControl, AdvancementService, CampaignService, CatalogService,
    CustomContentService, EquipmentService, FighterService, GangService, InjuryService,
    ValuationService, VehicleService, dto,
};
