//! 数据库仓储层
//!
//! 封装所有表的 SQL 读写。
//!
//! ## 约定
//!
//! - 只读查询放在 trait 实现里，服务层可以 mock
//! - 写操作是 `*_in_tx` 关联函数，接收调用方事务中的连接
//! - 仓储不做业务判断，事务边界由服务层决定

mod access_repo;
mod campaign_repo;
mod catalog_repo;
mod custom_repo;
mod effect_repo;
mod equipment_repo;
mod fighter_repo;
mod gang_log_repo;
mod gang_repo;
mod rating_repo;
mod skill_repo;
mod traits;
mod vehicle_repo;

pub use access_repo::AccessRepository;
pub use campaign_repo::CampaignRepository;
pub use catalog_repo::{CatalogRepository, EquipmentInput, FighterTypeInput};
pub use custom_repo::{CustomContentRepository, CustomEquipmentInput, CustomFighterTypeInput};
pub use effect_repo::EffectRepository;
pub use equipment_repo::{EquipmentRepository, NewFighterEquipment};
pub use fighter_repo::FighterRepository;
pub use gang_log_repo::{GangLogRepository, NewGangLog};
pub use gang_repo::GangRepository;
pub use rating_repo::RatingRepository;
pub use skill_repo::SkillRepository;
pub use traits::*;
pub use vehicle_repo::{NewVehicle, VehicleRepository};
