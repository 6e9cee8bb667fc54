//! 领域模型
//!
//! 与数据库表一一对应的实体，以及服务层使用的变更结构

mod campaign;
mod effect;
mod enums;
mod equipment;
mod fighter;
mod gang;
mod gang_log;
mod skill;
mod vehicle;

pub use campaign::*;
pub use effect::*;
pub use enums::*;
pub use equipment::*;
pub use fighter::*;
pub use gang::*;
pub use gang_log::*;
pub use skill::*;
pub use vehicle::*;
