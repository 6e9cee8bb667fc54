//! 载具相关实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 载具属性值
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VehicleStats {
    pub movement: i16,
    pub front: i16,
    pub side: i16,
    pub rear: i16,
    pub hull_points: i16,
    pub handling: i16,
    pub save: i16,
}

/// 载具类型（目录数据）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VehicleType {
    pub id: Uuid,
    pub vehicle_type: String,
    #[sqlx(default)]
    pub gang_type_id: Option<Uuid>,
    pub cost: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub stats: VehicleStats,
    pub body_slots: i16,
    pub drive_slots: i16,
    pub engine_slots: i16,
}

/// 载具
///
/// `fighter_id` 为空时载具未分配，不计入评分
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: Uuid,
    pub gang_id: Uuid,
    #[sqlx(default)]
    pub fighter_id: Option<Uuid>,
    pub user_id: Uuid,
    #[sqlx(default)]
    pub vehicle_type_id: Option<Uuid>,
    pub vehicle_type: String,
    pub vehicle_name: String,
    pub cost: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub stats: VehicleStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn is_assigned(&self) -> bool {
        self.fighter_id.is_some()
    }
}
