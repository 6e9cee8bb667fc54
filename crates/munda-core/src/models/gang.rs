//! 帮派相关实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Alignment, UserRole};

/// 用户档案
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub user_role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// 帮派类型（目录数据）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GangType {
    pub id: Uuid,
    pub gang_type: String,
    pub alignment: String,
}

/// 帮派
///
/// `rating` 为增量维护的缓存值，与战士费用聚合结果保持一致
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Gang {
    pub id: Uuid,
    /// 所属用户
    pub user_id: Uuid,
    pub name: String,
    pub gang_type_id: Uuid,
    pub alignment: Alignment,
    /// 可用信用点（不会小于 0）
    pub credits: i32,
    pub rating: i32,
    pub reputation: i32,
    pub meat: i32,
    pub scavenging_rolls: i32,
    pub exploration_points: i32,
    #[sqlx(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Gang {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }
}

/// 帮派字段变更
///
/// `None` 表示不修改；`credits_delta` 为有符号增量
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GangChanges {
    pub name: Option<String>,
    pub alignment: Option<Alignment>,
    pub credits_delta: Option<i32>,
    pub reputation: Option<i32>,
    pub meat: Option<i32>,
    pub scavenging_rolls: Option<i32>,
    pub exploration_points: Option<i32>,
    pub note: Option<String>,
}

impl GangChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.alignment.is_none()
            && self.credits_delta.is_none()
            && self.reputation.is_none()
            && self.meat.is_none()
            && self.scavenging_rolls.is_none()
            && self.exploration_points.is_none()
            && self.note.is_none()
    }
}
