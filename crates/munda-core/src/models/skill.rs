//! 技能相关实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 技能（目录数据）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
    pub skill_type_id: Uuid,
    pub skill_type: String,
}

/// 战士已习得的技能
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FighterSkill {
    pub id: Uuid,
    pub fighter_id: Uuid,
    pub skill_id: Uuid,
    pub skill_name: String,
    pub credits_increase: i32,
    pub xp_cost: i32,
    pub is_advance: bool,
    pub created_at: DateTime<Utc>,
}
