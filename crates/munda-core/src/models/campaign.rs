//! 战役相关实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{CampaignRole, CampaignStatus};

/// 战役
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub campaign_name: String,
    #[sqlx(default)]
    pub description: Option<String>,
    pub status: CampaignStatus,
    pub has_meat: bool,
    pub has_exploration_points: bool,
    pub has_scavenging_rolls: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 战役字段变更
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignChanges {
    pub campaign_name: Option<String>,
    pub description: Option<String>,
    pub status: Option<CampaignStatus>,
    pub has_meat: Option<bool>,
    pub has_exploration_points: Option<bool>,
    pub has_scavenging_rolls: Option<bool>,
}

/// 战役成员
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CampaignMember {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub role: CampaignRole,
    #[sqlx(default)]
    pub invited_by: Option<Uuid>,
    pub joined_at: DateTime<Utc>,
}

/// 参战帮派
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CampaignGang {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub gang_id: Uuid,
    pub campaign_member_id: Uuid,
    pub user_id: Uuid,
    pub gang_name: String,
    pub rating: i32,
    pub joined_at: DateTime<Utc>,
}

/// 帮派所在战役（帮派详情页使用）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GangCampaign {
    pub campaign_id: Uuid,
    pub campaign_name: String,
    pub campaign_gang_id: Uuid,
}

/// 战役领地
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CampaignTerritory {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub territory_name: String,
    #[sqlx(default)]
    pub gang_id: Option<Uuid>,
    pub ruined: bool,
    pub created_at: DateTime<Utc>,
}

/// 战役资源定义
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CampaignResource {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub resource_name: String,
}

/// 帮派持有的战役资源数量
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CampaignGangResource {
    pub campaign_gang_id: Uuid,
    pub campaign_resource_id: Uuid,
    pub quantity: i32,
}
