//! 帮派日志

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 帮派操作日志
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GangLog {
    pub id: Uuid,
    pub gang_id: Uuid,
    pub user_id: Uuid,
    pub action_type: String,
    pub description: String,
    #[sqlx(default)]
    pub fighter_id: Option<Uuid>,
    #[sqlx(default)]
    pub vehicle_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
