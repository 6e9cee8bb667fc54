//! 帮派日志仓储

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::traits::GangLogRepositoryTrait;
use crate::error::Result;
use crate::models::{GangLog, GangLogAction};

/// 日志写入参数
#[derive(Debug, Clone)]
pub struct NewGangLog {
    pub gang_id: Uuid,
    pub user_id: Uuid,
    pub action: GangLogAction,
    pub description: String,
    pub fighter_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
}

impl NewGangLog {
    pub fn new(
        gang_id: Uuid,
        user_id: Uuid,
        action: GangLogAction,
        description: impl Into<String>,
    ) -> Self {
        Self {
            gang_id,
            user_id,
            action,
            description: description.into(),
            fighter_id: None,
            vehicle_id: None,
        }
    }

    pub fn with_fighter(mut self, fighter_id: Uuid) -> Self {
        self.fighter_id = Some(fighter_id);
        self
    }

    pub fn with_vehicle(mut self, vehicle_id: Uuid) -> Self {
        self.vehicle_id = Some(vehicle_id);
        self
    }
}

/// 帮派日志仓储
pub struct GangLogRepository {
    pool: PgPool,
}

impl GangLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 在事务中写入日志，与业务变更一同提交
    pub async fn create_in_tx(tx: &mut PgConnection, log: &NewGangLog) -> Result<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO gang_logs (gang_id, user_id, action_type, description, fighter_id, vehicle_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(log.gang_id)
        .bind(log.user_id)
        .bind(log.action.as_str())
        .bind(&log.description)
        .bind(log.fighter_id)
        .bind(log.vehicle_id)
        .fetch_one(&mut *tx)
        .await?;

        Ok(id)
    }
}

#[async_trait]
impl GangLogRepositoryTrait for GangLogRepository {
    async fn list(
        &self,
        gang_id: Uuid,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<GangLog>, i64)> {
        let offset = (page.max(1) - 1) * page_size;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM gang_logs WHERE gang_id = $1")
            .bind(gang_id)
            .fetch_one(&self.pool)
            .await?;

        let logs = sqlx::query_as::<_, GangLog>(
            r#"
            SELECT id, gang_id, user_id, action_type, description, fighter_id, vehicle_id, created_at
            FROM gang_logs
            WHERE gang_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(gang_id)
        .bind(page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((logs, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_gang_log_builder() {
        let gang = Uuid::new_v4();
        let fighter = Uuid::new_v4();
        let log = NewGangLog::new(gang, Uuid::nil(), GangLogAction::FighterAdded, "Hired Vex")
            .with_fighter(fighter);
        assert_eq!(log.fighter_id, Some(fighter));
        assert!(log.vehicle_id.is_none());
        assert_eq!(log.action.as_str(), "fighter_added");
    }
}
