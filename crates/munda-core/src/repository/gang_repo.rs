//! 帮派仓储
//!
//! 帮派行在写操作中作为事务锁的入口（FOR UPDATE），
//! 同一帮派的信用点和评分变更因此串行化

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::traits::GangRepositoryTrait;
use crate::error::Result;
use crate::models::{Alignment, FighterEquipment, Gang, GangCampaign, GangChanges, GangType};

/// 帮派仓储
pub struct GangRepository {
    pool: PgPool,
}

impl GangRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 帮派仓库中的装备
    pub async fn list_stash(&self, gang_id: Uuid) -> Result<Vec<FighterEquipment>> {
        let items = sqlx::query_as::<_, FighterEquipment>(
            r#"
            SELECT id, gang_id, fighter_id, vehicle_id, gang_stash, equipment_id,
                   custom_equipment_id, equipment_name, equipment_type, purchase_cost,
                   original_cost, user_id, created_at
            FROM fighter_equipment
            WHERE gang_id = $1 AND gang_stash
            ORDER BY created_at
            "#,
        )
        .bind(gang_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    // ==================== 事务操作 ====================

    /// 在事务中获取帮派（带行级锁）
    pub async fn get_for_update(tx: &mut PgConnection, id: Uuid) -> Result<Option<Gang>> {
        let gang = sqlx::query_as::<_, Gang>(
            r#"
            SELECT id, user_id, name, gang_type_id, alignment, credits, rating, reputation,
                   meat, scavenging_rolls, exploration_points, note, created_at, updated_at
            FROM gangs
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        Ok(gang)
    }

    /// 在事务中创建帮派
    pub async fn create_in_tx(
        tx: &mut PgConnection,
        user_id: Uuid,
        name: &str,
        gang_type_id: Uuid,
        alignment: Alignment,
        credits: i32,
    ) -> Result<Gang> {
        let gang = sqlx::query_as::<_, Gang>(
            r#"
            INSERT INTO gangs (user_id, name, gang_type_id, alignment, credits, rating)
            VALUES ($1, $2, $3, $4, $5, 0)
            RETURNING id, user_id, name, gang_type_id, alignment, credits, rating, reputation,
                      meat, scavenging_rolls, exploration_points, note, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(gang_type_id)
        .bind(alignment)
        .bind(credits)
        .fetch_one(&mut *tx)
        .await?;

        Ok(gang)
    }

    /// 在事务中更新帮派的普通字段（不含信用点）
    pub async fn update_fields_in_tx(
        tx: &mut PgConnection,
        id: Uuid,
        changes: &GangChanges,
    ) -> Result<Gang> {
        let gang = sqlx::query_as::<_, Gang>(
            r#"
            UPDATE gangs
            SET name = COALESCE($2, name),
                alignment = COALESCE($3, alignment),
                reputation = COALESCE($4, reputation),
                meat = COALESCE($5, meat),
                scavenging_rolls = COALESCE($6, scavenging_rolls),
                exploration_points = COALESCE($7, exploration_points),
                note = COALESCE($8, note),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, user_id, name, gang_type_id, alignment, credits, rating, reputation,
                      meat, scavenging_rolls, exploration_points, note, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.alignment)
        .bind(changes.reputation)
        .bind(changes.meat)
        .bind(changes.scavenging_rolls)
        .bind(changes.exploration_points)
        .bind(changes.note.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        Ok(gang)
    }

    /// 在事务中调整信用点，返回调整后的余额
    ///
    /// 调用方需先锁定帮派并检查余额；数据库 CHECK 约束兜底
    pub async fn adjust_credits_in_tx(tx: &mut PgConnection, id: Uuid, delta: i32) -> Result<i32> {
        let credits: i32 = sqlx::query_scalar(
            r#"
            UPDATE gangs
            SET credits = credits + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING credits
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_one(&mut *tx)
        .await?;

        Ok(credits)
    }

    /// 在事务中删除帮派（关联数据由外键级联删除）
    pub async fn delete_in_tx(tx: &mut PgConnection, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM gangs WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl GangRepositoryTrait for GangRepository {
    async fn get_gang(&self, id: Uuid) -> Result<Option<Gang>> {
        let gang = sqlx::query_as::<_, Gang>(
            r#"
            SELECT id, user_id, name, gang_type_id, alignment, credits, rating, reputation,
                   meat, scavenging_rolls, exploration_points, note, created_at, updated_at
            FROM gangs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(gang)
    }

    async fn list_user_gangs(&self, user_id: Uuid) -> Result<Vec<Gang>> {
        let gangs = sqlx::query_as::<_, Gang>(
            r#"
            SELECT id, user_id, name, gang_type_id, alignment, credits, rating, reputation,
                   meat, scavenging_rolls, exploration_points, note, created_at, updated_at
            FROM gangs
            WHERE user_id = $1
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(gangs)
    }

    async fn get_gang_type(&self, id: Uuid) -> Result<Option<GangType>> {
        let gang_type = sqlx::query_as::<_, GangType>(
            "SELECT id, gang_type, alignment FROM gang_types WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(gang_type)
    }

    async fn list_gang_campaigns(&self, gang_id: Uuid) -> Result<Vec<GangCampaign>> {
        let campaigns = sqlx::query_as::<_, GangCampaign>(
            r#"
            SELECT c.id AS campaign_id, c.campaign_name, cg.id AS campaign_gang_id
            FROM campaign_gangs cg
            JOIN campaigns c ON c.id = cg.campaign_id
            WHERE cg.gang_id = $1
            "#,
        )
        .bind(gang_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(campaigns)
    }
}
