//! 费用聚合仓储
//!
//! 一条 SQL 按战士聚合费用构成，评分重算、帮派详情和写操作的增量计算共用

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::traits::RatingRepositoryTrait;
use crate::error::Result;
use crate::rating::{FighterCostRow, RatingDelta, VehicleCostRow};

/// 战士费用聚合（SUM 结果为 BIGINT，统一转回 INTEGER）
const FIGHTER_COST_SELECT: &str = r#"
    SELECT f.id AS fighter_id, f.gang_id,
           f.credits AS base_credits, f.cost_adjustment,
           COALESCE((SELECT SUM(fe.purchase_cost) FROM fighter_equipment fe
                     WHERE fe.fighter_id = f.id), 0)::INTEGER AS equipment,
           COALESCE((SELECT SUM(fs.credits_increase) FROM fighter_skills fs
                     WHERE fs.fighter_id = f.id), 0)::INTEGER AS skills,
           COALESCE((SELECT SUM(COALESCE((ef.type_specific_data->>'credits_increase')::INTEGER, 0))
                     FROM fighter_effects ef
                     WHERE ef.fighter_id = f.id), 0)::INTEGER AS effects,
           COALESCE((SELECT SUM(
                        v.cost
                        + COALESCE((SELECT SUM(ve.purchase_cost) FROM fighter_equipment ve
                                    WHERE ve.vehicle_id = v.id), 0)
                        + COALESCE((SELECT SUM(COALESCE((vf.type_specific_data->>'credits_increase')::INTEGER, 0))
                                    FROM fighter_effects vf
                                    WHERE vf.vehicle_id = v.id), 0))
                     FROM vehicles v
                     WHERE v.fighter_id = f.id), 0)::INTEGER AS vehicles,
           f.killed, f.retired, f.enslaved, f.captured, f.recovery, f.starved
    FROM fighters f
"#;

const VEHICLE_COST_SELECT: &str = r#"
    SELECT v.id AS vehicle_id, v.gang_id, v.fighter_id,
           v.cost AS base_cost,
           COALESCE((SELECT SUM(ve.purchase_cost) FROM fighter_equipment ve
                     WHERE ve.vehicle_id = v.id), 0)::INTEGER AS equipment,
           COALESCE((SELECT SUM(COALESCE((vf.type_specific_data->>'credits_increase')::INTEGER, 0))
                     FROM fighter_effects vf
                     WHERE vf.vehicle_id = v.id), 0)::INTEGER AS effects
    FROM vehicles v
"#;

/// 费用聚合仓储
pub struct RatingRepository {
    pool: PgPool,
}

impl RatingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn fighter_costs_by_gang_sql() -> String {
        format!("{FIGHTER_COST_SELECT} WHERE f.gang_id = $1 ORDER BY f.created_at")
    }

    fn fighter_cost_by_id_sql() -> String {
        format!("{FIGHTER_COST_SELECT} WHERE f.id = $1")
    }

    fn vehicle_cost_by_id_sql() -> String {
        format!("{VEHICLE_COST_SELECT} WHERE v.id = $1")
    }

    // ==================== 事务操作 ====================

    /// 在事务中读取单个战士的费用（写操作计算增量时使用）
    pub async fn fighter_cost_in_tx(
        tx: &mut PgConnection,
        fighter_id: Uuid,
    ) -> Result<Option<FighterCostRow>> {
        let sql = Self::fighter_cost_by_id_sql();
        let row = sqlx::query_as::<_, FighterCostRow>(&sql)
            .bind(fighter_id)
            .fetch_optional(&mut *tx)
            .await?;
        Ok(row)
    }

    /// 在事务中读取帮派全部战士费用
    pub async fn fighter_costs_in_tx(
        tx: &mut PgConnection,
        gang_id: Uuid,
    ) -> Result<Vec<FighterCostRow>> {
        let sql = Self::fighter_costs_by_gang_sql();
        let rows = sqlx::query_as::<_, FighterCostRow>(&sql)
            .bind(gang_id)
            .fetch_all(&mut *tx)
            .await?;
        Ok(rows)
    }

    pub async fn vehicle_cost_in_tx(
        tx: &mut PgConnection,
        vehicle_id: Uuid,
    ) -> Result<Option<VehicleCostRow>> {
        let sql = Self::vehicle_cost_by_id_sql();
        let row = sqlx::query_as::<_, VehicleCostRow>(&sql)
            .bind(vehicle_id)
            .fetch_optional(&mut *tx)
            .await?;
        Ok(row)
    }

    /// 在调用方事务中累加帮派评分，零增量不写库
    ///
    /// 返回是否实际写入
    pub async fn apply_rating_delta_in_tx(
        tx: &mut PgConnection,
        gang_id: Uuid,
        delta: RatingDelta,
    ) -> Result<bool> {
        if delta.is_zero() {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE gangs
            SET rating = rating + $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(gang_id)
        .bind(delta.value())
        .execute(&mut *tx)
        .await?;

        Ok(true)
    }

    /// 在事务中直接覆盖评分（全量重算时使用）
    pub async fn set_rating_in_tx(tx: &mut PgConnection, gang_id: Uuid, rating: i32) -> Result<()> {
        sqlx::query("UPDATE gangs SET rating = $2, updated_at = NOW() WHERE id = $1")
            .bind(gang_id)
            .bind(rating)
            .execute(&mut *tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RatingRepositoryTrait for RatingRepository {
    async fn fighter_costs(&self, gang_id: Uuid) -> Result<Vec<FighterCostRow>> {
        let sql = Self::fighter_costs_by_gang_sql();
        let rows = sqlx::query_as::<_, FighterCostRow>(&sql)
            .bind(gang_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn fighter_cost(&self, fighter_id: Uuid) -> Result<Option<FighterCostRow>> {
        let sql = Self::fighter_cost_by_id_sql();
        let row = sqlx::query_as::<_, FighterCostRow>(&sql)
            .bind(fighter_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn vehicle_costs(&self, gang_id: Uuid) -> Result<Vec<VehicleCostRow>> {
        let sql = format!("{VEHICLE_COST_SELECT} WHERE v.gang_id = $1 ORDER BY v.created_at");
        let rows = sqlx::query_as::<_, VehicleCostRow>(&sql)
            .bind(gang_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn vehicle_cost(&self, vehicle_id: Uuid) -> Result<Option<VehicleCostRow>> {
        let sql = Self::vehicle_cost_by_id_sql();
        let row = sqlx::query_as::<_, VehicleCostRow>(&sql)
            .bind(vehicle_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn stash_value(&self, gang_id: Uuid) -> Result<i32> {
        let value: i32 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(purchase_cost), 0)::INTEGER
            FROM fighter_equipment
            WHERE gang_id = $1 AND gang_stash
            "#,
        )
        .bind(gang_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_sql_filters() {
        let by_gang = RatingRepository::fighter_costs_by_gang_sql();
        assert!(by_gang.trim_end().ends_with("WHERE f.gang_id = $1 ORDER BY f.created_at"));
        assert!(by_gang.contains("AS vehicles"));

        let by_id = RatingRepository::fighter_cost_by_id_sql();
        assert!(by_id.trim_end().ends_with("WHERE f.id = $1"));

        let vehicle = RatingRepository::vehicle_cost_by_id_sql();
        assert!(vehicle.contains("AS base_cost"));
    }

    #[test]
    fn test_cost_sql_excludes_stash() {
        // 战士装备只按 fighter_id 汇总，仓库装备不会进入评分
        assert!(FIGHTER_COST_SELECT.contains("WHERE fe.fighter_id = f.id"));
        assert!(!FIGHTER_COST_SELECT.contains("gang_stash"));
    }
}
