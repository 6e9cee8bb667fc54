//! 战士技能仓储

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::Result;
use crate::models::FighterSkill;

/// 战士技能仓储
pub struct SkillRepository {
    pool: PgPool,
}

impl SkillRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_for_fighter(&self, fighter_id: Uuid) -> Result<Vec<FighterSkill>> {
        let skills = sqlx::query_as::<_, FighterSkill>(
            r#"
            SELECT fs.id, fs.fighter_id, fs.skill_id, s.name AS skill_name,
                   fs.credits_increase, fs.xp_cost, fs.is_advance, fs.created_at
            FROM fighter_skills fs
            JOIN skills s ON s.id = fs.skill_id
            WHERE fs.fighter_id = $1
            ORDER BY fs.created_at
            "#,
        )
        .bind(fighter_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(skills)
    }

    // ==================== 事务操作 ====================

    /// 在事务中获取战士技能（带行级锁）
    pub async fn get_for_update(tx: &mut PgConnection, id: Uuid) -> Result<Option<FighterSkill>> {
        let skill = sqlx::query_as::<_, FighterSkill>(
            r#"
            SELECT fs.id, fs.fighter_id, fs.skill_id, s.name AS skill_name,
                   fs.credits_increase, fs.xp_cost, fs.is_advance, fs.created_at
            FROM fighter_skills fs
            JOIN skills s ON s.id = fs.skill_id
            WHERE fs.id = $1
            FOR UPDATE OF fs
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        Ok(skill)
    }

    /// 战士是否已掌握该技能
    pub async fn exists_in_tx(tx: &mut PgConnection, fighter_id: Uuid, skill_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM fighter_skills WHERE fighter_id = $1 AND skill_id = $2)",
        )
        .bind(fighter_id)
        .bind(skill_id)
        .fetch_one(&mut *tx)
        .await?;
        Ok(exists)
    }

    /// 在事务中写入战士技能
    pub async fn insert_in_tx(
        tx: &mut PgConnection,
        fighter_id: Uuid,
        skill_id: Uuid,
        credits_increase: i32,
        xp_cost: i32,
        is_advance: bool,
        user_id: Uuid,
    ) -> Result<FighterSkill> {
        let skill = sqlx::query_as::<_, FighterSkill>(
            r#"
            WITH inserted AS (
                INSERT INTO fighter_skills (fighter_id, skill_id, credits_increase, xp_cost, is_advance, user_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, fighter_id, skill_id, credits_increase, xp_cost, is_advance, created_at
            )
            SELECT i.id, i.fighter_id, i.skill_id, s.name AS skill_name,
                   i.credits_increase, i.xp_cost, i.is_advance, i.created_at
            FROM inserted i
            JOIN skills s ON s.id = i.skill_id
            "#,
        )
        .bind(fighter_id)
        .bind(skill_id)
        .bind(credits_increase)
        .bind(xp_cost)
        .bind(is_advance)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        Ok(skill)
    }

    pub async fn delete_in_tx(tx: &mut PgConnection, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM fighter_skills WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
