//! 战士仓储

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::traits::FighterRepositoryTrait;
use crate::error::Result;
use crate::models::{ExoticBeastLink, Fighter, FighterChanges, FighterTemplate};
use crate::rating::FighterStatus;

const FIGHTER_COLUMNS: &str = r#"
    id, gang_id, user_id, fighter_name, label, fighter_type_id, custom_fighter_type_id,
    fighter_type, fighter_class, credits, cost_adjustment, xp, kills,
    movement, weapon_skill, ballistic_skill, strength, toughness, wounds, initiative,
    attacks, leadership, cool, willpower, intelligence, special_rules, free_skill,
    killed, retired, enslaved, starved, recovery, captured, note, created_at, updated_at
"#;

/// 战士仓储
pub struct FighterRepository {
    pool: PgPool,
}

impl FighterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 异兽的归属关系（如果该战士是异兽）
    pub async fn get_beast_owner(&self, pet_id: Uuid) -> Result<Option<ExoticBeastLink>> {
        let link = sqlx::query_as::<_, ExoticBeastLink>(
            r#"
            SELECT id, fighter_owner_id, fighter_pet_id, fighter_equipment_id
            FROM fighter_exotic_beasts
            WHERE fighter_pet_id = $1
            "#,
        )
        .bind(pet_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(link)
    }

    // ==================== 事务操作 ====================

    /// 在事务中获取战士（带行级锁）
    pub async fn get_for_update(tx: &mut PgConnection, id: Uuid) -> Result<Option<Fighter>> {
        let sql = format!("SELECT {FIGHTER_COLUMNS} FROM fighters WHERE id = $1 FOR UPDATE");
        let fighter = sqlx::query_as::<_, Fighter>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        Ok(fighter)
    }

    /// 在事务中按模板创建战士
    pub async fn create_in_tx(
        tx: &mut PgConnection,
        gang_id: Uuid,
        user_id: Uuid,
        fighter_name: &str,
        template: &FighterTemplate,
    ) -> Result<Fighter> {
        let sql = format!(
            r#"
            INSERT INTO fighters (
                gang_id, user_id, fighter_name, fighter_type_id, custom_fighter_type_id,
                fighter_type, fighter_class, credits,
                movement, weapon_skill, ballistic_skill, strength, toughness, wounds,
                initiative, attacks, leadership, cool, willpower, intelligence,
                special_rules, free_skill
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22)
            RETURNING {FIGHTER_COLUMNS}
            "#
        );
        let s = &template.stats;
        let fighter = sqlx::query_as::<_, Fighter>(&sql)
            .bind(gang_id)
            .bind(user_id)
            .bind(fighter_name)
            .bind(template.fighter_type_id)
            .bind(template.custom_fighter_type_id)
            .bind(&template.fighter_type)
            .bind(&template.fighter_class)
            .bind(template.base_credits)
            .bind(s.movement)
            .bind(s.weapon_skill)
            .bind(s.ballistic_skill)
            .bind(s.strength)
            .bind(s.toughness)
            .bind(s.wounds)
            .bind(s.initiative)
            .bind(s.attacks)
            .bind(s.leadership)
            .bind(s.cool)
            .bind(s.willpower)
            .bind(s.intelligence)
            .bind(&template.special_rules)
            .bind(template.free_skill)
            .fetch_one(&mut *tx)
            .await?;

        Ok(fighter)
    }

    /// 在事务中更新战士字段
    ///
    /// `xp_delta` 为增量；调用方需保证结果不小于 0
    pub async fn update_fields_in_tx(
        tx: &mut PgConnection,
        id: Uuid,
        changes: &FighterChanges,
    ) -> Result<Fighter> {
        let sql = format!(
            r#"
            UPDATE fighters
            SET fighter_name = COALESCE($2, fighter_name),
                label = COALESCE($3, label),
                note = COALESCE($4, note),
                kills = COALESCE($5, kills),
                xp = xp + COALESCE($6, 0),
                cost_adjustment = COALESCE($7, cost_adjustment),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {FIGHTER_COLUMNS}
            "#
        );
        let fighter = sqlx::query_as::<_, Fighter>(&sql)
            .bind(id)
            .bind(changes.fighter_name.as_deref())
            .bind(changes.label.as_deref())
            .bind(changes.note.as_deref())
            .bind(changes.kills)
            .bind(changes.xp_delta)
            .bind(changes.cost_adjustment)
            .fetch_one(&mut *tx)
            .await?;

        Ok(fighter)
    }

    /// 在事务中写入战士状态
    pub async fn set_status_in_tx(
        tx: &mut PgConnection,
        id: Uuid,
        status: FighterStatus,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE fighters
            SET killed = $2, retired = $3, enslaved = $4, captured = $5,
                recovery = $6, starved = $7, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.killed)
        .bind(status.retired)
        .bind(status.enslaved)
        .bind(status.captured)
        .bind(status.recovery)
        .bind(status.starved)
        .execute(&mut *tx)
        .await?;

        Ok(())
    }

    /// 在事务中调整经验值，返回调整后的值
    pub async fn adjust_xp_in_tx(tx: &mut PgConnection, id: Uuid, delta: i32) -> Result<i32> {
        let xp: i32 = sqlx::query_scalar(
            "UPDATE fighters SET xp = xp + $2, updated_at = NOW() WHERE id = $1 RETURNING xp",
        )
        .bind(id)
        .bind(delta)
        .fetch_one(&mut *tx)
        .await?;
        Ok(xp)
    }

    /// 在事务中删除战士（装备、效果、技能由外键级联删除）
    pub async fn delete_in_tx(tx: &mut PgConnection, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM fighters WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== 异兽 ====================

    /// 在事务中记录异兽归属
    pub async fn create_beast_link_in_tx(
        tx: &mut PgConnection,
        owner_id: Uuid,
        pet_id: Uuid,
        fighter_equipment_id: Uuid,
    ) -> Result<ExoticBeastLink> {
        let link = sqlx::query_as::<_, ExoticBeastLink>(
            r#"
            INSERT INTO fighter_exotic_beasts (fighter_owner_id, fighter_pet_id, fighter_equipment_id)
            VALUES ($1, $2, $3)
            RETURNING id, fighter_owner_id, fighter_pet_id, fighter_equipment_id
            "#,
        )
        .bind(owner_id)
        .bind(pet_id)
        .bind(fighter_equipment_id)
        .fetch_one(&mut *tx)
        .await?;

        Ok(link)
    }

    /// 在事务中列出战士拥有的异兽
    pub async fn list_beast_links_in_tx(
        tx: &mut PgConnection,
        owner_id: Uuid,
    ) -> Result<Vec<ExoticBeastLink>> {
        let links = sqlx::query_as::<_, ExoticBeastLink>(
            r#"
            SELECT id, fighter_owner_id, fighter_pet_id, fighter_equipment_id
            FROM fighter_exotic_beasts
            WHERE fighter_owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_all(&mut *tx)
        .await?;

        Ok(links)
    }

    /// 在事务中列出由某件装备生成的异兽
    pub async fn list_beasts_for_equipment_in_tx(
        tx: &mut PgConnection,
        fighter_equipment_id: Uuid,
    ) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT fighter_pet_id FROM fighter_exotic_beasts WHERE fighter_equipment_id = $1",
        )
        .bind(fighter_equipment_id)
        .fetch_all(&mut *tx)
        .await?;

        Ok(ids)
    }
}

#[async_trait]
impl FighterRepositoryTrait for FighterRepository {
    async fn get_fighter(&self, id: Uuid) -> Result<Option<Fighter>> {
        let sql = format!("SELECT {FIGHTER_COLUMNS} FROM fighters WHERE id = $1");
        let fighter = sqlx::query_as::<_, Fighter>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(fighter)
    }

    async fn list_by_gang(&self, gang_id: Uuid) -> Result<Vec<Fighter>> {
        let sql = format!(
            "SELECT {FIGHTER_COLUMNS} FROM fighters WHERE gang_id = $1 ORDER BY created_at"
        );
        let fighters = sqlx::query_as::<_, Fighter>(&sql)
            .bind(gang_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(fighters)
    }

    async fn list_beast_links(&self, owner_id: Uuid) -> Result<Vec<ExoticBeastLink>> {
        let links = sqlx::query_as::<_, ExoticBeastLink>(
            r#"
            SELECT id, fighter_owner_id, fighter_pet_id, fighter_equipment_id
            FROM fighter_exotic_beasts
            WHERE fighter_owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(links)
    }
}
