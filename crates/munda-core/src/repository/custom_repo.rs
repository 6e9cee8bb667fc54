//! 自定义内容仓储
//!
//! 用户自建装备与战士类型，所有查询均按 user_id 限定范围

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CustomEquipment, CustomFighterType, EquipmentType, FighterStats};

const CUSTOM_EQUIPMENT_COLUMNS: &str = r#"
    id, user_id, equipment_name, trading_post_category, equipment_category, equipment_type,
    availability, cost, created_at, updated_at
"#;

const CUSTOM_FIGHTER_TYPE_COLUMNS: &str = r#"
    id, user_id, fighter_type, gang_type_id, fighter_class, cost,
    movement, weapon_skill, ballistic_skill, strength, toughness, wounds,
    initiative, attacks, leadership, cool, willpower, intelligence,
    special_rules, free_skill, created_at, updated_at
"#;

/// 自定义装备写入参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomEquipmentInput {
    pub equipment_name: String,
    pub trading_post_category: Option<String>,
    pub equipment_category: String,
    pub equipment_type: EquipmentType,
    pub availability: Option<String>,
    pub cost: i32,
}

/// 自定义战士类型写入参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFighterTypeInput {
    pub fighter_type: String,
    pub gang_type_id: Option<Uuid>,
    pub fighter_class: String,
    pub cost: i32,
    #[serde(flatten)]
    pub stats: FighterStats,
    #[serde(default)]
    pub special_rules: Vec<String>,
    #[serde(default)]
    pub free_skill: bool,
}

/// 自定义内容仓储
pub struct CustomContentRepository {
    pool: PgPool,
}

impl CustomContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 自定义装备 ====================

    pub async fn get_equipment(&self, id: Uuid) -> Result<Option<CustomEquipment>> {
        let sql = format!("SELECT {CUSTOM_EQUIPMENT_COLUMNS} FROM custom_equipment WHERE id = $1");
        let item = sqlx::query_as::<_, CustomEquipment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    pub async fn list_equipment(&self, user_id: Uuid) -> Result<Vec<CustomEquipment>> {
        let sql = format!(
            r#"
            SELECT {CUSTOM_EQUIPMENT_COLUMNS} FROM custom_equipment
            WHERE user_id = $1
            ORDER BY equipment_category, equipment_name
            "#
        );
        let items = sqlx::query_as::<_, CustomEquipment>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn create_equipment(
        &self,
        user_id: Uuid,
        input: &CustomEquipmentInput,
    ) -> Result<CustomEquipment> {
        let sql = format!(
            r#"
            INSERT INTO custom_equipment (user_id, equipment_name, trading_post_category,
                                          equipment_category, equipment_type, availability, cost)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {CUSTOM_EQUIPMENT_COLUMNS}
            "#
        );
        let item = sqlx::query_as::<_, CustomEquipment>(&sql)
            .bind(user_id)
            .bind(&input.equipment_name)
            .bind(input.trading_post_category.as_deref())
            .bind(&input.equipment_category)
            .bind(input.equipment_type)
            .bind(input.availability.as_deref())
            .bind(input.cost)
            .fetch_one(&self.pool)
            .await?;
        Ok(item)
    }

    /// 仅更新属于该用户的记录，不存在或不属于该用户时返回 None
    pub async fn update_equipment(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: &CustomEquipmentInput,
    ) -> Result<Option<CustomEquipment>> {
        let sql = format!(
            r#"
            UPDATE custom_equipment
            SET equipment_name = $3, trading_post_category = $4, equipment_category = $5,
                equipment_type = $6, availability = $7, cost = $8, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {CUSTOM_EQUIPMENT_COLUMNS}
            "#
        );
        let item = sqlx::query_as::<_, CustomEquipment>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(&input.equipment_name)
            .bind(input.trading_post_category.as_deref())
            .bind(&input.equipment_category)
            .bind(input.equipment_type)
            .bind(input.availability.as_deref())
            .bind(input.cost)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    pub async fn delete_equipment(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM custom_equipment WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== 自定义战士类型 ====================

    pub async fn get_fighter_type(&self, id: Uuid) -> Result<Option<CustomFighterType>> {
        let sql = format!(
            "SELECT {CUSTOM_FIGHTER_TYPE_COLUMNS} FROM custom_fighter_types WHERE id = $1"
        );
        let item = sqlx::query_as::<_, CustomFighterType>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    pub async fn create_fighter_type(
        &self,
        user_id: Uuid,
        input: &CustomFighterTypeInput,
    ) -> Result<CustomFighterType> {
        let sql = format!(
            r#"
            INSERT INTO custom_fighter_types (
                user_id, fighter_type, gang_type_id, fighter_class, cost,
                movement, weapon_skill, ballistic_skill, strength, toughness, wounds,
                initiative, attacks, leadership, cool, willpower, intelligence,
                special_rules, free_skill
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19)
            RETURNING {CUSTOM_FIGHTER_TYPE_COLUMNS}
            "#
        );
        let s = &input.stats;
        let item = sqlx::query_as::<_, CustomFighterType>(&sql)
            .bind(user_id)
            .bind(&input.fighter_type)
            .bind(input.gang_type_id)
            .bind(&input.fighter_class)
            .bind(input.cost)
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
            .bind(&input.special_rules)
            .bind(input.free_skill)
            .fetch_one(&self.pool)
            .await?;
        Ok(item)
    }

    pub async fn update_fighter_type(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: &CustomFighterTypeInput,
    ) -> Result<Option<CustomFighterType>> {
        let sql = format!(
            r#"
            UPDATE custom_fighter_types
            SET fighter_type = $3, gang_type_id = $4, fighter_class = $5, cost = $6,
                movement = $7, weapon_skill = $8, ballistic_skill = $9, strength = $10,
                toughness = $11, wounds = $12, initiative = $13, attacks = $14,
                leadership = $15, cool = $16, willpower = $17, intelligence = $18,
                special_rules = $19, free_skill = $20, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {CUSTOM_FIGHTER_TYPE_COLUMNS}
            "#
        );
        let s = &input.stats;
        let item = sqlx::query_as::<_, CustomFighterType>(&sql)
            .bind(id)
            .bind(user_id)
            .bind(&input.fighter_type)
            .bind(input.gang_type_id)
            .bind(&input.fighter_class)
            .bind(input.cost)
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
            .bind(&input.special_rules)
            .bind(input.free_skill)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }

    pub async fn delete_fighter_type(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM custom_fighter_types WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
