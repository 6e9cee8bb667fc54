//! 目录数据仓储
//!
//! 帮派类型、战士类型、装备、载具类型、技能、效果类型，以及管理员维护接口

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::traits::CatalogRepositoryTrait;
use crate::error::Result;
use crate::models::{
    CustomFighterType, EffectTypeWithModifiers, Equipment, EquipmentType, FighterEffectType,
    FighterEffectTypeModifier, FighterStats, FighterType, FighterTypeWithCost, GangType, Skill,
    VehicleType,
};

const FIGHTER_TYPE_COLUMNS: &str = r#"
    ft.id, ft.fighter_type, ft.gang_type_id, ft.fighter_class, ft.cost,
    ft.movement, ft.weapon_skill, ft.ballistic_skill, ft.strength, ft.toughness, ft.wounds,
    ft.initiative, ft.attacks, ft.leadership, ft.cool, ft.willpower, ft.intelligence,
    ft.special_rules, ft.free_skill, ft.is_gang_addition
"#;

const EQUIPMENT_COLUMNS: &str = r#"
    id, equipment_name, trading_post_category, equipment_category, equipment_type,
    availability, cost, grants_fighter_type_id
"#;

const VEHICLE_TYPE_COLUMNS: &str = r#"
    id, vehicle_type, gang_type_id, cost, movement, front, side, rear, hull_points,
    handling, save, body_slots, drive_slots, engine_slots
"#;

const EFFECT_TYPE_SELECT: &str = r#"
    SELECT t.id, t.effect_name, c.category_name, t.type_specific_data
    FROM fighter_effect_types t
    JOIN fighter_effect_categories c ON c.id = t.fighter_effect_category_id
"#;

/// 目录装备写入参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentInput {
    pub equipment_name: String,
    pub trading_post_category: Option<String>,
    pub equipment_category: String,
    pub equipment_type: EquipmentType,
    pub availability: Option<String>,
    pub cost: i32,
    pub grants_fighter_type_id: Option<Uuid>,
}

/// 目录战士类型写入参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FighterTypeInput {
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
    #[serde(default)]
    pub is_gang_addition: bool,
    /// 默认装备（招募时以 0 价格附带）
    #[serde(default)]
    pub default_equipment_ids: Vec<Uuid>,
}

/// 目录数据仓储
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_effect_modifiers(
        &self,
        types: Vec<FighterEffectType>,
    ) -> Result<Vec<EffectTypeWithModifiers>> {
        if types.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = types.iter().map(|t| t.id).collect();
        let modifiers = sqlx::query_as::<_, FighterEffectTypeModifier>(
            r#"
            SELECT id, fighter_effect_type_id, stat_name, default_numeric_value
            FROM fighter_effect_type_modifiers
            WHERE fighter_effect_type_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_type: HashMap<Uuid, Vec<FighterEffectTypeModifier>> = HashMap::new();
        for m in modifiers {
            by_type.entry(m.fighter_effect_type_id).or_default().push(m);
        }

        Ok(types
            .into_iter()
            .map(|effect_type| {
                let modifiers = by_type.remove(&effect_type.id).unwrap_or_default();
                EffectTypeWithModifiers {
                    effect_type,
                    modifiers,
                }
            })
            .collect())
    }

    // ==================== 管理员维护 ====================

    pub async fn create_equipment(&self, input: &EquipmentInput) -> Result<Equipment> {
        let sql = format!(
            r#"
            INSERT INTO equipment (equipment_name, trading_post_category, equipment_category,
                                   equipment_type, availability, cost, grants_fighter_type_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {EQUIPMENT_COLUMNS}
            "#
        );
        let equipment = sqlx::query_as::<_, Equipment>(&sql)
            .bind(&input.equipment_name)
            .bind(input.trading_post_category.as_deref())
            .bind(&input.equipment_category)
            .bind(input.equipment_type)
            .bind(input.availability.as_deref())
            .bind(input.cost)
            .bind(input.grants_fighter_type_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(equipment)
    }

    pub async fn update_equipment(&self, id: Uuid, input: &EquipmentInput) -> Result<Option<Equipment>> {
        let sql = format!(
            r#"
            UPDATE equipment
            SET equipment_name = $2, trading_post_category = $3, equipment_category = $4,
                equipment_type = $5, availability = $6, cost = $7,
                grants_fighter_type_id = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {EQUIPMENT_COLUMNS}
            "#
        );
        let equipment = sqlx::query_as::<_, Equipment>(&sql)
            .bind(id)
            .bind(&input.equipment_name)
            .bind(input.trading_post_category.as_deref())
            .bind(&input.equipment_category)
            .bind(input.equipment_type)
            .bind(input.availability.as_deref())
            .bind(input.cost)
            .bind(input.grants_fighter_type_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(equipment)
    }

    pub async fn delete_equipment(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// 创建战士类型及其默认装备
    pub async fn create_fighter_type(&self, input: &FighterTypeInput) -> Result<FighterType> {
        let mut tx = self.pool.begin().await?;

        let s = &input.stats;
        let fighter_type = sqlx::query_as::<_, FighterType>(
            r#"
            INSERT INTO fighter_types (
                fighter_type, gang_type_id, fighter_class, cost,
                movement, weapon_skill, ballistic_skill, strength, toughness, wounds,
                initiative, attacks, leadership, cool, willpower, intelligence,
                special_rules, free_skill, is_gang_addition
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19)
            RETURNING id, fighter_type, gang_type_id, fighter_class, cost,
                      movement, weapon_skill, ballistic_skill, strength, toughness, wounds,
                      initiative, attacks, leadership, cool, willpower, intelligence,
                      special_rules, free_skill, is_gang_addition
            "#,
        )
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
        .bind(input.is_gang_addition)
        .fetch_one(&mut *tx)
        .await?;

        for equipment_id in &input.default_equipment_ids {
            sqlx::query(
                "INSERT INTO fighter_type_default_equipment (fighter_type_id, equipment_id) VALUES ($1, $2)",
            )
            .bind(fighter_type.id)
            .bind(equipment_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(fighter_type)
    }

    /// 更新战士类型，默认装备整体替换
    pub async fn update_fighter_type(
        &self,
        id: Uuid,
        input: &FighterTypeInput,
    ) -> Result<Option<FighterType>> {
        let mut tx = self.pool.begin().await?;

        let s = &input.stats;
        let fighter_type = sqlx::query_as::<_, FighterType>(
            r#"
            UPDATE fighter_types
            SET fighter_type = $2, gang_type_id = $3, fighter_class = $4, cost = $5,
                movement = $6, weapon_skill = $7, ballistic_skill = $8, strength = $9,
                toughness = $10, wounds = $11, initiative = $12, attacks = $13,
                leadership = $14, cool = $15, willpower = $16, intelligence = $17,
                special_rules = $18, free_skill = $19, is_gang_addition = $20,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, fighter_type, gang_type_id, fighter_class, cost,
                      movement, weapon_skill, ballistic_skill, strength, toughness, wounds,
                      initiative, attacks, leadership, cool, willpower, intelligence,
                      special_rules, free_skill, is_gang_addition
            "#,
        )
        .bind(id)
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
        .bind(input.is_gang_addition)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(fighter_type) = fighter_type else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM fighter_type_default_equipment WHERE fighter_type_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for equipment_id in &input.default_equipment_ids {
            sqlx::query(
                "INSERT INTO fighter_type_default_equipment (fighter_type_id, equipment_id) VALUES ($1, $2)",
            )
            .bind(id)
            .bind(equipment_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(fighter_type))
    }

    pub async fn delete_fighter_type(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM fighter_types WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// 设置帮派类型专属价格
    pub async fn set_gang_cost(
        &self,
        fighter_type_id: Uuid,
        gang_type_id: Uuid,
        adjusted_cost: i32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fighter_type_gang_costs (fighter_type_id, gang_type_id, adjusted_cost)
            VALUES ($1, $2, $3)
            ON CONFLICT (fighter_type_id, gang_type_id)
            DO UPDATE SET adjusted_cost = EXCLUDED.adjusted_cost
            "#,
        )
        .bind(fighter_type_id)
        .bind(gang_type_id)
        .bind(adjusted_cost)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogRepositoryTrait for CatalogRepository {
    async fn list_gang_types(&self) -> Result<Vec<GangType>> {
        let types = sqlx::query_as::<_, GangType>(
            "SELECT id, gang_type, alignment FROM gang_types ORDER BY gang_type",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(types)
    }

    async fn get_fighter_type(&self, id: Uuid) -> Result<Option<FighterType>> {
        let sql = format!("SELECT {FIGHTER_TYPE_COLUMNS} FROM fighter_types ft WHERE ft.id = $1");
        let fighter_type = sqlx::query_as::<_, FighterType>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(fighter_type)
    }

    async fn get_fighter_type_with_cost(
        &self,
        id: Uuid,
        gang_type_id: Uuid,
    ) -> Result<Option<FighterTypeWithCost>> {
        let sql = format!(
            r#"
            SELECT {FIGHTER_TYPE_COLUMNS}, gc.adjusted_cost
            FROM fighter_types ft
            LEFT JOIN fighter_type_gang_costs gc
                   ON gc.fighter_type_id = ft.id AND gc.gang_type_id = $2
            WHERE ft.id = $1
            "#
        );
        let fighter_type = sqlx::query_as::<_, FighterTypeWithCost>(&sql)
            .bind(id)
            .bind(gang_type_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(fighter_type)
    }

    async fn list_fighter_types_with_cost(
        &self,
        gang_type_id: Uuid,
    ) -> Result<Vec<FighterTypeWithCost>> {
        // 帮派自有类型 + 通过专属价格向该帮派开放的类型
        let sql = format!(
            r#"
            SELECT {FIGHTER_TYPE_COLUMNS}, gc.adjusted_cost
            FROM fighter_types ft
            LEFT JOIN fighter_type_gang_costs gc
                   ON gc.fighter_type_id = ft.id AND gc.gang_type_id = $1
            WHERE ft.gang_type_id = $1 OR gc.gang_type_id IS NOT NULL
            ORDER BY ft.cost DESC, ft.fighter_type
            "#
        );
        let types = sqlx::query_as::<_, FighterTypeWithCost>(&sql)
            .bind(gang_type_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(types)
    }

    async fn list_custom_fighter_types(&self, user_id: Uuid) -> Result<Vec<CustomFighterType>> {
        let types = sqlx::query_as::<_, CustomFighterType>(
            r#"
            SELECT id, user_id, fighter_type, gang_type_id, fighter_class, cost,
                   movement, weapon_skill, ballistic_skill, strength, toughness, wounds,
                   initiative, attacks, leadership, cool, willpower, intelligence,
                   special_rules, free_skill, created_at, updated_at
            FROM custom_fighter_types
            WHERE user_id = $1
            ORDER BY fighter_type
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(types)
    }

    async fn get_equipment(&self, id: Uuid) -> Result<Option<Equipment>> {
        let sql = format!("SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE id = $1");
        let equipment = sqlx::query_as::<_, Equipment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(equipment)
    }

    async fn list_equipment(&self, category: Option<String>) -> Result<Vec<Equipment>> {
        let sql = format!(
            r#"
            SELECT {EQUIPMENT_COLUMNS} FROM equipment
            WHERE $1::VARCHAR IS NULL OR equipment_category = $1
            ORDER BY equipment_category, equipment_name
            "#
        );
        let equipment = sqlx::query_as::<_, Equipment>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;
        Ok(equipment)
    }

    async fn list_default_equipment(&self, fighter_type_id: Uuid) -> Result<Vec<Equipment>> {
        let equipment = sqlx::query_as::<_, Equipment>(
            r#"
            SELECT e.id, e.equipment_name, e.trading_post_category, e.equipment_category,
                   e.equipment_type, e.availability, e.cost, e.grants_fighter_type_id
            FROM fighter_type_default_equipment d
            JOIN equipment e ON e.id = d.equipment_id
            WHERE d.fighter_type_id = $1
            "#,
        )
        .bind(fighter_type_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(equipment)
    }

    async fn get_vehicle_type(&self, id: Uuid) -> Result<Option<VehicleType>> {
        let sql = format!("SELECT {VEHICLE_TYPE_COLUMNS} FROM vehicle_types WHERE id = $1");
        let vehicle_type = sqlx::query_as::<_, VehicleType>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(vehicle_type)
    }

    async fn list_vehicle_types(&self, gang_type_id: Option<Uuid>) -> Result<Vec<VehicleType>> {
        let sql = format!(
            r#"
            SELECT {VEHICLE_TYPE_COLUMNS} FROM vehicle_types
            WHERE $1::UUID IS NULL OR gang_type_id IS NULL OR gang_type_id = $1
            ORDER BY vehicle_type
            "#
        );
        let types = sqlx::query_as::<_, VehicleType>(&sql)
            .bind(gang_type_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(types)
    }

    async fn get_skill(&self, id: Uuid) -> Result<Option<Skill>> {
        let skill = sqlx::query_as::<_, Skill>(
            r#"
            SELECT s.id, s.name, s.skill_type_id, st.name AS skill_type
            FROM skills s
            JOIN skill_types st ON st.id = s.skill_type_id
            WHERE s.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(skill)
    }

    async fn list_skills(&self, skill_type_id: Option<Uuid>) -> Result<Vec<Skill>> {
        let skills = sqlx::query_as::<_, Skill>(
            r#"
            SELECT s.id, s.name, s.skill_type_id, st.name AS skill_type
            FROM skills s
            JOIN skill_types st ON st.id = s.skill_type_id
            WHERE $1::UUID IS NULL OR s.skill_type_id = $1
            ORDER BY st.name, s.name
            "#,
        )
        .bind(skill_type_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(skills)
    }

    async fn get_effect_type(&self, id: Uuid) -> Result<Option<EffectTypeWithModifiers>> {
        let sql = format!("{EFFECT_TYPE_SELECT} WHERE t.id = $1");
        let effect_type = sqlx::query_as::<_, FighterEffectType>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match effect_type {
            Some(t) => Ok(self.attach_effect_modifiers(vec![t]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    async fn list_effect_types(&self, category: String) -> Result<Vec<EffectTypeWithModifiers>> {
        let sql = format!("{EFFECT_TYPE_SELECT} WHERE c.category_name = $1 ORDER BY t.effect_name");
        let types = sqlx::query_as::<_, FighterEffectType>(&sql)
            .bind(category)
            .fetch_all(&self.pool)
            .await?;
        self.attach_effect_modifiers(types).await
    }

    async fn list_granted_effect_types(
        &self,
        equipment_id: Uuid,
    ) -> Result<Vec<EffectTypeWithModifiers>> {
        let sql = format!(
            r#"
            {EFFECT_TYPE_SELECT}
            JOIN equipment_granted_effects g ON g.fighter_effect_type_id = t.id
            WHERE g.equipment_id = $1
            "#
        );
        let types = sqlx::query_as::<_, FighterEffectType>(&sql)
            .bind(equipment_id)
            .fetch_all(&self.pool)
            .await?;
        self.attach_effect_modifiers(types).await
    }
}
