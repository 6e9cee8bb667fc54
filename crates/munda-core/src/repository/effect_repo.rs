//! 效果仓储
//!
//! 战士与载具效果及其属性修正

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{EffectWithModifiers, FighterEffect, FighterEffectModifier, NewEffect};

const EFFECT_COLUMNS: &str = r#"
    id, fighter_id, vehicle_id, fighter_effect_type_id, fighter_equipment_id,
    category_name, effect_name, type_specific_data, user_id, created_at
"#;

/// 效果仓储
pub struct EffectRepository {
    pool: PgPool,
}

impl EffectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 战士身上的全部效果（含修正）
    pub async fn list_for_fighter(&self, fighter_id: Uuid) -> Result<Vec<EffectWithModifiers>> {
        let sql = format!(
            "SELECT {EFFECT_COLUMNS} FROM fighter_effects WHERE fighter_id = $1 ORDER BY created_at"
        );
        let effects = sqlx::query_as::<_, FighterEffect>(&sql)
            .bind(fighter_id)
            .fetch_all(&self.pool)
            .await?;
        self.attach_modifiers(effects).await
    }

    /// 载具身上的全部效果（含修正）
    pub async fn list_for_vehicle(&self, vehicle_id: Uuid) -> Result<Vec<EffectWithModifiers>> {
        let sql = format!(
            "SELECT {EFFECT_COLUMNS} FROM fighter_effects WHERE vehicle_id = $1 ORDER BY created_at"
        );
        let effects = sqlx::query_as::<_, FighterEffect>(&sql)
            .bind(vehicle_id)
            .fetch_all(&self.pool)
            .await?;
        self.attach_modifiers(effects).await
    }

    async fn attach_modifiers(
        &self,
        effects: Vec<FighterEffect>,
    ) -> Result<Vec<EffectWithModifiers>> {
        if effects.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = effects.iter().map(|e| e.id).collect();
        let modifiers = sqlx::query_as::<_, FighterEffectModifier>(
            r#"
            SELECT id, fighter_effect_id, stat_name, numeric_value
            FROM fighter_effect_modifiers
            WHERE fighter_effect_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(group_modifiers(effects, modifiers))
    }

    // ==================== 事务操作 ====================

    /// 在事务中获取效果
    pub async fn get_in_tx(tx: &mut PgConnection, id: Uuid) -> Result<Option<EffectWithModifiers>> {
        let sql = format!("SELECT {EFFECT_COLUMNS} FROM fighter_effects WHERE id = $1 FOR UPDATE");
        let effect = sqlx::query_as::<_, FighterEffect>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(effect) = effect else {
            return Ok(None);
        };

        let modifiers = sqlx::query_as::<_, FighterEffectModifier>(
            r#"
            SELECT id, fighter_effect_id, stat_name, numeric_value
            FROM fighter_effect_modifiers
            WHERE fighter_effect_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        Ok(Some(EffectWithModifiers { effect, modifiers }))
    }

    /// 在事务中创建效果及其修正
    pub async fn create_in_tx(
        tx: &mut PgConnection,
        new_effect: &NewEffect,
    ) -> Result<EffectWithModifiers> {
        let sql = format!(
            r#"
            INSERT INTO fighter_effects (
                fighter_id, vehicle_id, fighter_effect_type_id, fighter_equipment_id,
                category_name, effect_name, type_specific_data, user_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {EFFECT_COLUMNS}
            "#
        );
        let effect = sqlx::query_as::<_, FighterEffect>(&sql)
            .bind(new_effect.fighter_id)
            .bind(new_effect.vehicle_id)
            .bind(new_effect.fighter_effect_type_id)
            .bind(new_effect.fighter_equipment_id)
            .bind(&new_effect.category_name)
            .bind(&new_effect.effect_name)
            .bind(&new_effect.type_specific_data)
            .bind(new_effect.user_id)
            .fetch_one(&mut *tx)
            .await?;

        let mut modifiers = Vec::with_capacity(new_effect.modifiers.len());
        for (stat_name, value) in &new_effect.modifiers {
            let modifier = sqlx::query_as::<_, FighterEffectModifier>(
                r#"
                INSERT INTO fighter_effect_modifiers (fighter_effect_id, stat_name, numeric_value)
                VALUES ($1, $2, $3)
                RETURNING id, fighter_effect_id, stat_name, numeric_value
                "#,
            )
            .bind(effect.id)
            .bind(stat_name)
            .bind(value)
            .fetch_one(&mut *tx)
            .await?;
            modifiers.push(modifier);
        }

        Ok(EffectWithModifiers { effect, modifiers })
    }

    /// 在事务中删除效果（修正由外键级联删除）
    pub async fn delete_in_tx(tx: &mut PgConnection, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM fighter_effects WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// 在事务中删除某件装备附带的全部效果，返回删除数量
    pub async fn delete_for_equipment_in_tx(
        tx: &mut PgConnection,
        fighter_equipment_id: Uuid,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM fighter_effects WHERE fighter_equipment_id = $1")
            .bind(fighter_equipment_id)
            .execute(&mut *tx)
            .await?;
        Ok(result.rows_affected())
    }

    /// 在事务中统计某战士在某属性上已有的进阶次数
    pub async fn count_characteristic_advances_in_tx(
        tx: &mut PgConnection,
        fighter_id: Uuid,
        stat_name: &str,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM fighter_effects fe
            JOIN fighter_effect_modifiers m ON m.fighter_effect_id = fe.id
            WHERE fe.fighter_id = $1
              AND fe.category_name = 'advancements'
              AND m.stat_name = $2
              AND m.numeric_value > 0
            "#,
        )
        .bind(fighter_id)
        .bind(stat_name)
        .fetch_one(&mut *tx)
        .await?;
        Ok(count)
    }
}

/// 按效果 ID 归组修正，保持效果原有顺序
fn group_modifiers(
    effects: Vec<FighterEffect>,
    modifiers: Vec<FighterEffectModifier>,
) -> Vec<EffectWithModifiers> {
    let mut by_effect: HashMap<Uuid, Vec<FighterEffectModifier>> = HashMap::new();
    for m in modifiers {
        by_effect.entry(m.fighter_effect_id).or_default().push(m);
    }

    effects
        .into_iter()
        .map(|effect| {
            let modifiers = by_effect.remove(&effect.id).unwrap_or_default();
            EffectWithModifiers { effect, modifiers }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn effect(id: Uuid) -> FighterEffect {
        FighterEffect {
            id,
            fighter_id: Some(Uuid::nil()),
            vehicle_id: None,
            fighter_effect_type_id: None,
            fighter_equipment_id: None,
            category_name: "injuries".to_string(),
            effect_name: "Spinal Injury".to_string(),
            type_specific_data: json!({}),
            user_id: Uuid::nil(),
            created_at: Utc::now(),
        }
    }

    fn modifier(effect_id: Uuid, stat: &str, value: i32) -> FighterEffectModifier {
        FighterEffectModifier {
            id: Uuid::new_v4(),
            fighter_effect_id: effect_id,
            stat_name: stat.to_string(),
            numeric_value: value,
        }
    }

    #[test]
    fn test_group_modifiers() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let grouped = group_modifiers(
            vec![effect(a), effect(b)],
            vec![
                modifier(b, "strength", -1),
                modifier(a, "toughness", -1),
                modifier(b, "movement", -1),
            ],
        );

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].effect.id, a);
        assert_eq!(grouped[0].modifiers.len(), 1);
        assert_eq!(grouped[1].modifiers.len(), 2);
    }

    #[test]
    fn test_group_modifiers_without_modifiers() {
        let a = Uuid::new_v4();
        let grouped = group_modifiers(vec![effect(a)], vec![]);
        assert!(grouped[0].modifiers.is_empty());
    }
}
