//! 效果相关实体定义
//!
//! 伤病、进阶、载具损伤、装备附带效果统一存放在 fighter_effects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 效果类型（目录数据）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FighterEffectType {
    pub id: Uuid,
    pub effect_name: String,
    pub category_name: String,
    pub type_specific_data: Value,
}

/// 效果类型的默认属性修正
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FighterEffectTypeModifier {
    pub id: Uuid,
    pub fighter_effect_type_id: Uuid,
    pub stat_name: String,
    pub default_numeric_value: i32,
}

/// 带修正的效果类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectTypeWithModifiers {
    #[serde(flatten)]
    pub effect_type: FighterEffectType,
    pub modifiers: Vec<FighterEffectTypeModifier>,
}

/// 战士或载具身上的效果
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FighterEffect {
    pub id: Uuid,
    #[sqlx(default)]
    pub fighter_id: Option<Uuid>,
    #[sqlx(default)]
    pub vehicle_id: Option<Uuid>,
    #[sqlx(default)]
    pub fighter_effect_type_id: Option<Uuid>,
    /// 由装备附带时指向该装备，装备移除时级联删除
    #[sqlx(default)]
    pub fighter_equipment_id: Option<Uuid>,
    pub category_name: String,
    pub effect_name: String,
    pub type_specific_data: Value,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl FighterEffect {
    /// 效果带来的费用增加
    pub fn credits_increase(&self) -> i32 {
        EffectData::new(&self.type_specific_data).credits_increase()
    }

    /// 进阶效果消耗的经验值
    pub fn xp_cost(&self) -> i32 {
        EffectData::new(&self.type_specific_data).xp_cost()
    }
}

/// 效果属性修正
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FighterEffectModifier {
    pub id: Uuid,
    pub fighter_effect_id: Uuid,
    pub stat_name: String,
    pub numeric_value: i32,
}

/// 带修正的效果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectWithModifiers {
    #[serde(flatten)]
    pub effect: FighterEffect,
    pub modifiers: Vec<FighterEffectModifier>,
}

/// 新建效果所需数据
#[derive(Debug, Clone)]
pub struct NewEffect {
    pub fighter_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub fighter_effect_type_id: Option<Uuid>,
    pub fighter_equipment_id: Option<Uuid>,
    pub category_name: String,
    pub effect_name: String,
    pub type_specific_data: Value,
    pub user_id: Uuid,
    /// (stat_name, numeric_value)
    pub modifiers: Vec<(String, i32)>,
}

impl NewEffect {
    /// 以效果类型为模板创建
    pub fn from_type(
        template: &EffectTypeWithModifiers,
        fighter_id: Option<Uuid>,
        vehicle_id: Option<Uuid>,
        user_id: Uuid,
    ) -> Self {
        Self {
            fighter_id,
            vehicle_id,
            fighter_effect_type_id: Some(template.effect_type.id),
            fighter_equipment_id: None,
            category_name: template.effect_type.category_name.clone(),
            effect_name: template.effect_type.effect_name.clone(),
            type_specific_data: template.effect_type.type_specific_data.clone(),
            user_id,
            modifiers: template
                .modifiers
                .iter()
                .map(|m| (m.stat_name.clone(), m.default_numeric_value))
                .collect(),
        }
    }
}

/// type_specific_data 的只读视图
///
/// 缺失或类型不符的键按默认值处理
pub struct EffectData<'a>(&'a Value);

impl<'a> EffectData<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self(value)
    }

    fn int(&self, key: &str) -> i32 {
        self.0
            .get(key)
            .and_then(Value::as_i64)
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(0)
    }

    fn flag(&self, key: &str) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn credits_increase(&self) -> i32 {
        self.int("credits_increase")
    }

    pub fn xp_cost(&self) -> i32 {
        self.int("xp_cost")
    }

    /// 伤病是否使战士进入康复
    pub fn recovery(&self) -> bool {
        self.flag("recovery")
    }

    /// 伤病是否使战士被俘
    pub fn captured(&self) -> bool {
        self.flag("captured")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_effect_data_reads_known_keys() {
        let v = json!({"credits_increase": 20, "xp_cost": 6, "recovery": true});
        let data = EffectData::new(&v);
        assert_eq!(data.credits_increase(), 20);
        assert_eq!(data.xp_cost(), 6);
        assert!(data.recovery());
        assert!(!data.captured());
    }

    #[test]
    fn test_effect_data_defaults() {
        let v = json!({"credits_increase": "lots", "captured": 1});
        let data = EffectData::new(&v);
        assert_eq!(data.credits_increase(), 0);
        assert!(!data.captured());

        let empty = json!({});
        assert_eq!(EffectData::new(&empty).xp_cost(), 0);
    }

    #[test]
    fn test_new_effect_from_type_copies_modifiers() {
        let type_id = Uuid::new_v4();
        let template = EffectTypeWithModifiers {
            effect_type: FighterEffectType {
                id: type_id,
                effect_name: "Head Injury".to_string(),
                category_name: "injuries".to_string(),
                type_specific_data: json!({"recovery": false}),
            },
            modifiers: vec![FighterEffectTypeModifier {
                id: Uuid::new_v4(),
                fighter_effect_type_id: type_id,
                stat_name: "intelligence".to_string(),
                default_numeric_value: -1,
            }],
        };
        let fighter_id = Uuid::new_v4();
        let effect = NewEffect::from_type(&template, Some(fighter_id), None, Uuid::new_v4());
        assert_eq!(effect.fighter_effect_type_id, Some(type_id));
        assert_eq!(effect.modifiers, vec![("intelligence".to_string(), -1)]);
        assert_eq!(effect.category_name, "injuries");
    }
}
