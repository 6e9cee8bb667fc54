//! 战士相关实体定义
//!
//! 包含战士、战士类型（目录与自定义）及属性值

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Characteristic;
use crate::rating::FighterStatus;

/// 战士属性值
///
/// 战士、战士类型、自定义战士类型共用同一组列
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FighterStats {
    pub movement: i16,
    pub weapon_skill: i16,
    pub ballistic_skill: i16,
    pub strength: i16,
    pub toughness: i16,
    pub wounds: i16,
    pub initiative: i16,
    pub attacks: i16,
    pub leadership: i16,
    pub cool: i16,
    pub willpower: i16,
    pub intelligence: i16,
}

impl FighterStats {
    pub fn get(&self, stat: Characteristic) -> i16 {
        match stat {
            Characteristic::Movement => self.movement,
            Characteristic::WeaponSkill => self.weapon_skill,
            Characteristic::BallisticSkill => self.ballistic_skill,
            Characteristic::Strength => self.strength,
            Characteristic::Toughness => self.toughness,
            Characteristic::Wounds => self.wounds,
            Characteristic::Initiative => self.initiative,
            Characteristic::Attacks => self.attacks,
            Characteristic::Leadership => self.leadership,
            Characteristic::Cool => self.cool,
            Characteristic::Willpower => self.willpower,
            Characteristic::Intelligence => self.intelligence,
        }
    }
}

/// 战士
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Fighter {
    pub id: Uuid,
    pub gang_id: Uuid,
    pub user_id: Uuid,
    pub fighter_name: String,
    #[sqlx(default)]
    pub label: Option<String>,
    #[sqlx(default)]
    pub fighter_type_id: Option<Uuid>,
    #[sqlx(default)]
    pub custom_fighter_type_id: Option<Uuid>,
    /// 类型名（冗余存储，类型删除后仍可展示）
    pub fighter_type: String,
    pub fighter_class: String,
    /// 基础费用；异兽为 0，其费用由主人的装备承担
    pub credits: i32,
    pub cost_adjustment: i32,
    pub xp: i32,
    pub kills: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub stats: FighterStats,
    pub special_rules: Vec<String>,
    pub free_skill: bool,
    pub killed: bool,
    pub retired: bool,
    pub enslaved: bool,
    pub starved: bool,
    pub recovery: bool,
    pub captured: bool,
    #[sqlx(default)]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fighter {
    pub fn status(&self) -> FighterStatus {
        FighterStatus {
            killed: self.killed,
            retired: self.retired,
            enslaved: self.enslaved,
            captured: self.captured,
            recovery: self.recovery,
            starved: self.starved,
        }
    }
}

/// 战士字段变更
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FighterChanges {
    pub fighter_name: Option<String>,
    pub label: Option<String>,
    pub note: Option<String>,
    pub kills: Option<i32>,
    /// 经验值增量（可为负，但结果不得小于 0）
    pub xp_delta: Option<i32>,
    /// 新的费用调整值（绝对值）
    pub cost_adjustment: Option<i32>,
}

/// 战士类型（目录数据）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FighterType {
    pub id: Uuid,
    pub fighter_type: String,
    #[sqlx(default)]
    pub gang_type_id: Option<Uuid>,
    pub fighter_class: String,
    pub cost: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub stats: FighterStats,
    pub special_rules: Vec<String>,
    pub free_skill: bool,
    pub is_gang_addition: bool,
}

/// 带帮派专属价格的战士类型
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FighterTypeWithCost {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fighter_type: FighterType,
    /// 帮派类型专属价格，缺省为目录价
    #[sqlx(default)]
    pub adjusted_cost: Option<i32>,
}

impl FighterTypeWithCost {
    /// 对该帮派生效的价格
    pub fn effective_cost(&self) -> i32 {
        self.adjusted_cost.unwrap_or(self.fighter_type.cost)
    }
}

/// 用户自定义战士类型
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomFighterType {
    pub id: Uuid,
    pub user_id: Uuid,
    pub fighter_type: String,
    #[sqlx(default)]
    pub gang_type_id: Option<Uuid>,
    pub fighter_class: String,
    pub cost: i32,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub stats: FighterStats,
    pub special_rules: Vec<String>,
    pub free_skill: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 招募时使用的类型模板
///
/// 目录类型和自定义类型归一为同一结构后写入 fighters 表
#[derive(Debug, Clone)]
pub struct FighterTemplate {
    pub fighter_type_id: Option<Uuid>,
    pub custom_fighter_type_id: Option<Uuid>,
    pub fighter_type: String,
    pub fighter_class: String,
    /// 写入 fighters.credits 的基础费用
    pub base_credits: i32,
    pub stats: FighterStats,
    pub special_rules: Vec<String>,
    pub free_skill: bool,
}

impl FighterTemplate {
    pub fn from_catalog(ft: &FighterTypeWithCost) -> Self {
        Self {
            fighter_type_id: Some(ft.fighter_type.id),
            custom_fighter_type_id: None,
            fighter_type: ft.fighter_type.fighter_type.clone(),
            fighter_class: ft.fighter_type.fighter_class.clone(),
            base_credits: ft.effective_cost(),
            stats: ft.fighter_type.stats,
            special_rules: ft.fighter_type.special_rules.clone(),
            free_skill: ft.fighter_type.free_skill,
        }
    }

    pub fn from_custom(ct: &CustomFighterType) -> Self {
        Self {
            fighter_type_id: None,
            custom_fighter_type_id: Some(ct.id),
            fighter_type: ct.fighter_type.clone(),
            fighter_class: ct.fighter_class.clone(),
            base_credits: ct.cost,
            stats: ct.stats,
            special_rules: ct.special_rules.clone(),
            free_skill: ct.free_skill,
        }
    }

    /// 异兽模板：基础费用为 0
    pub fn exotic_beast(ft: &FighterType) -> Self {
        Self {
            fighter_type_id: Some(ft.id),
            custom_fighter_type_id: None,
            fighter_type: ft.fighter_type.clone(),
            fighter_class: ft.fighter_class.clone(),
            base_credits: 0,
            stats: ft.stats,
            special_rules: ft.special_rules.clone(),
            free_skill: ft.free_skill,
        }
    }
}

/// 异兽归属关系
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ExoticBeastLink {
    pub id: Uuid,
    pub fighter_owner_id: Uuid,
    pub fighter_pet_id: Uuid,
    pub fighter_equipment_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_type(cost: i32) -> FighterType {
        FighterType {
            id: Uuid::new_v4(),
            fighter_type: "Goliath Forge Tyrant".to_string(),
            gang_type_id: None,
            fighter_class: "Leader".to_string(),
            cost,
            stats: FighterStats {
                movement: 4,
                strength: 4,
                ..Default::default()
            },
            special_rules: vec!["Leader".to_string()],
            free_skill: true,
            is_gang_addition: false,
        }
    }

    #[test]
    fn test_effective_cost_prefers_gang_override() {
        let with_override = FighterTypeWithCost {
            fighter_type: catalog_type(135),
            adjusted_cost: Some(120),
        };
        assert_eq!(with_override.effective_cost(), 120);

        let without = FighterTypeWithCost {
            fighter_type: catalog_type(135),
            adjusted_cost: None,
        };
        assert_eq!(without.effective_cost(), 135);
    }

    #[test]
    fn test_template_from_catalog_uses_effective_cost() {
        let ft = FighterTypeWithCost {
            fighter_type: catalog_type(135),
            adjusted_cost: Some(100),
        };
        let template = FighterTemplate::from_catalog(&ft);
        assert_eq!(template.base_credits, 100);
        assert_eq!(template.stats.movement, 4);
        assert!(template.custom_fighter_type_id.is_none());
    }

    #[test]
    fn test_exotic_beast_template_is_free() {
        let template = FighterTemplate::exotic_beast(&catalog_type(60));
        assert_eq!(template.base_credits, 0);
        assert_eq!(template.fighter_type, "Goliath Forge Tyrant");
    }

    #[test]
    fn test_stats_get() {
        let stats = FighterStats {
            toughness: 5,
            wounds: 2,
            ..Default::default()
        };
        assert_eq!(stats.get(Characteristic::Toughness), 5);
        assert_eq!(stats.get(Characteristic::Wounds), 2);
        assert_eq!(stats.get(Characteristic::Cool), 0);
    }
}
