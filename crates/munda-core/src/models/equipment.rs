//! 装备相关实体定义
//!
//! 目录装备、自定义装备，以及帮派实际持有的装备行

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::EquipmentType;

/// 目录装备
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: Uuid,
    pub equipment_name: String,
    #[sqlx(default)]
    pub trading_post_category: Option<String>,
    pub equipment_category: String,
    pub equipment_type: EquipmentType,
    #[sqlx(default)]
    pub availability: Option<String>,
    pub cost: i32,
    /// 购买后生成的异兽类型
    #[sqlx(default)]
    pub grants_fighter_type_id: Option<Uuid>,
}

/// 用户自定义装备
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomEquipment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub equipment_name: String,
    #[sqlx(default)]
    pub trading_post_category: Option<String>,
    pub equipment_category: String,
    pub equipment_type: EquipmentType,
    #[sqlx(default)]
    pub availability: Option<String>,
    pub cost: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 交易所条目
///
/// 目录装备与调用者自定义装备合并后的展示结构
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingPostItem {
    pub id: Uuid,
    pub equipment_name: String,
    pub equipment_category: String,
    pub equipment_type: EquipmentType,
    pub availability: Option<String>,
    pub cost: i32,
    pub is_custom: bool,
    pub grants_fighter_type_id: Option<Uuid>,
}

impl From<Equipment> for TradingPostItem {
    fn from(e: Equipment) -> Self {
        Self {
            id: e.id,
            equipment_name: e.equipment_name,
            equipment_category: e.equipment_category,
            equipment_type: e.equipment_type,
            availability: e.availability,
            cost: e.cost,
            is_custom: false,
            grants_fighter_type_id: e.grants_fighter_type_id,
        }
    }
}

impl From<CustomEquipment> for TradingPostItem {
    fn from(e: CustomEquipment) -> Self {
        Self {
            id: e.id,
            equipment_name: e.equipment_name,
            equipment_category: e.equipment_category,
            equipment_type: e.equipment_type,
            availability: e.availability,
            cost: e.cost,
            is_custom: true,
            grants_fighter_type_id: None,
        }
    }
}

/// 帮派持有的装备
///
/// 归属于战士、载具、仓库三者之一（数据库 CHECK 约束保证）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FighterEquipment {
    pub id: Uuid,
    pub gang_id: Uuid,
    #[sqlx(default)]
    pub fighter_id: Option<Uuid>,
    #[sqlx(default)]
    pub vehicle_id: Option<Uuid>,
    pub gang_stash: bool,
    #[sqlx(default)]
    pub equipment_id: Option<Uuid>,
    #[sqlx(default)]
    pub custom_equipment_id: Option<Uuid>,
    pub equipment_name: String,
    pub equipment_type: EquipmentType,
    /// 实际支付价格，计入评分
    pub purchase_cost: i32,
    /// 购买时的目录价
    pub original_cost: i32,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl FighterEquipment {
    pub fn holder(&self) -> EquipmentHolder {
        match (self.fighter_id, self.vehicle_id) {
            (Some(id), _) => EquipmentHolder::Fighter(id),
            (None, Some(id)) => EquipmentHolder::Vehicle(id),
            (None, None) => EquipmentHolder::Stash,
        }
    }
}

/// 装备持有者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EquipmentHolder {
    Fighter(Uuid),
    Vehicle(Uuid),
    Stash,
}

/// 购买的物品来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EquipmentSource {
    Catalog(Uuid),
    Custom(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(fighter_id: Option<Uuid>, vehicle_id: Option<Uuid>) -> FighterEquipment {
        FighterEquipment {
            id: Uuid::new_v4(),
            gang_id: Uuid::new_v4(),
            fighter_id,
            vehicle_id,
            gang_stash: fighter_id.is_none() && vehicle_id.is_none(),
            equipment_id: None,
            custom_equipment_id: None,
            equipment_name: "Lasgun".to_string(),
            equipment_type: EquipmentType::Weapon,
            purchase_cost: 15,
            original_cost: 15,
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_holder() {
        let f = Uuid::new_v4();
        let v = Uuid::new_v4();
        assert_eq!(owned(Some(f), None).holder(), EquipmentHolder::Fighter(f));
        assert_eq!(owned(None, Some(v)).holder(), EquipmentHolder::Vehicle(v));
        assert_eq!(owned(None, None).holder(), EquipmentHolder::Stash);
    }

    #[test]
    fn test_holder_json() {
        let id = Uuid::nil();
        let json = serde_json::to_value(EquipmentHolder::Fighter(id)).unwrap();
        assert_eq!(json["kind"], "fighter");
        let stash: EquipmentHolder = serde_json::from_str(r#"{"kind":"stash"}"#).unwrap();
        assert_eq!(stash, EquipmentHolder::Stash);
    }

    #[test]
    fn test_trading_post_item_marks_custom() {
        let custom = CustomEquipment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            equipment_name: "Homebrew Blade".to_string(),
            trading_post_category: None,
            equipment_category: "Close Combat Weapons".to_string(),
            equipment_type: EquipmentType::Weapon,
            availability: Some("C".to_string()),
            cost: 20,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let item = TradingPostItem::from(custom);
        assert!(item.is_custom);
        assert!(item.grants_fighter_type_id.is_none());
    }
}
