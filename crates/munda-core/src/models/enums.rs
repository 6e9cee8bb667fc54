//! 领域枚举类型定义
//!
//! 所有存库枚举都支持数据库（sqlx）和 JSON（serde）序列化

use serde::{Deserialize, Serialize};

/// 用户角色
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

/// 帮派阵营
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum Alignment {
    LawAbiding,
    #[default]
    Outlaw,
}

impl Alignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LawAbiding => "law_abiding",
            Self::Outlaw => "outlaw",
        }
    }
}

/// 装备类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum EquipmentType {
    Weapon,
    Wargear,
    VehicleUpgrade,
}

/// 战役成员角色
///
/// Owner 唯一且不可转让；Arbitrator 可管理领地、资源和帮派
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum CampaignRole {
    Owner,
    Arbitrator,
    Member,
}

impl CampaignRole {
    /// 是否具备战役管理权限
    pub fn can_manage(&self) -> bool {
        matches!(self, Self::Owner | Self::Arbitrator)
    }
}

/// 战役状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum CampaignStatus {
    #[default]
    Active,
    Closed,
}

/// 战士属性
///
/// `stat_name()` 与 fighter_effect_modifiers.stat_name 列中的取值一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Characteristic {
    Movement,
    WeaponSkill,
    BallisticSkill,
    Strength,
    Toughness,
    Wounds,
    Initiative,
    Attacks,
    Leadership,
    Cool,
    Willpower,
    Intelligence,
}

impl Characteristic {
    pub const ALL: [Characteristic; 12] = [
        Self::Movement,
        Self::WeaponSkill,
        Self::BallisticSkill,
        Self::Strength,
        Self::Toughness,
        Self::Wounds,
        Self::Initiative,
        Self::Attacks,
        Self::Leadership,
        Self::Cool,
        Self::Willpower,
        Self::Intelligence,
    ];

    pub fn stat_name(&self) -> &'static str {
        match self {
            Self::Movement => "movement",
            Self::WeaponSkill => "weapon_skill",
            Self::BallisticSkill => "ballistic_skill",
            Self::Strength => "strength",
            Self::Toughness => "toughness",
            Self::Wounds => "wounds",
            Self::Initiative => "initiative",
            Self::Attacks => "attacks",
            Self::Leadership => "leadership",
            Self::Cool => "cool",
            Self::Willpower => "willpower",
            Self::Intelligence => "intelligence",
        }
    }

    pub fn from_stat_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.stat_name() == name)
    }
}

/// 帮派日志动作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GangLogAction {
    GangCreated,
    GangUpdated,
    CreditsChanged,
    RatingRecalculated,
    FighterAdded,
    FighterUpdated,
    FighterStatusChanged,
    FighterDeleted,
    EquipmentBought,
    EquipmentSold,
    EquipmentDeleted,
    EquipmentMoved,
    AdvancementAdded,
    AdvancementRemoved,
    InjuryAdded,
    InjuryRemoved,
    VehicleAdded,
    VehicleUpdated,
    VehicleDeleted,
    CampaignJoined,
    CampaignLeft,
}

impl GangLogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GangCreated => "gang_created",
            Self::GangUpdated => "gang_updated",
            Self::CreditsChanged => "credits_changed",
            Self::RatingRecalculated => "rating_recalculated",
            Self::FighterAdded => "fighter_added",
            Self::FighterUpdated => "fighter_updated",
            Self::FighterStatusChanged => "fighter_status_changed",
            Self::FighterDeleted => "fighter_deleted",
            Self::EquipmentBought => "equipment_bought",
            Self::EquipmentSold => "equipment_sold",
            Self::EquipmentDeleted => "equipment_deleted",
            Self::EquipmentMoved => "equipment_moved",
            Self::AdvancementAdded => "advancement_added",
            Self::AdvancementRemoved => "advancement_removed",
            Self::InjuryAdded => "injury_added",
            Self::InjuryRemoved => "injury_removed",
            Self::VehicleAdded => "vehicle_added",
            Self::VehicleUpdated => "vehicle_updated",
            Self::VehicleDeleted => "vehicle_deleted",
            Self::CampaignJoined => "campaign_joined",
            Self::CampaignLeft => "campaign_left",
        }
    }
}

/// 效果分类名（fighter_effect_categories.category_name）
pub mod effect_category {
    pub const INJURIES: &str = "injuries";
    pub const ADVANCEMENTS: &str = "advancements";
    pub const BIONICS: &str = "bionics";
    pub const USER: &str = "user";
    pub const VEHICLE_DAMAGES: &str = "vehicle damages";
    pub const EQUIPMENT: &str = "equipment";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_characteristic_stat_name_roundtrip() {
        for c in Characteristic::ALL {
            assert_eq!(Characteristic::from_stat_name(c.stat_name()), Some(c));
        }
        assert_eq!(Characteristic::from_stat_name("luck"), None);
    }

    #[test]
    fn test_campaign_role_can_manage() {
        assert!(CampaignRole::Owner.can_manage());
        assert!(CampaignRole::Arbitrator.can_manage());
        assert!(!CampaignRole::Member.can_manage());
    }

    #[test]
    fn test_enum_json_format() {
        assert_eq!(
            serde_json::to_string(&Alignment::LawAbiding).unwrap(),
            "\"law_abiding\""
        );
        assert_eq!(
            serde_json::to_string(&EquipmentType::VehicleUpgrade).unwrap(),
            "\"vehicle_upgrade\""
        );
        assert_eq!(
            serde_json::to_string(&Characteristic::WeaponSkill).unwrap(),
            "\"weapon_skill\""
        );
        let role: CampaignRole = serde_json::from_str("\"arbitrator\"").unwrap();
        assert_eq!(role, CampaignRole::Arbitrator);
    }
}
