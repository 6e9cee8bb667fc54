//! 服务层数据传输对象
//!
//! 服务入参与返回值，与表结构解耦

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Campaign, CampaignGang, CampaignGangResource, CampaignMember, CampaignResource,
    CampaignTerritory, Characteristic, CustomFighterType, EffectWithModifiers, EquipmentHolder,
    EquipmentSource, ExoticBeastLink, Fighter, FighterEquipment, FighterSkill,
    FighterTypeWithCost, Gang, GangCampaign, GangType, Vehicle,
};
use crate::rating::{CostBreakdown, FighterStatus, GangValuation, RatingDelta};

// ==================== 通用 ====================

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> PageResult<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total + page_size - 1) / page_size
        } else {
            0
        };
        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

/// 规范化分页参数：页码从 1 开始，每页 1..=100 条
pub fn normalize_page(page: i64, page_size: i64) -> (i64, i64) {
    (page.max(1), page_size.clamp(1, 100))
}

// ==================== 帮派 ====================

/// 帮派详情中的战士条目
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FighterSummary {
    #[serde(flatten)]
    pub fighter: Fighter,
    pub breakdown: CostBreakdown,
    pub total_cost: i32,
}

/// 帮派详情中的载具条目
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSummary {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub total_cost: i32,
}

/// 帮派详情
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GangDetail {
    pub gang: Gang,
    pub gang_type: Option<GangType>,
    pub fighters: Vec<FighterSummary>,
    pub vehicles: Vec<VehicleSummary>,
    pub stash: Vec<FighterEquipment>,
    pub campaigns: Vec<GangCampaign>,
    pub valuation: GangValuation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGangRequest {
    pub name: String,
    pub gang_type_id: Uuid,
    /// 缺省时取帮派类型的阵营
    pub alignment: Option<crate::models::Alignment>,
}

/// 评分重算结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingRecalculation {
    pub gang_id: Uuid,
    pub old_rating: i32,
    pub new_rating: i32,
}

impl RatingRecalculation {
    pub fn drift(&self) -> i32 {
        self.new_rating - self.old_rating
    }
}

// ==================== 战士 ====================

/// 招募来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum FighterTypeSource {
    Catalog(Uuid),
    Custom(Uuid),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFighterRequest {
    pub gang_id: Uuid,
    pub fighter_type: FighterTypeSource,
    pub fighter_name: String,
    /// 实付价格，缺省为类型价格
    pub cost_override: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFighterResult {
    pub fighter: Fighter,
    pub paid: i32,
    pub credits: i32,
    pub rating_delta: RatingDelta,
    pub default_equipment: Vec<FighterEquipment>,
}

/// 战士详情
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FighterDetail {
    pub fighter: Fighter,
    pub breakdown: CostBreakdown,
    pub total_cost: i32,
    pub equipment: Vec<FighterEquipment>,
    pub effects: Vec<EffectWithModifiers>,
    pub skills: Vec<FighterSkill>,
    pub vehicles: Vec<Vehicle>,
    pub exotic_beasts: Vec<ExoticBeastLink>,
}

/// 战士状态操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StatusAction {
    Kill,
    Resurrect,
    Retire,
    Unretire,
    /// 卖作奴隶，帮派获得 sell_value
    Enslave {
        sell_value: i32,
    },
    Rescue,
    Capture,
    Release,
    Starve,
    Feed,
    Recover,
    SendToRecovery,
}

impl StatusAction {
    /// 操作后的状态
    pub fn apply(&self, mut status: FighterStatus) -> FighterStatus {
        match self {
            Self::Kill => status.killed = true,
            Self::Resurrect => status.killed = false,
            Self::Retire => status.retired = true,
            Self::Unretire => status.retired = false,
            Self::Enslave { .. } => status.enslaved = true,
            Self::Rescue => status.enslaved = false,
            Self::Capture => status.captured = true,
            Self::Release => status.captured = false,
            Self::Starve => status.starved = true,
            Self::Feed => status.starved = false,
            Self::Recover => status.recovery = false,
            Self::SendToRecovery => status.recovery = true,
        }
        status
    }

    /// 操作带来的信用点收入
    pub fn credits_gain(&self) -> i32 {
        match self {
            Self::Enslave { sell_value } => *sell_value,
            _ => 0,
        }
    }

    /// 主人的异兽是否随之变更状态
    pub fn applies_to_beasts(&self) -> bool {
        matches!(self, Self::Kill | Self::Retire | Self::Enslave { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Kill => "kill",
            Self::Resurrect => "resurrect",
            Self::Retire => "retire",
            Self::Unretire => "unretire",
            Self::Enslave { .. } => "enslave",
            Self::Rescue => "rescue",
            Self::Capture => "capture",
            Self::Release => "release",
            Self::Starve => "starve",
            Self::Feed => "feed",
            Self::Recover => "recover",
            Self::SendToRecovery => "send_to_recovery",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeResult {
    pub fighter_id: Uuid,
    pub status: FighterStatus,
    pub credits: i32,
    pub rating_delta: RatingDelta,
    /// 随主人变更状态的异兽
    pub affected_beasts: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FighterDeletion {
    pub fighter_id: Uuid,
    pub deleted_beasts: Vec<Uuid>,
    pub unassigned_vehicles: Vec<Uuid>,
    pub rating_delta: RatingDelta,
}

// ==================== 装备 ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyEquipmentRequest {
    pub gang_id: Uuid,
    pub target: EquipmentHolder,
    pub item: EquipmentSource,
    /// 手动价格，缺省为目录价
    pub manual_cost: Option<i32>,
    #[serde(default)]
    pub buy_for_free: bool,
}

/// 购买结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResult {
    pub fighter_equipment: FighterEquipment,
    pub credits: i32,
    pub rating_delta: RatingDelta,
    pub effects: Vec<EffectWithModifiers>,
    pub exotic_beasts: Vec<Fighter>,
}

/// 出售或删除结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResult {
    pub fighter_equipment_id: Uuid,
    pub refund: i32,
    pub credits: i32,
    pub rating_delta: RatingDelta,
    pub removed_beasts: Vec<Uuid>,
}

/// 仓库移入移出结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StashMoveResult {
    pub fighter_equipment: FighterEquipment,
    pub rating_delta: RatingDelta,
    pub effects: Vec<EffectWithModifiers>,
}

// ==================== 进阶与伤病 ====================

/// 进阶花费
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancementCost {
    pub xp_cost: i32,
    pub credits_increase: i32,
}

/// 技能进阶方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillAdvancementKind {
    Primary,
    Secondary,
    RandomPrimary,
    RandomSecondary,
    Free,
}

impl SkillAdvancementKind {
    pub fn default_cost(&self) -> AdvancementCost {
        let (xp_cost, credits_increase) = match self {
            Self::Primary => (9, 20),
            Self::Secondary => (12, 35),
            Self::RandomPrimary => (6, 20),
            Self::RandomSecondary => (9, 35),
            Self::Free => (0, 0),
        };
        AdvancementCost {
            xp_cost,
            credits_increase,
        }
    }

    /// 免费技能不算作进阶
    pub fn is_advance(&self) -> bool {
        !matches!(self, Self::Free)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacteristicAdvancementRequest {
    pub stat: Characteristic,
    pub xp_cost: Option<i32>,
    pub credits_increase: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillAdvancementRequest {
    pub skill_id: Uuid,
    pub kind: SkillAdvancementKind,
    pub xp_cost: Option<i32>,
    pub credits_increase: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacteristicAdvancementResult {
    pub effect: EffectWithModifiers,
    pub xp: i32,
    pub rating_delta: RatingDelta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillAdvancementResult {
    pub skill: FighterSkill,
    pub xp: i32,
    pub rating_delta: RatingDelta,
}

/// 撤销进阶结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancementRemoval {
    pub xp_refunded: i32,
    pub xp: i32,
    pub rating_delta: RatingDelta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InjuryResult {
    pub effect: EffectWithModifiers,
    pub status: FighterStatus,
    pub rating_delta: RatingDelta,
}

// ==================== 载具 ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddVehicleRequest {
    pub gang_id: Uuid,
    pub vehicle_type_id: Uuid,
    pub vehicle_name: String,
    pub cost_override: Option<i32>,
    #[serde(default)]
    pub buy_for_free: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddVehicleResult {
    pub vehicle: Vehicle,
    pub paid: i32,
    pub credits: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrewAssignment {
    pub vehicle: Vehicle,
    pub previous_fighter_id: Option<Uuid>,
    pub rating_delta: RatingDelta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDamageResult {
    pub effect: EffectWithModifiers,
    pub rating_delta: RatingDelta,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairResult {
    pub effect_id: Uuid,
    pub repair_cost: i32,
    pub credits: i32,
    pub rating_delta: RatingDelta,
}

// ==================== 战役 ====================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    pub campaign_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub has_meat: bool,
    #[serde(default)]
    pub has_exploration_points: bool,
    #[serde(default)]
    pub has_scavenging_rolls: bool,
}

/// 战役详情
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDetail {
    pub campaign: Campaign,
    pub members: Vec<CampaignMember>,
    pub gangs: Vec<CampaignGang>,
    pub territories: Vec<CampaignTerritory>,
    pub resources: Vec<CampaignResource>,
    pub gang_resources: Vec<CampaignGangResource>,
}

// ==================== 目录 ====================

/// 可招募类型：目录类型（含帮派专属价）与调用者的自定义类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FighterTypeListing {
    pub catalog: Vec<FighterTypeWithCost>,
    pub custom: Vec<CustomFighterType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_result_total_pages() {
        let page = PageResult::new(vec![1, 2, 3], 45, 1, 20);
        assert_eq!(page.total_pages, 3);
        let empty: PageResult<i32> = PageResult::new(vec![], 0, 1, 20);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_normalize_page() {
        assert_eq!(normalize_page(0, 20), (1, 20));
        assert_eq!(normalize_page(3, 0), (3, 1));
        assert_eq!(normalize_page(2, 500), (2, 100));
    }

    #[test]
    fn test_status_action_apply() {
        let active = FighterStatus::default();
        assert!(StatusAction::Kill.apply(active).killed);
        assert!(!StatusAction::Resurrect.apply(StatusAction::Kill.apply(active)).killed);
        assert!(StatusAction::SendToRecovery.apply(active).recovery);
        assert!(!StatusAction::Recover.apply(StatusAction::SendToRecovery.apply(active)).recovery);
        let enslaved = StatusAction::Enslave { sell_value: 40 }.apply(active);
        assert!(enslaved.enslaved);
        assert!(!enslaved.counts_towards_rating());
    }

    #[test]
    fn test_status_action_credits_and_beasts() {
        assert_eq!(StatusAction::Enslave { sell_value: 40 }.credits_gain(), 40);
        assert_eq!(StatusAction::Kill.credits_gain(), 0);
        assert!(StatusAction::Kill.applies_to_beasts());
        assert!(StatusAction::Retire.applies_to_beasts());
        assert!(!StatusAction::Capture.applies_to_beasts());
    }

    #[test]
    fn test_status_action_json_shape() {
        let action: StatusAction =
            serde_json::from_str(r#"{"action":"enslave","sell_value":55}"#).unwrap();
        assert_eq!(action, StatusAction::Enslave { sell_value: 55 });
        let action: StatusAction =
            serde_json::from_str(r#"{"action":"send_to_recovery"}"#).unwrap();
        assert_eq!(action, StatusAction::SendToRecovery);
    }

    #[test]
    fn test_skill_kind_costs() {
        let cases = [
            (SkillAdvancementKind::Primary, 9, 20),
            (SkillAdvancementKind::Secondary, 12, 35),
            (SkillAdvancementKind::RandomPrimary, 6, 20),
            (SkillAdvancementKind::RandomSecondary, 9, 35),
            (SkillAdvancementKind::Free, 0, 0),
        ];
        for (kind, xp, credits) in cases {
            let cost = kind.default_cost();
            assert_eq!(cost.xp_cost, xp, "{:?}", kind);
            assert_eq!(cost.credits_increase, credits, "{:?}", kind);
        }
        assert!(!SkillAdvancementKind::Free.is_advance());
    }

    #[test]
    fn test_rating_recalculation_drift() {
        let r = RatingRecalculation {
            gang_id: Uuid::nil(),
            old_rating: 500,
            new_rating: 470,
        };
        assert_eq!(r.drift(), -30);
    }
}
