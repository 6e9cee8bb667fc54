//! 请求 DTO 定义
//!
//! 所有 REST API 的请求参数和请求体结构

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use munda_core::dto::{
    AddFighterRequest, AddVehicleRequest, BuyEquipmentRequest, CreateCampaignRequest,
    CreateGangRequest, FighterTypeSource,
};
use munda_core::{
    Alignment, CampaignRole, EquipmentHolder, EquipmentSource, FighterChanges, GangChanges,
};

/// 单次信用点增量范围
const MIN_CREDITS_DELTA: i32 = -1_000_000;
const MAX_CREDITS_DELTA: i32 = 1_000_000;
/// 单次经验值增量范围
const MIN_XP_DELTA: i32 = -10_000;
const MAX_XP_DELTA: i32 = 10_000;
/// 费用调整范围
const MIN_COST_ADJUSTMENT: i32 = -100_000;
const MAX_COST_ADJUSTMENT: i32 = 100_000;

/// 分页参数
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl PaginationParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1)
    }

    pub fn page_size(&self) -> i64 {
        self.page_size.unwrap_or(20)
    }
}

// ==================== 帮派 ====================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGangBody {
    #[validate(length(min = 1, max = 100, message = "帮派名称长度必须在1-100个字符之间"))]
    pub name: String,
    pub gang_type_id: Uuid,
    pub alignment: Option<Alignment>,
}

impl From<CreateGangBody> for CreateGangRequest {
    fn from(body: CreateGangBody) -> Self {
        Self {
            name: body.name,
            gang_type_id: body.gang_type_id,
            alignment: body.alignment,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGangBody {
    #[validate(length(min = 1, max = 100, message = "帮派名称长度必须在1-100个字符之间"))]
    pub name: Option<String>,
    pub alignment: Option<Alignment>,
    /// 信用点增量，可为负
    #[validate(range(min = MIN_CREDITS_DELTA, max = MAX_CREDITS_DELTA))]
    pub credits_delta: Option<i32>,
    #[validate(range(min = 0))]
    pub reputation: Option<i32>,
    #[validate(range(min = 0))]
    pub meat: Option<i32>,
    #[validate(range(min = 0))]
    pub scavenging_rolls: Option<i32>,
    #[validate(range(min = 0))]
    pub exploration_points: Option<i32>,
    pub note: Option<String>,
}

impl From<UpdateGangBody> for GangChanges {
    fn from(body: UpdateGangBody) -> Self {
        Self {
            name: body.name,
            alignment: body.alignment,
            credits_delta: body.credits_delta,
            reputation: body.reputation,
            meat: body.meat,
            scavenging_rolls: body.scavenging_rolls,
            exploration_points: body.exploration_points,
            note: body.note,
        }
    }
}

// ==================== 战士 ====================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddFighterBody {
    pub gang_id: Uuid,
    pub fighter_type: FighterTypeSource,
    #[validate(length(min = 1, max = 100, message = "战士名称长度必须在1-100个字符之间"))]
    pub fighter_name: String,
    #[validate(range(min = 0, message = "价格不能为负数"))]
    pub cost_override: Option<i32>,
}

impl From<AddFighterBody> for AddFighterRequest {
    fn from(body: AddFighterBody) -> Self {
        Self {
            gang_id: body.gang_id,
            fighter_type: body.fighter_type,
            fighter_name: body.fighter_name,
            cost_override: body.cost_override,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFighterBody {
    #[validate(length(min = 1, max = 100, message = "战士名称长度必须在1-100个字符之间"))]
    pub fighter_name: Option<String>,
    #[validate(length(max = 16))]
    pub label: Option<String>,
    pub note: Option<String>,
    #[validate(range(min = 0))]
    pub kills: Option<i32>,
    #[validate(range(min = MIN_XP_DELTA, max = MAX_XP_DELTA))]
    pub xp_delta: Option<i32>,
    #[validate(range(min = MIN_COST_ADJUSTMENT, max = MAX_COST_ADJUSTMENT))]
    pub cost_adjustment: Option<i32>,
}

impl From<UpdateFighterBody> for FighterChanges {
    fn from(body: UpdateFighterBody) -> Self {
        Self {
            fighter_name: body.fighter_name,
            label: body.label,
            note: body.note,
            kills: body.kills,
            xp_delta: body.xp_delta,
            cost_adjustment: body.cost_adjustment,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddInjuryBody {
    pub effect_type_id: Uuid,
    #[serde(default)]
    pub send_to_recovery: bool,
}

// ==================== 装备 ====================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BuyEquipmentBody {
    pub gang_id: Uuid,
    pub target: EquipmentHolder,
    pub item: EquipmentSource,
    #[validate(range(min = 0, message = "价格不能为负数"))]
    pub manual_cost: Option<i32>,
    #[serde(default)]
    pub buy_for_free: bool,
}

impl From<BuyEquipmentBody> for BuyEquipmentRequest {
    fn from(body: BuyEquipmentBody) -> Self {
        Self {
            gang_id: body.gang_id,
            target: body.target,
            item: body.item,
            manual_cost: body.manual_cost,
            buy_for_free: body.buy_for_free,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SellEquipmentBody {
    /// 手动售价，缺省按购买价退款
    #[validate(range(min = 0, message = "价格不能为负数"))]
    pub manual_price: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveFromStashBody {
    pub target: EquipmentHolder,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryQuery {
    pub category: Option<String>,
}

// ==================== 载具 ====================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddVehicleBody {
    pub gang_id: Uuid,
    pub vehicle_type_id: Uuid,
    #[validate(length(min = 1, max = 100, message = "载具名称长度必须在1-100个字符之间"))]
    pub vehicle_name: String,
    #[validate(range(min = 0, message = "价格不能为负数"))]
    pub cost_override: Option<i32>,
    #[serde(default)]
    pub buy_for_free: bool,
}

impl From<AddVehicleBody> for AddVehicleRequest {
    fn from(body: AddVehicleBody) -> Self {
        Self {
            gang_id: body.gang_id,
            vehicle_type_id: body.vehicle_type_id,
            vehicle_name: body.vehicle_name,
            cost_override: body.cost_override,
            buy_for_free: body.buy_for_free,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RenameVehicleBody {
    #[validate(length(min = 1, max = 100, message = "载具名称长度必须在1-100个字符之间"))]
    pub vehicle_name: String,
}

/// `fighterId` 为 null 表示撤下乘员
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignCrewBody {
    pub fighter_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDamageBody {
    pub effect_type_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RepairDamageBody {
    #[validate(range(min = 0, message = "维修费用不能为负数"))]
    pub repair_cost: i32,
}

// ==================== 战役 ====================

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignBody {
    #[validate(length(min = 1, max = 100, message = "战役名称长度必须在1-100个字符之间"))]
    pub campaign_name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub has_meat: bool,
    #[serde(default)]
    pub has_exploration_points: bool,
    #[serde(default)]
    pub has_scavenging_rolls: bool,
}

impl From<CreateCampaignBody> for CreateCampaignRequest {
    fn from(body: CreateCampaignBody) -> Self {
        Self {
            campaign_name: body.campaign_name,
            description: body.description,
            has_meat: body.has_meat,
            has_exploration_points: body.has_exploration_points,
            has_scavenging_rolls: body.has_scavenging_rolls,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberBody {
    pub user_id: Uuid,
    pub role: CampaignRole,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRoleBody {
    pub role: CampaignRole,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCampaignGangBody {
    pub gang_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddTerritoryBody {
    #[validate(length(min = 1, max = 100, message = "领地名称长度必须在1-100个字符之间"))]
    pub territory_name: String,
}

/// `gangId` 为 null 表示收回领地
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTerritoryBody {
    pub gang_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuinTerritoryBody {
    pub ruined: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddResourceBody {
    #[validate(length(min = 1, max = 100, message = "资源名称长度必须在1-100个字符之间"))]
    pub resource_name: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetGangResourceBody {
    #[validate(range(min = 0, message = "资源数量不能为负数"))]
    pub quantity: i32,
}

// ==================== 目录 ====================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FighterTypeQuery {
    pub gang_type_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GangTypeFilter {
    pub gang_type_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillQuery {
    pub skill_type_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectTypeQuery {
    pub category: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GangCostBody {
    #[validate(range(min = 0, message = "价格不能为负数"))]
    pub adjusted_cost: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_gang_validation() {
        let body: CreateGangBody = serde_json::from_value(serde_json::json!({
            "name": "",
            "gangTypeId": Uuid::nil(),
        }))
        .unwrap();
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_buy_equipment_body_shape() {
        let body: BuyEquipmentBody = serde_json::from_value(serde_json::json!({
            "gangId": Uuid::nil(),
            "target": {"kind": "stash"},
            "item": {"kind": "catalog", "id": Uuid::nil()},
            "manualCost": 15,
        }))
        .unwrap();
        assert!(body.validate().is_ok());
        let request = BuyEquipmentRequest::from(body);
        assert_eq!(request.target, EquipmentHolder::Stash);
        assert_eq!(request.manual_cost, Some(15));
        assert!(!request.buy_for_free);
    }

    #[test]
    fn test_negative_prices_rejected() {
        let sell = SellEquipmentBody {
            manual_price: Some(-1),
        };
        assert!(sell.validate().is_err());
        let repair = RepairDamageBody { repair_cost: -5 };
        assert!(repair.validate().is_err());
    }

    #[test]
    fn test_update_gang_credits_delta_bounds() {
        let body: UpdateGangBody =
            serde_json::from_value(serde_json::json!({ "creditsDelta": -250 })).unwrap();
        assert!(body.validate().is_ok());

        let body: UpdateGangBody =
            serde_json::from_value(serde_json::json!({ "creditsDelta": i32::MAX })).unwrap();
        assert!(body.validate().is_err());
        let body: UpdateGangBody =
            serde_json::from_value(serde_json::json!({ "creditsDelta": i32::MIN })).unwrap();
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_update_fighter_numeric_bounds() {
        let body: UpdateFighterBody = serde_json::from_value(serde_json::json!({
            "xpDelta": 6,
            "costAdjustment": -20,
        }))
        .unwrap();
        assert!(body.validate().is_ok());

        for (field, value) in [
            ("xpDelta", i32::MAX),
            ("xpDelta", i32::MIN),
            ("costAdjustment", i32::MAX),
            ("costAdjustment", i32::MIN),
        ] {
            let body: UpdateFighterBody =
                serde_json::from_value(serde_json::json!({ field: value })).unwrap();
            let errors = body.validate().unwrap_err();
            let key = if field == "xpDelta" { "xp_delta" } else { "cost_adjustment" };
            assert!(errors.field_errors().contains_key(key), "{field}={value}");
        }
    }

    #[test]
    fn test_pagination_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.page_size(), 20);
    }
}
