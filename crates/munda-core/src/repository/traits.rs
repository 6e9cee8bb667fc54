//! 仓储 Trait 定义
//!
//! 服务层依赖的只读接口，支持 mock 测试。写操作均为 `*_in_tx` 关联函数，
//! 由服务层在自己的事务中调用。

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Campaign, CampaignGang, CampaignGangResource, CampaignMember, CampaignResource, CampaignRole,
    CampaignTerritory, CustomFighterType, EffectTypeWithModifiers, Equipment, ExoticBeastLink,
    Fighter, FighterType, FighterTypeWithCost, Gang, GangCampaign, GangLog, GangType, Skill,
    UserRole, VehicleType,
};
use crate::rating::{FighterCostRow, VehicleCostRow};

/// 权限判定所需的查询
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessRepositoryTrait: Send + Sync {
    async fn user_role(&self, user_id: Uuid) -> Result<Option<UserRole>>;
    async fn gang_owner(&self, gang_id: Uuid) -> Result<Option<Uuid>>;
    /// 用户在帮派所属战役中的角色
    async fn campaign_roles_for_gang(
        &self,
        gang_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<CampaignRole>>;
    async fn campaign_role(&self, campaign_id: Uuid, user_id: Uuid)
    -> Result<Option<CampaignRole>>;
    async fn campaign_exists(&self, campaign_id: Uuid) -> Result<bool>;
}

/// 费用聚合查询
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatingRepositoryTrait: Send + Sync {
    async fn fighter_costs(&self, gang_id: Uuid) -> Result<Vec<FighterCostRow>>;
    async fn fighter_cost(&self, fighter_id: Uuid) -> Result<Option<FighterCostRow>>;
    async fn vehicle_costs(&self, gang_id: Uuid) -> Result<Vec<VehicleCostRow>>;
    async fn vehicle_cost(&self, vehicle_id: Uuid) -> Result<Option<VehicleCostRow>>;
    async fn stash_value(&self, gang_id: Uuid) -> Result<i32>;
}

/// 帮派仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GangRepositoryTrait: Send + Sync {
    async fn get_gang(&self, id: Uuid) -> Result<Option<Gang>>;
    async fn list_user_gangs(&self, user_id: Uuid) -> Result<Vec<Gang>>;
    async fn get_gang_type(&self, id: Uuid) -> Result<Option<GangType>>;
    async fn list_gang_campaigns(&self, gang_id: Uuid) -> Result<Vec<GangCampaign>>;
}

/// 战士仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FighterRepositoryTrait: Send + Sync {
    async fn get_fighter(&self, id: Uuid) -> Result<Option<Fighter>>;
    async fn list_by_gang(&self, gang_id: Uuid) -> Result<Vec<Fighter>>;
    /// 战士拥有的异兽
    async fn list_beast_links(&self, owner_id: Uuid) -> Result<Vec<ExoticBeastLink>>;
}

/// 目录仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepositoryTrait: Send + Sync {
    async fn list_gang_types(&self) -> Result<Vec<GangType>>;
    async fn get_fighter_type(&self, id: Uuid) -> Result<Option<FighterType>>;
    async fn get_fighter_type_with_cost(
        &self,
        id: Uuid,
        gang_type_id: Uuid,
    ) -> Result<Option<FighterTypeWithCost>>;
    async fn list_fighter_types_with_cost(
        &self,
        gang_type_id: Uuid,
    ) -> Result<Vec<FighterTypeWithCost>>;
    async fn list_custom_fighter_types(&self, user_id: Uuid) -> Result<Vec<CustomFighterType>>;
    async fn get_equipment(&self, id: Uuid) -> Result<Option<Equipment>>;
    async fn list_equipment(&self, category: Option<String>) -> Result<Vec<Equipment>>;
    async fn list_default_equipment(&self, fighter_type_id: Uuid) -> Result<Vec<Equipment>>;
    async fn get_vehicle_type(&self, id: Uuid) -> Result<Option<VehicleType>>;
    async fn list_vehicle_types(&self, gang_type_id: Option<Uuid>) -> Result<Vec<VehicleType>>;
    async fn get_skill(&self, id: Uuid) -> Result<Option<Skill>>;
    async fn list_skills(&self, skill_type_id: Option<Uuid>) -> Result<Vec<Skill>>;
    async fn get_effect_type(&self, id: Uuid) -> Result<Option<EffectTypeWithModifiers>>;
    async fn list_effect_types(&self, category: String) -> Result<Vec<EffectTypeWithModifiers>>;
    /// 装备附带的效果类型
    async fn list_granted_effect_types(
        &self,
        equipment_id: Uuid,
    ) -> Result<Vec<EffectTypeWithModifiers>>;
}

/// 战役仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CampaignRepositoryTrait: Send + Sync {
    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>>;
    async fn list_user_campaigns(&self, user_id: Uuid) -> Result<Vec<Campaign>>;
    async fn list_members(&self, campaign_id: Uuid) -> Result<Vec<CampaignMember>>;
    async fn get_member(&self, member_id: Uuid) -> Result<Option<CampaignMember>>;
    async fn list_gangs(&self, campaign_id: Uuid) -> Result<Vec<CampaignGang>>;
    async fn list_territories(&self, campaign_id: Uuid) -> Result<Vec<CampaignTerritory>>;
    async fn list_resources(&self, campaign_id: Uuid) -> Result<Vec<CampaignResource>>;
    async fn list_gang_resources(&self, campaign_id: Uuid) -> Result<Vec<CampaignGangResource>>;
}

/// 帮派日志仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GangLogRepositoryTrait: Send + Sync {
    /// 按时间倒序分页，返回 (当前页, 总数)
    async fn list(&self, gang_id: Uuid, page: i64, page_size: i64)
    -> Result<(Vec<GangLog>, i64)>;
}
