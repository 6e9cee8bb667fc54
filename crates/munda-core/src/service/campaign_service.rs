//! 战役服务
//!
//! 成员角色：
//! - Owner：创建者，唯一，不可转让或移除
//! - Arbitrator：管理成员、帮派、领地与资源
//! - Member：登记自己的帮派
//!
//! 一个帮派同一时间最多参加一个战役。

use std::sync::Arc;
use std::time::Duration;

use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use munda_shared::cache::{Cache, CacheKey};

use crate::error::{MundaError, Result};
use crate::models::{
    Campaign, CampaignChanges, CampaignGangResource, CampaignMember, CampaignResource,
    CampaignRole, CampaignTerritory, Gang, GangLogAction,
};
use crate::repository::{
    CampaignRepository, CampaignRepositoryTrait, GangLogRepository, NewGangLog,
};
use crate::service::access::Access;
use crate::service::dto::{CampaignDetail, CreateCampaignRequest};
use crate::service::{cached_or_fetch, ensure_non_negative, invalidate_gang_cache, lock_gang};

const CAMPAIGN_DETAIL_TTL: Duration = Duration::from_secs(60);

const MANAGERS: &[CampaignRole] = &[CampaignRole::Owner, CampaignRole::Arbitrator];
const OWNER_ONLY: &[CampaignRole] = &[CampaignRole::Owner];

fn ensure_name(name: &str, what: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MundaError::Validation(format!("{}不能为空", what)));
    }
    Ok(())
}

/// 新成员只能是 Member 或 Arbitrator
fn ensure_assignable(role: CampaignRole) -> Result<()> {
    if role == CampaignRole::Owner {
        return Err(MundaError::Validation(
            "战役所有者不可授予".to_string(),
        ));
    }
    Ok(())
}

pub struct CampaignService {
    pool: PgPool,
    cache: Arc<Cache>,
    access: Arc<Access>,
    repo: CampaignRepository,
}

impl CampaignService {
    pub fn new(pool: PgPool, cache: Arc<Cache>, access: Arc<Access>) -> Self {
        Self {
            repo: CampaignRepository::new(pool.clone()),
            pool,
            cache,
            access,
        }
    }

    async fn invalidate(&self, campaign_id: Uuid) {
        let key = CacheKey::campaign_detail(&campaign_id.to_string());
        if let Err(e) = self.cache.delete(&key).await {
            warn!(key = %key, error = %e, "Failed to invalidate campaign cache");
        }
    }

    // ==================== 战役 ====================

    /// 创建战役，创建者成为所有者
    #[instrument(skip(self, request))]
    pub async fn create_campaign(
        &self,
        user_id: Uuid,
        request: CreateCampaignRequest,
    ) -> Result<Campaign> {
        ensure_name(&request.campaign_name, "战役名称")?;

        let mut tx = self.pool.begin().await?;
        let campaign = CampaignRepository::create_in_tx(
            &mut tx,
            request.campaign_name.trim(),
            request.description.as_deref(),
            request.has_meat,
            request.has_exploration_points,
            request.has_scavenging_rolls,
        )
        .await?;
        CampaignRepository::add_member_in_tx(&mut tx, campaign.id, user_id, CampaignRole::Owner, None)
            .await?;
        tx.commit().await?;

        info!(campaign_id = %campaign.id, "战役创建成功");
        Ok(campaign)
    }

    /// 战役详情
    #[instrument(skip(self))]
    pub async fn get_campaign(&self, campaign_id: Uuid) -> Result<CampaignDetail> {
        let key = CacheKey::campaign_detail(&campaign_id.to_string());
        cached_or_fetch(&self.cache, &key, CAMPAIGN_DETAIL_TTL, || {
            self.load_detail(campaign_id)
        })
        .await
    }

    async fn load_detail(&self, campaign_id: Uuid) -> Result<CampaignDetail> {
        let campaign = self
            .repo
            .get_campaign(campaign_id)
            .await?
            .ok_or(MundaError::CampaignNotFound(campaign_id))?;

        Ok(CampaignDetail {
            members: self.repo.list_members(campaign_id).await?,
            gangs: self.repo.list_gangs(campaign_id).await?,
            territories: self.repo.list_territories(campaign_id).await?,
            resources: self.repo.list_resources(campaign_id).await?,
            gang_resources: self.repo.list_gang_resources(campaign_id).await?,
            campaign,
        })
    }

    pub async fn list_user_campaigns(&self, user_id: Uuid) -> Result<Vec<Campaign>> {
        self.repo.list_user_campaigns(user_id).await
    }

    #[instrument(skip(self, changes))]
    pub async fn update_campaign(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
        changes: CampaignChanges,
    ) -> Result<Campaign> {
        if let Some(name) = &changes.campaign_name {
            ensure_name(name, "战役名称")?;
        }
        self.access
            .ensure_campaign_role(user_id, campaign_id, MANAGERS)
            .await?;

        let mut tx = self.pool.begin().await?;
        let campaign = CampaignRepository::update_in_tx(&mut tx, campaign_id, &changes)
            .await?
            .ok_or(MundaError::CampaignNotFound(campaign_id))?;
        tx.commit().await?;

        self.invalidate(campaign_id).await;
        info!(campaign_id = %campaign_id, "战役更新成功");
        Ok(campaign)
    }

    /// 删除战役（仅所有者）
    #[instrument(skip(self))]
    pub async fn delete_campaign(&self, user_id: Uuid, campaign_id: Uuid) -> Result<()> {
        self.access
            .ensure_campaign_role(user_id, campaign_id, OWNER_ONLY)
            .await?;

        let mut tx = self.pool.begin().await?;
        if !CampaignRepository::delete_in_tx(&mut tx, campaign_id).await? {
            return Err(MundaError::CampaignNotFound(campaign_id));
        }
        tx.commit().await?;

        self.invalidate(campaign_id).await;
        info!(campaign_id = %campaign_id, "战役已删除");
        Ok(())
    }

    // ==================== 成员 ====================

    #[instrument(skip(self))]
    pub async fn add_member(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
        member_user_id: Uuid,
        role: CampaignRole,
    ) -> Result<CampaignMember> {
        ensure_assignable(role)?;
        self.access
            .ensure_campaign_role(user_id, campaign_id, MANAGERS)
            .await?;
        if !self.access.profile_exists(member_user_id).await? {
            return Err(MundaError::Validation(format!(
                "用户不存在: {}",
                member_user_id
            )));
        }

        let mut tx = self.pool.begin().await?;
        if CampaignRepository::find_member_in_tx(&mut tx, campaign_id, member_user_id)
            .await?
            .is_some()
        {
            return Err(MundaError::Conflict("用户已是战役成员".to_string()));
        }
        let member_id = CampaignRepository::add_member_in_tx(
            &mut tx,
            campaign_id,
            member_user_id,
            role,
            Some(user_id),
        )
        .await?;
        let member = CampaignRepository::get_member_for_update(&mut tx, member_id)
            .await?
            .ok_or(MundaError::CampaignMemberNotFound(member_id))?;
        tx.commit().await?;

        self.invalidate(campaign_id).await;
        info!(campaign_id = %campaign_id, member_id = %member_id, "战役成员已添加");
        Ok(member)
    }

    /// 变更成员角色（仅所有者）
    #[instrument(skip(self))]
    pub async fn change_member_role(
        &self,
        user_id: Uuid,
        member_id: Uuid,
        role: CampaignRole,
    ) -> Result<CampaignMember> {
        ensure_assignable(role)?;
        let current = self
            .repo
            .get_member(member_id)
            .await?
            .ok_or(MundaError::CampaignMemberNotFound(member_id))?;
        self.access
            .ensure_campaign_role(user_id, current.campaign_id, OWNER_ONLY)
            .await?;

        let mut tx = self.pool.begin().await?;
        let mut member = CampaignRepository::get_member_for_update(&mut tx, member_id)
            .await?
            .ok_or(MundaError::CampaignMemberNotFound(member_id))?;
        if member.role == CampaignRole::Owner {
            return Err(MundaError::Validation(
                "不能变更战役所有者的角色".to_string(),
            ));
        }
        CampaignRepository::set_member_role_in_tx(&mut tx, member_id, role).await?;
        tx.commit().await?;

        member.role = role;
        self.invalidate(member.campaign_id).await;
        info!(member_id = %member_id, role = ?role, "成员角色已变更");
        Ok(member)
    }

    /// 移除成员，其登记的帮派一并退出战役
    ///
    /// 管理者可移除他人，成员可自行退出；所有者不可移除
    #[instrument(skip(self))]
    pub async fn remove_member(&self, user_id: Uuid, member_id: Uuid) -> Result<Vec<Uuid>> {
        let current = self
            .repo
            .get_member(member_id)
            .await?
            .ok_or(MundaError::CampaignMemberNotFound(member_id))?;
        if current.user_id != user_id {
            self.access
                .ensure_campaign_role(user_id, current.campaign_id, MANAGERS)
                .await?;
        }

        let mut tx = self.pool.begin().await?;
        let member = CampaignRepository::get_member_for_update(&mut tx, member_id)
            .await?
            .ok_or(MundaError::CampaignMemberNotFound(member_id))?;
        if member.role == CampaignRole::Owner {
            return Err(MundaError::Validation(
                "战役所有者不能被移除".to_string(),
            ));
        }

        let gang_ids = CampaignRepository::list_member_gang_ids_in_tx(&mut tx, member_id).await?;
        let mut gangs = Vec::with_capacity(gang_ids.len());
        for gang_id in &gang_ids {
            let gang = lock_gang(&mut tx, *gang_id).await?;
            self.leave_in_tx(&mut tx, member.campaign_id, &gang, user_id).await?;
            gangs.push(gang);
        }
        CampaignRepository::remove_member_in_tx(&mut tx, member_id).await?;
        tx.commit().await?;

        self.invalidate(member.campaign_id).await;
        for gang in &gangs {
            invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        }
        info!(member_id = %member_id, gangs = gang_ids.len(), "战役成员已移除");
        Ok(gang_ids)
    }

    // ==================== 帮派 ====================

    /// 登记帮派
    ///
    /// 帮派所有者必须是战役成员；调用者须为帮派所有者或战役管理者
    #[instrument(skip(self))]
    pub async fn add_gang(&self, user_id: Uuid, campaign_id: Uuid, gang_id: Uuid) -> Result<Uuid> {
        let role = self.access.campaign_role(user_id, campaign_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, gang_id).await?;

        let is_manager = role.as_ref().is_some_and(CampaignRole::can_manage);
        if !gang.is_owned_by(user_id) && !is_manager && !self.access.is_admin(user_id).await? {
            return Err(MundaError::PermissionDenied(
                "无权登记该帮派".to_string(),
            ));
        }

        let owner_member = CampaignRepository::find_member_in_tx(&mut tx, campaign_id, gang.user_id)
            .await?
            .ok_or_else(|| {
                MundaError::Validation("帮派所有者不是战役成员".to_string())
            })?;

        if let Some((_, existing)) = CampaignRepository::find_gang_campaign_in_tx(&mut tx, gang_id).await? {
            return Err(MundaError::Conflict(format!(
                "帮派已参加战役 {}",
                existing
            )));
        }

        let campaign_gang_id = CampaignRepository::add_gang_in_tx(
            &mut tx,
            campaign_id,
            gang_id,
            owner_member.id,
            gang.user_id,
        )
        .await?;

        GangLogRepository::create_in_tx(
            &mut tx,
            &NewGangLog::new(
                gang_id,
                user_id,
                GangLogAction::CampaignJoined,
                format!("Joined campaign {}", campaign_id),
            ),
        )
        .await?;
        tx.commit().await?;

        self.invalidate(campaign_id).await;
        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        info!(campaign_id = %campaign_id, gang_id = %gang_id, "帮派加入战役");
        Ok(campaign_gang_id)
    }

    /// 帮派退出战役，释放其领地
    #[instrument(skip(self))]
    pub async fn remove_gang(&self, user_id: Uuid, campaign_id: Uuid, gang_id: Uuid) -> Result<()> {
        let role = self.access.campaign_role(user_id, campaign_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, gang_id).await?;

        let is_manager = role.as_ref().is_some_and(CampaignRole::can_manage);
        if !gang.is_owned_by(user_id) && !is_manager && !self.access.is_admin(user_id).await? {
            return Err(MundaError::PermissionDenied(
                "无权移除该帮派".to_string(),
            ));
        }

        if !self.leave_in_tx(&mut tx, campaign_id, &gang, user_id).await? {
            return Err(MundaError::Validation("帮派未参加该战役".to_string()));
        }
        tx.commit().await?;

        self.invalidate(campaign_id).await;
        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        info!(campaign_id = %campaign_id, gang_id = %gang_id, "帮派退出战役");
        Ok(())
    }

    /// 释放领地、删除登记并记录日志；帮派未登记时返回 false
    async fn leave_in_tx(
        &self,
        tx: &mut PgConnection,
        campaign_id: Uuid,
        gang: &Gang,
        user_id: Uuid,
    ) -> Result<bool> {
        let released = CampaignRepository::release_territories_in_tx(tx, campaign_id, gang.id).await?;
        if !CampaignRepository::remove_gang_in_tx(tx, campaign_id, gang.id).await? {
            return Ok(false);
        }
        GangLogRepository::create_in_tx(
            tx,
            &NewGangLog::new(
                gang.id,
                user_id,
                GangLogAction::CampaignLeft,
                format!(
                    "Left campaign {} ({} territories released)",
                    campaign_id, released
                ),
            ),
        )
        .await?;
        Ok(true)
    }

    // ==================== 领地 ====================

    #[instrument(skip(self))]
    pub async fn add_territory(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
        territory_name: &str,
    ) -> Result<CampaignTerritory> {
        ensure_name(territory_name, "领地名称")?;
        self.access
            .ensure_campaign_role(user_id, campaign_id, MANAGERS)
            .await?;

        let mut tx = self.pool.begin().await?;
        let territory =
            CampaignRepository::add_territory_in_tx(&mut tx, campaign_id, territory_name.trim())
                .await?;
        tx.commit().await?;

        self.invalidate(campaign_id).await;
        Ok(territory)
    }

    /// 锁定领地并校验管理权限
    async fn lock_territory(
        &self,
        tx: &mut PgConnection,
        user_id: Uuid,
        territory_id: Uuid,
    ) -> Result<CampaignTerritory> {
        let territory = CampaignRepository::get_territory_for_update(tx, territory_id)
            .await?
            .ok_or(MundaError::TerritoryNotFound(territory_id))?;
        self.access
            .ensure_campaign_role(user_id, territory.campaign_id, MANAGERS)
            .await?;
        Ok(territory)
    }

    /// 分配领地；帮派必须已参加该战役，None 表示收回
    #[instrument(skip(self))]
    pub async fn assign_territory(
        &self,
        user_id: Uuid,
        territory_id: Uuid,
        gang_id: Option<Uuid>,
    ) -> Result<CampaignTerritory> {
        let mut tx = self.pool.begin().await?;
        let territory = self.lock_territory(&mut tx, user_id, territory_id).await?;

        if let Some(gang_id) = gang_id {
            let joined = CampaignRepository::find_gang_campaign_in_tx(&mut tx, gang_id).await?;
            if joined.map(|(_, campaign)| campaign) != Some(territory.campaign_id) {
                return Err(MundaError::Validation(
                    "帮派未参加该战役".to_string(),
                ));
            }
        }

        let updated =
            CampaignRepository::update_territory_in_tx(&mut tx, territory_id, gang_id, territory.ruined)
                .await?;
        tx.commit().await?;

        self.invalidate(territory.campaign_id).await;
        info!(territory_id = %territory_id, gang_id = ?gang_id, "领地已分配");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn set_territory_ruined(
        &self,
        user_id: Uuid,
        territory_id: Uuid,
        ruined: bool,
    ) -> Result<CampaignTerritory> {
        let mut tx = self.pool.begin().await?;
        let territory = self.lock_territory(&mut tx, user_id, territory_id).await?;
        let updated =
            CampaignRepository::update_territory_in_tx(&mut tx, territory_id, territory.gang_id, ruined)
                .await?;
        tx.commit().await?;

        self.invalidate(territory.campaign_id).await;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_territory(&self, user_id: Uuid, territory_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let territory = self.lock_territory(&mut tx, user_id, territory_id).await?;
        CampaignRepository::delete_territory_in_tx(&mut tx, territory_id).await?;
        tx.commit().await?;

        self.invalidate(territory.campaign_id).await;
        Ok(())
    }

    // ==================== 资源 ====================

    #[instrument(skip(self))]
    pub async fn add_resource(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
        resource_name: &str,
    ) -> Result<CampaignResource> {
        ensure_name(resource_name, "资源名称")?;
        self.access
            .ensure_campaign_role(user_id, campaign_id, MANAGERS)
            .await?;

        let mut tx = self.pool.begin().await?;
        let resource =
            CampaignRepository::add_resource_in_tx(&mut tx, campaign_id, resource_name.trim())
                .await?;
        tx.commit().await?;

        self.invalidate(campaign_id).await;
        Ok(resource)
    }

    /// 设置帮派持有的资源数量（不能为负）
    #[instrument(skip(self))]
    pub async fn set_gang_resource(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
        gang_id: Uuid,
        resource_id: Uuid,
        quantity: i32,
    ) -> Result<CampaignGangResource> {
        ensure_non_negative(quantity, "quantity")?;
        self.access
            .ensure_campaign_role(user_id, campaign_id, MANAGERS)
            .await?;

        let mut tx = self.pool.begin().await?;
        let campaign_gang_id = match CampaignRepository::find_gang_campaign_in_tx(&mut tx, gang_id)
            .await?
        {
            Some((id, campaign)) if campaign == campaign_id => id,
            _ => {
                return Err(MundaError::Validation(
                    "帮派未参加该战役".to_string(),
                ));
            }
        };
        CampaignRepository::get_resource_in_tx(&mut tx, resource_id)
            .await?
            .filter(|r| r.campaign_id == campaign_id)
            .ok_or(MundaError::ResourceNotFound(resource_id))?;

        let row =
            CampaignRepository::set_gang_resource_in_tx(&mut tx, campaign_gang_id, resource_id, quantity)
                .await?;
        tx.commit().await?;

        self.invalidate(campaign_id).await;
        info!(gang_id = %gang_id, resource_id = %resource_id, quantity = quantity, "帮派资源已更新");
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_role_cannot_be_assigned() {
        assert!(matches!(
            ensure_assignable(CampaignRole::Owner),
            Err(MundaError::Validation(_))
        ));
        assert!(ensure_assignable(CampaignRole::Arbitrator).is_ok());
        assert!(ensure_assignable(CampaignRole::Member).is_ok());
    }

    #[test]
    fn test_ensure_name() {
        assert!(ensure_name("Badzone Uprising", "战役名称").is_ok());
        assert!(ensure_name("   ", "战役名称").is_err());
    }

    #[test]
    fn test_role_sets() {
        assert!(MANAGERS.iter().all(CampaignRole::can_manage));
        assert_eq!(OWNER_ONLY, &[CampaignRole::Owner]);
    }
}
