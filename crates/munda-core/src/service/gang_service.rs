//! 帮派服务
//!
//! 帮派的创建、查询、字段修改、删除与评分重算。
//!
//! ## 缓存策略
//!
//! - 帮派详情: TTL 60 秒，任何帮派写操作后失效
//! - 用户帮派列表: TTL 60 秒
//! - 所属战役的详情随帮派写操作一起失效

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use munda_shared::cache::{Cache, CacheKey};

use crate::error::{MundaError, Result};
use crate::models::{Alignment, FighterEquipment, Gang, GangChanges, GangLog, GangLogAction, GangType};
use crate::rating;
use crate::repository::{
    CampaignRepository, FighterRepository, FighterRepositoryTrait, GangLogRepository,
    GangLogRepositoryTrait, GangRepository, GangRepositoryTrait, NewGangLog, RatingRepository,
    VehicleRepository,
};
use crate::service::access::Access;
use crate::service::dto::{
    CreateGangRequest, FighterSummary, GangDetail, PageResult, RatingRecalculation,
    VehicleSummary, normalize_page,
};
use crate::service::valuation_service::ValuationService;
use crate::service::{cached_or_fetch, checked_delta, invalidate_gang_cache, lock_gang};

/// 缓存 TTL 常量（秒）
mod cache_ttl {
    pub const GANG_DETAIL: u64 = 60;
    pub const USER_GANGS: u64 = 60;
}

pub struct GangService {
    pool: PgPool,
    cache: Arc<Cache>,
    access: Arc<Access>,
    gang_repo: GangRepository,
    fighter_repo: FighterRepository,
    vehicle_repo: VehicleRepository,
    log_repo: GangLogRepository,
    valuation: ValuationService,
    starting_credits: i32,
}

impl GangService {
    pub fn new(pool: PgPool, cache: Arc<Cache>, access: Arc<Access>, starting_credits: i32) -> Self {
        Self {
            gang_repo: GangRepository::new(pool.clone()),
            fighter_repo: FighterRepository::new(pool.clone()),
            vehicle_repo: VehicleRepository::new(pool.clone()),
            log_repo: GangLogRepository::new(pool.clone()),
            valuation: ValuationService::new(Arc::new(RatingRepository::new(pool.clone()))),
            pool,
            cache,
            access,
            starting_credits,
        }
    }

    /// 创建帮派，初始信用点取配置值
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_gang(&self, user_id: Uuid, request: CreateGangRequest) -> Result<Gang> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(MundaError::Validation("帮派名称不能为空".to_string()));
        }

        let gang_type = self
            .gang_repo
            .get_gang_type(request.gang_type_id)
            .await?
            .ok_or_else(|| MundaError::Validation("帮派类型不存在".to_string()))?;
        let alignment = request
            .alignment
            .unwrap_or_else(|| default_alignment(&gang_type));

        let mut tx = self.pool.begin().await?;
        let gang = GangRepository::create_in_tx(
            &mut tx,
            user_id,
            name,
            gang_type.id,
            alignment,
            self.starting_credits,
        )
        .await?;
        GangLogRepository::create_in_tx(
            &mut tx,
            &NewGangLog::new(
                gang.id,
                user_id,
                GangLogAction::GangCreated,
                format!("Gang \"{}\" created ({})", gang.name, gang_type.gang_type),
            ),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, user_id).await;

        info!(gang_id = %gang.id, credits = gang.credits, "帮派创建成功");
        Ok(gang)
    }

    /// 帮派详情
    ///
    /// 缓存键: gang:detail:{id}, TTL: 60s
    #[instrument(skip(self))]
    pub async fn get_gang(&self, gang_id: Uuid) -> Result<GangDetail> {
        let key = CacheKey::gang_detail(&gang_id.to_string());
        cached_or_fetch(
            &self.cache,
            &key,
            Duration::from_secs(cache_ttl::GANG_DETAIL),
            || self.load_gang_detail(gang_id),
        )
        .await
    }

    async fn load_gang_detail(&self, gang_id: Uuid) -> Result<GangDetail> {
        let gang = self
            .gang_repo
            .get_gang(gang_id)
            .await?
            .ok_or(MundaError::GangNotFound(gang_id))?;

        let gang_type = self.gang_repo.get_gang_type(gang.gang_type_id).await?;
        let costs = self.valuation.gang_costs(&gang).await?;
        let fighter_costs = costs.fighter_costs_by_id();
        let vehicle_totals = costs.vehicle_totals_by_id();

        let fighters = self
            .fighter_repo
            .list_by_gang(gang_id)
            .await?
            .into_iter()
            .map(|fighter| {
                let breakdown = fighter_costs
                    .get(&fighter.id)
                    .map(|row| row.breakdown())
                    .unwrap_or_default();
                FighterSummary {
                    total_cost: breakdown.total(),
                    breakdown,
                    fighter,
                }
            })
            .collect();

        let vehicles = self
            .vehicle_repo
            .list_by_gang(gang_id)
            .await?
            .into_iter()
            .map(|vehicle| VehicleSummary {
                total_cost: vehicle_totals.get(&vehicle.id).copied().unwrap_or(vehicle.cost),
                vehicle,
            })
            .collect();

        let stash = self.gang_repo.list_stash(gang_id).await?;
        let campaigns = self.gang_repo.list_gang_campaigns(gang_id).await?;

        Ok(GangDetail {
            gang,
            gang_type,
            fighters,
            vehicles,
            stash,
            campaigns,
            valuation: costs.valuation,
        })
    }

    /// 用户的帮派列表
    ///
    /// 缓存键: user:gangs:{user_id}, TTL: 60s
    #[instrument(skip(self))]
    pub async fn list_user_gangs(&self, user_id: Uuid) -> Result<Vec<Gang>> {
        let key = CacheKey::user_gangs(&user_id.to_string());
        cached_or_fetch(
            &self.cache,
            &key,
            Duration::from_secs(cache_ttl::USER_GANGS),
            || self.gang_repo.list_user_gangs(user_id),
        )
        .await
    }

    /// 修改帮派字段，每个变更字段记一条日志
    #[instrument(skip(self, changes))]
    pub async fn update_gang(
        &self,
        user_id: Uuid,
        gang_id: Uuid,
        changes: GangChanges,
    ) -> Result<Gang> {
        if changes.is_empty() {
            return Err(MundaError::Validation("没有需要更新的字段".to_string()));
        }
        if let Some(name) = &changes.name
            && name.trim().is_empty()
        {
            return Err(MundaError::Validation("帮派名称不能为空".to_string()));
        }
        self.access.ensure_gang_access(user_id, gang_id).await?;

        let mut tx = self.pool.begin().await?;
        let before = lock_gang(&mut tx, gang_id).await?;

        let credits_delta = changes.credits_delta.filter(|d| *d != 0);
        if let Some(delta) = credits_delta
            && checked_delta(before.credits, delta, "credits")? < 0
        {
            return Err(MundaError::InsufficientCredits {
                required: delta.saturating_neg(),
                available: before.credits,
            });
        }

        let mut gang = GangRepository::update_fields_in_tx(&mut tx, gang_id, &changes).await?;
        if let Some(delta) = credits_delta {
            gang.credits = GangRepository::adjust_credits_in_tx(&mut tx, gang_id, delta).await?;
        }

        for (action, description) in describe_changes(&before, &changes) {
            GangLogRepository::create_in_tx(
                &mut tx,
                &NewGangLog::new(gang_id, user_id, action, description),
            )
            .await?;
        }
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang_id, gang.user_id).await;

        info!(gang_id = %gang_id, credits = gang.credits, "帮派更新成功");
        Ok(gang)
    }

    /// 删除帮派，下属数据由外键级联删除
    #[instrument(skip(self))]
    pub async fn delete_gang(&self, user_id: Uuid, gang_id: Uuid) -> Result<()> {
        self.access.ensure_gang_access(user_id, gang_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, gang_id).await?;
        let campaign = CampaignRepository::find_gang_campaign_in_tx(&mut tx, gang_id).await?;
        GangRepository::delete_in_tx(&mut tx, gang_id).await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang_id, gang.user_id).await;
        // 级联删除后已查不到所属战役
        if let Some((_, campaign_id)) = campaign {
            let key = CacheKey::campaign_detail(&campaign_id.to_string());
            if let Err(e) = self.cache.delete(&key).await {
                warn!(key = %key, error = %e, "Failed to invalidate campaign cache");
            }
        }

        info!(gang_id = %gang_id, "帮派已删除");
        Ok(())
    }

    /// 从零重算评分并写回
    #[instrument(skip(self))]
    pub async fn recalculate_rating(
        &self,
        user_id: Uuid,
        gang_id: Uuid,
    ) -> Result<RatingRecalculation> {
        self.access.ensure_gang_access(user_id, gang_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, gang_id).await?;
        let costs = RatingRepository::fighter_costs_in_tx(&mut tx, gang_id).await?;
        let new_rating = rating::rating_of(&costs);

        let result = RatingRecalculation {
            gang_id,
            old_rating: gang.rating,
            new_rating,
        };

        if result.drift() != 0 {
            RatingRepository::set_rating_in_tx(&mut tx, gang_id, new_rating).await?;
            GangLogRepository::create_in_tx(
                &mut tx,
                &NewGangLog::new(
                    gang_id,
                    user_id,
                    GangLogAction::RatingRecalculated,
                    format!("Rating recalculated: {} -> {}", gang.rating, new_rating),
                ),
            )
            .await?;
        }
        tx.commit().await?;

        if result.drift() != 0 {
            invalidate_gang_cache(&self.cache, &self.pool, gang_id, gang.user_id).await;
        }

        info!(
            gang_id = %gang_id,
            old_rating = result.old_rating,
            new_rating = result.new_rating,
            "评分重算完成"
        );
        Ok(result)
    }

    pub async fn list_stash(&self, gang_id: Uuid) -> Result<Vec<FighterEquipment>> {
        self.gang_repo
            .get_gang(gang_id)
            .await?
            .ok_or(MundaError::GangNotFound(gang_id))?;
        self.gang_repo.list_stash(gang_id).await
    }

    /// 帮派日志，按时间倒序分页
    pub async fn list_logs(
        &self,
        gang_id: Uuid,
        page: i64,
        page_size: i64,
    ) -> Result<PageResult<GangLog>> {
        let (page, page_size) = normalize_page(page, page_size);
        let (items, total) = self.log_repo.list(gang_id, page, page_size).await?;
        Ok(PageResult::new(items, total, page, page_size))
    }
}

/// 帮派类型未指定阵营时按 outlaw 处理
fn default_alignment(gang_type: &GangType) -> Alignment {
    match gang_type.alignment.to_lowercase().replace(['-', ' '], "_").as_str() {
        "law_abiding" => Alignment::LawAbiding,
        _ => Alignment::Outlaw,
    }
}

/// 为每个实际变化的字段生成一条日志
fn describe_changes(before: &Gang, changes: &GangChanges) -> Vec<(GangLogAction, String)> {
    let mut entries = Vec::new();

    let mut field = |label: &str, old: String, new: Option<String>| {
        if let Some(new) = new
            && new != old
        {
            entries.push((
                GangLogAction::GangUpdated,
                format!("{} changed from {} to {}", label, old, new),
            ));
        }
    };

    field("Name", before.name.clone(), changes.name.clone());
    field(
        "Alignment",
        before.alignment.as_str().to_string(),
        changes.alignment.map(|a| a.as_str().to_string()),
    );
    field(
        "Reputation",
        before.reputation.to_string(),
        changes.reputation.map(|v| v.to_string()),
    );
    field("Meat", before.meat.to_string(), changes.meat.map(|v| v.to_string()));
    field(
        "Scavenging rolls",
        before.scavenging_rolls.to_string(),
        changes.scavenging_rolls.map(|v| v.to_string()),
    );
    field(
        "Exploration points",
        before.exploration_points.to_string(),
        changes.exploration_points.map(|v| v.to_string()),
    );
    field(
        "Note",
        before.note.clone().unwrap_or_default(),
        changes.note.clone(),
    );

    if let Some(delta) = changes.credits_delta.filter(|d| *d != 0) {
        let verb = if delta > 0 { "gained" } else { "spent" };
        entries.push((
            GangLogAction::CreditsChanged,
            format!(
                "Credits {} {}: {} -> {}",
                verb,
                delta.unsigned_abs(),
                before.credits,
                before.credits.saturating_add(delta)
            ),
        ));
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn gang() -> Gang {
        Gang {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Orlock Roadkings".to_string(),
            gang_type_id: Uuid::new_v4(),
            alignment: Alignment::Outlaw,
            credits: 200,
            rating: 850,
            reputation: 5,
            meat: 0,
            scavenging_rolls: 0,
            exploration_points: 0,
            note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_default_alignment() {
        let mut gt = GangType {
            id: Uuid::new_v4(),
            gang_type: "Palanite Enforcers".to_string(),
            alignment: "Law Abiding".to_string(),
        };
        assert_eq!(default_alignment(&gt), Alignment::LawAbiding);
        gt.alignment = "outlaw".to_string();
        assert_eq!(default_alignment(&gt), Alignment::Outlaw);
        gt.alignment = String::new();
        assert_eq!(default_alignment(&gt), Alignment::Outlaw);
    }

    #[test]
    fn test_describe_changes_only_real_changes() {
        let before = gang();
        let changes = GangChanges {
            name: Some("Orlock Roadkings".to_string()),
            reputation: Some(7),
            credits_delta: Some(-50),
            ..Default::default()
        };

        let entries = describe_changes(&before, &changes);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0, GangLogAction::GangUpdated);
        assert!(entries[0].1.contains("Reputation changed from 5 to 7"));
        assert_eq!(entries[1].0, GangLogAction::CreditsChanged);
        assert!(entries[1].1.contains("spent 50: 200 -> 150"));
    }

    #[test]
    fn test_describe_changes_zero_credit_delta_is_ignored() {
        let changes = GangChanges {
            credits_delta: Some(0),
            ..Default::default()
        };
        assert!(describe_changes(&gang(), &changes).is_empty());
    }
}
