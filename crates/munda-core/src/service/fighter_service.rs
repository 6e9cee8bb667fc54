//! 战士服务
//!
//! 招募、详情、字段修改、状态变更与删除。
//!
//! 评分规则：
//! - 招募时评分增加类型基础费用（与实付价格无关）
//! - 状态进入或离开计分集合时，评分按战士总费用增减
//! - 删除时扣除战士及其异兽的计分部分，不退还信用点

use std::sync::Arc;

use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

use munda_shared::cache::Cache;
use munda_shared::observability::metrics;

use crate::error::{MundaError, Result};
use crate::models::{
    EquipmentHolder, Fighter, FighterChanges, FighterEquipment, FighterTemplate, GangLogAction,
};
use crate::rating::{FighterStatus, RatingDelta};
use crate::repository::{
    CatalogRepository, CatalogRepositoryTrait, CustomContentRepository, EffectRepository,
    EquipmentRepository, FighterRepository, FighterRepositoryTrait, GangLogRepository,
    GangRepository, NewFighterEquipment, NewGangLog, RatingRepository, RatingRepositoryTrait,
    SkillRepository, VehicleRepository,
};
use crate::service::access::Access;
use crate::service::dto::{
    AddFighterRequest, AddFighterResult, FighterDeletion, FighterDetail, FighterTypeSource,
    StatusAction, StatusChangeResult,
};
use crate::service::{
    apply_rating, checked_delta, checked_difference, ensure_credits, ensure_non_negative,
    invalidate_gang_cache, lock_fighter, lock_gang,
};

pub struct FighterService {
    pool: PgPool,
    cache: Arc<Cache>,
    access: Arc<Access>,
    fighter_repo: FighterRepository,
    catalog_repo: CatalogRepository,
    custom_repo: CustomContentRepository,
    equipment_repo: EquipmentRepository,
    effect_repo: EffectRepository,
    skill_repo: SkillRepository,
    vehicle_repo: VehicleRepository,
    rating_repo: RatingRepository,
}

impl FighterService {
    pub fn new(pool: PgPool, cache: Arc<Cache>, access: Arc<Access>) -> Self {
        Self {
            fighter_repo: FighterRepository::new(pool.clone()),
            catalog_repo: CatalogRepository::new(pool.clone()),
            custom_repo: CustomContentRepository::new(pool.clone()),
            equipment_repo: EquipmentRepository::new(pool.clone()),
            effect_repo: EffectRepository::new(pool.clone()),
            skill_repo: SkillRepository::new(pool.clone()),
            vehicle_repo: VehicleRepository::new(pool.clone()),
            rating_repo: RatingRepository::new(pool.clone()),
            pool,
            cache,
            access,
        }
    }

    /// 读取战士并校验调用者对其帮派的权限
    async fn authorize(&self, user_id: Uuid, fighter_id: Uuid) -> Result<Fighter> {
        let fighter = self
            .fighter_repo
            .get_fighter(fighter_id)
            .await?
            .ok_or(MundaError::FighterNotFound(fighter_id))?;
        self.access.ensure_gang_access(user_id, fighter.gang_id).await?;
        Ok(fighter)
    }

    /// 招募战士
    ///
    /// 扣除实付价格，复制类型属性，附带默认装备（价格 0），评分增加基础费用
    #[instrument(skip(self, request), fields(gang_id = %request.gang_id))]
    pub async fn add_fighter(
        &self,
        user_id: Uuid,
        request: AddFighterRequest,
    ) -> Result<AddFighterResult> {
        let name = request.fighter_name.trim();
        if name.is_empty() {
            return Err(MundaError::Validation("战士名称不能为空".to_string()));
        }
        if let Some(cost) = request.cost_override {
            ensure_non_negative(cost, "cost_override")?;
        }
        self.access.ensure_gang_access(user_id, request.gang_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, request.gang_id).await?;

        let template = match request.fighter_type {
            FighterTypeSource::Catalog(id) => {
                let fighter_type = self
                    .catalog_repo
                    .get_fighter_type_with_cost(id, gang.gang_type_id)
                    .await?
                    .ok_or(MundaError::FighterTypeNotFound(id))?;
                FighterTemplate::from_catalog(&fighter_type)
            }
            FighterTypeSource::Custom(id) => {
                let custom = self
                    .custom_repo
                    .get_fighter_type(id)
                    .await?
                    .filter(|c| c.user_id == user_id)
                    .ok_or(MundaError::CustomFighterTypeNotFound(id))?;
                FighterTemplate::from_custom(&custom)
            }
        };

        let paid = request.cost_override.unwrap_or(template.base_credits);
        ensure_credits(&gang, paid)?;

        let fighter = FighterRepository::create_in_tx(&mut tx, gang.id, user_id, name, &template).await?;
        let credits = if paid > 0 {
            GangRepository::adjust_credits_in_tx(&mut tx, gang.id, -paid).await?
        } else {
            gang.credits
        };

        let default_equipment = match template.fighter_type_id {
            Some(type_id) => {
                insert_default_equipment(&mut tx, &self.catalog_repo, &fighter, type_id, user_id)
                    .await?
            }
            None => Vec::new(),
        };

        let rating_delta = RatingDelta::for_fighter(fighter.status(), template.base_credits);
        apply_rating(&mut tx, gang.id, rating_delta, "fighter_added").await?;

        GangLogRepository::create_in_tx(
            &mut tx,
            &NewGangLog::new(
                gang.id,
                user_id,
                GangLogAction::FighterAdded,
                format!(
                    "Added {} ({}) for {} credits",
                    fighter.fighter_name, fighter.fighter_type, paid
                ),
            )
            .with_fighter(fighter.id),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        metrics::record_fighter_added(template.custom_fighter_type_id.is_some());

        info!(
            fighter_id = %fighter.id,
            paid = paid,
            rating_delta = rating_delta.value(),
            "战士招募成功"
        );

        Ok(AddFighterResult {
            fighter,
            paid,
            credits,
            rating_delta,
            default_equipment,
        })
    }

    /// 战士详情
    #[instrument(skip(self))]
    pub async fn get_fighter(&self, fighter_id: Uuid) -> Result<FighterDetail> {
        let fighter = self
            .fighter_repo
            .get_fighter(fighter_id)
            .await?
            .ok_or(MundaError::FighterNotFound(fighter_id))?;

        let breakdown = self
            .rating_repo
            .fighter_cost(fighter_id)
            .await?
            .map(|row| row.breakdown())
            .unwrap_or_default();

        Ok(FighterDetail {
            total_cost: breakdown.total(),
            breakdown,
            equipment: self.equipment_repo.list_for_fighter(fighter_id).await?,
            effects: self.effect_repo.list_for_fighter(fighter_id).await?,
            skills: self.skill_repo.list_for_fighter(fighter_id).await?,
            vehicles: self.vehicle_repo.list_by_fighter(fighter_id).await?,
            exotic_beasts: self.fighter_repo.list_beast_links(fighter_id).await?,
            fighter,
        })
    }

    /// 修改战士字段
    ///
    /// 经验值不能低于 0；费用调整的差值在战士计分时计入评分
    #[instrument(skip(self, changes))]
    pub async fn update_fighter(
        &self,
        user_id: Uuid,
        fighter_id: Uuid,
        changes: FighterChanges,
    ) -> Result<Fighter> {
        if let Some(name) = &changes.fighter_name
            && name.trim().is_empty()
        {
            return Err(MundaError::Validation("战士名称不能为空".to_string()));
        }
        let current = self.authorize(user_id, fighter_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let before = lock_fighter(&mut tx, fighter_id, gang.id).await?;

        if let Some(delta) = changes.xp_delta
            && checked_delta(before.xp, delta, "xp")? < 0
        {
            return Err(MundaError::InsufficientXp {
                required: delta.saturating_neg(),
                available: before.xp,
            });
        }
        let adjustment = match changes.cost_adjustment {
            Some(value) => checked_difference(value, before.cost_adjustment, "cost_adjustment")?,
            None => 0,
        };

        let fighter = FighterRepository::update_fields_in_tx(&mut tx, fighter_id, &changes).await?;

        let rating_delta = RatingDelta::for_fighter(fighter.status(), adjustment);
        apply_rating(&mut tx, gang.id, rating_delta, "cost_adjustment").await?;

        GangLogRepository::create_in_tx(
            &mut tx,
            &NewGangLog::new(
                gang.id,
                user_id,
                GangLogAction::FighterUpdated,
                describe_fighter_changes(&before, &changes),
            )
            .with_fighter(fighter_id),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;

        info!(fighter_id = %fighter_id, rating_delta = rating_delta.value(), "战士更新成功");
        Ok(fighter)
    }

    /// 变更战士状态
    ///
    /// 杀死、退役、卖作奴隶时，该战士拥有的异兽随之变更
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        user_id: Uuid,
        fighter_id: Uuid,
        action: StatusAction,
    ) -> Result<StatusChangeResult> {
        ensure_non_negative(action.credits_gain(), "sell_value")?;
        let current = self.authorize(user_id, fighter_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let fighter = lock_fighter(&mut tx, fighter_id, gang.id).await?;

        let before = fighter.status();
        let after = action.apply(before);
        if before == after {
            return Err(MundaError::Validation(format!(
                "战士当前状态不允许执行 {}",
                action.name()
            )));
        }

        let mut rating_delta = status_transition(&mut tx, fighter_id, before, after).await?;

        let mut affected_beasts = Vec::new();
        if action.applies_to_beasts() {
            for link in FighterRepository::list_beast_links_in_tx(&mut tx, fighter_id).await? {
                let beast = lock_fighter(&mut tx, link.fighter_pet_id, gang.id).await?;
                let beast_before = beast.status();
                let beast_after = action.apply(beast_before);
                if beast_before == beast_after {
                    continue;
                }
                rating_delta +=
                    status_transition(&mut tx, beast.id, beast_before, beast_after).await?;
                affected_beasts.push(beast.id);
            }
        }

        apply_rating(&mut tx, gang.id, rating_delta, "status_change").await?;

        let credits = match action.credits_gain() {
            0 => gang.credits,
            gain => GangRepository::adjust_credits_in_tx(&mut tx, gang.id, gain).await?,
        };

        GangLogRepository::create_in_tx(
            &mut tx,
            &NewGangLog::new(
                gang.id,
                user_id,
                GangLogAction::FighterStatusChanged,
                status_description(&fighter.fighter_name, &action),
            )
            .with_fighter(fighter_id),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;

        info!(
            fighter_id = %fighter_id,
            action = action.name(),
            rating_delta = rating_delta.value(),
            beasts = affected_beasts.len(),
            "战士状态变更成功"
        );

        Ok(StatusChangeResult {
            fighter_id,
            status: after,
            credits,
            rating_delta,
            affected_beasts,
        })
    }

    /// 删除战士
    ///
    /// 异兽一并删除，驾驶的载具变为未分配；装备、效果、技能由外键级联删除
    #[instrument(skip(self))]
    pub async fn delete_fighter(&self, user_id: Uuid, fighter_id: Uuid) -> Result<FighterDeletion> {
        let current = self.authorize(user_id, fighter_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let fighter = lock_fighter(&mut tx, fighter_id, gang.id).await?;

        let mut rating_delta = RatingDelta::ZERO;
        let mut deleted_beasts = Vec::new();
        for link in FighterRepository::list_beast_links_in_tx(&mut tx, fighter_id).await? {
            rating_delta += remove_fighter_in_tx(&mut tx, link.fighter_pet_id).await?;
            deleted_beasts.push(link.fighter_pet_id);
        }

        // 快照包含驾驶载具的费用；解除分配后载具不再计分
        let before = RatingRepository::fighter_cost_in_tx(&mut tx, fighter_id).await?;
        let unassigned_vehicles =
            VehicleRepository::unassign_fighter_in_tx(&mut tx, fighter_id).await?;
        FighterRepository::delete_in_tx(&mut tx, fighter_id).await?;
        rating_delta += RatingDelta::between(before.as_ref(), None);

        apply_rating(&mut tx, gang.id, rating_delta, "fighter_deleted").await?;

        GangLogRepository::create_in_tx(
            &mut tx,
            &NewGangLog::new(
                gang.id,
                user_id,
                GangLogAction::FighterDeleted,
                format!(
                    "Removed {} ({})",
                    fighter.fighter_name, fighter.fighter_type
                ),
            ),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;

        info!(
            fighter_id = %fighter_id,
            beasts = deleted_beasts.len(),
            vehicles = unassigned_vehicles.len(),
            rating_delta = rating_delta.value(),
            "战士已删除"
        );

        Ok(FighterDeletion {
            fighter_id,
            deleted_beasts,
            unassigned_vehicles,
            rating_delta,
        })
    }
}

/// 写入新状态并返回评分变化
async fn status_transition(
    tx: &mut PgConnection,
    fighter_id: Uuid,
    before: FighterStatus,
    after: FighterStatus,
) -> Result<RatingDelta> {
    let total = RatingRepository::fighter_cost_in_tx(tx, fighter_id)
        .await?
        .map(|row| row.total())
        .unwrap_or(0);
    FighterRepository::set_status_in_tx(tx, fighter_id, after).await?;
    Ok(RatingDelta::for_status_change(before, after, total))
}

/// 删除一个战士（异兽删除时使用），返回评分变化
pub(crate) async fn remove_fighter_in_tx(
    tx: &mut PgConnection,
    fighter_id: Uuid,
) -> Result<RatingDelta> {
    let before = RatingRepository::fighter_cost_in_tx(tx, fighter_id).await?;
    VehicleRepository::unassign_fighter_in_tx(tx, fighter_id).await?;
    FighterRepository::delete_in_tx(tx, fighter_id).await?;
    Ok(RatingDelta::between(before.as_ref(), None))
}

/// 写入类型默认装备（价格 0，保留目录价作为原价）
pub(crate) async fn insert_default_equipment(
    tx: &mut PgConnection,
    catalog: &CatalogRepository,
    fighter: &Fighter,
    fighter_type_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<FighterEquipment>> {
    let defaults = catalog.list_default_equipment(fighter_type_id).await?;
    let mut inserted = Vec::with_capacity(defaults.len());
    for equipment in defaults {
        let row = EquipmentRepository::insert_in_tx(
            tx,
            &NewFighterEquipment {
                gang_id: fighter.gang_id,
                holder: EquipmentHolder::Fighter(fighter.id),
                equipment_id: Some(equipment.id),
                custom_equipment_id: None,
                equipment_name: equipment.equipment_name,
                equipment_type: equipment.equipment_type,
                purchase_cost: 0,
                original_cost: equipment.cost,
                user_id,
            },
        )
        .await?;
        inserted.push(row);
    }
    Ok(inserted)
}

fn describe_fighter_changes(before: &Fighter, changes: &FighterChanges) -> String {
    let mut parts = Vec::new();
    if let Some(name) = &changes.fighter_name
        && *name != before.fighter_name
    {
        parts.push(format!("renamed to {}", name));
    }
    if let Some(kills) = changes.kills {
        parts.push(format!("kills {} -> {}", before.kills, kills));
    }
    if let Some(delta) = changes.xp_delta.filter(|d| *d != 0) {
        parts.push(format!("xp {} -> {}", before.xp, before.xp.saturating_add(delta)));
    }
    if let Some(adj) = changes.cost_adjustment {
        parts.push(format!("cost adjustment {} -> {}", before.cost_adjustment, adj));
    }
    if changes.label.is_some() || changes.note.is_some() {
        parts.push("details edited".to_string());
    }

    if parts.is_empty() {
        format!("{} updated", before.fighter_name)
    } else {
        format!("{}: {}", before.fighter_name, parts.join(", "))
    }
}

fn status_description(name: &str, action: &StatusAction) -> String {
    match action {
        StatusAction::Kill => format!("{} was killed", name),
        StatusAction::Resurrect => format!("{} was brought back", name),
        StatusAction::Retire => format!("{} retired", name),
        StatusAction::Unretire => format!("{} returned from retirement", name),
        StatusAction::Enslave { sell_value } => {
            format!("{} sold to the guilders for {} credits", name, sell_value)
        }
        StatusAction::Rescue => format!("{} rescued from slavery", name),
        StatusAction::Capture => format!("{} was captured", name),
        StatusAction::Release => format!("{} released from captivity", name),
        StatusAction::Starve => format!("{} is starving", name),
        StatusAction::Feed => format!("{} was fed", name),
        StatusAction::Recover => format!("{} recovered", name),
        StatusAction::SendToRecovery => format!("{} sent to recovery", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FighterStats;
    use chrono::Utc;

    fn fighter() -> Fighter {
        Fighter {
            id: Uuid::new_v4(),
            gang_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            fighter_name: "Brakk".to_string(),
            label: None,
            fighter_type_id: None,
            custom_fighter_type_id: None,
            fighter_type: "Goliath Bully".to_string(),
            fighter_class: "Ganger".to_string(),
            credits: 65,
            cost_adjustment: 0,
            xp: 4,
            kills: 1,
            stats: FighterStats::default(),
            special_rules: vec![],
            free_skill: false,
            killed: false,
            retired: false,
            enslaved: false,
            starved: false,
            recovery: false,
            captured: false,
            note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_describe_fighter_changes() {
        let before = fighter();
        let changes = FighterChanges {
            kills: Some(3),
            xp_delta: Some(2),
            cost_adjustment: Some(10),
            ..Default::default()
        };
        assert_eq!(
            describe_fighter_changes(&before, &changes),
            "Brakk: kills 1 -> 3, xp 4 -> 6, cost adjustment 0 -> 10"
        );
    }

    #[test]
    fn test_describe_fighter_changes_ignores_same_name() {
        let before = fighter();
        let changes = FighterChanges {
            fighter_name: Some("Brakk".to_string()),
            xp_delta: Some(0),
            ..Default::default()
        };
        assert_eq!(describe_fighter_changes(&before, &changes), "Brakk updated");
    }

    #[test]
    fn test_status_description() {
        assert_eq!(
            status_description("Brakk", &StatusAction::Enslave { sell_value: 40 }),
            "Brakk sold to the guilders for 40 credits"
        );
        assert_eq!(status_description("Brakk", &StatusAction::Kill), "Brakk was killed");
    }
}
