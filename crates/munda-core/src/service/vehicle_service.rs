//! 载具服务
//!
//! 载具费用计入驾驶员；未分配的载具只计入财富。

use std::sync::Arc;

use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

use munda_shared::cache::Cache;

use crate::error::{MundaError, Result};
use crate::models::{GangLogAction, NewEffect, Vehicle, effect_category};
use crate::rating::{FighterCostRow, RatingDelta};
use crate::repository::{
    CatalogRepository, CatalogRepositoryTrait, EffectRepository, GangLogRepository,
    GangRepository, NewGangLog, NewVehicle, RatingRepository, VehicleRepository,
};
use crate::service::access::Access;
use crate::service::dto::{
    AddVehicleRequest, AddVehicleResult, CrewAssignment, RepairResult, VehicleDamageResult,
};
use crate::service::{
    apply_rating, ensure_credits, ensure_non_negative, invalidate_gang_cache, lock_fighter,
    lock_gang, lock_vehicle,
};

async fn crew_snapshot(
    tx: &mut PgConnection,
    crew: Option<Uuid>,
) -> Result<Option<FighterCostRow>> {
    match crew {
        Some(id) => RatingRepository::fighter_cost_in_tx(tx, id).await,
        None => Ok(None),
    }
}

pub struct VehicleService {
    pool: PgPool,
    cache: Arc<Cache>,
    access: Arc<Access>,
    vehicle_repo: VehicleRepository,
    catalog_repo: CatalogRepository,
}

impl VehicleService {
    pub fn new(pool: PgPool, cache: Arc<Cache>, access: Arc<Access>) -> Self {
        Self {
            vehicle_repo: VehicleRepository::new(pool.clone()),
            catalog_repo: CatalogRepository::new(pool.clone()),
            pool,
            cache,
            access,
        }
    }

    async fn authorize(&self, user_id: Uuid, vehicle_id: Uuid) -> Result<Vehicle> {
        let vehicle = self
            .vehicle_repo
            .get_vehicle(vehicle_id)
            .await?
            .ok_or(MundaError::VehicleNotFound(vehicle_id))?;
        self.access.ensure_gang_access(user_id, vehicle.gang_id).await?;
        Ok(vehicle)
    }

    /// 购买载具，新载具未分配驾驶员
    #[instrument(skip(self, request), fields(gang_id = %request.gang_id))]
    pub async fn add_vehicle(
        &self,
        user_id: Uuid,
        request: AddVehicleRequest,
    ) -> Result<AddVehicleResult> {
        let name = request.vehicle_name.trim();
        if name.is_empty() {
            return Err(MundaError::Validation("载具名称不能为空".to_string()));
        }
        if let Some(cost) = request.cost_override {
            ensure_non_negative(cost, "cost_override")?;
        }
        self.access.ensure_gang_access(user_id, request.gang_id).await?;
        let vehicle_type = self
            .catalog_repo
            .get_vehicle_type(request.vehicle_type_id)
            .await?
            .ok_or(MundaError::VehicleTypeNotFound(request.vehicle_type_id))?;

        let cost = request.cost_override.unwrap_or(vehicle_type.cost);
        let paid = if request.buy_for_free { 0 } else { cost };

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, request.gang_id).await?;
        ensure_credits(&gang, paid)?;

        let vehicle = VehicleRepository::create_in_tx(
            &mut tx,
            &NewVehicle {
                gang_id: gang.id,
                user_id,
                vehicle_type_id: Some(vehicle_type.id),
                vehicle_type: vehicle_type.vehicle_type.clone(),
                vehicle_name: name.to_string(),
                cost,
                stats: vehicle_type.stats,
            },
        )
        .await?;

        let credits = if paid > 0 {
            GangRepository::adjust_credits_in_tx(&mut tx, gang.id, -paid).await?
        } else {
            gang.credits
        };

        GangLogRepository::create_in_tx(
            &mut tx,
            &NewGangLog::new(
                gang.id,
                user_id,
                GangLogAction::VehicleAdded,
                format!(
                    "Added {} ({}) for {} credits",
                    vehicle.vehicle_name, vehicle.vehicle_type, paid
                ),
            )
            .with_vehicle(vehicle.id),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        info!(vehicle_id = %vehicle.id, paid = paid, "载具购买成功");

        Ok(AddVehicleResult {
            vehicle,
            paid,
            credits,
        })
    }

    /// 分配或解除驾驶员
    ///
    /// 一个战士最多驾驶一辆载具；评分按载具总费用从旧驾驶员移到新驾驶员
    #[instrument(skip(self))]
    pub async fn assign_crew(
        &self,
        user_id: Uuid,
        vehicle_id: Uuid,
        fighter_id: Option<Uuid>,
    ) -> Result<CrewAssignment> {
        let current = self.authorize(user_id, vehicle_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let vehicle = lock_vehicle(&mut tx, vehicle_id, gang.id).await?;
        let previous_fighter_id = vehicle.fighter_id;

        if previous_fighter_id == fighter_id {
            return Ok(CrewAssignment {
                vehicle,
                previous_fighter_id,
                rating_delta: RatingDelta::ZERO,
            });
        }

        if let Some(new_crew) = fighter_id {
            lock_fighter(&mut tx, new_crew, gang.id).await?;
            if let Some(other) = VehicleRepository::get_by_fighter_in_tx(&mut tx, new_crew).await?
                && other.id != vehicle_id
            {
                return Err(MundaError::Conflict(format!(
                    "战士已驾驶载具 {}",
                    other.vehicle_name
                )));
            }
        }

        let old_before = crew_snapshot(&mut tx, previous_fighter_id).await?;
        let new_before = crew_snapshot(&mut tx, fighter_id).await?;
        VehicleRepository::set_crew_in_tx(&mut tx, vehicle_id, fighter_id).await?;
        let old_after = crew_snapshot(&mut tx, previous_fighter_id).await?;
        let new_after = crew_snapshot(&mut tx, fighter_id).await?;

        let rating_delta = RatingDelta::between(old_before.as_ref(), old_after.as_ref())
            + RatingDelta::between(new_before.as_ref(), new_after.as_ref());
        apply_rating(&mut tx, gang.id, rating_delta, "crew_assigned").await?;

        let description = match fighter_id {
            Some(_) => format!("Assigned new crew to {}", vehicle.vehicle_name),
            None => format!("{} left without crew", vehicle.vehicle_name),
        };
        GangLogRepository::create_in_tx(
            &mut tx,
            &NewGangLog::new(gang.id, user_id, GangLogAction::VehicleUpdated, description)
                .with_vehicle(vehicle_id),
        )
        .await?;

        let vehicle = VehicleRepository::get_for_update(&mut tx, vehicle_id)
            .await?
            .ok_or(MundaError::VehicleNotFound(vehicle_id))?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        info!(
            vehicle_id = %vehicle_id,
            rating_delta = rating_delta.value(),
            "载具驾驶员已变更"
        );

        Ok(CrewAssignment {
            vehicle,
            previous_fighter_id,
            rating_delta,
        })
    }

    #[instrument(skip(self))]
    pub async fn rename_vehicle(
        &self,
        user_id: Uuid,
        vehicle_id: Uuid,
        name: &str,
    ) -> Result<Vehicle> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MundaError::Validation("载具名称不能为空".to_string()));
        }
        let current = self.authorize(user_id, vehicle_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let before = lock_vehicle(&mut tx, vehicle_id, gang.id).await?;
        let vehicle = VehicleRepository::rename_in_tx(&mut tx, vehicle_id, name).await?;

        GangLogRepository::create_in_tx(
            &mut tx,
            &NewGangLog::new(
                gang.id,
                user_id,
                GangLogAction::VehicleUpdated,
                format!("Renamed {} to {}", before.vehicle_name, vehicle.vehicle_name),
            )
            .with_vehicle(vehicle_id),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        Ok(vehicle)
    }

    /// 删除载具；装备与损伤由外键级联删除，不退款
    #[instrument(skip(self))]
    pub async fn delete_vehicle(&self, user_id: Uuid, vehicle_id: Uuid) -> Result<RatingDelta> {
        let current = self.authorize(user_id, vehicle_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let vehicle = lock_vehicle(&mut tx, vehicle_id, gang.id).await?;

        let before = crew_snapshot(&mut tx, vehicle.fighter_id).await?;
        VehicleRepository::delete_in_tx(&mut tx, vehicle_id).await?;
        let after = crew_snapshot(&mut tx, vehicle.fighter_id).await?;
        let rating_delta = RatingDelta::between(before.as_ref(), after.as_ref());
        apply_rating(&mut tx, gang.id, rating_delta, "vehicle_deleted").await?;

        GangLogRepository::create_in_tx(
            &mut tx,
            &NewGangLog::new(
                gang.id,
                user_id,
                GangLogAction::VehicleDeleted,
                format!("Removed {} ({})", vehicle.vehicle_name, vehicle.vehicle_type),
            ),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        info!(vehicle_id = %vehicle_id, rating_delta = rating_delta.value(), "载具已删除");

        Ok(rating_delta)
    }

    /// 添加载具损伤
    #[instrument(skip(self))]
    pub async fn add_damage(
        &self,
        user_id: Uuid,
        vehicle_id: Uuid,
        effect_type_id: Uuid,
    ) -> Result<VehicleDamageResult> {
        let current = self.authorize(user_id, vehicle_id).await?;
        let template = self
            .catalog_repo
            .get_effect_type(effect_type_id)
            .await?
            .ok_or(MundaError::EffectTypeNotFound(effect_type_id))?;
        if template.effect_type.category_name != effect_category::VEHICLE_DAMAGES {
            return Err(MundaError::Validation(format!(
                "效果类型 {} 不是载具损伤",
                template.effect_type.effect_name
            )));
        }

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let vehicle = lock_vehicle(&mut tx, vehicle_id, gang.id).await?;

        let before = crew_snapshot(&mut tx, vehicle.fighter_id).await?;
        let effect = EffectRepository::create_in_tx(
            &mut tx,
            &NewEffect::from_type(&template, None, Some(vehicle_id), user_id),
        )
        .await?;
        let after = crew_snapshot(&mut tx, vehicle.fighter_id).await?;
        let rating_delta = RatingDelta::between(before.as_ref(), after.as_ref());
        apply_rating(&mut tx, gang.id, rating_delta, "vehicle_damaged").await?;

        GangLogRepository::create_in_tx(
            &mut tx,
            &NewGangLog::new(
                gang.id,
                user_id,
                GangLogAction::VehicleUpdated,
                format!(
                    "{} took damage: {}",
                    vehicle.vehicle_name, effect.effect.effect_name
                ),
            )
            .with_vehicle(vehicle_id),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        info!(vehicle_id = %vehicle_id, damage = %effect.effect.effect_name, "载具损伤已添加");

        Ok(VehicleDamageResult {
            effect,
            rating_delta,
        })
    }

    /// 修复损伤，扣除修理费
    #[instrument(skip(self))]
    pub async fn repair_damage(
        &self,
        user_id: Uuid,
        vehicle_id: Uuid,
        effect_id: Uuid,
        repair_cost: i32,
    ) -> Result<RepairResult> {
        ensure_non_negative(repair_cost, "repair_cost")?;
        let current = self.authorize(user_id, vehicle_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let vehicle = lock_vehicle(&mut tx, vehicle_id, gang.id).await?;

        let effect = EffectRepository::get_in_tx(&mut tx, effect_id)
            .await?
            .filter(|e| {
                e.effect.vehicle_id == Some(vehicle_id)
                    && e.effect.category_name == effect_category::VEHICLE_DAMAGES
            })
            .ok_or(MundaError::EffectNotFound(effect_id))?;
        ensure_credits(&gang, repair_cost)?;

        let before = crew_snapshot(&mut tx, vehicle.fighter_id).await?;
        EffectRepository::delete_in_tx(&mut tx, effect_id).await?;
        let after = crew_snapshot(&mut tx, vehicle.fighter_id).await?;
        let rating_delta = RatingDelta::between(before.as_ref(), after.as_ref());
        apply_rating(&mut tx, gang.id, rating_delta, "vehicle_repaired").await?;

        let credits = if repair_cost > 0 {
            GangRepository::adjust_credits_in_tx(&mut tx, gang.id, -repair_cost).await?
        } else {
            gang.credits
        };

        GangLogRepository::create_in_tx(
            &mut tx,
            &NewGangLog::new(
                gang.id,
                user_id,
                GangLogAction::VehicleUpdated,
                format!(
                    "Repaired {} on {} for {} credits",
                    effect.effect.effect_name, vehicle.vehicle_name, repair_cost
                ),
            )
            .with_vehicle(vehicle_id),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        info!(vehicle_id = %vehicle_id, repair_cost = repair_cost, "载具已修复");

        Ok(RepairResult {
            effect_id,
            repair_cost,
            credits,
            rating_delta,
        })
    }
}
