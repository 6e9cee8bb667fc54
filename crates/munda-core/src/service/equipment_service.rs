//! 装备服务
//!
//! 交易所购买、出售、删除，以及仓库移入移出。
//!
//! 评分通过"费用计入者"的前后快照计算：战士持有计入自身，载具持有计入驾驶员，
//! 仓库不计入。异兽随装备创建和删除，其评分单独累加。

use std::sync::Arc;

use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

use munda_shared::cache::Cache;
use munda_shared::observability::metrics;

use crate::error::{MundaError, Result};
use crate::models::{
    CustomEquipment, EffectTypeWithModifiers, EffectWithModifiers, Equipment, EquipmentHolder,
    EquipmentSource, EquipmentType, FighterEquipment, FighterTemplate, Gang, GangLogAction,
    NewEffect, TradingPostItem,
};
use crate::rating::{FighterCostRow, RatingDelta};
use crate::repository::{
    CatalogRepository, CatalogRepositoryTrait, CustomContentRepository, EffectRepository,
    EquipmentRepository, FighterRepository, GangLogRepository, GangRepository,
    NewFighterEquipment, NewGangLog, RatingRepository,
};
use crate::service::access::Access;
use crate::service::dto::{BuyEquipmentRequest, PurchaseResult, SaleResult, StashMoveResult};
use crate::service::fighter_service::{insert_default_equipment, remove_fighter_in_tx};
use crate::service::{
    apply_rating, ensure_credits, ensure_non_negative, invalidate_gang_cache, lock_fighter,
    lock_gang, lock_vehicle, rating_contributor,
};

/// 待购买的物品（目录或自定义归一后）
struct ResolvedItem {
    equipment_id: Option<Uuid>,
    custom_equipment_id: Option<Uuid>,
    equipment_name: String,
    equipment_type: EquipmentType,
    cost: i32,
    grants_fighter_type_id: Option<Uuid>,
}

pub struct EquipmentService {
    pool: PgPool,
    cache: Arc<Cache>,
    access: Arc<Access>,
    equipment_repo: EquipmentRepository,
    catalog_repo: CatalogRepository,
    custom_repo: CustomContentRepository,
}

impl EquipmentService {
    pub fn new(pool: PgPool, cache: Arc<Cache>, access: Arc<Access>) -> Self {
        Self {
            equipment_repo: EquipmentRepository::new(pool.clone()),
            catalog_repo: CatalogRepository::new(pool.clone()),
            custom_repo: CustomContentRepository::new(pool.clone()),
            pool,
            cache,
            access,
        }
    }

    async fn resolve_item(&self, user_id: Uuid, source: EquipmentSource) -> Result<ResolvedItem> {
        match source {
            EquipmentSource::Catalog(id) => {
                let e = self
                    .catalog_repo
                    .get_equipment(id)
                    .await?
                    .ok_or(MundaError::EquipmentNotFound(id))?;
                Ok(ResolvedItem {
                    equipment_id: Some(e.id),
                    custom_equipment_id: None,
                    equipment_name: e.equipment_name,
                    equipment_type: e.equipment_type,
                    cost: e.cost,
                    grants_fighter_type_id: e.grants_fighter_type_id,
                })
            }
            EquipmentSource::Custom(id) => {
                let e = self
                    .custom_repo
                    .get_equipment(id)
                    .await?
                    .filter(|e| e.user_id == user_id)
                    .ok_or(MundaError::CustomEquipmentNotFound(id))?;
                Ok(ResolvedItem {
                    equipment_id: None,
                    custom_equipment_id: Some(e.id),
                    equipment_name: e.equipment_name,
                    equipment_type: e.equipment_type,
                    cost: e.cost,
                    grants_fighter_type_id: None,
                })
            }
        }
    }

    /// 读取已购装备并校验调用者对其帮派的权限
    async fn authorize(&self, user_id: Uuid, fighter_equipment_id: Uuid) -> Result<FighterEquipment> {
        let item = self
            .equipment_repo
            .get_owned(fighter_equipment_id)
            .await?
            .ok_or(MundaError::FighterEquipmentNotFound(fighter_equipment_id))?;
        self.access.ensure_gang_access(user_id, item.gang_id).await?;
        Ok(item)
    }

    /// 购买装备
    #[instrument(skip(self, request), fields(gang_id = %request.gang_id))]
    pub async fn buy_equipment(
        &self,
        user_id: Uuid,
        request: BuyEquipmentRequest,
    ) -> Result<PurchaseResult> {
        if let Some(cost) = request.manual_cost {
            ensure_non_negative(cost, "manual_cost")?;
        }
        self.access.ensure_gang_access(user_id, request.gang_id).await?;
        let item = self.resolve_item(user_id, request.item).await?;

        if item.grants_fighter_type_id.is_some()
            && !matches!(request.target, EquipmentHolder::Fighter(_))
        {
            return Err(MundaError::Validation(
                "生成异兽的装备只能由战士购买".to_string(),
            ));
        }

        let granted = match item.equipment_id {
            Some(id) if request.target != EquipmentHolder::Stash => {
                self.catalog_repo.list_granted_effect_types(id).await?
            }
            _ => Vec::new(),
        };
        let beast_type = match item.grants_fighter_type_id {
            Some(type_id) => Some(
                self.catalog_repo
                    .get_fighter_type(type_id)
                    .await?
                    .ok_or(MundaError::FighterTypeNotFound(type_id))?,
            ),
            None => None,
        };

        let price = request.manual_cost.unwrap_or(item.cost);

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, request.gang_id).await?;
        lock_holder(&mut tx, request.target, gang.id).await?;

        if !request.buy_for_free {
            ensure_credits(&gang, price)?;
        }

        let contributor = rating_contributor(&mut tx, request.target).await?;
        let before = snapshot(&mut tx, contributor).await?;

        let owned = EquipmentRepository::insert_in_tx(
            &mut tx,
            &NewFighterEquipment {
                gang_id: gang.id,
                holder: request.target,
                equipment_id: item.equipment_id,
                custom_equipment_id: item.custom_equipment_id,
                equipment_name: item.equipment_name.clone(),
                equipment_type: item.equipment_type,
                purchase_cost: price,
                original_cost: item.cost,
                user_id,
            },
        )
        .await?;

        let credits = if request.buy_for_free || price == 0 {
            gang.credits
        } else {
            GangRepository::adjust_credits_in_tx(&mut tx, gang.id, -price).await?
        };

        let effects = create_granted_effects(&mut tx, &granted, &owned, user_id).await?;

        let mut exotic_beasts = Vec::new();
        if let (Some(beast_type), EquipmentHolder::Fighter(owner_id)) = (&beast_type, request.target)
        {
            let beast = FighterRepository::create_in_tx(
                &mut tx,
                gang.id,
                user_id,
                &beast_type.fighter_type,
                &FighterTemplate::exotic_beast(beast_type),
            )
            .await?;
            FighterRepository::create_beast_link_in_tx(&mut tx, owner_id, beast.id, owned.id)
                .await?;
            insert_default_equipment(&mut tx, &self.catalog_repo, &beast, beast_type.id, user_id)
                .await?;
            exotic_beasts.push(beast);
        }

        let after = snapshot(&mut tx, contributor).await?;
        let mut rating_delta = RatingDelta::between(before.as_ref(), after.as_ref());
        for beast in &exotic_beasts {
            let row = RatingRepository::fighter_cost_in_tx(&mut tx, beast.id).await?;
            rating_delta += RatingDelta::between(None, row.as_ref());
        }
        apply_rating(&mut tx, gang.id, rating_delta, "equipment_bought").await?;

        GangLogRepository::create_in_tx(
            &mut tx,
            &with_holder(
                NewGangLog::new(
                    gang.id,
                    user_id,
                    GangLogAction::EquipmentBought,
                    purchase_description(&owned, request.buy_for_free),
                ),
                request.target,
            ),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        metrics::record_equipment_transaction("buy");

        info!(
            fighter_equipment_id = %owned.id,
            price = price,
            free = request.buy_for_free,
            rating_delta = rating_delta.value(),
            beasts = exotic_beasts.len(),
            "装备购买成功"
        );

        Ok(PurchaseResult {
            fighter_equipment: owned,
            credits,
            rating_delta,
            effects,
            exotic_beasts,
        })
    }

    /// 出售装备，退款为手动价格或购买价
    #[instrument(skip(self))]
    pub async fn sell_equipment(
        &self,
        user_id: Uuid,
        fighter_equipment_id: Uuid,
        manual_price: Option<i32>,
    ) -> Result<SaleResult> {
        if let Some(price) = manual_price {
            ensure_non_negative(price, "manual_price")?;
        }
        self.remove(user_id, fighter_equipment_id, Removal::Sell(manual_price))
            .await
    }

    /// 删除装备，不退款
    #[instrument(skip(self))]
    pub async fn delete_equipment(
        &self,
        user_id: Uuid,
        fighter_equipment_id: Uuid,
    ) -> Result<SaleResult> {
        self.remove(user_id, fighter_equipment_id, Removal::Delete)
            .await
    }

    async fn remove(
        &self,
        user_id: Uuid,
        fighter_equipment_id: Uuid,
        removal: Removal,
    ) -> Result<SaleResult> {
        let current = self.authorize(user_id, fighter_equipment_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let owned = lock_owned(&mut tx, fighter_equipment_id, &gang).await?;

        let contributor = rating_contributor(&mut tx, owned.holder()).await?;
        let before = snapshot(&mut tx, contributor).await?;

        let mut rating_delta = RatingDelta::ZERO;
        let removed_beasts =
            FighterRepository::list_beasts_for_equipment_in_tx(&mut tx, owned.id).await?;
        for beast_id in &removed_beasts {
            rating_delta += remove_fighter_in_tx(&mut tx, *beast_id).await?;
        }

        EffectRepository::delete_for_equipment_in_tx(&mut tx, owned.id).await?;
        EquipmentRepository::delete_in_tx(&mut tx, owned.id).await?;

        let after = snapshot(&mut tx, contributor).await?;
        rating_delta += RatingDelta::between(before.as_ref(), after.as_ref());
        apply_rating(&mut tx, gang.id, rating_delta, removal.metric()).await?;

        let refund = match removal {
            Removal::Sell(manual) => manual.unwrap_or(owned.purchase_cost),
            Removal::Delete => 0,
        };
        let credits = if refund > 0 {
            GangRepository::adjust_credits_in_tx(&mut tx, gang.id, refund).await?
        } else {
            gang.credits
        };

        let (action, description) = match removal {
            Removal::Sell(_) => (
                GangLogAction::EquipmentSold,
                format!("Sold {} for {} credits", owned.equipment_name, refund),
            ),
            Removal::Delete => (
                GangLogAction::EquipmentDeleted,
                format!("Removed {}", owned.equipment_name),
            ),
        };
        GangLogRepository::create_in_tx(
            &mut tx,
            &with_holder(
                NewGangLog::new(gang.id, user_id, action, description),
                owned.holder(),
            ),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        metrics::record_equipment_transaction(removal.metric());

        info!(
            fighter_equipment_id = %owned.id,
            refund = refund,
            rating_delta = rating_delta.value(),
            beasts = removed_beasts.len(),
            "装备已移除"
        );

        Ok(SaleResult {
            fighter_equipment_id: owned.id,
            refund,
            credits,
            rating_delta,
            removed_beasts,
        })
    }

    /// 移入仓库
    ///
    /// 附带效果被删除；生成异兽的装备不能移入仓库
    #[instrument(skip(self))]
    pub async fn move_to_stash(
        &self,
        user_id: Uuid,
        fighter_equipment_id: Uuid,
    ) -> Result<StashMoveResult> {
        let current = self.authorize(user_id, fighter_equipment_id).await?;
        if let Some(equipment_id) = current.equipment_id
            && let Some(equipment) = self.catalog_repo.get_equipment(equipment_id).await?
            && equipment.grants_fighter_type_id.is_some()
        {
            return Err(MundaError::Validation(
                "生成异兽的装备不能移入仓库".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let owned = lock_owned(&mut tx, fighter_equipment_id, &gang).await?;

        if owned.holder() == EquipmentHolder::Stash {
            return Err(MundaError::Validation("装备已在仓库中".to_string()));
        }
        if !FighterRepository::list_beasts_for_equipment_in_tx(&mut tx, owned.id)
            .await?
            .is_empty()
        {
            return Err(MundaError::Validation(
                "生成异兽的装备不能移入仓库".to_string(),
            ));
        }

        let from = owned.holder();
        let contributor = rating_contributor(&mut tx, from).await?;
        let before = snapshot(&mut tx, contributor).await?;

        EffectRepository::delete_for_equipment_in_tx(&mut tx, owned.id).await?;
        let moved = EquipmentRepository::move_in_tx(&mut tx, owned.id, EquipmentHolder::Stash).await?;

        let after = snapshot(&mut tx, contributor).await?;
        let rating_delta = RatingDelta::between(before.as_ref(), after.as_ref());
        apply_rating(&mut tx, gang.id, rating_delta, "equipment_stashed").await?;

        GangLogRepository::create_in_tx(
            &mut tx,
            &with_holder(
                NewGangLog::new(
                    gang.id,
                    user_id,
                    GangLogAction::EquipmentMoved,
                    format!("Moved {} to the stash", moved.equipment_name),
                ),
                from,
            ),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        metrics::record_equipment_transaction("stash");

        info!(fighter_equipment_id = %moved.id, rating_delta = rating_delta.value(), "装备移入仓库");

        Ok(StashMoveResult {
            fighter_equipment: moved,
            rating_delta,
            effects: Vec::new(),
        })
    }

    /// 从仓库取出，交给战士或载具，并重建附带效果
    #[instrument(skip(self))]
    pub async fn move_from_stash(
        &self,
        user_id: Uuid,
        stash_item_id: Uuid,
        target: EquipmentHolder,
    ) -> Result<StashMoveResult> {
        if target == EquipmentHolder::Stash {
            return Err(MundaError::Validation(
                "目标必须是战士或载具".to_string(),
            ));
        }
        let current = self.authorize(user_id, stash_item_id).await?;
        let granted = match current.equipment_id {
            Some(id) => self.catalog_repo.list_granted_effect_types(id).await?,
            None => Vec::new(),
        };

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let owned = lock_owned(&mut tx, stash_item_id, &gang).await?;
        if owned.holder() != EquipmentHolder::Stash {
            return Err(MundaError::Validation("装备不在仓库中".to_string()));
        }
        lock_holder(&mut tx, target, gang.id).await?;

        let contributor = rating_contributor(&mut tx, target).await?;
        let before = snapshot(&mut tx, contributor).await?;

        let moved = EquipmentRepository::move_in_tx(&mut tx, owned.id, target).await?;
        let effects = create_granted_effects(&mut tx, &granted, &moved, user_id).await?;

        let after = snapshot(&mut tx, contributor).await?;
        let rating_delta = RatingDelta::between(before.as_ref(), after.as_ref());
        apply_rating(&mut tx, gang.id, rating_delta, "equipment_unstashed").await?;

        GangLogRepository::create_in_tx(
            &mut tx,
            &with_holder(
                NewGangLog::new(
                    gang.id,
                    user_id,
                    GangLogAction::EquipmentMoved,
                    format!("Took {} from the stash", moved.equipment_name),
                ),
                target,
            ),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        metrics::record_equipment_transaction("unstash");

        info!(fighter_equipment_id = %moved.id, rating_delta = rating_delta.value(), "装备移出仓库");

        Ok(StashMoveResult {
            fighter_equipment: moved,
            rating_delta,
            effects,
        })
    }

    /// 交易所列表：目录装备加调用者的自定义装备
    #[instrument(skip(self))]
    pub async fn catalogue(
        &self,
        user_id: Uuid,
        category: Option<String>,
    ) -> Result<Vec<TradingPostItem>> {
        let catalog = self.catalog_repo.list_equipment(category.clone()).await?;
        let custom = self.custom_repo.list_equipment(user_id).await?;
        Ok(merge_trading_post(catalog, custom, category.as_deref()))
    }
}

#[derive(Debug, Clone, Copy)]
enum Removal {
    Sell(Option<i32>),
    Delete,
}

impl Removal {
    fn metric(&self) -> &'static str {
        match self {
            Self::Sell(_) => "sell",
            Self::Delete => "delete",
        }
    }
}

/// 锁定已购装备，并确认其属于该帮派
async fn lock_owned(tx: &mut PgConnection, id: Uuid, gang: &Gang) -> Result<FighterEquipment> {
    EquipmentRepository::get_owned_for_update(tx, id)
        .await?
        .filter(|e| e.gang_id == gang.id)
        .ok_or(MundaError::FighterEquipmentNotFound(id))
}

/// 锁定目标持有者，并确认其属于该帮派
async fn lock_holder(tx: &mut PgConnection, holder: EquipmentHolder, gang_id: Uuid) -> Result<()> {
    match holder {
        EquipmentHolder::Fighter(id) => {
            lock_fighter(tx, id, gang_id).await?;
        }
        EquipmentHolder::Vehicle(id) => {
            lock_vehicle(tx, id, gang_id).await?;
        }
        EquipmentHolder::Stash => {}
    }
    Ok(())
}

async fn snapshot(
    tx: &mut PgConnection,
    contributor: Option<Uuid>,
) -> Result<Option<FighterCostRow>> {
    match contributor {
        Some(id) => RatingRepository::fighter_cost_in_tx(tx, id).await,
        None => Ok(None),
    }
}

/// 在战士或载具身上创建装备附带的效果
async fn create_granted_effects(
    tx: &mut PgConnection,
    granted: &[EffectTypeWithModifiers],
    owned: &FighterEquipment,
    user_id: Uuid,
) -> Result<Vec<EffectWithModifiers>> {
    let (fighter_id, vehicle_id) = match owned.holder() {
        EquipmentHolder::Fighter(id) => (Some(id), None),
        EquipmentHolder::Vehicle(id) => (None, Some(id)),
        EquipmentHolder::Stash => return Ok(Vec::new()),
    };

    let mut effects = Vec::with_capacity(granted.len());
    for template in granted {
        let mut new_effect = NewEffect::from_type(template, fighter_id, vehicle_id, user_id);
        new_effect.fighter_equipment_id = Some(owned.id);
        effects.push(EffectRepository::create_in_tx(tx, &new_effect).await?);
    }
    Ok(effects)
}

fn with_holder(log: NewGangLog, holder: EquipmentHolder) -> NewGangLog {
    match holder {
        EquipmentHolder::Fighter(id) => log.with_fighter(id),
        EquipmentHolder::Vehicle(id) => log.with_vehicle(id),
        EquipmentHolder::Stash => log,
    }
}

fn purchase_description(owned: &FighterEquipment, free: bool) -> String {
    let target = match owned.holder() {
        EquipmentHolder::Fighter(_) => "fighter",
        EquipmentHolder::Vehicle(_) => "vehicle",
        EquipmentHolder::Stash => "stash",
    };
    if free {
        format!("Added {} to {} for free", owned.equipment_name, target)
    } else {
        format!(
            "Bought {} for {} credits ({})",
            owned.equipment_name, owned.purchase_cost, target
        )
    }
}

/// 合并目录与自定义装备，按分类过滤并按名称排序
fn merge_trading_post(
    catalog: Vec<Equipment>,
    custom: Vec<CustomEquipment>,
    category: Option<&str>,
) -> Vec<TradingPostItem> {
    let mut items: Vec<TradingPostItem> = catalog
        .into_iter()
        .map(TradingPostItem::from)
        .chain(
            custom
                .into_iter()
                .filter(|c| category.is_none_or(|cat| c.equipment_category == cat))
                .map(TradingPostItem::from),
        )
        .collect();
    items.sort_by(|a, b| a.equipment_name.cmp(&b.equipment_name));
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn owned(holder: EquipmentHolder, cost: i32) -> FighterEquipment {
        let (fighter_id, vehicle_id) = match holder {
            EquipmentHolder::Fighter(id) => (Some(id), None),
            EquipmentHolder::Vehicle(id) => (None, Some(id)),
            EquipmentHolder::Stash => (None, None),
        };
        FighterEquipment {
            id: Uuid::new_v4(),
            gang_id: Uuid::new_v4(),
            fighter_id,
            vehicle_id,
            gang_stash: holder == EquipmentHolder::Stash,
            equipment_id: None,
            custom_equipment_id: None,
            equipment_name: "Autogun".to_string(),
            equipment_type: EquipmentType::Weapon,
            purchase_cost: cost,
            original_cost: 15,
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_purchase_description() {
        let item = owned(EquipmentHolder::Fighter(Uuid::new_v4()), 15);
        assert_eq!(
            purchase_description(&item, false),
            "Bought Autogun for 15 credits (fighter)"
        );
        let stash = owned(EquipmentHolder::Stash, 0);
        assert_eq!(purchase_description(&stash, true), "Added Autogun to stash for free");
    }

    #[test]
    fn test_with_holder() {
        let fighter = Uuid::new_v4();
        let log = NewGangLog::new(Uuid::new_v4(), Uuid::new_v4(), GangLogAction::EquipmentBought, "x");
        assert_eq!(
            with_holder(log.clone(), EquipmentHolder::Fighter(fighter)).fighter_id,
            Some(fighter)
        );
        let stash = with_holder(log, EquipmentHolder::Stash);
        assert!(stash.fighter_id.is_none() && stash.vehicle_id.is_none());
    }

    #[test]
    fn test_removal_metric() {
        assert_eq!(Removal::Sell(None).metric(), "sell");
        assert_eq!(Removal::Delete.metric(), "delete");
    }

    #[test]
    fn test_merge_trading_post_filters_custom_by_category() {
        let catalog = vec![Equipment {
            id: Uuid::new_v4(),
            equipment_name: "Lasgun".to_string(),
            trading_post_category: None,
            equipment_category: "Basic Weapons".to_string(),
            equipment_type: EquipmentType::Weapon,
            availability: Some("C".to_string()),
            cost: 15,
            grants_fighter_type_id: None,
        }];
        let custom = |name: &str, category: &str| CustomEquipment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            equipment_name: name.to_string(),
            trading_post_category: None,
            equipment_category: category.to_string(),
            equipment_type: EquipmentType::Weapon,
            availability: None,
            cost: 10,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let items = merge_trading_post(
            catalog.clone(),
            vec![custom("Axe", "Basic Weapons"), custom("Drone", "Wargear")],
            Some("Basic Weapons"),
        );
        let names: Vec<_> = items.iter().map(|i| i.equipment_name.as_str()).collect();
        assert_eq!(names, vec!["Axe", "Lasgun"]);
        assert!(items[0].is_custom);

        let all = merge_trading_post(catalog, vec![custom("Drone", "Wargear")], None);
        assert_eq!(all.len(), 2);
    }
}
