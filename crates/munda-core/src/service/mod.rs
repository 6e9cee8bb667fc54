//! 服务层
//!
//! 实现帮派管理业务逻辑，协调仓储层和缓存层。
//!
//! ## 写操作约定
//!
//! 1. 事务外完成权限判定
//! 2. 开启事务，`FOR UPDATE` 锁定帮派行，再锁定要修改的实体
//! 3. 写入业务数据、评分增量、帮派日志
//! 4. 提交后失效缓存，失败只记录警告
//!
//! ## 模块结构
//!
//! - `dto`: 服务入参与返回值
//! - `access`: 权限判定
//! - `valuation_service`: 费用与估值读取
//! - 其余按业务对象划分

pub mod access;
pub mod advancement_service;
pub mod campaign_service;
pub mod catalog_service;
pub mod custom_service;
pub mod dto;
pub mod equipment_service;
pub mod fighter_service;
pub mod gang_service;
pub mod injury_service;
pub mod valuation_service;
pub mod vehicle_service;

pub use access::{Access, AccessControl};
pub use advancement_service::{AdvancementService, characteristic_cost};
pub use campaign_service::CampaignService;
pub use catalog_service::CatalogService;
pub use custom_service::CustomContentService;
pub use dto::*;
pub use equipment_service::EquipmentService;
pub use fighter_service::FighterService;
pub use gang_service::GangService;
pub use injury_service::InjuryService;
pub use valuation_service::ValuationService;
pub use vehicle_service::VehicleService;

use std::future::Future;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use sqlx::{PgConnection, PgPool};
use tracing::warn;
use uuid::Uuid;

use munda_shared::cache::{Cache, CacheKey};
use munda_shared::observability::metrics;

use crate::error::{MundaError, Result};
use crate::models::{EquipmentHolder, Fighter, Gang, Vehicle};
use crate::rating::RatingDelta;
use crate::repository::{
    CampaignRepository, FighterRepository, GangRepository, RatingRepository, VehicleRepository,
};

/// 锁定帮派行
pub(crate) async fn lock_gang(tx: &mut PgConnection, gang_id: Uuid) -> Result<Gang> {
    GangRepository::get_for_update(tx, gang_id)
        .await?
        .ok_or(MundaError::GangNotFound(gang_id))
}

/// 锁定战士行，并确认其属于该帮派
pub(crate) async fn lock_fighter(
    tx: &mut PgConnection,
    fighter_id: Uuid,
    gang_id: Uuid,
) -> Result<Fighter> {
    FighterRepository::get_for_update(tx, fighter_id)
        .await?
        .filter(|f| f.gang_id == gang_id)
        .ok_or(MundaError::FighterNotFound(fighter_id))
}

/// 锁定载具行，并确认其属于该帮派
pub(crate) async fn lock_vehicle(
    tx: &mut PgConnection,
    vehicle_id: Uuid,
    gang_id: Uuid,
) -> Result<Vehicle> {
    VehicleRepository::get_for_update(tx, vehicle_id)
        .await?
        .filter(|v| v.gang_id == gang_id)
        .ok_or(MundaError::VehicleNotFound(vehicle_id))
}

/// 余额检查
pub(crate) fn ensure_credits(gang: &Gang, required: i32) -> Result<()> {
    if gang.credits < required {
        return Err(MundaError::InsufficientCredits {
            required,
            available: gang.credits,
        });
    }
    Ok(())
}

/// 价格不能为负
pub(crate) fn ensure_non_negative(value: i32, field: &str) -> Result<()> {
    if value < 0 {
        return Err(MundaError::Validation(format!("{} 不能为负数", field)));
    }
    Ok(())
}

/// 在当前值上加增量，溢出时返回校验错误
pub(crate) fn checked_delta(current: i32, delta: i32, field: &str) -> Result<i32> {
    current
        .checked_add(delta)
        .ok_or_else(|| MundaError::Validation(format!("{} 超出取值范围", field)))
}

/// 两个值之差，溢出时返回校验错误
pub(crate) fn checked_difference(after: i32, before: i32, field: &str) -> Result<i32> {
    after
        .checked_sub(before)
        .ok_or_else(|| MundaError::Validation(format!("{} 超出取值范围", field)))
}

/// 写入评分增量并记录指标
pub(crate) async fn apply_rating(
    tx: &mut PgConnection,
    gang_id: Uuid,
    delta: RatingDelta,
    reason: &str,
) -> Result<()> {
    if RatingRepository::apply_rating_delta_in_tx(tx, gang_id, delta).await? {
        metrics::record_rating_adjustment(reason);
    }
    Ok(())
}

/// 费用计入哪个战士
///
/// 战士持有计入自身；载具持有计入载具的驾驶员；仓库不计入任何人
pub(crate) async fn rating_contributor(
    tx: &mut PgConnection,
    holder: EquipmentHolder,
) -> Result<Option<Uuid>> {
    match holder {
        EquipmentHolder::Fighter(id) => Ok(Some(id)),
        EquipmentHolder::Vehicle(id) => Ok(VehicleRepository::get_for_update(tx, id)
            .await?
            .and_then(|v| v.fighter_id)),
        EquipmentHolder::Stash => Ok(None),
    }
}

/// 缓存优先读取
///
/// 缓存读写失败只记录警告，回落到数据源
pub(crate) async fn cached_or_fetch<T, F, Fut>(
    cache: &Cache,
    key: &str,
    ttl: Duration,
    fetch: F,
) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match cache.get::<T>(key).await {
        Ok(Some(cached)) => return Ok(cached),
        Ok(None) => {}
        Err(e) => {
            warn!(key = %key, error = %e, "Cache get failed, falling back to database");
        }
    }

    let data = fetch().await?;

    if let Err(e) = cache.set(key, &data, ttl).await {
        warn!(key = %key, error = %e, "Cache set failed");
    }

    Ok(data)
}

/// 帮派写操作后需要失效的缓存键
///
/// 帮派参加战役时，战役详情里的帮派评分也随之过期
fn gang_cache_keys(gang_id: Uuid, owner_id: Uuid, campaign_id: Option<Uuid>) -> Vec<String> {
    let mut keys = vec![
        CacheKey::gang_detail(&gang_id.to_string()),
        CacheKey::user_gangs(&owner_id.to_string()),
    ];
    if let Some(campaign_id) = campaign_id {
        keys.push(CacheKey::campaign_detail(&campaign_id.to_string()));
    }
    keys
}

async fn find_gang_campaign(pool: &PgPool, gang_id: Uuid) -> Result<Option<Uuid>> {
    let mut conn = pool.acquire().await?;
    let row = CampaignRepository::find_gang_campaign_in_tx(&mut conn, gang_id).await?;
    Ok(row.map(|(_, campaign_id)| campaign_id))
}

/// 失效帮派相关缓存（尽力而为）
pub(crate) async fn invalidate_gang_cache(
    cache: &Cache,
    pool: &PgPool,
    gang_id: Uuid,
    owner_id: Uuid,
) {
    let campaign_id = match find_gang_campaign(pool, gang_id).await {
        Ok(campaign_id) => campaign_id,
        Err(e) => {
            warn!(gang_id = %gang_id, error = %e, "Failed to look up gang campaign");
            None
        }
    };

    for key in gang_cache_keys(gang_id, owner_id, campaign_id) {
        if let Err(e) = cache.delete(&key).await {
            warn!(key = %key, error = %e, "Failed to invalidate gang cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Alignment;
    use chrono::Utc;

    fn gang(credits: i32) -> Gang {
        Gang {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Goliath Bruisers".to_string(),
            gang_type_id: Uuid::new_v4(),
            alignment: Alignment::Outlaw,
            credits,
            rating: 0,
            reputation: 0,
            meat: 0,
            scavenging_rolls: 0,
            exploration_points: 0,
            note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_ensure_credits() {
        assert!(ensure_credits(&gang(100), 100).is_ok());
        let err = ensure_credits(&gang(40), 65).unwrap_err();
        assert!(matches!(
            err,
            MundaError::InsufficientCredits {
                required: 65,
                available: 40
            }
        ));
    }

    #[test]
    fn test_ensure_non_negative() {
        assert!(ensure_non_negative(0, "cost").is_ok());
        assert!(matches!(
            ensure_non_negative(-1, "cost"),
            Err(MundaError::Validation(_))
        ));
    }

    #[test]
    fn test_checked_delta_rejects_overflow() {
        assert_eq!(checked_delta(100, -40, "credits").unwrap(), 60);
        assert!(matches!(
            checked_delta(i32::MAX, 1, "credits"),
            Err(MundaError::Validation(_))
        ));
        assert!(matches!(
            checked_delta(i32::MIN, -1, "xp"),
            Err(MundaError::Validation(_))
        ));
    }

    #[test]
    fn test_checked_difference_rejects_overflow() {
        assert_eq!(checked_difference(30, -10, "cost_adjustment").unwrap(), 40);
        assert!(matches!(
            checked_difference(i32::MAX, -1, "cost_adjustment"),
            Err(MundaError::Validation(_))
        ));
    }

    #[test]
    fn test_gang_cache_keys_include_campaign_detail() {
        let gang_id = Uuid::new_v4();
        let owner_id = Uuid::new_v4();
        let campaign_id = Uuid::new_v4();

        let keys = gang_cache_keys(gang_id, owner_id, None);
        assert_eq!(
            keys,
            vec![
                CacheKey::gang_detail(&gang_id.to_string()),
                CacheKey::user_gangs(&owner_id.to_string()),
            ]
        );

        let keys = gang_cache_keys(gang_id, owner_id, Some(campaign_id));
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&CacheKey::campaign_detail(&campaign_id.to_string())));
    }
}
