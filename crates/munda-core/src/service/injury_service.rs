//! 伤病服务

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use munda_shared::cache::Cache;

use crate::error::{MundaError, Result};
use crate::models::{EffectData, Fighter, GangLogAction, NewEffect, effect_category};
use crate::rating::{FighterStatus, RatingDelta};
use crate::repository::{
    CatalogRepository, CatalogRepositoryTrait, EffectRepository, FighterRepository,
    FighterRepositoryTrait, GangLogRepository, NewGangLog, RatingRepository,
};
use crate::service::access::Access;
use crate::service::dto::InjuryResult;
use crate::service::{apply_rating, invalidate_gang_cache, lock_fighter, lock_gang};

/// 伤病附带的状态标记叠加到当前状态上
fn status_after_injury(before: FighterStatus, data: &EffectData<'_>, send_to_recovery: bool) -> FighterStatus {
    FighterStatus {
        recovery: before.recovery || data.recovery() || send_to_recovery,
        captured: before.captured || data.captured(),
        ..before
    }
}

pub struct InjuryService {
    pool: PgPool,
    cache: Arc<Cache>,
    access: Arc<Access>,
    fighter_repo: FighterRepository,
    catalog_repo: CatalogRepository,
}

impl InjuryService {
    pub fn new(pool: PgPool, cache: Arc<Cache>, access: Arc<Access>) -> Self {
        Self {
            fighter_repo: FighterRepository::new(pool.clone()),
            catalog_repo: CatalogRepository::new(pool.clone()),
            pool,
            cache,
            access,
        }
    }

    async fn authorize(&self, user_id: Uuid, fighter_id: Uuid) -> Result<Fighter> {
        let fighter = self
            .fighter_repo
            .get_fighter(fighter_id)
            .await?
            .ok_or(MundaError::FighterNotFound(fighter_id))?;
        self.access.ensure_gang_access(user_id, fighter.gang_id).await?;
        Ok(fighter)
    }

    /// 添加伤病
    ///
    /// 复制效果类型及其修正；`recovery`/`captured` 标记写入战士状态
    #[instrument(skip(self))]
    pub async fn add_injury(
        &self,
        user_id: Uuid,
        fighter_id: Uuid,
        effect_type_id: Uuid,
        send_to_recovery: bool,
    ) -> Result<InjuryResult> {
        let current = self.authorize(user_id, fighter_id).await?;
        let template = self
            .catalog_repo
            .get_effect_type(effect_type_id)
            .await?
            .ok_or(MundaError::EffectTypeNotFound(effect_type_id))?;
        if template.effect_type.category_name != effect_category::INJURIES {
            return Err(MundaError::Validation(format!(
                "效果类型 {} 不是伤病",
                template.effect_type.effect_name
            )));
        }

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let fighter = lock_fighter(&mut tx, fighter_id, gang.id).await?;

        let total_before = RatingRepository::fighter_cost_in_tx(&mut tx, fighter_id)
            .await?
            .map(|row| row.total())
            .unwrap_or(0);

        let effect = EffectRepository::create_in_tx(
            &mut tx,
            &NewEffect::from_type(&template, Some(fighter_id), None, user_id),
        )
        .await?;

        let before = fighter.status();
        let data = EffectData::new(&effect.effect.type_specific_data);
        let after = status_after_injury(before, &data, send_to_recovery);
        if after != before {
            FighterRepository::set_status_in_tx(&mut tx, fighter_id, after).await?;
        }

        let rating_delta = RatingDelta::for_fighter(after, data.credits_increase())
            + RatingDelta::for_status_change(before, after, total_before);
        apply_rating(&mut tx, gang.id, rating_delta, "injury_added").await?;

        let mut description = format!(
            "{} suffered {}",
            fighter.fighter_name, effect.effect.effect_name
        );
        if after.recovery && !before.recovery {
            description.push_str(" and went into recovery");
        }
        if after.captured && !before.captured {
            description.push_str(" and was captured");
        }
        GangLogRepository::create_in_tx(
            &mut tx,
            &NewGangLog::new(gang.id, user_id, GangLogAction::InjuryAdded, description)
                .with_fighter(fighter_id),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;

        info!(
            fighter_id = %fighter_id,
            injury = %effect.effect.effect_name,
            rating_delta = rating_delta.value(),
            "伤病添加成功"
        );

        Ok(InjuryResult {
            effect,
            status: after,
            rating_delta,
        })
    }

    /// 删除伤病；战士状态保持不变
    #[instrument(skip(self))]
    pub async fn delete_injury(
        &self,
        user_id: Uuid,
        fighter_id: Uuid,
        effect_id: Uuid,
    ) -> Result<RatingDelta> {
        let current = self.authorize(user_id, fighter_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let fighter = lock_fighter(&mut tx, fighter_id, gang.id).await?;

        let effect = EffectRepository::get_in_tx(&mut tx, effect_id)
            .await?
            .filter(|e| {
                e.effect.fighter_id == Some(fighter_id)
                    && e.effect.category_name == effect_category::INJURIES
            })
            .ok_or(MundaError::EffectNotFound(effect_id))?;
        EffectRepository::delete_in_tx(&mut tx, effect_id).await?;

        let rating_delta =
            RatingDelta::for_fighter(fighter.status(), -effect.effect.credits_increase());
        apply_rating(&mut tx, gang.id, rating_delta, "injury_removed").await?;

        GangLogRepository::create_in_tx(
            &mut tx,
            &NewGangLog::new(
                gang.id,
                user_id,
                GangLogAction::InjuryRemoved,
                format!(
                    "{} recovered from {}",
                    fighter.fighter_name, effect.effect.effect_name
                ),
            )
            .with_fighter(fighter_id),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        info!(fighter_id = %fighter_id, effect_id = %effect_id, "伤病已删除");

        Ok(rating_delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_injury_flags_set_status() {
        let data = json!({"recovery": true});
        let after = status_after_injury(FighterStatus::default(), &EffectData::new(&data), false);
        assert!(after.recovery);
        assert!(!after.captured);
        assert!(after.counts_towards_rating());
    }

    #[test]
    fn test_send_to_recovery_overrides_missing_flag() {
        let data = json!({});
        let after = status_after_injury(FighterStatus::default(), &EffectData::new(&data), true);
        assert!(after.recovery);
    }

    #[test]
    fn test_injury_keeps_existing_flags() {
        let before = FighterStatus {
            captured: true,
            starved: true,
            ..Default::default()
        };
        let data = json!({"captured": false});
        let after = status_after_injury(before, &EffectData::new(&data), false);
        assert!(after.captured);
        assert!(after.starved);
        assert!(!after.recovery);
    }
}
