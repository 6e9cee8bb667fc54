//! 进阶服务
//!
//! 属性进阶存为 `advancements` 分类的效果（带 +1 修正），技能进阶写入
//! fighter_skills。两者都扣除经验值，并把费用增加计入评分。

use std::sync::Arc;

use serde_json::json;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

use munda_shared::cache::Cache;

use crate::error::{MundaError, Result};
use crate::models::{Characteristic, Fighter, GangLogAction, NewEffect, effect_category};
use crate::rating::RatingDelta;
use crate::repository::{
    CatalogRepository, CatalogRepositoryTrait, EffectRepository, FighterRepository,
    FighterRepositoryTrait, GangLogRepository, NewGangLog, SkillRepository,
};
use crate::service::access::Access;
use crate::service::dto::{
    AdvancementCost, AdvancementRemoval, CharacteristicAdvancementRequest,
    CharacteristicAdvancementResult, SkillAdvancementRequest, SkillAdvancementResult,
};
use crate::service::{
    apply_rating, ensure_non_negative, invalidate_gang_cache, lock_fighter, lock_gang,
};

/// 同一属性每多一次进阶，经验消耗增加的量
const XP_STEP_PER_INCREASE: i32 = 2;

/// 属性进阶的默认花费
///
/// `times_increased` 为该战士在此属性上已有的进阶次数
pub fn characteristic_cost(stat: Characteristic, times_increased: i64) -> AdvancementCost {
    let (base_xp, credits_increase): (i32, i32) = match stat {
        Characteristic::Willpower
        | Characteristic::Intelligence
        | Characteristic::Leadership
        | Characteristic::Cool => (3, 5),
        Characteristic::Initiative => (4, 10),
        Characteristic::Movement => (5, 10),
        Characteristic::WeaponSkill | Characteristic::BallisticSkill => (6, 20),
        Characteristic::Strength | Characteristic::Toughness => (8, 30),
        Characteristic::Wounds | Characteristic::Attacks => (12, 45),
    };
    let steps = i32::try_from(times_increased.max(0)).unwrap_or(i32::MAX / XP_STEP_PER_INCREASE);
    AdvancementCost {
        xp_cost: base_xp.saturating_add(steps.saturating_mul(XP_STEP_PER_INCREASE)),
        credits_increase,
    }
}

fn display_name(stat: Characteristic) -> &'static str {
    match stat {
        Characteristic::Movement => "Movement",
        Characteristic::WeaponSkill => "Weapon Skill",
        Characteristic::BallisticSkill => "Ballistic Skill",
        Characteristic::Strength => "Strength",
        Characteristic::Toughness => "Toughness",
        Characteristic::Wounds => "Wounds",
        Characteristic::Initiative => "Initiative",
        Characteristic::Attacks => "Attacks",
        Characteristic::Leadership => "Leadership",
        Characteristic::Cool => "Cool",
        Characteristic::Willpower => "Willpower",
        Characteristic::Intelligence => "Intelligence",
    }
}

fn ensure_xp(fighter: &Fighter, required: i32) -> Result<()> {
    if fighter.xp < required {
        return Err(MundaError::InsufficientXp {
            required,
            available: fighter.xp,
        });
    }
    Ok(())
}

pub struct AdvancementService {
    pool: PgPool,
    cache: Arc<Cache>,
    access: Arc<Access>,
    fighter_repo: FighterRepository,
    catalog_repo: CatalogRepository,
}

impl AdvancementService {
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

    /// 属性进阶
    #[instrument(skip(self, request), fields(stat = request.stat.stat_name()))]
    pub async fn add_characteristic_advancement(
        &self,
        user_id: Uuid,
        fighter_id: Uuid,
        request: CharacteristicAdvancementRequest,
    ) -> Result<CharacteristicAdvancementResult> {
        for (value, field) in [
            (request.xp_cost, "xp_cost"),
            (request.credits_increase, "credits_increase"),
        ] {
            if let Some(v) = value {
                ensure_non_negative(v, field)?;
            }
        }
        let current = self.authorize(user_id, fighter_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let fighter = lock_fighter(&mut tx, fighter_id, gang.id).await?;

        let stat = request.stat;
        let times =
            EffectRepository::count_characteristic_advances_in_tx(&mut tx, fighter_id, stat.stat_name())
                .await?;
        let default = characteristic_cost(stat, times);
        let cost = AdvancementCost {
            xp_cost: request.xp_cost.unwrap_or(default.xp_cost),
            credits_increase: request.credits_increase.unwrap_or(default.credits_increase),
        };
        ensure_xp(&fighter, cost.xp_cost)?;

        let effect = EffectRepository::create_in_tx(
            &mut tx,
            &NewEffect {
                fighter_id: Some(fighter_id),
                vehicle_id: None,
                fighter_effect_type_id: None,
                fighter_equipment_id: None,
                category_name: effect_category::ADVANCEMENTS.to_string(),
                effect_name: display_name(stat).to_string(),
                type_specific_data: json!({
                    "xp_cost": cost.xp_cost,
                    "credits_increase": cost.credits_increase,
                    "stat": stat.stat_name(),
                }),
                user_id,
                modifiers: vec![(stat.stat_name().to_string(), 1)],
            },
        )
        .await?;

        let xp = FighterRepository::adjust_xp_in_tx(&mut tx, fighter_id, -cost.xp_cost).await?;
        let rating_delta = RatingDelta::for_fighter(fighter.status(), cost.credits_increase);
        apply_rating(&mut tx, gang.id, rating_delta, "advancement_added").await?;

        GangLogRepository::create_in_tx(
            &mut tx,
            &NewGangLog::new(
                gang.id,
                user_id,
                GangLogAction::AdvancementAdded,
                format!(
                    "{} advanced {} for {} XP (+{} credits)",
                    fighter.fighter_name,
                    display_name(stat),
                    cost.xp_cost,
                    cost.credits_increase
                ),
            )
            .with_fighter(fighter_id),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;

        info!(
            fighter_id = %fighter_id,
            xp_cost = cost.xp_cost,
            credits_increase = cost.credits_increase,
            "属性进阶成功"
        );

        Ok(CharacteristicAdvancementResult {
            effect,
            xp,
            rating_delta,
        })
    }

    /// 技能进阶；重复习得同一技能返回 Conflict
    #[instrument(skip(self, request), fields(skill_id = %request.skill_id))]
    pub async fn add_skill_advancement(
        &self,
        user_id: Uuid,
        fighter_id: Uuid,
        request: SkillAdvancementRequest,
    ) -> Result<SkillAdvancementResult> {
        for (value, field) in [
            (request.xp_cost, "xp_cost"),
            (request.credits_increase, "credits_increase"),
        ] {
            if let Some(v) = value {
                ensure_non_negative(v, field)?;
            }
        }
        let current = self.authorize(user_id, fighter_id).await?;
        let skill = self
            .catalog_repo
            .get_skill(request.skill_id)
            .await?
            .ok_or(MundaError::SkillNotFound(request.skill_id))?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let fighter = lock_fighter(&mut tx, fighter_id, gang.id).await?;

        if SkillRepository::exists_in_tx(&mut tx, fighter_id, skill.id).await? {
            return Err(MundaError::Conflict(format!(
                "战士已掌握技能 {}",
                skill.name
            )));
        }

        let default = request.kind.default_cost();
        let xp_cost = request.xp_cost.unwrap_or(default.xp_cost);
        let credits_increase = request.credits_increase.unwrap_or(default.credits_increase);
        ensure_xp(&fighter, xp_cost)?;

        let fighter_skill = SkillRepository::insert_in_tx(
            &mut tx,
            fighter_id,
            skill.id,
            credits_increase,
            xp_cost,
            request.kind.is_advance(),
            user_id,
        )
        .await?;

        let xp = if xp_cost > 0 {
            FighterRepository::adjust_xp_in_tx(&mut tx, fighter_id, -xp_cost).await?
        } else {
            fighter.xp
        };
        let rating_delta = RatingDelta::for_fighter(fighter.status(), credits_increase);
        apply_rating(&mut tx, gang.id, rating_delta, "skill_added").await?;

        GangLogRepository::create_in_tx(
            &mut tx,
            &NewGangLog::new(
                gang.id,
                user_id,
                GangLogAction::AdvancementAdded,
                format!(
                    "{} learned {} for {} XP (+{} credits)",
                    fighter.fighter_name, skill.name, xp_cost, credits_increase
                ),
            )
            .with_fighter(fighter_id),
        )
        .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;

        info!(fighter_id = %fighter_id, xp_cost = xp_cost, "技能进阶成功");

        Ok(SkillAdvancementResult {
            skill: fighter_skill,
            xp,
            rating_delta,
        })
    }

    /// 撤销属性进阶，退还经验值
    #[instrument(skip(self))]
    pub async fn delete_advancement(
        &self,
        user_id: Uuid,
        fighter_id: Uuid,
        effect_id: Uuid,
    ) -> Result<AdvancementRemoval> {
        let current = self.authorize(user_id, fighter_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let fighter = lock_fighter(&mut tx, fighter_id, gang.id).await?;

        let effect = EffectRepository::get_in_tx(&mut tx, effect_id)
            .await?
            .filter(|e| {
                e.effect.fighter_id == Some(fighter_id)
                    && e.effect.category_name == effect_category::ADVANCEMENTS
            })
            .ok_or(MundaError::EffectNotFound(effect_id))?;

        let xp_refunded = effect.effect.xp_cost();
        let credits_increase = effect.effect.credits_increase();
        EffectRepository::delete_in_tx(&mut tx, effect_id).await?;

        let removal = self
            .finish_removal(
                &mut tx,
                &fighter,
                user_id,
                xp_refunded,
                credits_increase,
                &effect.effect.effect_name,
            )
            .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        info!(fighter_id = %fighter_id, xp_refunded = xp_refunded, "属性进阶已撤销");
        Ok(removal)
    }

    /// 删除技能，退还经验值
    #[instrument(skip(self))]
    pub async fn delete_skill(
        &self,
        user_id: Uuid,
        fighter_id: Uuid,
        fighter_skill_id: Uuid,
    ) -> Result<AdvancementRemoval> {
        let current = self.authorize(user_id, fighter_id).await?;

        let mut tx = self.pool.begin().await?;
        let gang = lock_gang(&mut tx, current.gang_id).await?;
        let fighter = lock_fighter(&mut tx, fighter_id, gang.id).await?;

        let skill = SkillRepository::get_for_update(&mut tx, fighter_skill_id)
            .await?
            .filter(|s| s.fighter_id == fighter_id)
            .ok_or(MundaError::SkillNotFound(fighter_skill_id))?;
        SkillRepository::delete_in_tx(&mut tx, fighter_skill_id).await?;

        let removal = self
            .finish_removal(
                &mut tx,
                &fighter,
                user_id,
                skill.xp_cost,
                skill.credits_increase,
                &skill.skill_name,
            )
            .await?;
        tx.commit().await?;

        invalidate_gang_cache(&self.cache, &self.pool, gang.id, gang.user_id).await;
        info!(fighter_id = %fighter_id, xp_refunded = skill.xp_cost, "技能已删除");
        Ok(removal)
    }

    /// 退还经验、扣除评分并记录日志
    async fn finish_removal(
        &self,
        tx: &mut PgConnection,
        fighter: &Fighter,
        user_id: Uuid,
        xp_refunded: i32,
        credits_increase: i32,
        name: &str,
    ) -> Result<AdvancementRemoval> {
        let xp = if xp_refunded != 0 {
            FighterRepository::adjust_xp_in_tx(tx, fighter.id, xp_refunded).await?
        } else {
            fighter.xp
        };
        let rating_delta = RatingDelta::for_fighter(fighter.status(), -credits_increase);
        apply_rating(tx, fighter.gang_id, rating_delta, "advancement_removed").await?;

        GangLogRepository::create_in_tx(
            tx,
            &NewGangLog::new(
                fighter.gang_id,
                user_id,
                GangLogAction::AdvancementRemoved,
                format!(
                    "{} lost {} ({} XP refunded)",
                    fighter.fighter_name, name, xp_refunded
                ),
            )
            .with_fighter(fighter.id),
        )
        .await?;

        Ok(AdvancementRemoval {
            xp_refunded,
            xp,
            rating_delta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_characteristic_base_costs() {
        assert_eq!(
            characteristic_cost(Characteristic::Cool, 0),
            AdvancementCost {
                xp_cost: 3,
                credits_increase: 5
            }
        );
        assert_eq!(characteristic_cost(Characteristic::Initiative, 0).xp_cost, 4);
        assert_eq!(characteristic_cost(Characteristic::Movement, 0).xp_cost, 5);
        assert_eq!(
            characteristic_cost(Characteristic::BallisticSkill, 0).credits_increase,
            20
        );
        assert_eq!(characteristic_cost(Characteristic::Toughness, 0).xp_cost, 8);
        assert_eq!(
            characteristic_cost(Characteristic::Attacks, 0),
            AdvancementCost {
                xp_cost: 12,
                credits_increase: 45
            }
        );
    }

    #[test]
    fn test_xp_cost_grows_per_increase() {
        assert_eq!(characteristic_cost(Characteristic::Strength, 1).xp_cost, 10);
        assert_eq!(characteristic_cost(Characteristic::Strength, 3).xp_cost, 14);
        // 费用增加不随次数变化
        assert_eq!(
            characteristic_cost(Characteristic::Strength, 3).credits_increase,
            30
        );
        assert_eq!(characteristic_cost(Characteristic::Wounds, -1).xp_cost, 12);
    }

    #[test]
    fn test_xp_cost_saturates_for_huge_counts() {
        let cost = characteristic_cost(Characteristic::Strength, i64::MAX);
        assert_eq!(cost.xp_cost, i32::MAX);
        assert_eq!(cost.credits_increase, 30);
        assert_eq!(
            characteristic_cost(Characteristic::Cool, i64::from(i32::MAX)).xp_cost,
            i32::MAX
        );
    }

    #[test]
    fn test_display_name_covers_all() {
        for stat in Characteristic::ALL {
            assert!(!display_name(stat).is_empty());
        }
        assert_eq!(display_name(Characteristic::WeaponSkill), "Weapon Skill");
    }
}
