//! 战士费用与帮派评分引擎
//!
//! 评分（rating）是帮派所有在役战士总费用之和。战士总费用由以下部分组成：
//!
//! - 基础费用（fighters.credits）与费用调整（cost_adjustment）
//! - 持有装备的实际购买价
//! - 技能与效果带来的费用增加
//! - 所驾驶载具的费用（载具本身 + 载具装备 + 载具效果）
//!
//! 仓库装备和未分配载具不计入评分，只计入财富（wealth）。
//!
//! 服务层在每次写操作中用 [`RatingDelta`] 计算增量，并在同一事务内通过
//! `RatingRepository::apply_rating_delta_in_tx` 写回 `gangs.rating`；
//! 需要修复漂移时使用 [`rating_of`] 从聚合结果全量重算。

use std::ops::{Add, AddAssign, Neg};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 战士费用构成
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub base_credits: i32,
    pub cost_adjustment: i32,
    pub equipment: i32,
    pub skills: i32,
    pub effects: i32,
    pub vehicles: i32,
}

impl CostBreakdown {
    /// 各部分之和，溢出时饱和到 i32 边界
    pub fn total(&self) -> i32 {
        [
            self.cost_adjustment,
            self.equipment,
            self.skills,
            self.effects,
            self.vehicles,
        ]
        .into_iter()
        .fold(self.base_credits, i32::saturating_add)
    }
}

/// 战士状态
///
/// 被杀、退役、被卖为奴隶的战士不计入评分；被俘、康复、饥饿仍计入
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FighterStatus {
    pub killed: bool,
    pub retired: bool,
    pub enslaved: bool,
    pub captured: bool,
    pub recovery: bool,
    pub starved: bool,
}

impl FighterStatus {
    pub fn counts_towards_rating(&self) -> bool {
        !self.killed && !self.retired && !self.enslaved
    }
}

/// 费用聚合查询的单行结果（每个战士一行）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FighterCostRow {
    pub fighter_id: Uuid,
    pub gang_id: Uuid,
    pub base_credits: i32,
    pub cost_adjustment: i32,
    pub equipment: i32,
    pub skills: i32,
    pub effects: i32,
    pub vehicles: i32,
    pub killed: bool,
    pub retired: bool,
    pub enslaved: bool,
    pub captured: bool,
    pub recovery: bool,
    pub starved: bool,
}

impl FighterCostRow {
    pub fn breakdown(&self) -> CostBreakdown {
        CostBreakdown {
            base_credits: self.base_credits,
            cost_adjustment: self.cost_adjustment,
            equipment: self.equipment,
            skills: self.skills,
            effects: self.effects,
            vehicles: self.vehicles,
        }
    }

    pub fn status(&self) -> FighterStatus {
        FighterStatus {
            killed: self.killed,
            retired: self.retired,
            enslaved: self.enslaved,
            captured: self.captured,
            recovery: self.recovery,
            starved: self.starved,
        }
    }

    pub fn total(&self) -> i32 {
        self.breakdown().total()
    }

    pub fn counts_towards_rating(&self) -> bool {
        self.status().counts_towards_rating()
    }
}

/// 载具费用聚合结果
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VehicleCostRow {
    pub vehicle_id: Uuid,
    pub gang_id: Uuid,
    pub fighter_id: Option<Uuid>,
    pub base_cost: i32,
    pub equipment: i32,
    pub effects: i32,
}

impl VehicleCostRow {
    pub fn total(&self) -> i32 {
        self.base_cost
            .saturating_add(self.equipment)
            .saturating_add(self.effects)
    }
}

/// 帮派估值
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GangValuation {
    pub rating: i32,
    pub wealth: i32,
    pub stash_value: i32,
    pub unassigned_vehicle_value: i32,
    pub credits: i32,
}

/// 帮派评分的有符号变化量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RatingDelta(i32);

impl RatingDelta {
    pub const ZERO: RatingDelta = RatingDelta(0);

    pub fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// 战士身上的费用变化：仅在该战士计入评分时生效
    pub fn for_fighter(status: FighterStatus, amount: i32) -> Self {
        if status.counts_towards_rating() {
            Self(amount)
        } else {
            Self::ZERO
        }
    }

    /// 状态切换带来的评分变化
    ///
    /// 进入计分集合 +total，离开 -total，其余为 0
    pub fn for_status_change(before: FighterStatus, after: FighterStatus, total: i32) -> Self {
        match (
            before.counts_towards_rating(),
            after.counts_towards_rating(),
        ) {
            (false, true) => Self(total),
            (true, false) => Self(total.saturating_neg()),
            _ => Self::ZERO,
        }
    }

    /// 同一战士写操作前后两次费用快照之间的评分变化
    ///
    /// `None` 表示该时刻战士不存在（新建或已删除）
    pub fn between(before: Option<&FighterCostRow>, after: Option<&FighterCostRow>) -> Self {
        let rated = |row: Option<&FighterCostRow>| {
            row.filter(|r| r.counts_towards_rating())
                .map(FighterCostRow::total)
                .unwrap_or(0)
        };
        Self(rated(after).saturating_sub(rated(before)))
    }
}

impl Add for RatingDelta {
    type Output = RatingDelta;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for RatingDelta {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Neg for RatingDelta {
    type Output = RatingDelta;

    fn neg(self) -> Self::Output {
        Self(self.0.saturating_neg())
    }
}

impl std::iter::Sum for RatingDelta {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// 帮派评分：计入评分的战士总费用之和
pub fn rating_of(fighters: &[FighterCostRow]) -> i32 {
    fighters
        .iter()
        .filter(|f| f.counts_towards_rating())
        .map(FighterCostRow::total)
        .fold(0, i32::saturating_add)
}

/// 帮派估值：财富 = 评分 + 仓库 + 未分配载具 + 信用点
pub fn valuate(
    fighters: &[FighterCostRow],
    stash_value: i32,
    unassigned_vehicle_value: i32,
    credits: i32,
) -> GangValuation {
    let rating = rating_of(fighters);
    GangValuation {
        rating,
        wealth: rating
            .saturating_add(stash_value)
            .saturating_add(unassigned_vehicle_value)
            .saturating_add(credits),
        stash_value,
        unassigned_vehicle_value,
        credits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(base: i32, equipment: i32, status: FighterStatus) -> FighterCostRow {
        FighterCostRow {
            fighter_id: Uuid::new_v4(),
            gang_id: Uuid::nil(),
            base_credits: base,
            cost_adjustment: 0,
            equipment,
            skills: 0,
            effects: 0,
            vehicles: 0,
            killed: status.killed,
            retired: status.retired,
            enslaved: status.enslaved,
            captured: status.captured,
            recovery: status.recovery,
            starved: status.starved,
        }
    }

    fn active() -> FighterStatus {
        FighterStatus::default()
    }

    fn killed() -> FighterStatus {
        FighterStatus {
            killed: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_breakdown_total_sums_every_part() {
        let b = CostBreakdown {
            base_credits: 100,
            cost_adjustment: -10,
            equipment: 45,
            skills: 20,
            effects: 5,
            vehicles: 80,
        };
        assert_eq!(b.total(), 240);
        assert_eq!(CostBreakdown::default().total(), 0);
    }

    #[test]
    fn test_breakdown_total_saturates_on_extreme_adjustment() {
        let b = CostBreakdown {
            base_credits: 65,
            cost_adjustment: i32::MAX,
            equipment: 30,
            ..Default::default()
        };
        assert_eq!(b.total(), i32::MAX);

        let b = CostBreakdown {
            base_credits: 65,
            cost_adjustment: i32::MIN,
            ..Default::default()
        };
        assert_eq!(b.total(), i32::MIN + 65);

        // 已死亡战士的极端调整值不影响评分
        let mut r = row(65, 0, killed());
        r.cost_adjustment = i32::MAX;
        assert_eq!(rating_of(&[r.clone()]), 0);
        assert_eq!(RatingDelta::between(Some(&r), None), RatingDelta::ZERO);

        let mut alive = row(65, 0, active());
        alive.cost_adjustment = i32::MAX;
        assert_eq!(rating_of(&[alive.clone(), alive.clone()]), i32::MAX);
        assert_eq!(-RatingDelta::new(i32::MIN), RatingDelta::new(i32::MAX));
    }

    #[test]
    fn test_counts_towards_rating() {
        assert!(active().counts_towards_rating());
        assert!(!killed().counts_towards_rating());
        for status in [
            FighterStatus {
                retired: true,
                ..Default::default()
            },
            FighterStatus {
                enslaved: true,
                ..Default::default()
            },
        ] {
            assert!(!status.counts_towards_rating());
        }
        for status in [
            FighterStatus {
                captured: true,
                ..Default::default()
            },
            FighterStatus {
                recovery: true,
                ..Default::default()
            },
            FighterStatus {
                starved: true,
                ..Default::default()
            },
        ] {
            assert!(status.counts_towards_rating());
        }
    }

    #[test]
    fn test_rating_of_skips_inactive_fighters() {
        let fighters = vec![
            row(100, 30, active()),
            row(50, 0, killed()),
            row(
                65,
                10,
                FighterStatus {
                    captured: true,
                    ..Default::default()
                },
            ),
        ];
        assert_eq!(rating_of(&fighters), 205);
        assert_eq!(rating_of(&[]), 0);
    }

    #[test]
    fn test_valuate_wealth() {
        let fighters = vec![row(100, 0, active()), row(40, 0, killed())];
        let v = valuate(&fighters, 25, 80, 300);
        assert_eq!(v.rating, 100);
        assert_eq!(v.wealth, 100 + 25 + 80 + 300);
        assert_eq!(v.stash_value, 25);
        assert_eq!(v.unassigned_vehicle_value, 80);
        assert_eq!(v.credits, 300);
    }

    #[test]
    fn test_delta_for_fighter() {
        assert_eq!(RatingDelta::for_fighter(active(), 35).value(), 35);
        assert_eq!(RatingDelta::for_fighter(active(), -35).value(), -35);
        assert!(RatingDelta::for_fighter(killed(), 35).is_zero());
    }

    #[test]
    fn test_delta_for_status_change() {
        let retired = FighterStatus {
            retired: true,
            ..Default::default()
        };
        let captured = FighterStatus {
            captured: true,
            ..Default::default()
        };

        assert_eq!(
            RatingDelta::for_status_change(active(), killed(), 120).value(),
            -120
        );
        assert_eq!(
            RatingDelta::for_status_change(killed(), active(), 120).value(),
            120
        );
        // 两侧都不计分：被杀后退役
        assert!(RatingDelta::for_status_change(killed(), retired, 120).is_zero());
        // 两侧都计分：被俘
        assert!(RatingDelta::for_status_change(active(), captured, 120).is_zero());
    }

    #[test]
    fn test_delta_arithmetic() {
        let mut d = RatingDelta::new(10) + RatingDelta::new(-4);
        assert_eq!(d.value(), 6);
        d += RatingDelta::new(4);
        assert_eq!((-d).value(), -10);

        let total: RatingDelta = [1, 2, 3].into_iter().map(RatingDelta::new).sum();
        assert_eq!(total.value(), 6);
    }

    #[test]
    fn test_vehicle_cost_total() {
        let v = VehicleCostRow {
            vehicle_id: Uuid::new_v4(),
            gang_id: Uuid::nil(),
            fighter_id: None,
            base_cost: 120,
            equipment: 30,
            effects: -5,
        };
        assert_eq!(v.total(), 145);
    }

    #[test]
    fn test_delta_between_snapshots() {
        let before = row(100, 30, active());
        let mut after = before.clone();
        after.equipment = 0;
        assert_eq!(RatingDelta::between(Some(&before), Some(&after)).value(), -30);

        // 删除计分战士
        assert_eq!(RatingDelta::between(Some(&before), None).value(), -130);
        // 删除不计分战士
        let dead = row(100, 30, killed());
        assert!(RatingDelta::between(Some(&dead), None).is_zero());
        // 状态切换与费用变化同时发生
        let mut revived = dead.clone();
        revived.killed = false;
        revived.equipment = 40;
        assert_eq!(RatingDelta::between(Some(&dead), Some(&revived)).value(), 140);
    }

    #[test]
    fn test_beast_rating_rides_on_owner_equipment() {
        // 主人购买 Cyber-mastiff（70），异兽本身基础费用为 0
        let owner = row(100, 70, active());
        let beast = row(0, 0, active());
        assert_eq!(rating_of(&[owner, beast]), 170);
    }
}
