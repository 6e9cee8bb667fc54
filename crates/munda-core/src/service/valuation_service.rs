//! 费用与估值读取
//!
//! 把费用聚合查询的结果交给 `rating` 模块计算，供帮派详情与评分重算使用

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::Result;
use crate::models::Gang;
use crate::rating::{self, FighterCostRow, GangValuation, VehicleCostRow};
use crate::repository::{RatingRepository, RatingRepositoryTrait};

/// 帮派费用快照
#[derive(Debug, Clone)]
pub struct GangCosts {
    pub fighters: Vec<FighterCostRow>,
    pub vehicles: Vec<VehicleCostRow>,
    pub valuation: GangValuation,
}

impl GangCosts {
    pub fn fighter_costs_by_id(&self) -> HashMap<Uuid, &FighterCostRow> {
        self.fighters.iter().map(|r| (r.fighter_id, r)).collect()
    }

    pub fn vehicle_totals_by_id(&self) -> HashMap<Uuid, i32> {
        self.vehicles.iter().map(|r| (r.vehicle_id, r.total())).collect()
    }
}

pub struct ValuationService<R: RatingRepositoryTrait = RatingRepository> {
    repo: Arc<R>,
}

impl<R: RatingRepositoryTrait> ValuationService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// 读取帮派全部费用并计算估值
    pub async fn gang_costs(&self, gang: &Gang) -> Result<GangCosts> {
        let fighters = self.repo.fighter_costs(gang.id).await?;
        let vehicles = self.repo.vehicle_costs(gang.id).await?;
        let stash_value = self.repo.stash_value(gang.id).await?;

        let unassigned_vehicle_value = vehicles
            .iter()
            .filter(|v| v.fighter_id.is_none())
            .map(VehicleCostRow::total)
            .sum();

        let valuation =
            rating::valuate(&fighters, stash_value, unassigned_vehicle_value, gang.credits);

        Ok(GangCosts {
            fighters,
            vehicles,
            valuation,
        })
    }

    pub async fn fighter_cost(&self, fighter_id: Uuid) -> Result<Option<FighterCostRow>> {
        self.repo.fighter_cost(fighter_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Alignment;
    use crate::repository::MockRatingRepositoryTrait;
    use chrono::Utc;

    fn gang(credits: i32) -> Gang {
        Gang {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Escher Sisters".to_string(),
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

    fn fighter(base: i32, vehicles: i32, killed: bool) -> FighterCostRow {
        FighterCostRow {
            fighter_id: Uuid::new_v4(),
            gang_id: Uuid::nil(),
            base_credits: base,
            cost_adjustment: 0,
            equipment: 0,
            skills: 0,
            effects: 0,
            vehicles,
            killed,
            retired: false,
            enslaved: false,
            captured: false,
            recovery: false,
            starved: false,
        }
    }

    fn vehicle(fighter_id: Option<Uuid>, base_cost: i32) -> VehicleCostRow {
        VehicleCostRow {
            vehicle_id: Uuid::new_v4(),
            gang_id: Uuid::nil(),
            fighter_id,
            base_cost,
            equipment: 0,
            effects: 0,
        }
    }

    #[tokio::test]
    async fn test_gang_costs_valuation() {
        let crew = fighter(110, 95, false);
        let crew_id = crew.fighter_id;
        let fighters = vec![crew, fighter(60, 0, true)];
        let vehicles = vec![vehicle(Some(crew_id), 95), vehicle(None, 80)];

        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_fighter_costs()
            .returning(move |_| Ok(fighters.clone()));
        repo.expect_vehicle_costs()
            .returning(move |_| Ok(vehicles.clone()));
        repo.expect_stash_value().returning(|_| Ok(25));

        let service = ValuationService::new(Arc::new(repo));
        let costs = service.gang_costs(&gang(300)).await.unwrap();

        // 载具费用已计入驾驶员；阵亡战士不计分
        assert_eq!(costs.valuation.rating, 205);
        assert_eq!(costs.valuation.unassigned_vehicle_value, 80);
        assert_eq!(costs.valuation.stash_value, 25);
        assert_eq!(costs.valuation.wealth, 205 + 80 + 25 + 300);
        assert_eq!(costs.fighter_costs_by_id()[&crew_id].total(), 205);
    }

    #[tokio::test]
    async fn test_empty_gang() {
        let mut repo = MockRatingRepositoryTrait::new();
        repo.expect_fighter_costs().returning(|_| Ok(vec![]));
        repo.expect_vehicle_costs().returning(|_| Ok(vec![]));
        repo.expect_stash_value().returning(|_| Ok(0));

        let service = ValuationService::new(Arc::new(repo));
        let costs = service.gang_costs(&gang(1000)).await.unwrap();
        assert_eq!(costs.valuation.rating, 0);
        assert_eq!(costs.valuation.wealth, 1000);
    }
}
