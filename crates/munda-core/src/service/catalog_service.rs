//! 目录服务
//!
//! 目录数据读取走缓存；管理员写入后按 `catalog:*` 整体失效。

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use munda_shared::cache::{Cache, CacheKey};

use crate::error::{MundaError, Result};
use crate::models::{
    CustomFighterType, EffectTypeWithModifiers, Equipment, FighterType, GangType, Skill,
    VehicleType,
};
use crate::repository::{
    CatalogRepository, CatalogRepositoryTrait, EquipmentInput, FighterTypeInput,
};
use crate::service::access::Access;
use crate::service::cached_or_fetch;
use crate::service::dto::FighterTypeListing;

/// 目录缓存 TTL
const CATALOG_TTL: Duration = Duration::from_secs(600);

/// 对该帮派类型可用的自定义类型：未限定帮派类型或限定为该类型
fn custom_types_for_gang(
    types: Vec<CustomFighterType>,
    gang_type_id: Uuid,
) -> Vec<CustomFighterType> {
    types
        .into_iter()
        .filter(|t| t.gang_type_id.is_none_or(|id| id == gang_type_id))
        .collect()
}

fn validate_cost(cost: i32) -> Result<()> {
    if cost < 0 {
        return Err(MundaError::Validation("价格不能为负数".to_string()));
    }
    Ok(())
}

pub struct CatalogService {
    cache: Arc<Cache>,
    access: Arc<Access>,
    repo: CatalogRepository,
}

impl CatalogService {
    pub fn new(pool: PgPool, cache: Arc<Cache>, access: Arc<Access>) -> Self {
        Self {
            repo: CatalogRepository::new(pool),
            cache,
            access,
        }
    }

    async fn invalidate_catalog(&self) {
        match self.cache.delete_pattern(&CacheKey::catalog_pattern()).await {
            Ok(deleted) => info!(deleted = deleted, "目录缓存已失效"),
            Err(e) => warn!(error = %e, "Failed to invalidate catalog cache"),
        }
    }

    // ==================== 读取 ====================

    pub async fn gang_types(&self) -> Result<Vec<GangType>> {
        cached_or_fetch(&self.cache, &CacheKey::gang_types(), CATALOG_TTL, || {
            self.repo.list_gang_types()
        })
        .await
    }

    /// 可招募类型：目录类型（含帮派专属价）加调用者的自定义类型
    #[instrument(skip(self))]
    pub async fn fighter_types_with_cost(
        &self,
        gang_type_id: Uuid,
        user_id: Uuid,
    ) -> Result<FighterTypeListing> {
        let key = CacheKey::fighter_types(&gang_type_id.to_string());
        let catalog = cached_or_fetch(&self.cache, &key, CATALOG_TTL, || {
            self.repo.list_fighter_types_with_cost(gang_type_id)
        })
        .await?;
        let custom = custom_types_for_gang(
            self.repo.list_custom_fighter_types(user_id).await?,
            gang_type_id,
        );
        Ok(FighterTypeListing { catalog, custom })
    }

    /// 目录装备；不带分类的全量列表走缓存
    pub async fn equipment(&self, category: Option<String>) -> Result<Vec<Equipment>> {
        match category {
            None => {
                cached_or_fetch(&self.cache, &CacheKey::equipment_catalog(), CATALOG_TTL, || {
                    self.repo.list_equipment(None)
                })
                .await
            }
            Some(c) => self.repo.list_equipment(Some(c)).await,
        }
    }

    pub async fn vehicle_types(&self, gang_type_id: Option<Uuid>) -> Result<Vec<VehicleType>> {
        self.repo.list_vehicle_types(gang_type_id).await
    }

    pub async fn skills(&self, skill_type_id: Option<Uuid>) -> Result<Vec<Skill>> {
        self.repo.list_skills(skill_type_id).await
    }

    pub async fn effect_types(&self, category: &str) -> Result<Vec<EffectTypeWithModifiers>> {
        self.repo.list_effect_types(category.to_string()).await
    }

    // ==================== 管理员写入 ====================

    #[instrument(skip(self, input), fields(name = %input.equipment_name))]
    pub async fn create_equipment(&self, user_id: Uuid, input: EquipmentInput) -> Result<Equipment> {
        self.access.ensure_admin(user_id).await?;
        validate_cost(input.cost)?;
        let equipment = self.repo.create_equipment(&input).await?;
        self.invalidate_catalog().await;
        info!(equipment_id = %equipment.id, "目录装备已创建");
        Ok(equipment)
    }

    #[instrument(skip(self, input))]
    pub async fn update_equipment(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: EquipmentInput,
    ) -> Result<Equipment> {
        self.access.ensure_admin(user_id).await?;
        validate_cost(input.cost)?;
        let equipment = self
            .repo
            .update_equipment(id, &input)
            .await?
            .ok_or(MundaError::EquipmentNotFound(id))?;
        self.invalidate_catalog().await;
        Ok(equipment)
    }

    #[instrument(skip(self))]
    pub async fn delete_equipment(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        self.access.ensure_admin(user_id).await?;
        if !self.repo.delete_equipment(id).await? {
            return Err(MundaError::EquipmentNotFound(id));
        }
        self.invalidate_catalog().await;
        info!(equipment_id = %id, "目录装备已删除");
        Ok(())
    }

    #[instrument(skip(self, input), fields(name = %input.fighter_type))]
    pub async fn create_fighter_type(
        &self,
        user_id: Uuid,
        input: FighterTypeInput,
    ) -> Result<FighterType> {
        self.access.ensure_admin(user_id).await?;
        validate_cost(input.cost)?;
        let fighter_type = self.repo.create_fighter_type(&input).await?;
        self.invalidate_catalog().await;
        info!(fighter_type_id = %fighter_type.id, "战士类型已创建");
        Ok(fighter_type)
    }

    #[instrument(skip(self, input))]
    pub async fn update_fighter_type(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: FighterTypeInput,
    ) -> Result<FighterType> {
        self.access.ensure_admin(user_id).await?;
        validate_cost(input.cost)?;
        let fighter_type = self
            .repo
            .update_fighter_type(id, &input)
            .await?
            .ok_or(MundaError::FighterTypeNotFound(id))?;
        self.invalidate_catalog().await;
        Ok(fighter_type)
    }

    #[instrument(skip(self))]
    pub async fn delete_fighter_type(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        self.access.ensure_admin(user_id).await?;
        if !self.repo.delete_fighter_type(id).await? {
            return Err(MundaError::FighterTypeNotFound(id));
        }
        self.invalidate_catalog().await;
        info!(fighter_type_id = %id, "战士类型已删除");
        Ok(())
    }

    /// 设置战士类型在某帮派类型下的专属价格
    #[instrument(skip(self))]
    pub async fn set_gang_cost(
        &self,
        user_id: Uuid,
        fighter_type_id: Uuid,
        gang_type_id: Uuid,
        adjusted_cost: i32,
    ) -> Result<()> {
        self.access.ensure_admin(user_id).await?;
        validate_cost(adjusted_cost)?;
        if self.repo.get_fighter_type(fighter_type_id).await?.is_none() {
            return Err(MundaError::FighterTypeNotFound(fighter_type_id));
        }
        self.repo
            .set_gang_cost(fighter_type_id, gang_type_id, adjusted_cost)
            .await?;
        self.invalidate_catalog().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FighterStats;
    use chrono::Utc;

    fn custom(gang_type_id: Option<Uuid>) -> CustomFighterType {
        CustomFighterType {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            fighter_type: "Hired Brute".to_string(),
            gang_type_id,
            fighter_class: "Brute".to_string(),
            cost: 150,
            stats: FighterStats::default(),
            special_rules: vec![],
            free_skill: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_custom_types_for_gang() {
        let goliath = Uuid::new_v4();
        let escher = Uuid::new_v4();
        let types = vec![custom(None), custom(Some(goliath)), custom(Some(escher))];

        let available = custom_types_for_gang(types, goliath);
        assert_eq!(available.len(), 2);
        assert!(available
            .iter()
            .all(|t| t.gang_type_id.is_none() || t.gang_type_id == Some(goliath)));
    }

    #[test]
    fn test_validate_cost() {
        assert!(validate_cost(0).is_ok());
        assert!(matches!(validate_cost(-5), Err(MundaError::Validation(_))));
    }
}
