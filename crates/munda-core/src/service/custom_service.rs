//! 自定义内容服务
//!
//! 用户自建装备与战士类型，只对创建者可见。

use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{MundaError, Result};
use crate::models::{CustomEquipment, CustomFighterType};
use crate::repository::{
    CatalogRepository, CatalogRepositoryTrait, CustomContentRepository, CustomEquipmentInput,
    CustomFighterTypeInput,
};

fn validate(name: &str, cost: i32) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MundaError::Validation("名称不能为空".to_string()));
    }
    if cost < 0 {
        return Err(MundaError::Validation("价格不能为负数".to_string()));
    }
    Ok(())
}

pub struct CustomContentService {
    repo: CustomContentRepository,
    catalog_repo: CatalogRepository,
}

impl CustomContentService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: CustomContentRepository::new(pool.clone()),
            catalog_repo: CatalogRepository::new(pool),
        }
    }

    // ==================== 自定义装备 ====================

    pub async fn list_equipment(&self, user_id: Uuid) -> Result<Vec<CustomEquipment>> {
        self.repo.list_equipment(user_id).await
    }

    #[instrument(skip(self, input))]
    pub async fn create_equipment(
        &self,
        user_id: Uuid,
        input: CustomEquipmentInput,
    ) -> Result<CustomEquipment> {
        validate(&input.equipment_name, input.cost)?;
        let item = self.repo.create_equipment(user_id, &input).await?;
        info!(custom_equipment_id = %item.id, "自定义装备已创建");
        Ok(item)
    }

    #[instrument(skip(self, input))]
    pub async fn update_equipment(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: CustomEquipmentInput,
    ) -> Result<CustomEquipment> {
        validate(&input.equipment_name, input.cost)?;
        self.repo
            .update_equipment(user_id, id, &input)
            .await?
            .ok_or(MundaError::CustomEquipmentNotFound(id))
    }

    /// 删除自定义装备；已购买的装备行保留名称与价格
    #[instrument(skip(self))]
    pub async fn delete_equipment(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        if !self.repo.delete_equipment(user_id, id).await? {
            return Err(MundaError::CustomEquipmentNotFound(id));
        }
        info!(custom_equipment_id = %id, "自定义装备已删除");
        Ok(())
    }

    // ==================== 自定义战士类型 ====================

    pub async fn list_fighter_types(&self, user_id: Uuid) -> Result<Vec<CustomFighterType>> {
        self.catalog_repo.list_custom_fighter_types(user_id).await
    }

    pub async fn get_fighter_type(&self, user_id: Uuid, id: Uuid) -> Result<CustomFighterType> {
        self.repo
            .get_fighter_type(id)
            .await?
            .filter(|t| t.user_id == user_id)
            .ok_or(MundaError::CustomFighterTypeNotFound(id))
    }

    #[instrument(skip(self, input))]
    pub async fn create_fighter_type(
        &self,
        user_id: Uuid,
        input: CustomFighterTypeInput,
    ) -> Result<CustomFighterType> {
        validate(&input.fighter_type, input.cost)?;
        let fighter_type = self.repo.create_fighter_type(user_id, &input).await?;
        info!(custom_fighter_type_id = %fighter_type.id, "自定义战士类型已创建");
        Ok(fighter_type)
    }

    #[instrument(skip(self, input))]
    pub async fn update_fighter_type(
        &self,
        user_id: Uuid,
        id: Uuid,
        input: CustomFighterTypeInput,
    ) -> Result<CustomFighterType> {
        validate(&input.fighter_type, input.cost)?;
        self.repo
            .update_fighter_type(user_id, id, &input)
            .await?
            .ok_or(MundaError::CustomFighterTypeNotFound(id))
    }

    #[instrument(skip(self))]
    pub async fn delete_fighter_type(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        if !self.repo.delete_fighter_type(user_id, id).await? {
            return Err(MundaError::CustomFighterTypeNotFound(id));
        }
        info!(custom_fighter_type_id = %id, "自定义战士类型已删除");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(validate("Homebrew Blade", 25).is_ok());
        assert!(matches!(validate("  ", 25), Err(MundaError::Validation(_))));
        assert!(matches!(
            validate("Homebrew Blade", -1),
            Err(MundaError::Validation(_))
        ));
    }
}
