//! 权限查询仓储

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::traits::AccessRepositoryTrait;
use crate::error::Result;
use crate::models::{CampaignRole, UserRole};

pub struct AccessRepository {
    pool: PgPool,
}

impl AccessRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessRepositoryTrait for AccessRepository {
    async fn user_role(&self, user_id: Uuid) -> Result<Option<UserRole>> {
        let role = sqlx::query_scalar::<_, UserRole>("SELECT user_role FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(role)
    }

    async fn gang_owner(&self, gang_id: Uuid) -> Result<Option<Uuid>> {
        let owner = sqlx::query_scalar::<_, Uuid>("SELECT user_id FROM gangs WHERE id = $1")
            .bind(gang_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(owner)
    }

    async fn campaign_roles_for_gang(
        &self,
        gang_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<CampaignRole>> {
        let roles = sqlx::query_scalar::<_, CampaignRole>(
            r#"
            SELECT cm.role
            FROM campaign_gangs cg
            JOIN campaign_members cm ON cm.campaign_id = cg.campaign_id
            WHERE cg.gang_id = $1 AND cm.user_id = $2
            "#,
        )
        .bind(gang_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    async fn campaign_role(
        &self,
        campaign_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<CampaignRole>> {
        let role = sqlx::query_scalar::<_, CampaignRole>(
            "SELECT role FROM campaign_members WHERE campaign_id = $1 AND user_id = $2",
        )
        .bind(campaign_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    async fn campaign_exists(&self, campaign_id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM campaigns WHERE id = $1)")
                .bind(campaign_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}
