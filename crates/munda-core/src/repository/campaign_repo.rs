//! 战役仓储
//!
//! 战役、成员、参战帮派、领地与资源

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::traits::CampaignRepositoryTrait;
use crate::error::Result;
use crate::models::{
    Campaign, CampaignChanges, CampaignGang, CampaignGangResource, CampaignMember,
    CampaignResource, CampaignRole, CampaignTerritory,
};

const CAMPAIGN_COLUMNS: &str = r#"
    id, campaign_name, description, status, has_meat, has_exploration_points,
    has_scavenging_rolls, created_at, updated_at
"#;

const MEMBER_SELECT: &str = r#"
    SELECT cm.id, cm.campaign_id, cm.user_id, p.username, cm.role, cm.invited_by, cm.joined_at
    FROM campaign_members cm
    JOIN profiles p ON p.id = cm.user_id
"#;

/// 战役仓储
pub struct CampaignRepository {
    pool: PgPool,
}

impl CampaignRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 战役 ====================

    pub async fn create_in_tx(
        tx: &mut PgConnection,
        campaign_name: &str,
        description: Option<&str>,
        has_meat: bool,
        has_exploration_points: bool,
        has_scavenging_rolls: bool,
    ) -> Result<Campaign> {
        let sql = format!(
            r#"
            INSERT INTO campaigns (campaign_name, description, has_meat,
                                   has_exploration_points, has_scavenging_rolls)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        );
        let campaign = sqlx::query_as::<_, Campaign>(&sql)
            .bind(campaign_name)
            .bind(description)
            .bind(has_meat)
            .bind(has_exploration_points)
            .bind(has_scavenging_rolls)
            .fetch_one(&mut *tx)
            .await?;
        Ok(campaign)
    }

    pub async fn update_in_tx(
        tx: &mut PgConnection,
        id: Uuid,
        changes: &CampaignChanges,
    ) -> Result<Option<Campaign>> {
        let sql = format!(
            r#"
            UPDATE campaigns
            SET campaign_name = COALESCE($2, campaign_name),
                description = COALESCE($3, description),
                status = COALESCE($4, status),
                has_meat = COALESCE($5, has_meat),
                has_exploration_points = COALESCE($6, has_exploration_points),
                has_scavenging_rolls = COALESCE($7, has_scavenging_rolls),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CAMPAIGN_COLUMNS}
            "#
        );
        let campaign = sqlx::query_as::<_, Campaign>(&sql)
            .bind(id)
            .bind(changes.campaign_name.as_deref())
            .bind(changes.description.as_deref())
            .bind(changes.status)
            .bind(changes.has_meat)
            .bind(changes.has_exploration_points)
            .bind(changes.has_scavenging_rolls)
            .fetch_optional(&mut *tx)
            .await?;
        Ok(campaign)
    }

    pub async fn delete_in_tx(tx: &mut PgConnection, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== 成员 ====================

    pub async fn add_member_in_tx(
        tx: &mut PgConnection,
        campaign_id: Uuid,
        user_id: Uuid,
        role: CampaignRole,
        invited_by: Option<Uuid>,
    ) -> Result<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO campaign_members (campaign_id, user_id, role, invited_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(campaign_id)
        .bind(user_id)
        .bind(role)
        .bind(invited_by)
        .fetch_one(&mut *tx)
        .await?;
        Ok(id)
    }

    pub async fn get_member_for_update(
        tx: &mut PgConnection,
        member_id: Uuid,
    ) -> Result<Option<CampaignMember>> {
        let sql = format!("{MEMBER_SELECT} WHERE cm.id = $1 FOR UPDATE OF cm");
        let member = sqlx::query_as::<_, CampaignMember>(&sql)
            .bind(member_id)
            .fetch_optional(&mut *tx)
            .await?;
        Ok(member)
    }

    pub async fn find_member_in_tx(
        tx: &mut PgConnection,
        campaign_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<CampaignMember>> {
        let sql = format!("{MEMBER_SELECT} WHERE cm.campaign_id = $1 AND cm.user_id = $2");
        let member = sqlx::query_as::<_, CampaignMember>(&sql)
            .bind(campaign_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;
        Ok(member)
    }

    pub async fn set_member_role_in_tx(
        tx: &mut PgConnection,
        member_id: Uuid,
        role: CampaignRole,
    ) -> Result<()> {
        sqlx::query("UPDATE campaign_members SET role = $2 WHERE id = $1")
            .bind(member_id)
            .bind(role)
            .execute(&mut *tx)
            .await?;
        Ok(())
    }

    /// 在事务中删除成员（其参战帮派由外键级联移除）
    pub async fn remove_member_in_tx(tx: &mut PgConnection, member_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM campaign_members WHERE id = $1")
            .bind(member_id)
            .execute(&mut *tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// 某成员登记的全部帮派 ID
    pub async fn list_member_gang_ids_in_tx(
        tx: &mut PgConnection,
        member_id: Uuid,
    ) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT gang_id FROM campaign_gangs WHERE campaign_member_id = $1",
        )
        .bind(member_id)
        .fetch_all(&mut *tx)
        .await?;
        Ok(ids)
    }

    // ==================== 参战帮派 ====================

    /// 帮派当前所在的战役（一个帮派最多参加一个战役）
    pub async fn find_gang_campaign_in_tx(
        tx: &mut PgConnection,
        gang_id: Uuid,
    ) -> Result<Option<(Uuid, Uuid)>> {
        let row = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT id, campaign_id FROM campaign_gangs WHERE gang_id = $1",
        )
        .bind(gang_id)
        .fetch_optional(&mut *tx)
        .await?;
        Ok(row)
    }

    pub async fn add_gang_in_tx(
        tx: &mut PgConnection,
        campaign_id: Uuid,
        gang_id: Uuid,
        member_id: Uuid,
        user_id: Uuid,
    ) -> Result<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO campaign_gangs (campaign_id, gang_id, campaign_member_id, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(campaign_id)
        .bind(gang_id)
        .bind(member_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        Ok(id)
    }

    pub async fn remove_gang_in_tx(
        tx: &mut PgConnection,
        campaign_id: Uuid,
        gang_id: Uuid,
    ) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM campaign_gangs WHERE campaign_id = $1 AND gang_id = $2")
                .bind(campaign_id)
                .bind(gang_id)
                .execute(&mut *tx)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// 释放帮派在战役中占有的领地，返回释放数量
    pub async fn release_territories_in_tx(
        tx: &mut PgConnection,
        campaign_id: Uuid,
        gang_id: Uuid,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE campaign_territories SET gang_id = NULL WHERE campaign_id = $1 AND gang_id = $2",
        )
        .bind(campaign_id)
        .bind(gang_id)
        .execute(&mut *tx)
        .await?;
        Ok(result.rows_affected())
    }

    // ==================== 领地 ====================

    pub async fn get_territory_for_update(
        tx: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<CampaignTerritory>> {
        let territory = sqlx::query_as::<_, CampaignTerritory>(
            r#"
            SELECT id, campaign_id, territory_name, gang_id, ruined, created_at
            FROM campaign_territories
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        Ok(territory)
    }

    pub async fn add_territory_in_tx(
        tx: &mut PgConnection,
        campaign_id: Uuid,
        territory_name: &str,
    ) -> Result<CampaignTerritory> {
        let territory = sqlx::query_as::<_, CampaignTerritory>(
            r#"
            INSERT INTO campaign_territories (campaign_id, territory_name)
            VALUES ($1, $2)
            RETURNING id, campaign_id, territory_name, gang_id, ruined, created_at
            "#,
        )
        .bind(campaign_id)
        .bind(territory_name)
        .fetch_one(&mut *tx)
        .await?;
        Ok(territory)
    }

    pub async fn update_territory_in_tx(
        tx: &mut PgConnection,
        id: Uuid,
        gang_id: Option<Uuid>,
        ruined: bool,
    ) -> Result<CampaignTerritory> {
        let territory = sqlx::query_as::<_, CampaignTerritory>(
            r#"
            UPDATE campaign_territories
            SET gang_id = $2, ruined = $3
            WHERE id = $1
            RETURNING id, campaign_id, territory_name, gang_id, ruined, created_at
            "#,
        )
        .bind(id)
        .bind(gang_id)
        .bind(ruined)
        .fetch_one(&mut *tx)
        .await?;
        Ok(territory)
    }

    pub async fn delete_territory_in_tx(tx: &mut PgConnection, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM campaign_territories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== 资源 ====================

    pub async fn add_resource_in_tx(
        tx: &mut PgConnection,
        campaign_id: Uuid,
        resource_name: &str,
    ) -> Result<CampaignResource> {
        let resource = sqlx::query_as::<_, CampaignResource>(
            r#"
            INSERT INTO campaign_resources (campaign_id, resource_name)
            VALUES ($1, $2)
            RETURNING id, campaign_id, resource_name
            "#,
        )
        .bind(campaign_id)
        .bind(resource_name)
        .fetch_one(&mut *tx)
        .await?;
        Ok(resource)
    }

    pub async fn get_resource_in_tx(
        tx: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<CampaignResource>> {
        let resource = sqlx::query_as::<_, CampaignResource>(
            "SELECT id, campaign_id, resource_name FROM campaign_resources WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        Ok(resource)
    }

    /// 写入帮派持有的资源数量（不存在则插入）
    pub async fn set_gang_resource_in_tx(
        tx: &mut PgConnection,
        campaign_gang_id: Uuid,
        resource_id: Uuid,
        quantity: i32,
    ) -> Result<CampaignGangResource> {
        let row = sqlx::query_as::<_, CampaignGangResource>(
            r#"
            INSERT INTO campaign_gang_resources (campaign_gang_id, campaign_resource_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (campaign_gang_id, campaign_resource_id)
            DO UPDATE SET quantity = EXCLUDED.quantity
            RETURNING campaign_gang_id, campaign_resource_id, quantity
            "#,
        )
        .bind(campaign_gang_id)
        .bind(resource_id)
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await?;
        Ok(row)
    }
}

#[async_trait]
impl CampaignRepositoryTrait for CampaignRepository {
    async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>> {
        let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE id = $1");
        let campaign = sqlx::query_as::<_, Campaign>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(campaign)
    }

    async fn list_user_campaigns(&self, user_id: Uuid) -> Result<Vec<Campaign>> {
        let sql = format!(
            r#"
            SELECT {CAMPAIGN_COLUMNS} FROM campaigns
            WHERE id IN (SELECT campaign_id FROM campaign_members WHERE user_id = $1)
            ORDER BY updated_at DESC
            "#
        );
        let campaigns = sqlx::query_as::<_, Campaign>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(campaigns)
    }

    async fn list_members(&self, campaign_id: Uuid) -> Result<Vec<CampaignMember>> {
        let sql = format!("{MEMBER_SELECT} WHERE cm.campaign_id = $1 ORDER BY cm.joined_at");
        let members = sqlx::query_as::<_, CampaignMember>(&sql)
            .bind(campaign_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(members)
    }

    async fn get_member(&self, member_id: Uuid) -> Result<Option<CampaignMember>> {
        let sql = format!("{MEMBER_SELECT} WHERE cm.id = $1");
        let member = sqlx::query_as::<_, CampaignMember>(&sql)
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(member)
    }

    async fn list_gangs(&self, campaign_id: Uuid) -> Result<Vec<CampaignGang>> {
        let gangs = sqlx::query_as::<_, CampaignGang>(
            r#"
            SELECT cg.id, cg.campaign_id, cg.gang_id, cg.campaign_member_id, cg.user_id,
                   g.name AS gang_name, g.rating, cg.joined_at
            FROM campaign_gangs cg
            JOIN gangs g ON g.id = cg.gang_id
            WHERE cg.campaign_id = $1
            ORDER BY g.rating DESC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(gangs)
    }

    async fn list_territories(&self, campaign_id: Uuid) -> Result<Vec<CampaignTerritory>> {
        let territories = sqlx::query_as::<_, CampaignTerritory>(
            r#"
            SELECT id, campaign_id, territory_name, gang_id, ruined, created_at
            FROM campaign_territories
            WHERE campaign_id = $1
            ORDER BY territory_name
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(territories)
    }

    async fn list_resources(&self, campaign_id: Uuid) -> Result<Vec<CampaignResource>> {
        let resources = sqlx::query_as::<_, CampaignResource>(
            r#"
            SELECT id, campaign_id, resource_name
            FROM campaign_resources
            WHERE campaign_id = $1
            ORDER BY resource_name
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(resources)
    }

    async fn list_gang_resources(&self, campaign_id: Uuid) -> Result<Vec<CampaignGangResource>> {
        let rows = sqlx::query_as::<_, CampaignGangResource>(
            r#"
            SELECT cgr.campaign_gang_id, cgr.campaign_resource_id, cgr.quantity
            FROM campaign_gang_resources cgr
            JOIN campaign_gangs cg ON cg.id = cgr.campaign_gang_id
            WHERE cg.campaign_id = $1
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
