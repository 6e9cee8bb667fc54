//! 权限判定
//!
//! 帮派写操作允许：帮派所有者、管理员、帮派所在战役的所有者或仲裁者。
//! 战役操作按成员角色判定，管理员不受限制。

use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{MundaError, Result};
use crate::models::{CampaignRole, UserRole};
use crate::repository::{AccessRepository, AccessRepositoryTrait};

/// 生产环境使用的权限判定
pub type Access = AccessControl<AccessRepository>;

pub struct AccessControl<R: AccessRepositoryTrait> {
    repo: Arc<R>,
}

impl<R: AccessRepositoryTrait> AccessControl<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn is_admin(&self, user_id: Uuid) -> Result<bool> {
        Ok(self.repo.user_role(user_id).await? == Some(UserRole::Admin))
    }

    /// 用户档案是否存在
    pub async fn profile_exists(&self, user_id: Uuid) -> Result<bool> {
        Ok(self.repo.user_role(user_id).await?.is_some())
    }

    #[instrument(skip(self))]
    pub async fn ensure_admin(&self, user_id: Uuid) -> Result<()> {
        if self.is_admin(user_id).await? {
            Ok(())
        } else {
            Err(MundaError::PermissionDenied("需要管理员权限".to_string()))
        }
    }

    /// 校验用户可修改该帮派
    #[instrument(skip(self))]
    pub async fn ensure_gang_access(&self, user_id: Uuid, gang_id: Uuid) -> Result<()> {
        let owner = self
            .repo
            .gang_owner(gang_id)
            .await?
            .ok_or(MundaError::GangNotFound(gang_id))?;

        if owner == user_id {
            return Ok(());
        }

        if self.is_admin(user_id).await? {
            debug!("管理员访问帮派");
            return Ok(());
        }

        let roles = self.repo.campaign_roles_for_gang(gang_id, user_id).await?;
        if roles.iter().any(CampaignRole::can_manage) {
            debug!("战役管理者访问帮派");
            return Ok(());
        }

        Err(MundaError::PermissionDenied(
            "无权修改该帮派".to_string(),
        ))
    }

    /// 用户在战役中的角色；战役不存在返回 CampaignNotFound
    pub async fn campaign_role(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
    ) -> Result<Option<CampaignRole>> {
        if !self.repo.campaign_exists(campaign_id).await? {
            return Err(MundaError::CampaignNotFound(campaign_id));
        }
        self.repo.campaign_role(campaign_id, user_id).await
    }

    /// 校验用户在战役中具备指定角色之一，管理员直接通过
    ///
    /// 返回用户的实际角色（管理员且非成员时为 None）
    #[instrument(skip(self, allowed))]
    pub async fn ensure_campaign_role(
        &self,
        user_id: Uuid,
        campaign_id: Uuid,
        allowed: &[CampaignRole],
    ) -> Result<Option<CampaignRole>> {
        let role = self.campaign_role(user_id, campaign_id).await?;

        if let Some(r) = role
            && allowed.contains(&r)
        {
            return Ok(role);
        }

        if self.is_admin(user_id).await? {
            return Ok(role);
        }

        Err(MundaError::PermissionDenied(
            "战役权限不足".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockAccessRepositoryTrait;
    use mockall::predicate::eq;

    fn control(repo: MockAccessRepositoryTrait) -> AccessControl<MockAccessRepositoryTrait> {
        AccessControl::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn test_owner_has_gang_access() {
        let user = Uuid::new_v4();
        let gang = Uuid::new_v4();
        let mut repo = MockAccessRepositoryTrait::new();
        repo.expect_gang_owner()
            .with(eq(gang))
            .returning(move |_| Ok(Some(user)));
        repo.expect_user_role().never();

        assert!(control(repo).ensure_gang_access(user, gang).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_gang_is_not_found() {
        let mut repo = MockAccessRepositoryTrait::new();
        repo.expect_gang_owner().returning(|_| Ok(None));

        let err = control(repo)
            .ensure_gang_access(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, MundaError::GangNotFound(_)));
    }

    #[tokio::test]
    async fn test_admin_has_gang_access() {
        let mut repo = MockAccessRepositoryTrait::new();
        repo.expect_gang_owner()
            .returning(|_| Ok(Some(Uuid::new_v4())));
        repo.expect_user_role()
            .returning(|_| Ok(Some(UserRole::Admin)));
        repo.expect_campaign_roles_for_gang().never();

        assert!(
            control(repo)
                .ensure_gang_access(Uuid::new_v4(), Uuid::new_v4())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_campaign_arbitrator_has_gang_access() {
        let mut repo = MockAccessRepositoryTrait::new();
        repo.expect_gang_owner()
            .returning(|_| Ok(Some(Uuid::new_v4())));
        repo.expect_user_role()
            .returning(|_| Ok(Some(UserRole::User)));
        repo.expect_campaign_roles_for_gang()
            .returning(|_, _| Ok(vec![CampaignRole::Arbitrator]));

        assert!(
            control(repo)
                .ensure_gang_access(Uuid::new_v4(), Uuid::new_v4())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_campaign_member_denied() {
        let mut repo = MockAccessRepositoryTrait::new();
        repo.expect_gang_owner()
            .returning(|_| Ok(Some(Uuid::new_v4())));
        repo.expect_user_role()
            .returning(|_| Ok(Some(UserRole::User)));
        repo.expect_campaign_roles_for_gang()
            .returning(|_, _| Ok(vec![CampaignRole::Member]));

        let err = control(repo)
            .ensure_gang_access(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, MundaError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_ensure_admin() {
        let mut repo = MockAccessRepositoryTrait::new();
        repo.expect_user_role().returning(|_| Ok(None));

        let err = control(repo).ensure_admin(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, MundaError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_campaign_role_checks() {
        let campaign = Uuid::new_v4();
        let mut repo = MockAccessRepositoryTrait::new();
        repo.expect_campaign_exists()
            .with(eq(campaign))
            .returning(|_| Ok(true));
        repo.expect_campaign_role()
            .returning(|_, _| Ok(Some(CampaignRole::Arbitrator)));
        repo.expect_user_role()
            .returning(|_| Ok(Some(UserRole::User)));
        let access = control(repo);
        let user = Uuid::new_v4();

        let role = access
            .ensure_campaign_role(user, campaign, &[CampaignRole::Owner, CampaignRole::Arbitrator])
            .await
            .unwrap();
        assert_eq!(role, Some(CampaignRole::Arbitrator));

        let err = access
            .ensure_campaign_role(user, campaign, &[CampaignRole::Owner])
            .await
            .unwrap_err();
        assert!(matches!(err, MundaError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_missing_campaign_is_not_found() {
        let mut repo = MockAccessRepositoryTrait::new();
        repo.expect_campaign_exists().returning(|_| Ok(false));

        let err = control(repo)
            .ensure_campaign_role(Uuid::new_v4(), Uuid::new_v4(), &[CampaignRole::Owner])
            .await
            .unwrap_err();
        assert!(matches!(err, MundaError::CampaignNotFound(_)));
    }
}
