//! 领域错误类型
//!
//! 定义服务层的业务错误和系统错误

use thiserror::Error;
use uuid::Uuid;

use munda_shared::error::SharedError;

/// 领域错误类型
#[derive(Debug, Error)]
pub enum MundaError {
    // === 帮派与战士 ===
    #[error("帮派不存在: {0}")]
    GangNotFound(Uuid),

    #[error("战士不存在: {0}")]
    FighterNotFound(Uuid),

    #[error("载具不存在: {0}")]
    VehicleNotFound(Uuid),

    // === 装备 ===
    #[error("装备不存在: {0}")]
    EquipmentNotFound(Uuid),

    #[error("已购装备不存在: {0}")]
    FighterEquipmentNotFound(Uuid),

    #[error("自定义装备不存在: {0}")]
    CustomEquipmentNotFound(Uuid),

    // === 效果与技能 ===
    #[error("效果不存在: {0}")]
    EffectNotFound(Uuid),

    #[error("效果类型不存在: {0}")]
    EffectTypeNotFound(Uuid),

    #[error("技能不存在: {0}")]
    SkillNotFound(Uuid),

    // === 目录 ===
    #[error("战士类型不存在: {0}")]
    FighterTypeNotFound(Uuid),

    #[error("自定义战士类型不存在: {0}")]
    CustomFighterTypeNotFound(Uuid),

    #[error("载具类型不存在: {0}")]
    VehicleTypeNotFound(Uuid),

    // === 战役 ===
    #[error("战役不存在: {0}")]
    CampaignNotFound(Uuid),

    #[error("战役成员不存在: {0}")]
    CampaignMemberNotFound(Uuid),

    #[error("领地不存在: {0}")]
    TerritoryNotFound(Uuid),

    #[error("战役资源不存在: {0}")]
    ResourceNotFound(Uuid),

    // === 资源不足 ===
    #[error("信用点不足: 需要 {required}, 可用 {available}")]
    InsufficientCredits { required: i32, available: i32 },

    #[error("经验值不足: 需要 {required}, 可用 {available}")]
    InsufficientXp { required: i32, available: i32 },

    // === 通用业务错误 ===
    #[error("无权执行此操作: {0}")]
    PermissionDenied(String),

    #[error("数据冲突: {0}")]
    Conflict(String),

    #[error("参数校验失败: {0}")]
    Validation(String),

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("缓存错误: {0}")]
    Cache(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 领域 Result 类型别名
pub type Result<T> = std::result::Result<T, MundaError>;

impl From<SharedError> for MundaError {
    fn from(err: SharedError) -> Self {
        match err {
            SharedError::Database(e) => Self::Database(e),
            SharedError::CacheSerialization(e) => Self::Serialization(e),
            SharedError::Redis(e) => Self::Cache(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl MundaError {
    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        !matches!(
            self,
            Self::Database(_) | Self::Serialization(_) | Self::Cache(_) | Self::Internal(_)
        )
    }

    /// 是否为"资源不存在"类错误
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::GangNotFound(_)
                | Self::FighterNotFound(_)
                | Self::VehicleNotFound(_)
                | Self::EquipmentNotFound(_)
                | Self::FighterEquipmentNotFound(_)
                | Self::CustomEquipmentNotFound(_)
                | Self::EffectNotFound(_)
                | Self::EffectTypeNotFound(_)
                | Self::SkillNotFound(_)
                | Self::FighterTypeNotFound(_)
                | Self::CustomFighterTypeNotFound(_)
                | Self::VehicleTypeNotFound(_)
                | Self::CampaignNotFound(_)
                | Self::CampaignMemberNotFound(_)
                | Self::TerritoryNotFound(_)
                | Self::ResourceNotFound(_)
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::GangNotFound(_) => "GANG_NOT_FOUND",
            Self::FighterNotFound(_) => "FIGHTER_NOT_FOUND",
            Self::VehicleNotFound(_) => "VEHICLE_NOT_FOUND",
            Self::EquipmentNotFound(_) => "EQUIPMENT_NOT_FOUND",
            Self::FighterEquipmentNotFound(_) => "FIGHTER_EQUIPMENT_NOT_FOUND",
            Self::CustomEquipmentNotFound(_) => "CUSTOM_EQUIPMENT_NOT_FOUND",
            Self::EffectNotFound(_) => "EFFECT_NOT_FOUND",
            Self::EffectTypeNotFound(_) => "EFFECT_TYPE_NOT_FOUND",
            Self::SkillNotFound(_) => "SKILL_NOT_FOUND",
            Self::FighterTypeNotFound(_) => "FIGHTER_TYPE_NOT_FOUND",
            Self::CustomFighterTypeNotFound(_) => "CUSTOM_FIGHTER_TYPE_NOT_FOUND",
            Self::VehicleTypeNotFound(_) => "VEHICLE_TYPE_NOT_FOUND",
            Self::CampaignNotFound(_) => "CAMPAIGN_NOT_FOUND",
            Self::CampaignMemberNotFound(_) => "CAMPAIGN_MEMBER_NOT_FOUND",
            Self::TerritoryNotFound(_) => "TERRITORY_NOT_FOUND",
            Self::ResourceNotFound(_) => "RESOURCE_NOT_FOUND",
            Self::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            Self::InsufficientXp { .. } => "INSUFFICIENT_XP",
            Self::PermissionDenied(_) => "PERMISSION_DENIED",
            Self::Conflict(_) => "CONFLICT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_business_error() {
        assert!(MundaError::GangNotFound(Uuid::nil()).is_business_error());
        assert!(
            MundaError::InsufficientCredits {
                required: 50,
                available: 10
            }
            .is_business_error()
        );
        assert!(MundaError::Conflict("dup".to_string()).is_business_error());
        assert!(!MundaError::Database(sqlx::Error::RowNotFound).is_business_error());
        assert!(!MundaError::Internal("x".to_string()).is_business_error());
        assert!(!MundaError::Cache("down".to_string()).is_business_error());
    }

    #[test]
    fn test_not_found_classification() {
        assert!(MundaError::FighterNotFound(Uuid::nil()).is_not_found());
        assert!(MundaError::TerritoryNotFound(Uuid::nil()).is_not_found());
        assert!(!MundaError::Validation("bad".to_string()).is_not_found());
        assert!(!MundaError::PermissionDenied("no".to_string()).is_not_found());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            MundaError::GangNotFound(Uuid::nil()).error_code(),
            "GANG_NOT_FOUND"
        );
        assert_eq!(
            MundaError::InsufficientXp {
                required: 6,
                available: 2
            }
            .error_code(),
            "INSUFFICIENT_XP"
        );
        assert_eq!(
            MundaError::Validation("x".to_string()).error_code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_error_display_carries_amounts() {
        let err = MundaError::InsufficientCredits {
            required: 125,
            available: 40,
        };
        let msg = err.to_string();
        assert!(msg.contains("125"));
        assert!(msg.contains("40"));
    }

    #[test]
    fn test_from_shared_error() {
        let err: MundaError = SharedError::Internal("boom".to_string()).into();
        assert!(matches!(err, MundaError::Internal(_)));

        let err: MundaError = SharedError::Database(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, MundaError::Database(_)));
    }
}
