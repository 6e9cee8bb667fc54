//! 应用状态定义
//!
//! 包含 Axum 路由共享的服务实例

use std::sync::Arc;

use sqlx::PgPool;

use munda_core::{
    Access, AccessControl, AccessRepository, AdvancementService, CampaignService, CatalogService,
    CustomContentService, EquipmentService, FighterService, GangService, InjuryService,
    VehicleService,
};
use munda_shared::cache::Cache;
use munda_shared::config::AuthConfig;

use crate::auth::JwtManager;

/// Axum 应用共享状态
///
/// 服务均通过 Arc 在 handler 间共享
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub cache: Arc<Cache>,
    pub jwt_manager: Arc<JwtManager>,
    pub access: Arc<Access>,
    pub gangs: Arc<GangService>,
    pub fighters: Arc<FighterService>,
    pub equipment: Arc<EquipmentService>,
    pub advancements: Arc<AdvancementService>,
    pub injuries: Arc<InjuryService>,
    pub vehicles: Arc<VehicleService>,
    pub campaigns: Arc<CampaignService>,
    pub catalog: Arc<CatalogService>,
    pub custom: Arc<CustomContentService>,
}

impl AppState {
    pub fn new(pool: PgPool, cache: Arc<Cache>, auth: &AuthConfig, starting_credits: i32) -> Self {
        let access = Arc::new(AccessControl::new(Arc::new(AccessRepository::new(
            pool.clone(),
        ))));

        Self {
            jwt_manager: Arc::new(JwtManager::new(auth)),
            gangs: Arc::new(GangService::new(
                pool.clone(),
                cache.clone(),
                access.clone(),
                starting_credits,
            )),
            fighters: Arc::new(FighterService::new(pool.clone(), cache.clone(), access.clone())),
            equipment: Arc::new(EquipmentService::new(pool.clone(), cache.clone(), access.clone())),
            advancements: Arc::new(AdvancementService::new(
                pool.clone(),
                cache.clone(),
                access.clone(),
            )),
            injuries: Arc::new(InjuryService::new(pool.clone(), cache.clone(), access.clone())),
            vehicles: Arc::new(VehicleService::new(pool.clone(), cache.clone(), access.clone())),
            campaigns: Arc::new(CampaignService::new(pool.clone(), cache.clone(), access.clone())),
            catalog: Arc::new(CatalogService::new(pool.clone(), cache.clone(), access.clone())),
            custom: Arc::new(CustomContentService::new(pool.clone())),
            access,
            pool,
            cache,
        }
    }
}
