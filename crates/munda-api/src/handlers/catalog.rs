//! 目录只读 API
//!
//! 帮派类型、战士类型、装备、载具类型、技能与效果类型。
//! 所有已登录用户可读。

use axum::{
    Json,
    extract::{Query, State},
};

use munda_core::dto::FighterTypeListing;
use munda_core::{EffectTypeWithModifiers, Equipment, GangType, Skill, VehicleType};

use crate::{
    auth::AuthUser,
    dto::{ApiResponse, CategoryQuery, EffectTypeQuery, FighterTypeQuery, GangTypeFilter, SkillQuery},
    error::Result,
    state::AppState,
};

/// GET /api/catalog/gang-types
pub async fn gang_types(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<GangType>>>> {
    let types = state.catalog.gang_types().await?;
    Ok(Json(ApiResponse::success(types)))
}

/// 可招募的战士类型，价格已按帮派类型调整
///
/// GET /api/catalog/fighter-types?gangTypeId=
pub async fn fighter_types(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<FighterTypeQuery>,
) -> Result<Json<ApiResponse<FighterTypeListing>>> {
    let listing = state
        .catalog
        .fighter_types_with_cost(query.gang_type_id, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(listing)))
}

/// GET /api/catalog/equipment?category=
pub async fn equipment(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<ApiResponse<Vec<Equipment>>>> {
    let items = state.catalog.equipment(query.category).await?;
    Ok(Json(ApiResponse::success(items)))
}

/// GET /api/catalog/vehicle-types?gangTypeId=
pub async fn vehicle_types(
    State(state): State<AppState>,
    Query(filter): Query<GangTypeFilter>,
) -> Result<Json<ApiResponse<Vec<VehicleType>>>> {
    let types = state.catalog.vehicle_types(filter.gang_type_id).await?;
    Ok(Json(ApiResponse::success(types)))
}

/// GET /api/catalog/skills?skillTypeId=
pub async fn skills(
    State(state): State<AppState>,
    Query(query): Query<SkillQuery>,
) -> Result<Json<ApiResponse<Vec<Skill>>>> {
    let skills = state.catalog.skills(query.skill_type_id).await?;
    Ok(Json(ApiResponse::success(skills)))
}

/// GET /api/catalog/effect-types?category=injuries
pub async fn effect_types(
    State(state): State<AppState>,
    Query(query): Query<EffectTypeQuery>,
) -> Result<Json<ApiResponse<Vec<EffectTypeWithModifiers>>>> {
    let types = state.catalog.effect_types(&query.category).await?;
    Ok(Json(ApiResponse::success(types)))
}
