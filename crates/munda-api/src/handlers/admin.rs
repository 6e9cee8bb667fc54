//! 目录维护 API
//!
//! 挂在 `require_admin` 之后；服务层仍会再次校验管理员身份

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use munda_core::repository::{EquipmentInput, FighterTypeInput};
use munda_core::{Equipment, FighterType};

use crate::{
    auth::AuthUser,
    dto::{ApiResponse, DeletedResponse, GangCostBody},
    error::Result,
    state::AppState,
};

/// POST /api/admin/equipment
pub async fn create_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<EquipmentInput>,
) -> Result<Json<ApiResponse<Equipment>>> {
    let item = state.catalog.create_equipment(user.user_id, input).await?;
    info!(equipment_id = %item.id, admin = %user.user_id, "Catalog equipment created");
    Ok(Json(ApiResponse::success(item)))
}

/// PUT /api/admin/equipment/{id}
pub async fn update_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<EquipmentInput>,
) -> Result<Json<ApiResponse<Equipment>>> {
    let item = state.catalog.update_equipment(user.user_id, id, input).await?;
    Ok(Json(ApiResponse::success(item)))
}

/// DELETE /api/admin/equipment/{id}
pub async fn delete_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedResponse>>> {
    state.catalog.delete_equipment(user.user_id, id).await?;
    info!(equipment_id = %id, admin = %user.user_id, "Catalog equipment deleted");
    Ok(Json(ApiResponse::success(DeletedResponse { id })))
}

/// POST /api/admin/fighter-types
pub async fn create_fighter_type(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<FighterTypeInput>,
) -> Result<Json<ApiResponse<FighterType>>> {
    let fighter_type = state.catalog.create_fighter_type(user.user_id, input).await?;
    info!(fighter_type_id = %fighter_type.id, admin = %user.user_id, "Catalog fighter type created");
    Ok(Json(ApiResponse::success(fighter_type)))
}

/// PUT /api/admin/fighter-types/{id}
pub async fn update_fighter_type(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<FighterTypeInput>,
) -> Result<Json<ApiResponse<FighterType>>> {
    let fighter_type = state
        .catalog
        .update_fighter_type(user.user_id, id, input)
        .await?;
    Ok(Json(ApiResponse::success(fighter_type)))
}

/// DELETE /api/admin/fighter-types/{id}
pub async fn delete_fighter_type(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedResponse>>> {
    state.catalog.delete_fighter_type(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(DeletedResponse { id })))
}

/// 帮派类型专属价格
///
/// PUT /api/admin/fighter-types/{id}/gang-costs/{gang_type_id}
pub async fn set_gang_cost(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, gang_type_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<GangCostBody>,
) -> Result<Json<ApiResponse<()>>> {
    body.validate()?;
    state
        .catalog
        .set_gang_cost(user.user_id, id, gang_type_id, body.adjusted_cost)
        .await?;
    Ok(Json(ApiResponse::success(())))
}
