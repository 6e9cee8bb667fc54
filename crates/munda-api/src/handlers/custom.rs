//! 用户自定义内容 API
//!
//! 仅对创建者可见

use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use munda_core::repository::{CustomEquipmentInput, CustomFighterTypeInput};
use munda_core::{CustomEquipment, CustomFighterType};

use crate::{
    auth::AuthUser,
    dto::{ApiResponse, DeletedResponse},
    error::Result,
    state::AppState,
};

/// GET /api/custom/equipment
pub async fn list_equipment(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<CustomEquipment>>>> {
    let items = state.custom.list_equipment(user.user_id).await?;
    Ok(Json(ApiResponse::success(items)))
}

/// POST /api/custom/equipment
pub async fn create_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CustomEquipmentInput>,
) -> Result<Json<ApiResponse<CustomEquipment>>> {
    let item = state.custom.create_equipment(user.user_id, input).await?;
    Ok(Json(ApiResponse::success(item)))
}

/// PUT /api/custom/equipment/{id}
pub async fn update_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<CustomEquipmentInput>,
) -> Result<Json<ApiResponse<CustomEquipment>>> {
    let item = state.custom.update_equipment(user.user_id, id, input).await?;
    Ok(Json(ApiResponse::success(item)))
}

/// DELETE /api/custom/equipment/{id}
pub async fn delete_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedResponse>>> {
    state.custom.delete_equipment(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(DeletedResponse { id })))
}

/// GET /api/custom/fighter-types
pub async fn list_fighter_types(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<CustomFighterType>>>> {
    let types = state.custom.list_fighter_types(user.user_id).await?;
    Ok(Json(ApiResponse::success(types)))
}

/// GET /api/custom/fighter-types/{id}
pub async fn get_fighter_type(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CustomFighterType>>> {
    let fighter_type = state.custom.get_fighter_type(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(fighter_type)))
}

/// POST /api/custom/fighter-types
pub async fn create_fighter_type(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CustomFighterTypeInput>,
) -> Result<Json<ApiResponse<CustomFighterType>>> {
    let fighter_type = state.custom.create_fighter_type(user.user_id, input).await?;
    Ok(Json(ApiResponse::success(fighter_type)))
}

/// PUT /api/custom/fighter-types/{id}
pub async fn update_fighter_type(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<CustomFighterTypeInput>,
) -> Result<Json<ApiResponse<CustomFighterType>>> {
    let fighter_type = state
        .custom
        .update_fighter_type(user.user_id, id, input)
        .await?;
    Ok(Json(ApiResponse::success(fighter_type)))
}

/// DELETE /api/custom/fighter-types/{id}
pub async fn delete_fighter_type(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedResponse>>> {
    state.custom.delete_fighter_type(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(DeletedResponse { id })))
}
