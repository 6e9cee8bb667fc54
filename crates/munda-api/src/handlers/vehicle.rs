//! 载具 API 处理器

use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;
use validator::Validate;

use munda_core::dto::{AddVehicleResult, CrewAssignment, RepairResult, VehicleDamageResult};
use munda_core::{RatingDelta, Vehicle};

use crate::{
    auth::AuthUser,
    dto::{
        AddDamageBody, AddVehicleBody, ApiResponse, AssignCrewBody, RenameVehicleBody,
        RepairDamageBody,
    },
    error::Result,
    state::AppState,
};

/// POST /api/vehicles
pub async fn add_vehicle(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<AddVehicleBody>,
) -> Result<Json<ApiResponse<AddVehicleResult>>> {
    body.validate()?;
    let result = state.vehicles.add_vehicle(user.user_id, body.into()).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// PATCH /api/vehicles/{id}
pub async fn rename_vehicle(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RenameVehicleBody>,
) -> Result<Json<ApiResponse<Vehicle>>> {
    body.validate()?;
    let vehicle = state
        .vehicles
        .rename_vehicle(user.user_id, id, &body.vehicle_name)
        .await?;
    Ok(Json(ApiResponse::success(vehicle)))
}

/// PUT /api/vehicles/{id}/crew
pub async fn assign_crew(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignCrewBody>,
) -> Result<Json<ApiResponse<CrewAssignment>>> {
    let result = state
        .vehicles
        .assign_crew(user.user_id, id, body.fighter_id)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// DELETE /api/vehicles/{id}
pub async fn delete_vehicle(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RatingDelta>>> {
    let delta = state.vehicles.delete_vehicle(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(delta)))
}

/// POST /api/vehicles/{id}/damages
pub async fn add_damage(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AddDamageBody>,
) -> Result<Json<ApiResponse<VehicleDamageResult>>> {
    let result = state
        .vehicles
        .add_damage(user.user_id, id, body.effect_type_id)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// POST /api/vehicles/{id}/damages/{effect_id}/repair
pub async fn repair_damage(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, effect_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<RepairDamageBody>,
) -> Result<Json<ApiResponse<RepairResult>>> {
    body.validate()?;
    let result = state
        .vehicles
        .repair_damage(user.user_id, id, effect_id, body.repair_cost)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}
