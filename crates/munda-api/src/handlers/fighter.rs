//! 战士 API 处理器
//!
//! 招募、状态、进阶与伤病

use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;
use validator::Validate;

use munda_core::dto::{
    AddFighterResult, AdvancementRemoval, CharacteristicAdvancementRequest,
    CharacteristicAdvancementResult, FighterDeletion, FighterDetail, InjuryResult,
    SkillAdvancementRequest, SkillAdvancementResult, StatusAction, StatusChangeResult,
};
use munda_core::{Fighter, RatingDelta};

use crate::{
    auth::AuthUser,
    dto::{AddFighterBody, AddInjuryBody, ApiResponse, UpdateFighterBody},
    error::Result,
    state::AppState,
};

/// POST /api/fighters
pub async fn add_fighter(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<AddFighterBody>,
) -> Result<Json<ApiResponse<AddFighterResult>>> {
    body.validate()?;
    let result = state.fighters.add_fighter(user.user_id, body.into()).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// GET /api/fighters/{id}
pub async fn get_fighter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FighterDetail>>> {
    let detail = state.fighters.get_fighter(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// PATCH /api/fighters/{id}
pub async fn update_fighter(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateFighterBody>,
) -> Result<Json<ApiResponse<Fighter>>> {
    body.validate()?;
    let fighter = state
        .fighters
        .update_fighter(user.user_id, id, body.into())
        .await?;
    Ok(Json(ApiResponse::success(fighter)))
}

/// 状态变更：`{"action": "kill"}`、`{"action": "enslave", "sell_value": 40}` 等
///
/// POST /api/fighters/{id}/status
pub async fn change_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(action): Json<StatusAction>,
) -> Result<Json<ApiResponse<StatusChangeResult>>> {
    let result = state.fighters.change_status(user.user_id, id, action).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// DELETE /api/fighters/{id}
pub async fn delete_fighter(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FighterDeletion>>> {
    let result = state.fighters.delete_fighter(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(result)))
}

// ==================== 进阶 ====================

/// POST /api/fighters/{id}/advancements/characteristic
pub async fn add_characteristic_advancement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CharacteristicAdvancementRequest>,
) -> Result<Json<ApiResponse<CharacteristicAdvancementResult>>> {
    let result = state
        .advancements
        .add_characteristic_advancement(user.user_id, id, body)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// POST /api/fighters/{id}/advancements/skill
pub async fn add_skill_advancement(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SkillAdvancementRequest>,
) -> Result<Json<ApiResponse<SkillAdvancementResult>>> {
    let result = state
        .advancements
        .add_skill_advancement(user.user_id, id, body)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// DELETE /api/fighters/{id}/advancements/{effect_id}
pub async fn delete_advancement(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, effect_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<AdvancementRemoval>>> {
    let result = state
        .advancements
        .delete_advancement(user.user_id, id, effect_id)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// DELETE /api/fighters/{id}/skills/{fighter_skill_id}
pub async fn delete_skill(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, fighter_skill_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<AdvancementRemoval>>> {
    let result = state
        .advancements
        .delete_skill(user.user_id, id, fighter_skill_id)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

// ==================== 伤病 ====================

/// POST /api/fighters/{id}/injuries
pub async fn add_injury(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AddInjuryBody>,
) -> Result<Json<ApiResponse<InjuryResult>>> {
    let result = state
        .injuries
        .add_injury(user.user_id, id, body.effect_type_id, body.send_to_recovery)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// DELETE /api/fighters/{id}/injuries/{effect_id}
pub async fn delete_injury(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, effect_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<RatingDelta>>> {
    let delta = state
        .injuries
        .delete_injury(user.user_id, id, effect_id)
        .await?;
    Ok(Json(ApiResponse::success(delta)))
}
