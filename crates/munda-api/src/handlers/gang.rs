//! 帮派 API 处理器

use axum::{
    Json,
    extract::{Path, Query, State},
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use munda_core::dto::{GangDetail, RatingRecalculation};
use munda_core::{FighterEquipment, Gang, GangLog};

use crate::{
    auth::AuthUser,
    dto::{ApiResponse, CreateGangBody, DeletedResponse, PageResponse, PaginationParams, UpdateGangBody},
    error::Result,
    state::AppState,
};

/// 创建帮派
///
/// POST /api/gangs
pub async fn create_gang(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateGangBody>,
) -> Result<Json<ApiResponse<Gang>>> {
    body.validate()?;
    let gang = state.gangs.create_gang(user.user_id, body.into()).await?;
    info!(gang_id = %gang.id, user_id = %user.user_id, "Gang created");
    Ok(Json(ApiResponse::success(gang)))
}

/// 当前用户的帮派
///
/// GET /api/gangs
pub async fn list_my_gangs(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<Gang>>>> {
    let gangs = state.gangs.list_user_gangs(user.user_id).await?;
    Ok(Json(ApiResponse::success(gangs)))
}

/// GET /api/gangs/{id}
pub async fn get_gang(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<GangDetail>>> {
    let detail = state.gangs.get_gang(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// PATCH /api/gangs/{id}
pub async fn update_gang(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateGangBody>,
) -> Result<Json<ApiResponse<Gang>>> {
    body.validate()?;
    let gang = state.gangs.update_gang(user.user_id, id, body.into()).await?;
    Ok(Json(ApiResponse::success(gang)))
}

/// DELETE /api/gangs/{id}
pub async fn delete_gang(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedResponse>>> {
    state.gangs.delete_gang(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(DeletedResponse { id })))
}

/// 从零重算评分
///
/// POST /api/gangs/{id}/rating/recalculate
pub async fn recalculate_rating(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RatingRecalculation>>> {
    let result = state.gangs.recalculate_rating(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// GET /api/gangs/{id}/stash
pub async fn list_stash(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<FighterEquipment>>>> {
    let items = state.gangs.list_stash(id).await?;
    Ok(Json(ApiResponse::success(items)))
}

/// GET /api/gangs/{id}/logs?page=&pageSize=
pub async fn list_logs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PageResponse<GangLog>>>> {
    let page = state
        .gangs
        .list_logs(id, params.page(), params.page_size())
        .await?;
    Ok(Json(ApiResponse::success(page.into())))
}
