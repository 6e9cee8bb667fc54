//! 装备交易 API 处理器
//!
//! 购买、出售、删除与仓库转移

use axum::{
    Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;
use validator::Validate;

use munda_core::TradingPostItem;
use munda_core::dto::{PurchaseResult, SaleResult, StashMoveResult};

use crate::{
    auth::AuthUser,
    dto::{ApiResponse, BuyEquipmentBody, CategoryQuery, MoveFromStashBody, SellEquipmentBody},
    error::Result,
    state::AppState,
};

/// POST /api/equipment
pub async fn buy_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<BuyEquipmentBody>,
) -> Result<Json<ApiResponse<PurchaseResult>>> {
    body.validate()?;
    let result = state.equipment.buy_equipment(user.user_id, body.into()).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// POST /api/equipment/{id}/sell
pub async fn sell_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<SellEquipmentBody>,
) -> Result<Json<ApiResponse<SaleResult>>> {
    body.validate()?;
    let result = state
        .equipment
        .sell_equipment(user.user_id, id, body.manual_price)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// 删除不退款
///
/// DELETE /api/equipment/{id}
pub async fn delete_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<SaleResult>>> {
    let result = state.equipment.delete_equipment(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// POST /api/equipment/{id}/stash
pub async fn move_to_stash(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<StashMoveResult>>> {
    let result = state.equipment.move_to_stash(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(result)))
}

/// POST /api/stash/{id}/move
pub async fn move_from_stash(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<MoveFromStashBody>,
) -> Result<Json<ApiResponse<StashMoveResult>>> {
    let result = state
        .equipment
        .move_from_stash(user.user_id, id, body.target)
        .await?;
    Ok(Json(ApiResponse::success(result)))
}

/// 交易站：目录装备与调用者的自定义装备
///
/// GET /api/trading-post?category=
pub async fn trading_post(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<ApiResponse<Vec<TradingPostItem>>>> {
    let items = state
        .equipment
        .catalogue(user.user_id, query.category)
        .await?;
    Ok(Json(ApiResponse::success(items)))
}
