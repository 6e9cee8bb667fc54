//! 战役 API 处理器
//!
//! 战役、成员、参战帮派、领地与资源

use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;
use validator::Validate;

use munda_core::dto::CampaignDetail;
use munda_core::{
    Campaign, CampaignChanges, CampaignGangResource, CampaignMember, CampaignResource,
    CampaignTerritory,
};

use crate::{
    auth::AuthUser,
    dto::{
        AddCampaignGangBody, AddMemberBody, AddResourceBody, AddTerritoryBody, ApiResponse,
        AssignTerritoryBody, ChangeRoleBody, CreateCampaignBody, DeletedResponse,
        RuinTerritoryBody, SetGangResourceBody,
    },
    error::Result,
    state::AppState,
};

/// POST /api/campaigns
pub async fn create_campaign(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateCampaignBody>,
) -> Result<Json<ApiResponse<Campaign>>> {
    body.validate()?;
    let campaign = state
        .campaigns
        .create_campaign(user.user_id, body.into())
        .await?;
    Ok(Json(ApiResponse::success(campaign)))
}

/// GET /api/campaigns
pub async fn list_my_campaigns(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<Campaign>>>> {
    let campaigns = state.campaigns.list_user_campaigns(user.user_id).await?;
    Ok(Json(ApiResponse::success(campaigns)))
}

/// GET /api/campaigns/{id}
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CampaignDetail>>> {
    let detail = state.campaigns.get_campaign(id).await?;
    Ok(Json(ApiResponse::success(detail)))
}

/// PATCH /api/campaigns/{id}
pub async fn update_campaign(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(changes): Json<CampaignChanges>,
) -> Result<Json<ApiResponse<Campaign>>> {
    let campaign = state
        .campaigns
        .update_campaign(user.user_id, id, changes)
        .await?;
    Ok(Json(ApiResponse::success(campaign)))
}

/// DELETE /api/campaigns/{id}
pub async fn delete_campaign(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedResponse>>> {
    state.campaigns.delete_campaign(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(DeletedResponse { id })))
}

// ==================== 成员 ====================

/// POST /api/campaigns/{id}/members
pub async fn add_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AddMemberBody>,
) -> Result<Json<ApiResponse<CampaignMember>>> {
    let member = state
        .campaigns
        .add_member(user.user_id, id, body.user_id, body.role)
        .await?;
    Ok(Json(ApiResponse::success(member)))
}

/// PATCH /api/campaign-members/{member_id}
pub async fn change_member_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path(member_id): Path<Uuid>,
    Json(body): Json<ChangeRoleBody>,
) -> Result<Json<ApiResponse<CampaignMember>>> {
    let member = state
        .campaigns
        .change_member_role(user.user_id, member_id, body.role)
        .await?;
    Ok(Json(ApiResponse::success(member)))
}

/// 移除成员，其帮派一并退出战役；返回退出的帮派
///
/// DELETE /api/campaign-members/{member_id}
pub async fn remove_member(
    State(state): State<AppState>,
    user: AuthUser,
    Path(member_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<Uuid>>>> {
    let gangs = state.campaigns.remove_member(user.user_id, member_id).await?;
    Ok(Json(ApiResponse::success(gangs)))
}

// ==================== 参战帮派 ====================

/// POST /api/campaigns/{id}/gangs
pub async fn add_gang(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AddCampaignGangBody>,
) -> Result<Json<ApiResponse<DeletedResponse>>> {
    let campaign_gang_id = state.campaigns.add_gang(user.user_id, id, body.gang_id).await?;
    Ok(Json(ApiResponse::success(DeletedResponse {
        id: campaign_gang_id,
    })))
}

/// DELETE /api/campaigns/{id}/gangs/{gang_id}
pub async fn remove_gang(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, gang_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<DeletedResponse>>> {
    state.campaigns.remove_gang(user.user_id, id, gang_id).await?;
    Ok(Json(ApiResponse::success(DeletedResponse { id: gang_id })))
}

// ==================== 领地 ====================

/// POST /api/campaigns/{id}/territories
pub async fn add_territory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AddTerritoryBody>,
) -> Result<Json<ApiResponse<CampaignTerritory>>> {
    body.validate()?;
    let territory = state
        .campaigns
        .add_territory(user.user_id, id, &body.territory_name)
        .await?;
    Ok(Json(ApiResponse::success(territory)))
}

/// PUT /api/territories/{id}/gang
pub async fn assign_territory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignTerritoryBody>,
) -> Result<Json<ApiResponse<CampaignTerritory>>> {
    let territory = state
        .campaigns
        .assign_territory(user.user_id, id, body.gang_id)
        .await?;
    Ok(Json(ApiResponse::success(territory)))
}

/// PATCH /api/territories/{id}
pub async fn set_territory_ruined(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RuinTerritoryBody>,
) -> Result<Json<ApiResponse<CampaignTerritory>>> {
    let territory = state
        .campaigns
        .set_territory_ruined(user.user_id, id, body.ruined)
        .await?;
    Ok(Json(ApiResponse::success(territory)))
}

/// DELETE /api/territories/{id}
pub async fn delete_territory(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<DeletedResponse>>> {
    state.campaigns.delete_territory(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(DeletedResponse { id })))
}

// ==================== 资源 ====================

/// POST /api/campaigns/{id}/resources
pub async fn add_resource(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AddResourceBody>,
) -> Result<Json<ApiResponse<CampaignResource>>> {
    body.validate()?;
    let resource = state
        .campaigns
        .add_resource(user.user_id, id, &body.resource_name)
        .await?;
    Ok(Json(ApiResponse::success(resource)))
}

/// PUT /api/campaigns/{id}/gangs/{gang_id}/resources/{resource_id}
pub async fn set_gang_resource(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, gang_id, resource_id)): Path<(Uuid, Uuid, Uuid)>,
    Json(body): Json<SetGangResourceBody>,
) -> Result<Json<ApiResponse<CampaignGangResource>>> {
    body.validate()?;
    let resource = state
        .campaigns
        .set_gang_resource(user.user_id, id, gang_id, resource_id, body.quantity)
        .await?;
    Ok(Json(ApiResponse::success(resource)))
}
