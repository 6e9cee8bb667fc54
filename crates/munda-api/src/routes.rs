//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, patch, post, put},
};

use munda_shared::observability::middleware as obs_middleware;

use crate::{
    handlers,
    middleware::{auth_middleware, require_admin},
    state::AppState,
};

/// 帮派路由
fn gang_routes() -> Router<AppState> {
    Router::new()
        .route("/gangs", post(handlers::gang::create_gang))
        .route("/gangs", get(handlers::gang::list_my_gangs))
        .route("/gangs/{id}", get(handlers::gang::get_gang))
        .route("/gangs/{id}", patch(handlers::gang::update_gang))
        .route("/gangs/{id}", delete(handlers::gang::delete_gang))
        .route(
            "/gangs/{id}/rating/recalculate",
            post(handlers::gang::recalculate_rating),
        )
        .route("/gangs/{id}/stash", get(handlers::gang::list_stash))
        .route("/gangs/{id}/logs", get(handlers::gang::list_logs))
}

/// 战士路由
///
/// 包含状态变更、进阶与伤病
fn fighter_routes() -> Router<AppState> {
    Router::new()
        .route("/fighters", post(handlers::fighter::add_fighter))
        .route("/fighters/{id}", get(handlers::fighter::get_fighter))
        .route("/fighters/{id}", patch(handlers::fighter::update_fighter))
        .route("/fighters/{id}", delete(handlers::fighter::delete_fighter))
        .route(
            "/fighters/{id}/status",
            post(handlers::fighter::change_status),
        )
        // 进阶
        .route(
            "/fighters/{id}/advancements/characteristic",
            post(handlers::fighter::add_characteristic_advancement),
        )
        .route(
            "/fighters/{id}/advancements/skill",
            post(handlers::fighter::add_skill_advancement),
        )
        .route(
            "/fighters/{id}/advancements/{effect_id}",
            delete(handlers::fighter::delete_advancement),
        )
        .route(
            "/fighters/{id}/skills/{fighter_skill_id}",
            delete(handlers::fighter::delete_skill),
        )
        // 伤病
        .route(
            "/fighters/{id}/injuries",
            post(handlers::fighter::add_injury),
        )
        .route(
            "/fighters/{id}/injuries/{effect_id}",
            delete(handlers::fighter::delete_injury),
        )
}

/// 装备交易路由
fn equipment_routes() -> Router<AppState> {
    Router::new()
        .route("/equipment", post(handlers::equipment::buy_equipment))
        .route(
            "/equipment/{id}",
            delete(handlers::equipment::delete_equipment),
        )
        .route(
            "/equipment/{id}/sell",
            post(handlers::equipment::sell_equipment),
        )
        .route(
            "/equipment/{id}/stash",
            post(handlers::equipment::move_to_stash),
        )
        .route("/stash/{id}/move", post(handlers::equipment::move_from_stash))
        .route("/trading-post", get(handlers::equipment::trading_post))
}

/// 载具路由
fn vehicle_routes() -> Router<AppState> {
    Router::new()
        .route("/vehicles", post(handlers::vehicle::add_vehicle))
        .route("/vehicles/{id}", patch(handlers::vehicle::rename_vehicle))
        .route("/vehicles/{id}", delete(handlers::vehicle::delete_vehicle))
        .route("/vehicles/{id}/crew", put(handlers::vehicle::assign_crew))
        .route("/vehicles/{id}/damages", post(handlers::vehicle::add_damage))
        .route(
            "/vehicles/{id}/damages/{effect_id}/repair",
            post(handlers::vehicle::repair_damage),
        )
}

/// 战役路由
fn campaign_routes() -> Router<AppState> {
    Router::new()
        .route("/campaigns", post(handlers::campaign::create_campaign))
        .route("/campaigns", get(handlers::campaign::list_my_campaigns))
        .route("/campaigns/{id}", get(handlers::campaign::get_campaign))
        .route("/campaigns/{id}", patch(handlers::campaign::update_campaign))
        .route(
            "/campaigns/{id}",
            delete(handlers::campaign::delete_campaign),
        )
        // 成员
        .route(
            "/campaigns/{id}/members",
            post(handlers::campaign::add_member),
        )
        .route(
            "/campaign-members/{member_id}",
            patch(handlers::campaign::change_member_role),
        )
        .route(
            "/campaign-members/{member_id}",
            delete(handlers::campaign::remove_member),
        )
        // 参战帮派
        .route("/campaigns/{id}/gangs", post(handlers::campaign::add_gang))
        .route(
            "/campaigns/{id}/gangs/{gang_id}",
            delete(handlers::campaign::remove_gang),
        )
        // 领地
        .route(
            "/campaigns/{id}/territories",
            post(handlers::campaign::add_territory),
        )
        .route(
            "/territories/{id}",
            patch(handlers::campaign::set_territory_ruined),
        )
        .route(
            "/territories/{id}",
            delete(handlers::campaign::delete_territory),
        )
        .route(
            "/territories/{id}/gang",
            put(handlers::campaign::assign_territory),
        )
        // 资源
        .route(
            "/campaigns/{id}/resources",
            post(handlers::campaign::add_resource),
        )
        .route(
            "/campaigns/{id}/gangs/{gang_id}/resources/{resource_id}",
            put(handlers::campaign::set_gang_resource),
        )
}

/// 目录只读路由
fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/catalog/gang-types", get(handlers::catalog::gang_types))
        .route(
            "/catalog/fighter-types",
            get(handlers::catalog::fighter_types),
        )
        .route("/catalog/equipment", get(handlers::catalog::equipment))
        .route(
            "/catalog/vehicle-types",
            get(handlers::catalog::vehicle_types),
        )
        .route("/catalog/skills", get(handlers::catalog::skills))
        .route(
            "/catalog/effect-types",
            get(handlers::catalog::effect_types),
        )
}

/// 自定义内容路由
fn custom_routes() -> Router<AppState> {
    Router::new()
        .route("/custom/equipment", get(handlers::custom::list_equipment))
        .route("/custom/equipment", post(handlers::custom::create_equipment))
        .route(
            "/custom/equipment/{id}",
            put(handlers::custom::update_equipment),
        )
        .route(
            "/custom/equipment/{id}",
            delete(handlers::custom::delete_equipment),
        )
        .route(
            "/custom/fighter-types",
            get(handlers::custom::list_fighter_types),
        )
        .route(
            "/custom/fighter-types",
            post(handlers::custom::create_fighter_type),
        )
        .route(
            "/custom/fighter-types/{id}",
            get(handlers::custom::get_fighter_type),
        )
        .route(
            "/custom/fighter-types/{id}",
            put(handlers::custom::update_fighter_type),
        )
        .route(
            "/custom/fighter-types/{id}",
            delete(handlers::custom::delete_fighter_type),
        )
}

/// 目录维护路由，仅管理员可访问
fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/equipment", post(handlers::admin::create_equipment))
        .route(
            "/admin/equipment/{id}",
            put(handlers::admin::update_equipment),
        )
        .route(
            "/admin/equipment/{id}",
            delete(handlers::admin::delete_equipment),
        )
        .route(
            "/admin/fighter-types",
            post(handlers::admin::create_fighter_type),
        )
        .route(
            "/admin/fighter-types/{id}",
            put(handlers::admin::update_fighter_type),
        )
        .route(
            "/admin/fighter-types/{id}",
            delete(handlers::admin::delete_fighter_type),
        )
        .route(
            "/admin/fighter-types/{id}/gang-costs/{gang_type_id}",
            put(handlers::admin::set_gang_cost),
        )
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

/// 构建全部业务路由（挂载在 /api 下）
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(gang_routes())
        .merge(fighter_routes())
        .merge(equipment_routes())
        .merge(vehicle_routes())
        .merge(campaign_routes())
        .merge(catalog_routes())
        .merge(custom_routes())
        .merge(admin_routes(state))
}

/// 构建完整应用路由
///
/// CORS 由调用方按部署环境追加
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes(state.clone()))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}

/// 为所有响应注入 HTTP 安全头
async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        HeaderName::from_static("strict-transport-security"),
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    // 旧的 XSS 过滤器显式关闭
    headers.insert(
        HeaderName::from_static("x-xss-protection"),
        HeaderValue::from_static("0"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use munda_shared::cache::Cache;
    use munda_shared::config::{AuthConfig, DatabaseConfig, RedisConfig};
    use munda_shared::database::Database;

    use crate::auth::JwtManager;

    /// 数据库和 Redis 均为延迟连接，认证失败的请求不会触达它们
    fn test_state() -> AppState {
        let pool = Database::connect_lazy(&DatabaseConfig::default())
            .unwrap()
            .pool()
            .clone();
        let cache = Arc::new(Cache::new(&RedisConfig::default()).unwrap());
        AppState::new(pool, cache, &AuthConfig::default(), 1000)
    }

    async fn body_json(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn test_routes_construction() {
        let _gang = gang_routes();
        let _fighter = fighter_routes();
        let _equipment = equipment_routes();
        let _vehicle = vehicle_routes();
        let _campaign = campaign_routes();
        let _catalog = catalog_routes();
        let _custom = custom_routes();
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = build_router(test_state());

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-frame-options").unwrap(),
            "DENY"
        );
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "munda-api");
    }

    #[tokio::test]
    async fn test_missing_token_rejected() {
        let app = build_router(test_state());

        let response = app
            .oneshot(Request::builder().uri("/api/gangs").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let app = build_router(test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/campaigns")
                    .header("Authorization", "Bearer not-a-jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_body_rejected_before_service() {
        let state = test_state();
        let token = JwtManager::new(&AuthConfig::default())
            .generate_token(Uuid::new_v4(), 3600)
            .unwrap();
        let app = build_router(state);

        let body = serde_json::json!({
            "name": "",
            "gangTypeId": Uuid::new_v4(),
        });
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/gangs")
                    .header("Authorization", format!("Bearer {}", token))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }
}
