//! Munda Manager API 服务
//!
//! 帮派、战士、装备、载具与战役管理的 REST API。

use std::sync::Arc;

use axum::http::HeaderValue;
use munda_api::{routes, state::AppState};
use munda_shared::{cache::Cache, config::AppConfig, database::Database, observability};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

const SERVICE_NAME: &str = "munda-api";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // config/default.toml → config/{service}.toml → MUNDA_* 环境变量
    let config = AppConfig::load(SERVICE_NAME)?;
    config.validate()?;

    let _guard = observability::init(SERVICE_NAME, &config.observability).await?;

    info!(
        environment = %config.environment,
        "Starting {} on {}",
        SERVICE_NAME,
        config.server_addr()
    );

    let db = Database::connect(&config.database).await?;
    db.run_migrations().await?;
    let cache = Arc::new(Cache::new(&config.redis)?);

    let state = AppState::new(
        db.pool().clone(),
        cache,
        &config.auth,
        config.gang.starting_credits,
    );

    let app = routes::build_router(state).layer(cors_layer(config.is_production()));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// CORS 配置：MUNDA_CORS_ORIGINS 为逗号分隔的来源列表，`*` 表示不限制
fn cors_layer(is_production: bool) -> CorsLayer {
    let allowed_origins = std::env::var("MUNDA_CORS_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());

    if allowed_origins == "*" {
        if is_production {
            warn!("MUNDA_CORS_ORIGINS=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        info!("CORS allowed_origins: * (all origins)");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    info!("CORS allowed_origins: {}", allowed_origins);
    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 监听关闭信号
///
/// 收到 Ctrl+C 或 SIGTERM 后返回，触发 axum 的优雅关闭。
/// 信号处理器注册失败时该分支永不完成。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
