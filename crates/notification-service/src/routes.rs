//! 路由配置模块

use std::time::Duration;

use axum::{Router, http::StatusCode, middleware, routing::get};
use notify_shared::observability::middleware as obs_middleware;
use tower_http::timeout::TimeoutLayer;

use crate::{handlers, state::AppState};

/// 通知查询路由
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/notification",
            get(handlers::notification::list_my_notifications),
        )
        .route(
            "/api/notification/",
            get(handlers::notification::list_my_notifications),
        )
        .route(
            "/api/notification/all",
            get(handlers::notification::list_all_notifications),
        )
}

/// 构建完整应用：业务路由、探针和可观测性中间件
pub fn app(state: AppState, request_timeout_seconds: u64) -> Router {
    Router::new()
        .merge(notification_routes())
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(request_timeout_seconds),
        ))
        // 可观测性中间件：请求追踪和指标收集
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
