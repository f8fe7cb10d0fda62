//! 健康检查处理器

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::state::AppState;

const SERVICE_NAME: &str = "notification-service";

/// 存活探针：服务进程正常即返回 ok
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
    }))
}

/// 就绪探针：检查数据库连接和消费者状态
///
/// 任一检查失败返回 503，K8s 会将实例从 Service 端点移除。
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = state.repository.health_check().await.is_ok();
    let consumer_state = *state.consumer_state.borrow();
    let consumer_ok = consumer_state.is_ready();
    let all_ok = db_ok && consumer_ok;

    let status = if all_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if all_ok { "ok" } else { "degraded" },
            "service": SERVICE_NAME,
            "checks": {
                "database": if db_ok { "ok" } else { "fail" },
                "consumer": consumer_state,
            }
        })),
    )
}
