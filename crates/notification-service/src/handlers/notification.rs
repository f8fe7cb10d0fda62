//! 通知查询 API 处理器
//!
//! 调用方身份来自上游网关注入的 `X-User-Id` 请求头，服务本身不做鉴权。

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::HeaderMap,
};
use tracing::{debug, instrument};
use validator::Validate;

use crate::{
    dto::{ListAllParams, USER_ID_HEADER},
    error::{NotificationError, Result},
    models::Notification,
    state::AppState,
};

/// 查询当前用户的全部通知
///
/// GET /api/notification/
///
/// 缺少或为空的 `X-User-Id` 直接返回 400，不访问存储。
#[instrument(skip_all)]
pub async fn list_my_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Notification>>> {
    let user_id = caller_id(&headers)?;

    let notifications = state.repository.list_by_user(user_id).await?;
    debug!(user_id, count = notifications.len(), "查询用户通知");

    Ok(Json(notifications))
}

/// 分页查询全部通知
///
/// GET /api/notification/all?skip=0&limit=100
///
/// 注：该接口未做权限控制，部署时应由网关限制访问。
#[instrument(skip_all)]
pub async fn list_all_notifications(
    State(state): State<AppState>,
    params: std::result::Result<Query<ListAllParams>, QueryRejection>,
) -> Result<Json<Vec<Notification>>> {
    let Query(params) =
        params.map_err(|e| NotificationError::InvalidRequest(e.body_text()))?;
    params.validate()?;

    let notifications = state
        .repository
        .list_all(params.skip, params.limit)
        .await?;
    debug!(
        skip = params.skip,
        limit = params.limit,
        count = notifications.len(),
        "分页查询全部通知"
    );

    Ok(Json(notifications))
}

/// 从请求头读取调用方用户 ID
fn caller_id(headers: &HeaderMap) -> Result<&str> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| NotificationError::InvalidRequest("缺少 X-User-Id 请求头".to_string()))
}
