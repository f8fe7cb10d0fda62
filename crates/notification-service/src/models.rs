//! 通知记录模型
//!
//! 对应 `notifications` 表的一行，也是 API 直接返回的 JSON 结构（snake_case 字段）。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 新建通知的默认状态，当前范围内不存在后续状态流转
pub const DEFAULT_STATUS: &str = "SENT";

/// 已持久化的通知记录
///
/// `id` 与 `created_at` 由存储层分配，写入后不再变化。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: i64,
    pub user_id: String,
    pub order_id: String,
    pub message: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// 待写入的通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub user_id: String,
    pub order_id: String,
    pub message: String,
}

impl NewNotification {
    /// 校验必填字段非空，返回第一个为空的字段名
    pub fn first_empty_field(&self) -> Option<&'static str> {
        [
            ("user_id", &self.user_id),
            ("order_id", &self.order_id),
            ("message", &self.message),
        ]
        .into_iter()
        .find(|(_, value)| value.is_empty())
        .map(|(field, _)| field)
    }
}
