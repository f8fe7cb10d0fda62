//! 订单事件模型
//!
//! 入站负载在边界处是无类型的 JSON 对象，这里把它校验为结构化的
//! `OrderCreatedEvent`。字段缺失、为 null、为空字符串或类型不对时立即返回
//! `MalformedEvent`，不会把空值继续传递到下游。

use serde_json::{Map, Value};

use crate::error::NotificationError;

/// 负载中用户 ID 的字段名
pub const USER_ID_FIELD: &str = "userId";
/// 负载中订单 ID 的字段名
pub const ORDER_ID_FIELD: &str = "orderId";

/// 订单创建事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCreatedEvent {
    pub user_id: String,
    pub order_id: String,
}

impl OrderCreatedEvent {
    /// 从 JSON 对象提取并校验事件，额外字段忽略
    pub fn from_payload(payload: &Map<String, Value>) -> Result<Self, NotificationError> {
        Ok(Self {
            user_id: required_id(payload, USER_ID_FIELD)?,
            order_id: required_id(payload, ORDER_ID_FIELD)?,
        })
    }
}

/// 读取必填的 ID 字段
///
/// 上游订单服务的 ID 可能是数字，数字按十进制字符串接收。
fn required_id(payload: &Map<String, Value>, field: &str) -> Result<String, NotificationError> {
    match payload.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::String(_)) => Err(NotificationError::MalformedEvent(format!(
            "字段 {field} 为空"
        ))),
        None | Some(Value::Null) => Err(NotificationError::MalformedEvent(format!(
            "缺少字段 {field}"
        ))),
        Some(other) => Err(NotificationError::MalformedEvent(format!(
            "字段 {field} 类型无效: {other}"
        ))),
    }
}
