//! 通知服务错误类型
//!
//! 按处理路径划分错误：消费侧（事件格式、存储）只影响当前这条消息，
//! API 侧只影响当前请求，并通过 `IntoResponse` 转换为 HTTP 状态码。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use notify_shared::error::ServiceError;
use notify_shared::observability::tracing::current_trace_id;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotificationError {
    /// 入站事件缺少必填字段或字段类型不对，该消息被丢弃
    #[error("事件格式错误: {0}")]
    MalformedEvent(String),

    #[error("存储错误: {0}")]
    Storage(#[from] sqlx::Error),

    /// 写入数据违反表约束（如必填字段为空）
    #[error("违反存储约束: {0}")]
    ConstraintViolation(String),

    /// 调用方违反接口约定（缺少 header、分页参数越界）
    #[error("请求无效: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Infrastructure(#[from] ServiceError),
}

impl NotificationError {
    /// 是否属于存储类错误（落库失败时事件直接丢弃，不重试）
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::Storage(_)
                | Self::ConstraintViolation(_)
                | Self::Infrastructure(ServiceError::Database(_))
        )
    }

    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::MalformedEvent(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) | Self::ConstraintViolation(_) | Self::Infrastructure(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 返回错误码（用于 API 响应和指标标签）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedEvent(_) => "MALFORMED_EVENT",
            Self::Storage(_) | Self::ConstraintViolation(_) => "STORAGE_ERROR",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Infrastructure(e) => e.code(),
        }
    }
}

impl IntoResponse for NotificationError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = if status.is_server_error() {
            tracing::error!(
                error = %self,
                code = self.error_code(),
                trace_id = ?current_trace_id(),
                "请求处理失败"
            );
            "服务内部错误，请稍后重试".to_string()
        } else {
            self.to_string()
        };

        let body = json!({
            "code": self.error_code(),
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换（API 查询参数校验）
impl From<validator::ValidationErrors> for NotificationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::InvalidRequest(errors.to_string())
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, NotificationError>;
