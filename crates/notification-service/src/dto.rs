//! API 请求参数

use serde::Deserialize;
use validator::Validate;

use crate::repository::DEFAULT_PAGE_LIMIT;

/// 调用方身份请求头，由上游网关注入
pub const USER_ID_HEADER: &str = "x-user-id";

/// `/api/notification/all` 查询参数
#[derive(Debug, Deserialize, Validate)]
pub struct ListAllParams {
    #[serde(default)]
    #[validate(range(min = 0, message = "skip 不能为负数"))]
    pub skip: i64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, message = "limit 必须大于 0"))]
    pub limit: i64,
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

impl Default for ListAllParams {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}
