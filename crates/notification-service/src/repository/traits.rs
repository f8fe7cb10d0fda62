//! 仓储 Trait 定义
//!
//! 消费者和 API 都只依赖该 trait，启动时注入同一个实例。

use async_trait::async_trait;

use crate::error::{NotificationError, Result};
use crate::models::Notification;

/// `/all` 接口的默认页大小
pub const DEFAULT_PAGE_LIMIT: i64 = 100;

/// 通知仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepositoryTrait: Send + Sync {
    /// 写入一条通知，分配 id、创建时间和默认状态后返回完整记录
    async fn insert(&self, user_id: &str, order_id: &str, message: &str) -> Result<Notification>;

    /// 查询某用户的全部通知，按 id 升序，不分页
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Notification>>;

    /// 按 id 升序分页查询全部通知
    async fn list_all(&self, offset: i64, limit: i64) -> Result<Vec<Notification>>;

    /// 通知总数
    async fn count(&self) -> Result<i64>;

    /// 存储连通性检查
    async fn health_check(&self) -> Result<()>;
}

/// 校验分页参数：offset >= 0，limit > 0
pub fn validate_page(offset: i64, limit: i64) -> Result<()> {
    if offset < 0 {
        return Err(NotificationError::InvalidRequest(format!(
            "skip 不能为负数: {offset}"
        )));
    }
    if limit <= 0 {
        return Err(NotificationError::InvalidRequest(format!(
            "limit 必须大于 0: {limit}"
        )));
    }
    Ok(())
}
