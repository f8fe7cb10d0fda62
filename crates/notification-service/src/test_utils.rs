//! 测试工具模块
//!
//! 提供不依赖 PostgreSQL 的内存仓储，以及构造测试消息的辅助函数，
//! 供单元测试和 `tests/` 下的集成测试共用。

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use notify_shared::kafka::{ConsumerMessage, topics};
use tokio::sync::RwLock;

use crate::error::{NotificationError, Result};
use crate::models::{DEFAULT_STATUS, NewNotification, Notification};
use crate::repository::{NotificationRepositoryTrait, validate_page};

/// 内存通知仓储
///
/// 与 PostgreSQL 实现保持相同的语义：id 自增、默认状态 SENT、
/// 必填字段为空时返回约束错误、查询按 id 升序。
/// `set_unavailable(true)` 后所有操作返回存储错误，用于模拟数据库故障。
#[derive(Default)]
pub struct InMemoryNotificationRepository {
    rows: RwLock<Vec<Notification>>,
    next_id: AtomicI64,
    unavailable: AtomicBool,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(NotificationError::Storage(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    /// 当前全部记录的快照
    pub async fn snapshot(&self) -> Vec<Notification> {
        self.rows.read().await.clone()
    }
}

#[async_trait]
impl NotificationRepositoryTrait for InMemoryNotificationRepository {
    async fn insert(&self, user_id: &str, order_id: &str, message: &str) -> Result<Notification> {
        self.ensure_available()?;

        let new = NewNotification {
            user_id: user_id.to_string(),
            order_id: order_id.to_string(),
            message: message.to_string(),
        };
        if let Some(field) = new.first_empty_field() {
            return Err(NotificationError::ConstraintViolation(format!(
                "{field} 不能为空"
            )));
        }

        // 持有写锁期间分配 id，保证 id 与 created_at 同序
        let mut rows = self.rows.write().await;
        let notification = Notification {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            user_id: new.user_id,
            order_id: new.order_id,
            message: new.message,
            status: DEFAULT_STATUS.to_string(),
            created_at: Utc::now(),
        };
        rows.push(notification.clone());
        Ok(notification)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        self.ensure_available()?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self, offset: i64, limit: i64) -> Result<Vec<Notification>> {
        validate_page(offset, limit)?;
        self.ensure_available()?;
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<i64> {
        self.ensure_available()?;
        Ok(self.rows.read().await.len() as i64)
    }

    async fn health_check(&self) -> Result<()> {
        self.ensure_available()
    }
}

/// 构造一条 `orders` topic 上的消息
pub fn order_message(offset: i64, payload: &str) -> ConsumerMessage {
    ConsumerMessage::from_json_payload(topics::ORDERS, offset, payload)
}
