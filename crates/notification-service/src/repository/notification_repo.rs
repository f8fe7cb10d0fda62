//! PostgreSQL 通知仓储

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::traits::{NotificationRepositoryTrait, validate_page};
use crate::error::{NotificationError, Result};
use crate::models::{NewNotification, Notification};

const NOTIFICATION_COLUMNS: &str = "id, user_id, order_id, message, status, created_at";

/// 通知仓储
///
/// `id` 由 BIGSERIAL 分配，`status` 与 `created_at` 使用列默认值。
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, new: &NewNotification) -> Result<Notification> {
        if let Some(field) = new.first_empty_field() {
            return Err(NotificationError::ConstraintViolation(format!(
                "{field} 不能为空"
            )));
        }

        let notification = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (user_id, order_id, message)
            VALUES ($1, $2, $3)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(&new.user_id)
        .bind(&new.order_id)
        .bind(&new.message)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        debug!(notification_id = notification.id, user_id = %notification.user_id, "通知已写入");
        Ok(notification)
    }

    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE user_id = $1
            ORDER BY id
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn list_all(&self, offset: i64, limit: i64) -> Result<Vec<Notification>> {
        validate_page(offset, limit)?;

        let rows = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// 表约束冲突映射为 ConstraintViolation，其余为 Storage
fn map_write_error(err: sqlx::Error) -> NotificationError {
    match &err {
        sqlx::Error::Database(db_err)
            if db_err.is_check_violation() || db_err.is_unique_violation() =>
        {
            NotificationError::ConstraintViolation(db_err.message().to_string())
        }
        _ => NotificationError::Storage(err),
    }
}

#[async_trait]
impl NotificationRepositoryTrait for NotificationRepository {
    async fn insert(&self, user_id: &str, order_id: &str, message: &str) -> Result<Notification> {
        let new = NewNotification {
            user_id: user_id.to_string(),
            order_id: order_id.to_string(),
            message: message.to_string(),
        };
        NotificationRepository::insert(self, &new).await
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Notification>> {
        NotificationRepository::list_by_user(self, user_id).await
    }

    async fn list_all(&self, offset: i64, limit: i64) -> Result<Vec<Notification>> {
        NotificationRepository::list_all(self, offset, limit).await
    }

    async fn count(&self) -> Result<i64> {
        NotificationRepository::count(self).await
    }

    async fn health_check(&self) -> Result<()> {
        NotificationRepository::health_check(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_write_error_keeps_connectivity_failures() {
        let err = map_write_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, NotificationError::Storage(_)));
    }

    #[tokio::test]
    async fn test_insert_rejects_empty_fields_before_query() {
        // connect_lazy 不会建立连接，校验失败时不应触达数据库
        let pool = PgPool::connect_lazy("postgres://unused@localhost:1/unused").unwrap();
        let repo = NotificationRepository::new(pool);

        let err = repo
            .insert(&NewNotification {
                user_id: String::new(),
                order_id: "A-1".to_string(),
                message: "m".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationError::ConstraintViolation(ref m) if m.contains("user_id")));
    }

    #[tokio::test]
    async fn test_list_all_rejects_invalid_page_before_query() {
        let pool = PgPool::connect_lazy("postgres://unused@localhost:1/unused").unwrap();
        let repo = NotificationRepository::new(pool);

        let err = repo.list_all(-1, 10).await.unwrap_err();
        assert!(matches!(err, NotificationError::InvalidRequest(_)));
    }
}
