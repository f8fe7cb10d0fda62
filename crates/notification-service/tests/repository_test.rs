//! NotificationRepository 集成测试
//!
//! 使用真实 PostgreSQL 验证 SQL、列默认值和表约束。
//!
//! ## 运行方式
//!
//! ```bash
//! TEST_DATABASE_URL=postgres://... \
//!   cargo test -p notification-service --test repository_test -- --ignored
//! ```

use notification_service::NotificationError;
use notification_service::repository::{NotificationRepository, NotificationRepositoryTrait};
use notify_shared::database::Database;
use sqlx::PgPool;
use uuid::Uuid;

// ==================== 辅助函数 ====================

fn database_url() -> String {
    std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set for integration tests")
}

/// 连接测试库并应用迁移
async fn setup() -> NotificationRepository {
    let pool = PgPool::connect(&database_url())
        .await
        .expect("连接测试数据库失败");
    Database::from_pool(pool.clone())
        .run_migrations(&sqlx::migrate!())
        .await
        .expect("应用迁移失败");
    NotificationRepository::new(pool)
}

/// 每个测试使用独立的用户 ID，避免与其他测试数据冲突
fn unique_user() -> String {
    format!("it-{}", Uuid::new_v4())
}

// ==================== 测试用例 ====================

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_insert_applies_defaults() {
    let repo = setup().await;
    let user_id = unique_user();

    let notification = NotificationRepositoryTrait::insert(&repo, &user_id, "A-100", "hello")
        .await
        .unwrap();

    assert!(notification.id > 0);
    assert_eq!(notification.user_id, user_id);
    assert_eq!(notification.order_id, "A-100");
    assert_eq!(notification.status, "SENT");
}

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_list_by_user_returns_only_own_rows_in_id_order() {
    let repo = setup().await;
    let alice = unique_user();
    let bob = unique_user();

    let a1 = NotificationRepositoryTrait::insert(&repo, &alice, "o1", "m1").await.unwrap();
    NotificationRepositoryTrait::insert(&repo, &bob, "o2", "m2").await.unwrap();
    let a2 = NotificationRepositoryTrait::insert(&repo, &alice, "o3", "m3").await.unwrap();

    let rows = NotificationRepositoryTrait::list_by_user(&repo, &alice).await.unwrap();
    let ids: Vec<i64> = rows.iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![a1.id, a2.id]);

    let rows = NotificationRepositoryTrait::list_by_user(&repo, &unique_user()).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_list_all_pagination() {
    let repo = setup().await;
    let user_id = unique_user();
    for i in 0..3 {
        NotificationRepositoryTrait::insert(&repo, &user_id, &format!("o{i}"), "m")
            .await
            .unwrap();
    }

    let total = NotificationRepositoryTrait::count(&repo).await.unwrap();
    assert!(total >= 3);

    let first = NotificationRepositoryTrait::list_all(&repo, 0, 2).await.unwrap();
    let second = NotificationRepositoryTrait::list_all(&repo, 2, 2).await.unwrap();
    assert_eq!(first.len(), 2);
    assert!(first.windows(2).all(|w| w[0].id < w[1].id));
    assert!(second.iter().all(|n| n.id > first[1].id));

    assert!(matches!(
        NotificationRepositoryTrait::list_all(&repo, -1, 2).await,
        Err(NotificationError::InvalidRequest(_))
    ));
}

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_empty_field_is_rejected() {
    let repo = setup().await;
    let before = NotificationRepositoryTrait::count(&repo).await.unwrap();

    let err = NotificationRepositoryTrait::insert(&repo, "", "o1", "m")
        .await
        .unwrap_err();
    assert!(matches!(err, NotificationError::ConstraintViolation(_)));

    // 绕过应用层校验，确认表约束同样生效
    let pool = PgPool::connect(&database_url()).await.unwrap();
    let err = sqlx::query(
        "INSERT INTO notifications (user_id, order_id, message) VALUES ('u', '', 'm')",
    )
    .execute(&pool)
    .await
    .unwrap_err();
    assert!(err.as_database_error().is_some_and(|e| e.is_check_violation()));

    let after = NotificationRepositoryTrait::count(&repo).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
#[ignore = "需要 PostgreSQL 数据库连接"]
async fn test_health_check() {
    let repo = setup().await;
    tokio_test::assert_ok!(NotificationRepositoryTrait::health_check(&repo).await);
}
