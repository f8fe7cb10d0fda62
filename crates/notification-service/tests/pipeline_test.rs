//! 事件到 API 的端到端测试
//!
//! 用内存消息流驱动消费循环，用内存仓储代替 PostgreSQL，
//! 再通过完整路由查询结果，无需外部依赖。

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use futures::{SinkExt, channel::mpsc};
use notification_service::{
    AppState, ConsumerState, NotificationRepositoryTrait, OrderEventConsumer, OrderEventProcessor,
    routes,
    sender::LogSender,
    test_utils::{InMemoryNotificationRepository, order_message},
};
use notify_shared::config::KafkaConfig;
use notify_shared::error::ServiceError;
use notify_shared::kafka::ConsumerMessage;
use serde_json::Value;
use tokio::sync::watch;
use tower::ServiceExt;

// ==================== 辅助函数 ====================

struct Harness {
    repo: Arc<InMemoryNotificationRepository>,
    consumer: OrderEventConsumer,
}

fn harness() -> Harness {
    let repo = Arc::new(InMemoryNotificationRepository::new());
    let processor = Arc::new(OrderEventProcessor::new(repo.clone(), Arc::new(LogSender)));
    let consumer = OrderEventConsumer::new(KafkaConfig::default(), processor);
    Harness { repo, consumer }
}

fn app(repo: Arc<InMemoryNotificationRepository>) -> Router {
    let (_tx, rx) = watch::channel(ConsumerState::Receiving);
    routes::app(AppState::new(repo, rx), 30)
}

/// 依次投递消息并等待消费循环处理完毕
async fn deliver(consumer: OrderEventConsumer, payloads: &[&str]) {
    let messages: Vec<Result<ConsumerMessage, ServiceError>> = payloads
        .iter()
        .enumerate()
        .map(|(i, p)| Ok(order_message(i as i64, p)))
        .collect();
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    consumer
        .run_stream(futures::stream::iter(messages), shutdown_rx)
        .await;
}

async fn get(app: &Router, uri: &str, user_id: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri);
    if let Some(user_id) = user_id {
        builder = builder.header("X-User-Id", user_id);
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

// ==================== 测试用例 ====================

#[tokio::test]
async fn test_order_event_visible_to_owner_only() {
    let Harness { repo, consumer } = harness();
    deliver(consumer, &[r#"{"userId":"42","orderId":"A-100"}"#]).await;

    let app = app(repo);

    let (status, json) = get(&app, "/api/notification/", Some("42")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["user_id"], "42");
    assert_eq!(rows[0]["order_id"], "A-100");
    assert_eq!(rows[0]["status"], "SENT");
    assert_eq!(
        rows[0]["message"],
        "42's order A-100 has been successfully created."
    );
    assert!(rows[0]["created_at"].is_string());

    let (status, json) = get(&app, "/api/notification/", Some("99")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!([]));
}

#[tokio::test]
async fn test_malformed_event_leaves_store_unchanged() {
    let Harness { repo, consumer } = harness();
    deliver(
        consumer,
        &[
            r#"{"userId":"42"}"#,
            r#"{"orderId":"A-1"}"#,
            r#"{"userId":"","orderId":"A-2"}"#,
            r#"{"userId":null,"orderId":"A-3"}"#,
            "not json at all",
        ],
    )
    .await;

    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_extra_fields_and_numeric_ids() {
    let Harness { repo, consumer } = harness();
    deliver(
        consumer,
        &[r#"{"userId":7,"orderId":1001,"amount":12.5,"items":["x"]}"#],
    )
    .await;

    let rows = repo.snapshot().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].user_id, "7");
    assert_eq!(rows[0].order_id, "1001");
}

#[tokio::test]
async fn test_missing_header_is_rejected() {
    let app = app(Arc::new(InMemoryNotificationRepository::new()));

    let (status, json) = get(&app, "/api/notification/", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_list_all_pages_are_disjoint() {
    let Harness { repo, consumer } = harness();
    let payloads: Vec<String> = (0..5)
        .map(|i| format!(r#"{{"userId":"u{i}","orderId":"o{i}"}}"#))
        .collect();
    let payloads: Vec<&str> = payloads.iter().map(String::as_str).collect();
    deliver(consumer, &payloads).await;

    let app = app(repo);

    let mut seen = Vec::new();
    for skip in (0..6).step_by(2) {
        let (status, json) = get(
            &app,
            &format!("/api/notification/all?skip={skip}&limit=2"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let page = json.as_array().unwrap();
        assert!(page.len() <= 2);
        for row in page {
            let id = row["id"].as_i64().unwrap();
            assert!(!seen.contains(&id), "记录 {id} 在多页中重复出现");
            seen.push(id);
        }
    }

    assert_eq!(seen, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_storage_outage_returns_500() {
    let repo = Arc::new(InMemoryNotificationRepository::new());
    repo.set_unavailable(true);
    tokio_test::assert_err!(repo.health_check().await);
    let app = app(repo);

    let (status, json) = get(&app, "/api/notification/", Some("42")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "STORAGE_ERROR");

    let (status, _) = get(&app, "/api/notification/all", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_shutdown_stops_consumer_after_in_flight_message() {
    let Harness { repo, consumer } = harness();
    let state = consumer.state();
    let (mut tx, rx) = mpsc::unbounded::<Result<ConsumerMessage, ServiceError>>();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(consumer.run_stream(rx, shutdown_rx));

    tx.send(Ok(order_message(1, r#"{"userId":"1","orderId":"o1"}"#)))
        .await
        .unwrap();

    // 等待第一条消息落库
    for _ in 0..100 {
        if repo.count().await.unwrap() == 1 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(repo.count().await.unwrap(), 1);

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
    assert_eq!(*state.borrow(), ConsumerState::Disconnected);

    // 关闭后投递的消息不再被处理
    let _ = tx.send(Ok(order_message(2, r#"{"userId":"2","orderId":"o2"}"#))).await;
    assert_eq!(repo.count().await.unwrap(), 1);
}
