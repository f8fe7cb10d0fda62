//! 订单事件处理器
//!
//! 把一条订单创建事件转换为一条通知记录：校验负载 -> 渲染文案 -> 落库 -> 模拟投递。
//! 处理器内部不做重试，失败会在这里记录日志和指标后返回给消费者，
//! 由消费者决定丢弃该消息。

use std::sync::Arc;
use std::time::Instant;

use notify_shared::observability::metrics;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::events::OrderCreatedEvent;
use crate::models::Notification;
use crate::repository::NotificationRepositoryTrait;
use crate::sender::NotificationSender;
use crate::templates::render_order_created;

/// 订单事件处理器
///
/// 使用 trait object 持有仓储和发送器，启动时由 main 注入，
/// 测试中替换为内存实现或 mock。
pub struct OrderEventProcessor {
    repository: Arc<dyn NotificationRepositoryTrait>,
    sender: Arc<dyn NotificationSender>,
}

impl OrderEventProcessor {
    pub fn new(
        repository: Arc<dyn NotificationRepositoryTrait>,
        sender: Arc<dyn NotificationSender>,
    ) -> Self {
        Self { repository, sender }
    }

    /// 处理一条订单创建事件
    ///
    /// 成功时返回已落库的通知；负载不合法返回 `MalformedEvent`，
    /// 落库失败返回存储错误。投递失败只记录告警，不影响已落库的记录。
    pub async fn process_order_created(&self, payload: &Map<String, Value>) -> Result<Notification> {
        let start = Instant::now();

        let event = OrderCreatedEvent::from_payload(payload).inspect_err(|e| {
            warn!(error = %e, "订单事件缺少必要字段，已丢弃");
            metrics::record_event_dropped("malformed");
        })?;

        let message = render_order_created(&event);

        let notification = self
            .repository
            .insert(&event.user_id, &event.order_id, &message)
            .await
            .inspect_err(|e| {
                error!(
                    error = %e,
                    user_id = %event.user_id,
                    order_id = %event.order_id,
                    "通知落库失败，事件已丢弃"
                );
                metrics::record_event_dropped("storage");
            })?;

        if let Err(e) = self.sender.send(&notification).await {
            warn!(
                error = %e,
                channel = self.sender.channel(),
                notification_id = notification.id,
                "通知投递失败"
            );
        }

        metrics::record_notification_created(start.elapsed().as_secs_f64());

        info!(
            notification_id = notification.id,
            user_id = %notification.user_id,
            order_id = %notification.order_id,
            "订单事件处理完成"
        );

        Ok(notification)
    }
}
