//! 订单事件消费者
//!
//! 以广播方式订阅 `orders` topic，逐条把消息交给 `OrderEventProcessor`。
//! 每条消息在处理前即确认（至多一次）；解码或处理失败只影响当前消息，
//! 消费循环继续运行，直到收到关闭信号。

use std::sync::Arc;

use futures::Stream;
use notify_shared::config::KafkaConfig;
use notify_shared::error::ServiceError;
use notify_shared::kafka::{ConsumerMessage, KafkaConsumer, consume_stream};
use notify_shared::observability::{metrics, tracing as obs_tracing};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::error::{NotificationError, Result};
use crate::models::Notification;
use crate::processor::OrderEventProcessor;

/// 消费者状态
///
/// `Disconnected -> Connecting -> Subscribed -> Receiving`，
/// 之后每条消息在 `Receiving` 与 `Processing` 之间切换；关闭后回到 `Disconnected`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsumerState {
    Disconnected,
    Connecting,
    Subscribed,
    Receiving,
    Processing,
}

impl ConsumerState {
    /// 已订阅并在收消息（或正在处理一条消息）
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Subscribed | Self::Receiving | Self::Processing)
    }
}

/// 订单事件消费者
pub struct OrderEventConsumer {
    config: KafkaConfig,
    processor: Arc<OrderEventProcessor>,
    state: watch::Sender<ConsumerState>,
}

impl OrderEventConsumer {
    pub fn new(config: KafkaConfig, processor: Arc<OrderEventProcessor>) -> Self {
        let (state, _) = watch::channel(ConsumerState::Disconnected);
        Self {
            config,
            processor,
            state,
        }
    }

    /// 订阅状态变化（供就绪探针读取）
    pub fn state(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    /// 连接 broker 并启动消费循环，直到 shutdown 变为 true
    ///
    /// broker 连接中断时依赖 rdkafka 客户端自身的重连，这里不额外处理。
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        self.state.send_replace(ConsumerState::Connecting);

        let consumer = match self.connect() {
            Ok(consumer) => consumer,
            Err(e) => {
                self.state.send_replace(ConsumerState::Disconnected);
                return Err(e.into());
            }
        };
        self.state.send_replace(ConsumerState::Subscribed);

        info!(
            topic = %self.config.orders_topic,
            group_id = consumer.group_id(),
            "订单事件消费者已启动"
        );

        let Self {
            processor, state, ..
        } = self;

        state.send_replace(ConsumerState::Receiving);
        consumer
            .start(shutdown, |msg| on_message(&processor, &state, msg))
            .await;
        state.send_replace(ConsumerState::Disconnected);

        info!("订单事件消费者已停止");
        Ok(())
    }

    /// 以任意消息流驱动消费循环，不经过 broker
    ///
    /// 用于集成测试和离线回放，处理语义与 `run` 相同。
    pub async fn run_stream<S>(self, stream: S, shutdown: watch::Receiver<bool>)
    where
        S: Stream<Item = std::result::Result<ConsumerMessage, ServiceError>>,
    {
        let Self {
            processor, state, ..
        } = self;

        state.send_replace(ConsumerState::Receiving);
        consume_stream(stream, shutdown, |msg| on_message(&processor, &state, msg)).await;
        state.send_replace(ConsumerState::Disconnected);
    }

    fn connect(&self) -> std::result::Result<KafkaConsumer, ServiceError> {
        let consumer = KafkaConsumer::broadcast(&self.config)?;
        consumer.subscribe(&[self.config.orders_topic.as_str()])?;
        Ok(consumer)
    }
}

/// 消费循环的 handler：处理结果在这里被吞掉，消费循环永远收到 Ok
async fn on_message(
    processor: &OrderEventProcessor,
    state: &watch::Sender<ConsumerState>,
    msg: ConsumerMessage,
) -> std::result::Result<(), ServiceError> {
    let span = info_span!(
        "order_event",
        topic = %msg.topic,
        partition = msg.partition,
        offset = msg.offset,
    );
    obs_tracing::set_parent_from_headers(&span, &msg.headers);

    async {
        state.send_replace(ConsumerState::Processing);
        let outcome = handle_message(processor, &msg).await;
        state.send_replace(ConsumerState::Receiving);

        match outcome {
            Ok(notification) => debug!(notification_id = notification.id, "消息处理成功"),
            Err(e) => debug!(code = e.error_code(), "消息已丢弃"),
        }
    }
    .instrument(span)
    .await;

    Ok(())
}

/// 处理单条 Kafka 消息：解码负载后交给处理器
pub async fn handle_message(
    processor: &OrderEventProcessor,
    msg: &ConsumerMessage,
) -> Result<Notification> {
    metrics::record_event_received(&msg.topic);

    let payload = match msg.deserialize_payload::<Value>() {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!(payload = %other, "订单事件负载不是 JSON 对象，已丢弃");
            metrics::record_event_dropped("decode");
            return Err(NotificationError::MalformedEvent(
                "负载不是 JSON 对象".to_string(),
            ));
        }
        Err(e) => {
            warn!(error = %e, "订单事件负载不是合法 JSON，已丢弃");
            metrics::record_event_dropped("decode");
            return Err(NotificationError::MalformedEvent(e.to_string()));
        }
    };

    info!(payload = ?payload, "收到订单创建事件");

    processor.process_order_created(&payload).await
}
