//! Kafka 基础设施封装
//!
//! 将 rdkafka 的底层 API 封装为 Producer/Consumer 抽象，
//! 统一消息序列化、错误映射和关闭语义。

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use futures::{Stream, StreamExt};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Headers, Message};
use rdkafka::producer::{FutureProducer, FutureRecord};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::KafkaConfig;
use crate::error::ServiceError;

// ---------------------------------------------------------------------------
// Topic 常量
// ---------------------------------------------------------------------------

/// Kafka topic 名称
pub mod topics {
    /// 订单服务广播的订单创建事件
    pub const ORDERS: &str = "orders";
}

// ---------------------------------------------------------------------------
// ConsumerMessage
// ---------------------------------------------------------------------------

/// 消费到的 Kafka 消息的统一表示
///
/// 将 rdkafka 的 `BorrowedMessage`（带生命周期约束）转换为拥有所有权的结构体，
/// 使消息可以安全地跨 await 点传递给异步处理函数。
#[derive(Debug, Clone)]
pub struct ConsumerMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub payload: Vec<u8>,
    pub timestamp: Option<i64>,
    pub headers: HashMap<String, String>,
}

impl ConsumerMessage {
    /// 从 rdkafka 的借用消息构造，提取并拥有所有字段
    fn from_borrowed(msg: &BorrowedMessage<'_>) -> Self {
        let key = msg
            .key()
            .and_then(|k| std::str::from_utf8(k).ok())
            .map(String::from);

        let payload = msg.payload().map(|p| p.to_vec()).unwrap_or_default();

        let mut headers = HashMap::new();
        if let Some(h) = msg.headers() {
            for idx in 0..h.count() {
                let header = h.get(idx);
                if let Some(raw) = header.value
                    && let Ok(value) = std::str::from_utf8(raw)
                {
                    headers.insert(header.key.to_string(), value.to_string());
                }
            }
        }

        Self {
            topic: msg.topic().to_string(),
            partition: msg.partition(),
            offset: msg.offset(),
            key,
            payload,
            timestamp: msg.timestamp().to_millis(),
            headers,
        }
    }

    /// 以 JSON 负载构造消息，用于测试和本地回放
    pub fn from_json_payload(topic: &str, offset: i64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.to_string(),
            partition: 0,
            offset,
            key: None,
            payload: payload.into(),
            timestamp: None,
            headers: HashMap::new(),
        }
    }

    /// 将 JSON 格式负载反序列化为目标类型
    pub fn deserialize_payload<T: DeserializeOwned>(&self) -> Result<T, ServiceError> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| ServiceError::Kafka(format!("负载反序列化失败: {e}")))
    }
}

// ---------------------------------------------------------------------------
// KafkaProducer
// ---------------------------------------------------------------------------

/// 面向业务的 Kafka 生产者
///
/// 本服务自身不发布事件，生产者用于联调脚本和依赖真实 broker 的集成测试。
#[derive(Clone)]
pub struct KafkaProducer {
    producer: FutureProducer,
}

impl KafkaProducer {
    pub fn new(config: &KafkaConfig) -> Result<Self, ServiceError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| ServiceError::Kafka(format!("创建生产者失败: {e}")))?;

        info!(brokers = %config.brokers, "Kafka 生产者已初始化");
        Ok(Self { producer })
    }

    /// 发送原始字节消息
    pub async fn send(
        &self,
        topic: &str,
        key: &str,
        payload: &[u8],
    ) -> Result<(i32, i64), ServiceError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        let delivery = self
            .producer
            .send(record, Duration::from_secs(5))
            .await
            .map_err(|(e, _)| ServiceError::Kafka(format!("发送消息失败: {e}")))?;

        debug!(
            topic,
            key,
            partition = delivery.partition,
            offset = delivery.offset,
            "消息已发送"
        );
        Ok((delivery.partition, delivery.offset))
    }

    /// 将值序列化为 JSON 后发送
    pub async fn send_json<T: Serialize>(
        &self,
        topic: &str,
        key: &str,
        value: &T,
    ) -> Result<(i32, i64), ServiceError> {
        let payload = serde_json::to_vec(value)
            .map_err(|e| ServiceError::Kafka(format!("序列化失败: {e}")))?;

        self.send(topic, key, &payload).await
    }
}

// ---------------------------------------------------------------------------
// KafkaConsumer
// ---------------------------------------------------------------------------

/// 面向业务的 Kafka 广播订阅者
///
/// 每个实例使用独立的消费组（前缀 + UUID），相当于一个匿名、独占、
/// 实例退出后即废弃的订阅队列：所有运行中的实例都会收到每一条事件，
/// 实例之间不分摊消息。
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    group_id: String,
}

impl KafkaConsumer {
    /// 创建广播订阅者
    ///
    /// 关闭自动提交，由 `start` 在收到消息时立即提交位点。
    pub fn broadcast(config: &KafkaConfig) -> Result<Self, ServiceError> {
        let group_id = format!("{}.{}", config.consumer_group, Uuid::new_v4());

        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &group_id)
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("enable.auto.commit", "false")
            .create()
            .map_err(|e| ServiceError::Kafka(format!("创建消费者失败: {e}")))?;

        info!(brokers = %config.brokers, group_id, "Kafka 广播订阅者已初始化");
        Ok(Self { consumer, group_id })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// 订阅指定的 topic 列表
    pub fn subscribe(&self, topics: &[&str]) -> Result<(), ServiceError> {
        self.consumer
            .subscribe(topics)
            .map_err(|e| ServiceError::Kafka(format!("订阅 topic 失败: {e}")))?;

        info!(?topics, group_id = %self.group_id, "已订阅 Kafka topics");
        Ok(())
    }

    /// 启动消费循环
    ///
    /// 每条消息在交给 handler 之前先提交位点（收到即确认）。
    /// 进程在提交之后、处理完成之前崩溃会丢失该事件，即至多一次语义。
    pub async fn start<F, Fut>(self, shutdown: watch::Receiver<bool>, handler: F)
    where
        F: Fn(ConsumerMessage) -> Fut,
        Fut: Future<Output = Result<(), ServiceError>>,
    {
        let consumer = &self.consumer;
        let stream = consumer.stream().map(move |result| match result {
            Ok(borrowed_msg) => {
                if let Err(e) = consumer.commit_message(&borrowed_msg, CommitMode::Async) {
                    warn!(
                        error = %e,
                        partition = borrowed_msg.partition(),
                        offset = borrowed_msg.offset(),
                        "提交位点失败"
                    );
                }
                Ok(ConsumerMessage::from_borrowed(&borrowed_msg))
            }
            Err(e) => Err(ServiceError::Kafka(format!("接收消息出错: {e}"))),
        });

        consume_stream(stream, shutdown, handler).await;
    }
}

/// 驱动消息流直到关闭信号或流结束
///
/// 使用 `tokio::select!` 同时监听消息流和关闭信号：
/// - 收到消息时调用 handler 处理；handler 返回错误只记录日志而不中断循环。
/// - 流中的接收错误同样只记录日志。
/// - 关闭信号变为 `true`（或发送端被丢弃）时退出循环，正在执行的 handler 会先完成。
///
/// 消息严格按到达顺序逐条处理。与 broker 无关，测试中可直接传入内存流。
pub async fn consume_stream<S, F, Fut>(stream: S, mut shutdown: watch::Receiver<bool>, handler: F)
where
    S: Stream<Item = Result<ConsumerMessage, ServiceError>>,
    F: Fn(ConsumerMessage) -> Fut,
    Fut: Future<Output = Result<(), ServiceError>>,
{
    futures::pin_mut!(stream);

    if *shutdown.borrow() {
        info!("关闭信号已置位，消费循环不启动");
        return;
    }

    info!("Kafka 消费循环已启动");

    loop {
        tokio::select! {
            // 偏向关闭信号，保证收到关闭时能尽快退出
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("收到关闭信号，Kafka 消费循环退出");
                    break;
                }
            }

            msg_result = stream.next() => {
                let Some(msg_result) = msg_result else {
                    warn!("Kafka 消息流意外结束");
                    break;
                };

                match msg_result {
                    Ok(msg) => {
                        debug!(
                            topic = %msg.topic,
                            partition = msg.partition,
                            offset = msg.offset,
                            "收到 Kafka 消息"
                        );

                        if let Err(e) = handler(msg).await {
                            error!(error = %e, "处理 Kafka 消息失败");
                        }
                    }
                    Err(e) => {
                        error!(error = %e, retryable = e.is_retryable(), "接收 Kafka 消息出错");
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 测试
// ---------------------------------------------------------------------------
