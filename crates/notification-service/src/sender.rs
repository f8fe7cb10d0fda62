//! 通知投递
//!
//! 通过 `NotificationSender` trait 抽象投递行为。当前只有模拟实现
//! `LogSender`：把将要发出的通知写成一条结构化日志，替代真实的
//! 邮件 / 短信 / 推送渠道。接入真实渠道时实现同一 trait 即可。

use async_trait::async_trait;
use tracing::info;

use crate::error::NotificationError;
use crate::models::Notification;

/// 通知发送器 trait
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// 投递一条已落库的通知
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError>;

    /// 渠道名称，用于日志
    fn channel(&self) -> &'static str;
}

/// 模拟发送器，仅记录日志
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSender;

#[async_trait]
impl NotificationSender for LogSender {
    async fn send(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            channel = self.channel(),
            notification_id = notification.id,
            recipient = %notification.user_id,
            order_id = %notification.order_id,
            message = %notification.message,
            "模拟发送通知"
        );
        Ok(())
    }

    fn channel(&self) -> &'static str {
        "LOG"
    }
}
