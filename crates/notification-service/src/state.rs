//! 应用状态定义

use std::sync::Arc;

use tokio::sync::watch;

use crate::consumer::ConsumerState;
use crate::repository::NotificationRepositoryTrait;

/// Axum 应用共享状态
///
/// 仓储与消费者共用同一个实例；消费者状态只读，供就绪探针使用。
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn NotificationRepositoryTrait>,
    pub consumer_state: watch::Receiver<ConsumerState>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn NotificationRepositoryTrait>,
        consumer_state: watch::Receiver<ConsumerState>,
    ) -> Self {
        Self {
            repository,
            consumer_state,
        }
    }
}
