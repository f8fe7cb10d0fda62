//! 通知服务
//!
//! 以广播方式消费订单创建事件，为每条事件生成一条通知并落库，
//! 同时提供按用户查询和分页查询通知的 REST API。

pub mod consumer;
pub mod dto;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod processor;
pub mod repository;
pub mod routes;
pub mod sender;
pub mod state;
pub mod templates;
pub mod test_utils;

pub use consumer::{ConsumerState, OrderEventConsumer};
pub use error::NotificationError;
pub use processor::OrderEventProcessor;
pub use repository::{NotificationRepository, NotificationRepositoryTrait};
pub use state::AppState;
