//! 通知存储层
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 每个操作都是单条 SQL，原子性由数据库保证，不需要跨操作事务
//! - 定义 trait 接口以支持 mock 测试和内存实现

mod notification_repo;
mod traits;

pub use notification_repo::NotificationRepository;
pub use traits::*;
