//! 通知文案模板
//!
//! 订单创建通知使用固定模板，下游客户端和测试都依赖该文案逐字一致。

use crate::events::OrderCreatedEvent;

/// 渲染订单创建通知的正文
pub fn render_order_created(event: &OrderCreatedEvent) -> String {
    format!(
        "{}'s order {} has been successfully created.",
        event.user_id, event.order_id
    )
}
