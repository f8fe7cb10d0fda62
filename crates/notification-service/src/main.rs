//! 通知服务入口
//!
//! 同一进程内启动 HTTP API 和订单事件消费者，两者共用一个通知仓储。

use std::sync::Arc;

use notification_service::{
    AppState, NotificationRepository, OrderEventConsumer, OrderEventProcessor, routes,
    sender::LogSender,
};
use notify_shared::{config::AppConfig, database::Database, observability};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load("notification-service")?;

    let _guard = observability::init(&config.observability, &config.service_name).await?;

    info!(
        environment = %config.environment,
        "Starting notification-service on {}",
        config.server_addr()
    );

    let db = Database::connect(&config.database).await?;
    if config.database.run_migrations {
        db.run_migrations(&sqlx::migrate!()).await?;
    }

    let repository = Arc::new(NotificationRepository::new(db.pool().clone()));
    let processor = Arc::new(OrderEventProcessor::new(
        repository.clone(),
        Arc::new(LogSender),
    ));

    let consumer = OrderEventConsumer::new(config.kafka.clone(), processor);
    let state = AppState::new(repository, consumer.state());

    // 消费者在独立任务中运行，通过 watch 通道通知其停止
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer_handle = tokio::spawn(async move {
        if let Err(e) = consumer.run(shutdown_rx).await {
            error!(error = %e, "订单事件消费者启动失败，仅提供查询 API");
        }
    });

    let app = routes::app(state, config.server.request_timeout_seconds);

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：先停止接收新连接并等待已有请求完成，再停止消费者
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = consumer_handle.await {
        error!(error = %e, "消费者任务异常退出");
    }

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// K8s 通过 SIGTERM 通知 Pod 停止；本地开发通过 Ctrl+C。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
