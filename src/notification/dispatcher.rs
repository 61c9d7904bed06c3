//! 通知分发器 - 处理接收者并调用渠道发送

use super::channel::{NotificationChannel, NotificationMessage, SendResult};
use super::router::Recipients;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 通知分发器 - 持有一个渠道，负责把消息投递到接收者
pub struct NotificationDispatcher {
    /// 投递渠道
    channel: Arc<dyn NotificationChannel>,
    /// 是否为 dry-run 模式
    dry_run: bool,
}

impl NotificationDispatcher {
    /// 创建新的分发器
    pub fn new(channel: Arc<dyn NotificationChannel>) -> Self {
        Self {
            channel,
            dry_run: false,
        }
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 渠道名称
    pub fn channel_name(&self) -> &str {
        self.channel.name()
    }

    /// 同步投递消息
    ///
    /// 发送失败只记录日志，不返回错误。
    pub fn deliver(&self, message: &NotificationMessage, recipients: &Recipients) -> SendResult {
        let name = self.channel.name().to_string();

        let targets = match recipients {
            Recipients::Inert => {
                info!(channel = %name, "Recipient set is inert, not delivering");
                return SendResult::Skipped("no direct message target".to_string());
            }
            Recipients::Targets(targets) if targets.is_empty() => {
                warn!(channel = %name, "No recipients resolved, not delivering");
                return SendResult::Skipped("no recipients".to_string());
            }
            Recipients::Targets(targets) => targets,
        };

        if self.dry_run {
            eprintln!(
                "[DRY-RUN] Would send to {} via {} ({}):\n{}",
                targets.join(","),
                name,
                message.color,
                message.text
            );
            return SendResult::Skipped("dry-run".to_string());
        }

        let result = match self.channel.publish(message, targets) {
            Ok(r) => r,
            Err(e) => {
                warn!(channel = %name, error = %e, "Channel publish failed");
                SendResult::Failed(e.to_string())
            }
        };

        match &result {
            SendResult::Sent => debug!(channel = %name, targets = ?targets, "Notification delivered"),
            SendResult::Failed(reason) => {
                warn!(channel = %name, reason = %reason, "Notification delivery failed")
            }
            SendResult::Skipped(reason) => debug!(channel = %name, reason = %reason, "Notification skipped"),
        }

        result
    }
}
