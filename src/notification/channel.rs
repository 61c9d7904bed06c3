//! 通知渠道 trait 定义

use anyhow::Result;
use serde::{Deserialize, Serialize};
use super::color::ColorTag;

/// 通知消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// 消息内容（已转义）
    pub text: String,
    /// 颜色标记
    pub color: ColorTag,
}

impl NotificationMessage {
    pub fn new(text: impl Into<String>, color: ColorTag) -> Self {
        Self {
            text: text.into(),
            color,
        }
    }
}

/// 发送结果
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// 发送成功
    Sent,
    /// 跳过（无接收者、dry-run 等）
    Skipped(String),
    /// 发送失败
    Failed(String),
}

impl SendResult {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendResult::Sent)
    }
}

/// 通知渠道 trait
///
/// 渠道只负责网络调用和认证，消息内容和接收者由调用方决定。
pub trait NotificationChannel: Send + Sync {
    /// 渠道名称（用于日志）
    fn name(&self) -> &str;

    /// 发送消息到所有目标
    fn publish(&self, message: &NotificationMessage, targets: &[String]) -> Result<SendResult>;
}
