//! Slack 渠道 - 通过 incoming hook 发送附件消息
//!
//! 每个目标（频道或 `@用户`）单独 POST 一次：
//! `https://<team>.slack.com/services/hooks/jenkins-ci?token=<token>`，
//! 表单字段 `payload` 为 JSON 字符串。

use crate::notification::channel::{NotificationChannel, NotificationMessage, SendResult};
use anyhow::{anyhow, bail, Result};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 默认 Slack 域名
const DEFAULT_HOST: &str = "slack.com";

/// 默认超时（秒）
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Slack 渠道配置
#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// 团队子域名
    pub team_domain: String,
    /// 集成 token
    pub token: String,
    /// 发送者显示名（可选）
    pub send_as: Option<String>,
    /// Slack 域名
    pub host: String,
    /// 超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            team_domain: String::new(),
            token: String::new(),
            send_as: None,
            host: DEFAULT_HOST.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Slack 渠道
pub struct SlackChannel {
    client: reqwest::blocking::Client,
    config: SlackConfig,
}

impl SlackChannel {
    /// 创建 Slack 渠道，team_domain 和 token 必填
    pub fn new(config: SlackConfig) -> Result<Self> {
        if config.team_domain.trim().is_empty() {
            bail!("team_domain is required");
        }
        if config.token.trim().is_empty() {
            bail!("token is required");
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow!("Cannot create HTTP client: {}", e))?;

        Ok(Self { client, config })
    }

    /// hook 地址（不含 token）
    pub fn endpoint(&self) -> String {
        format!(
            "https://{}.{}/services/hooks/jenkins-ci",
            self.config.team_domain.trim(),
            self.config.host
        )
    }

    /// 构建单个目标的 payload，空目标不带 channel（使用 hook 默认频道）
    pub fn build_payload(&self, message: &NotificationMessage, target: &str) -> serde_json::Value {
        let mut payload = json!({
            "attachments": [
                {
                    "fallback": message.text,
                    "color": message.color.as_str(),
                    "fields": [
                        {
                            "value": message.text,
                            "short": false
                        }
                    ],
                    "mrkdwn_in": ["pretext", "text", "fields"]
                }
            ]
        });

        if !target.is_empty() {
            payload["channel"] = json!(target);
        }
        if let Some(name) = self.config.send_as.as_deref().filter(|n| !n.is_empty()) {
            payload["username"] = json!(name);
        }

        payload
    }

    /// 发送到单个目标
    fn post(&self, message: &NotificationMessage, target: &str) -> Result<()> {
        let payload = self.build_payload(message, target);

        debug!(
            endpoint = %self.endpoint(),
            target = %target,
            color = %message.color,
            "Posting message to Slack"
        );

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("token", self.config.token.as_str())])
            .form(&[("payload", payload.to_string())])
            .send()
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("Slack post to {} failed: {} - {}", target, status, body);
        }

        Ok(())
    }
}

impl NotificationChannel for SlackChannel {
    fn name(&self) -> &str {
        "slack"
    }

    fn publish(&self, message: &NotificationMessage, targets: &[String]) -> Result<SendResult> {
        let mut errors = Vec::new();

        for target in targets {
            if let Err(e) = self.post(message, target) {
                warn!(target = %target, error = %e, "Slack post failed");
                errors.push(e.to_string());
            }
        }

        if errors.is_empty() {
            info!(
                team_domain = %self.config.team_domain,
                targets = targets.len(),
                "Message sent to Slack"
            );
            Ok(SendResult::Sent)
        } else {
            Ok(SendResult::Failed(errors.join("; ")))
        }
    }
}
