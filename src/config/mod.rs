//! 通知配置 - job 级、全局级配置与分层解析
//!
//! 配置来源（优先级从高到低）：
//! 1. job 配置中的值，展开构建环境变量后非空
//! 2. 全局配置 `~/.config/build-notifier/config.json`
//!
//! 全局配置在每个事件开始时作为只读快照传入，不在计算过程中重新读取。

pub mod env;
pub mod resolver;

pub use env::{EnvVars, EnvironmentSource, ProcessEnvironment};
pub use resolver::{first_present, resolve, EffectiveConfig};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 未配置服务器地址时使用的默认值
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/";

/// 私信模式
///
/// 反序列化与 job 层一致：大小写不敏感，无法识别时回退到 None。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum DirectMessageMode {
    /// 只发到频道
    #[default]
    None,
    /// 只私信触发用户
    User,
    /// 频道 + 私信
    Both,
}

impl DirectMessageMode {
    /// 解析配置文本（大小写不敏感），无法识别时回退到 None
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "" | "none" => DirectMessageMode::None,
            "user" => DirectMessageMode::User,
            "both" => DirectMessageMode::Both,
            other => {
                warn!(value = %other, "Unknown direct message mode, falling back to none");
                DirectMessageMode::None
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectMessageMode::None => "none",
            DirectMessageMode::User => "user",
            DirectMessageMode::Both => "both",
        }
    }
}

impl From<String> for DirectMessageMode {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

/// 每个 job 的通知开关
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationFlags {
    pub start_notification: bool,
    pub notify_aborted: bool,
    pub notify_failure: bool,
    pub notify_repeated_failure: bool,
    pub notify_not_built: bool,
    pub notify_success: bool,
    pub notify_back_to_normal: bool,
    pub notify_unstable: bool,
    pub show_commit_list: bool,
    pub include_test_summary: bool,
    pub include_custom_message: bool,
    /// 自定义消息模板（支持 $VAR / ${VAR}）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_message: Option<String>,
}

/// job 级配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// 逗号分隔的频道列表
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// "none" | "user" | "both"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_direct_message: Option<String>,
    #[serde(flatten)]
    pub flags: NotificationFlags,
}

impl JobConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read job config: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse job config: {}", path.display()))
    }
}

/// 全局配置（所有 job 共享的默认值）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_server_url: Option<String>,
    /// 发送者显示名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_as: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_message: Option<DirectMessageMode>,
    /// 平台用户 ID -> 聊天用户名
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub users: HashMap<String, String>,
}

impl GlobalConfig {
    /// 默认配置文件路径
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("build-notifier")
            .join("config.json")
    }

    /// 加载配置文件，文件不存在时返回空配置
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Global config not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read global config: {}", path.display()))?;
        let mut config: GlobalConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse global config: {}", path.display()))?;

        config.build_server_url = config.build_server_url.as_deref().map(normalize_server_url);
        Ok(config)
    }

    /// 保存配置（带文件锁）
    pub fn save(&self, path: &Path) -> Result<()> {
        use fs2::FileExt;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut normalized = self.clone();
        normalized.build_server_url = self.build_server_url.as_deref().map(normalize_server_url);
        let content = serde_json::to_string_pretty(&normalized)?;

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("Failed to open global config: {}", path.display()))?;

        file.lock_exclusive()?;
        let mut file = file;
        file.write_all(content.as_bytes())?;
        file.unlock()?;

        debug!(path = %path.display(), "Global config saved");
        Ok(())
    }

    /// 构建服务器根地址，保证以 `/` 结尾
    pub fn build_server_url(&self) -> String {
        self.build_server_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .map(normalize_server_url)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
    }
}

/// 规范化服务器地址：去除空白并补全结尾的 `/`
pub fn normalize_server_url(url: &str) -> String {
    let url = url.trim();
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}
