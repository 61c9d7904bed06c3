//! 构建事件模型 - 由外部调度器提供的只读构建视图
//!
//! 本模块只描述数据，不修改事件：
//! - `BuildEvent`: 一次构建生命周期事件（开始或完成）
//! - `BuildHistory`: 同一 job 之前已完成构建的结果序列
//! - `Cause`: 触发原因（用户、SCM 轮询、上游构建等）

pub mod duration;
pub mod history;

pub use duration::format_duration;
pub use history::BuildHistory;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// 构建结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    Aborted,
    NotBuilt,
}

impl BuildResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildResult::Success => "SUCCESS",
            BuildResult::Unstable => "UNSTABLE",
            BuildResult::Failure => "FAILURE",
            BuildResult::Aborted => "ABORTED",
            BuildResult::NotBuilt => "NOT_BUILT",
        }
    }
}

impl std::fmt::Display for BuildResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 触发原因类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CauseKind {
    /// 用户手动触发
    User,
    /// SCM 轮询触发
    Scm,
    /// 上游构建触发
    Upstream,
    /// 其他（定时器、远程调用等）
    Other,
}

/// 上游构建引用
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpstreamRef {
    /// 上游 job 全名
    pub project: String,
    /// 上游构建号
    pub build: u32,
}

/// 构建触发原因
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cause {
    pub kind: CauseKind,
    /// 简短描述，如 "Started by user Alice"
    #[serde(default)]
    pub short_description: String,
    /// 触发用户 ID（仅 User 类型）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// 上游引用（仅 Upstream 类型）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<UpstreamRef>,
}

impl Cause {
    pub fn user(user_id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: CauseKind::User,
            short_description: description.into(),
            user_id: Some(user_id.into()),
            upstream: None,
        }
    }

    pub fn scm(description: impl Into<String>) -> Self {
        Self {
            kind: CauseKind::Scm,
            short_description: description.into(),
            user_id: None,
            upstream: None,
        }
    }

    pub fn upstream(project: impl Into<String>, build: u32) -> Self {
        let project = project.into();
        Self {
            kind: CauseKind::Upstream,
            short_description: format!("Started by upstream project \"{}\" build number {}", project, build),
            user_id: None,
            upstream: Some(UpstreamRef { project, build }),
        }
    }
}

/// 变更文件的修改类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditType {
    Add,
    Edit,
    Delete,
}

/// 变更涉及的文件（路径 + 修改类型 决定同一性）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AffectedFile {
    pub path: String,
    #[serde(default = "default_edit_type")]
    pub edit_type: EditType,
}

fn default_edit_type() -> EditType {
    EditType::Edit
}

/// 变更集中的一条提交
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// 提交信息
    pub message: String,
    /// 作者显示名
    pub author: String,
    #[serde(default)]
    pub affected_files: Vec<AffectedFile>,
}

/// 测试结果汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultSummary {
    pub total: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl TestResultSummary {
    pub fn passed(&self) -> u32 {
        self.total.saturating_sub(self.failed).saturating_sub(self.skipped)
    }
}

/// 一次构建生命周期事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildEvent {
    /// 构建号
    pub number: u32,
    /// 构建显示名，如 "#12"
    pub display_name: String,
    /// job 全名，如 "folder » app"
    pub project_full_name: String,
    /// 相对 URL，如 "job/app/12/"
    pub url: String,
    /// 是否仍在构建中
    #[serde(default)]
    pub building: bool,
    /// 当前结果（构建中为 None）
    #[serde(default)]
    pub result: Option<BuildResult>,
    /// 之前已完成构建的结果
    #[serde(default)]
    pub history: BuildHistory,
    /// 已格式化的耗时文本
    #[serde(default)]
    pub duration: Option<String>,
    /// 耗时毫秒数（没有 duration 文本时使用）
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub causes: Vec<Cause>,
    /// 变更集（None 表示尚未计算）
    #[serde(default)]
    pub change_set: Option<Vec<ChangeLogEntry>>,
    #[serde(default)]
    pub test_result: Option<TestResultSummary>,
    /// 构建环境变量（None 表示调度器无法提供）
    #[serde(default)]
    pub environment: Option<HashMap<String, String>>,
}

impl BuildEvent {
    /// 创建一个最小事件（其余字段取默认值）
    pub fn new(
        project_full_name: impl Into<String>,
        number: u32,
        url: impl Into<String>,
    ) -> Self {
        Self {
            number,
            display_name: format!("#{}", number),
            project_full_name: project_full_name.into(),
            url: url.into(),
            building: false,
            result: None,
            history: BuildHistory::default(),
            duration: None,
            duration_ms: None,
            causes: Vec::new(),
            change_set: None,
            test_result: None,
            environment: None,
        }
    }

    /// 上一个非 ABORTED 构建的结果（没有则为 SUCCESS）
    pub fn previous_result(&self) -> BuildResult {
        self.history.previous_result()
    }

    /// 耗时文本，优先使用调度器提供的文本
    pub fn duration_text(&self) -> String {
        if let Some(text) = self.duration.as_deref().filter(|d| !d.is_empty()) {
            return text.to_string();
        }
        match self.duration_ms {
            Some(ms) => format_duration(Duration::from_millis(ms)),
            None => String::new(),
        }
    }

    pub fn find_cause(&self, kind: CauseKind) -> Option<&Cause> {
        self.causes.iter().find(|c| c.kind == kind)
    }

    pub fn has_scm_cause(&self) -> bool {
        self.find_cause(CauseKind::Scm).is_some()
    }

    /// 触发用户 ID（仅当存在 User 类型原因时）
    pub fn triggering_user_id(&self) -> Option<&str> {
        self.find_cause(CauseKind::User)
            .and_then(|c| c.user_id.as_deref())
    }

    pub fn upstream_ref(&self) -> Option<&UpstreamRef> {
        self.find_cause(CauseKind::Upstream)
            .and_then(|c| c.upstream.as_ref())
    }

    /// 原因描述（取第一个原因）
    pub fn cause_description(&self) -> &str {
        self.causes
            .first()
            .map(|c| c.short_description.as_str())
            .unwrap_or("")
    }
}
