//! 消息构建器 - 按固定顺序拼接通知文本
//!
//! 所有普通文本片段在拼接前转义（`&` `<` `>`），构建器自己生成的
//! 链接片段不转义，因此不会出现二次转义。
//!
//! 完成消息：标题 → 状态 → 耗时 → 链接 → [测试汇总] → [自定义消息]
//! 开始消息：标题 → 变更汇总或触发原因 → 链接

use crate::build::{BuildEvent, BuildResult, TestResultSummary};
use crate::changes::{ChangeOrigin, ChangeSummary};
use crate::config::{EnvVars, NotificationFlags};
use tracing::debug;

/// 没有变更时的提交列表文本
pub const NO_CHANGES: &str = "No Changes.";

/// 转义标记语言中的特殊字符（顺序固定：& → < → >）
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// 状态短语
pub fn status_message(event: &BuildEvent) -> &'static str {
    if event.building {
        return "Starting...";
    }

    let previous = event.previous_result();
    match (event.result, previous) {
        (Some(BuildResult::Success), BuildResult::Failure) => "Back to normal",
        (Some(BuildResult::Failure), BuildResult::Failure) => "Still Failing",
        (Some(BuildResult::Success), _) => "Success",
        (Some(BuildResult::Failure), _) => "Failure",
        (Some(BuildResult::Aborted), _) => "Aborted",
        (Some(BuildResult::NotBuilt), _) => "Not built",
        (Some(BuildResult::Unstable), _) => "Unstable",
        (None, _) => "Unknown",
    }
}

/// 顺序转义的文本构建器
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    message: String,
    url: String,
}

impl MessageBuilder {
    /// 以 `"<job 全名> - <构建名> "` 开头
    pub fn new(project_full_name: &str, display_name: &str, url: &str) -> Self {
        let mut message = String::new();
        message.push_str(&escape(project_full_name));
        message.push_str(" - ");
        message.push_str(&escape(display_name));
        message.push(' ');
        Self {
            message,
            url: url.to_string(),
        }
    }

    pub fn for_event(event: &BuildEvent) -> Self {
        Self::new(&event.project_full_name, &event.display_name, &event.url)
    }

    pub fn for_origin(origin: &ChangeOrigin) -> Self {
        Self::new(&origin.project_full_name, &origin.display_name, &origin.url)
    }

    /// 追加普通文本（转义）
    pub fn append(mut self, text: impl AsRef<str>) -> Self {
        self.message.push_str(&escape(text.as_ref()));
        self
    }

    pub fn append_status_message(self, event: &BuildEvent) -> Self {
        self.append(status_message(event))
    }

    /// `" after <耗时>"`
    pub fn append_duration(self, event: &BuildEvent) -> Self {
        self.append(" after ").append(event.duration_text())
    }

    /// `" (<server_url + url|Open>)"`，链接片段不转义
    pub fn append_open_link(mut self, server_url: &str) -> Self {
        self.message.push_str(" (<");
        self.message.push_str(server_url);
        self.message.push_str(&self.url);
        self.message.push_str("|Open>)");
        self
    }

    pub fn append_test_summary(self, test_result: Option<&TestResultSummary>) -> Self {
        match test_result {
            Some(summary) => self
                .append("\nTest Status:\n")
                .append(format!(
                    "\tPassed: {}, Failed: {}, Skipped: {}",
                    summary.passed(),
                    summary.failed,
                    summary.skipped
                )),
            None => self.append("\nNo Tests found."),
        }
    }

    /// 追加展开环境变量后的自定义消息（空模板不追加）
    pub fn append_custom_message(self, template: Option<&str>, env: &EnvVars) -> Self {
        match template.filter(|t| !t.trim().is_empty()) {
            Some(template) => self.append("\n").append(env.expand(template)),
            None => {
                debug!("Custom message enabled but template is empty");
                self
            }
        }
    }

    pub fn build(self) -> String {
        self.message
    }
}

/// 完成事件的状态消息
pub fn build_status_message(
    event: &BuildEvent,
    server_url: &str,
    flags: &NotificationFlags,
    env: &EnvVars,
) -> String {
    let mut builder = MessageBuilder::for_event(event)
        .append_status_message(event)
        .append_duration(event)
        .append_open_link(server_url);

    if flags.include_test_summary {
        builder = builder.append_test_summary(event.test_result.as_ref());
    }
    if flags.include_custom_message {
        builder = builder.append_custom_message(flags.custom_message.as_deref(), env);
    }

    builder.build()
}

/// 开始事件消息：有变更时显示作者和文件数，否则显示触发原因
pub fn start_message(event: &BuildEvent, changes: &ChangeSummary, server_url: &str) -> String {
    let builder = MessageBuilder::for_event(event);

    let builder = match changes {
        ChangeSummary::Authors {
            authors,
            changed_files,
        } if !authors.is_empty() => builder
            .append("Started by changes from ")
            .append(authors.join(", "))
            .append(format!(" ({} file(s) changed)", changed_files)),
        _ => builder.append(event.cause_description()),
    };

    builder.append_open_link(server_url).build()
}

/// 提交列表消息
pub fn commit_list_message(changes: &ChangeSummary) -> String {
    match changes {
        ChangeSummary::Commits { origin, lines } if !lines.is_empty() => {
            MessageBuilder::for_origin(origin)
                .append("Changes:\n- ")
                .append(lines.join("\n- "))
                .build()
        }
        _ => NO_CHANGES.to_string(),
    }
}
