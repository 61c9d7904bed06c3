//! 构建通知器 - 处理构建开始 / 完成事件
//!
//! 每个事件独立、同步处理：
//! 1. 解析生效配置（job → 全局，展开环境变量）
//! 2. 判断是否需要通知
//! 3. 渲染消息、计算接收者
//! 4. 通过分发器投递（状态消息，然后可选的提交列表）
//!
//! 任何失败都只记录日志，不会让触发通知的构建失败。

use crate::build::BuildEvent;
use crate::changes::{BuildLookup, ChangeAggregator};
use crate::config::{self, EffectiveConfig, EnvVars, EnvironmentSource, GlobalConfig, JobConfig};
use crate::notification::builder::ChannelProvider;
use crate::notification::channel::{NotificationChannel, NotificationMessage, SendResult};
use crate::notification::dispatcher::NotificationDispatcher;
use crate::notification::message::{build_status_message, commit_list_message, start_message};
use crate::notification::router::{
    channel_targets, resolve_username, route, Recipients, UserDirectory,
};
use crate::notification::trigger::{should_notify, should_notify_start, start_color};
use crate::notification::ColorTag;
use anyhow::{bail, Result};
use tracing::{debug, error, info, warn};

/// 一次投递记录
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub message: NotificationMessage,
    pub recipients: Recipients,
    pub result: SendResult,
}

/// 事件处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyOutcome {
    /// job 没有通知配置
    NotConfigured,
    /// 根据开关不需要通知
    Suppressed,
    /// 无法创建投递渠道
    ChannelUnavailable(String),
    /// 已尝试投递（按顺序）
    Delivered(Vec<Delivery>),
}

impl NotifyOutcome {
    pub fn deliveries(&self) -> &[Delivery] {
        match self {
            NotifyOutcome::Delivered(deliveries) => deliveries,
            _ => &[],
        }
    }
}

/// 构建通知器
pub struct BuildNotifier {
    /// 全局配置快照（只读）
    global: GlobalConfig,
    channels: Box<dyn ChannelProvider>,
    environment: Box<dyn EnvironmentSource>,
    users: Box<dyn UserDirectory>,
    builds: Box<dyn BuildLookup>,
    dry_run: bool,
}

impl BuildNotifier {
    pub fn new(
        global: GlobalConfig,
        channels: Box<dyn ChannelProvider>,
        environment: Box<dyn EnvironmentSource>,
        users: Box<dyn UserDirectory>,
        builds: Box<dyn BuildLookup>,
        dry_run: bool,
    ) -> Self {
        Self {
            global,
            channels,
            environment,
            users,
            builds,
            dry_run,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn global(&self) -> &GlobalConfig {
        &self.global
    }

    /// 处理构建开始事件
    pub fn on_started(&self, event: &BuildEvent, job: Option<&JobConfig>) -> NotifyOutcome {
        let job = match job {
            Some(job) => job,
            None => {
                warn!(project = %event.project_full_name, "Project has no notification configuration");
                return NotifyOutcome::NotConfigured;
            }
        };

        if !should_notify_start(event, &job.flags) {
            debug!(
                project = %event.project_full_name,
                scm_triggered = event.has_scm_cause(),
                "Start notification suppressed"
            );
            return NotifyOutcome::Suppressed;
        }

        let env = self.load_environment(event);
        let config = config::resolve(job, &self.global, &env);

        let changes = ChangeAggregator::new(&*self.builds).start_summary(event);
        let text = start_message(event, &changes, &self.global.build_server_url());
        let message = NotificationMessage::new(text, start_color(event));

        info!(
            project = %event.project_full_name,
            build = %event.display_name,
            "Sending start notification"
        );
        self.deliver_all(event, &config, vec![message])
    }

    /// 处理构建完成事件
    pub fn on_completed(&self, event: &BuildEvent, job: Option<&JobConfig>) -> NotifyOutcome {
        let job = match job {
            Some(job) => job,
            None => {
                warn!(project = %event.project_full_name, "Project has no notification configuration");
                return NotifyOutcome::NotConfigured;
            }
        };

        let previous = event.previous_result();
        let color = match should_notify(event.result, previous, &job.flags) {
            Some(color) => color,
            None => {
                debug!(
                    project = %event.project_full_name,
                    result = ?event.result,
                    previous = %previous,
                    "Completion notification suppressed"
                );
                return NotifyOutcome::Suppressed;
            }
        };

        let env = self.load_environment(event);
        let config = config::resolve(job, &self.global, &env);
        let server_url = self.global.build_server_url();

        let mut messages = vec![NotificationMessage::new(
            build_status_message(event, &server_url, &job.flags, &env),
            color,
        )];

        if job.flags.show_commit_list {
            let changes = ChangeAggregator::new(&*self.builds).summarize(event);
            messages.push(NotificationMessage::new(commit_list_message(&changes), color));
        }

        info!(
            project = %event.project_full_name,
            build = %event.display_name,
            result = ?event.result,
            color = %color,
            "Sending completion notification"
        );
        self.deliver_all(event, &config, messages)
    }

    /// 获取构建环境，失败时使用空环境
    fn load_environment(&self, event: &BuildEvent) -> EnvVars {
        match self.environment.environment(event) {
            Ok(env) => env,
            Err(e) => {
                error!(
                    project = %event.project_full_name,
                    error = %e,
                    "Error retrieving environment vars"
                );
                EnvVars::new()
            }
        }
    }

    /// 按顺序投递所有消息
    fn deliver_all(
        &self,
        event: &BuildEvent,
        config: &EffectiveConfig,
        messages: Vec<NotificationMessage>,
    ) -> NotifyOutcome {
        let username = resolve_username(event, &*self.users);
        let recipients = route(&config.rooms, config.direct_message_mode, username.as_deref());

        debug!(
            username = ?username,
            direct_message = config.direct_message_mode.as_str(),
            recipients = ?recipients,
            "Resolved notification recipients"
        );

        let dispatcher = match self.channels.channel(config) {
            Ok(channel) => NotificationDispatcher::new(channel).with_dry_run(self.dry_run),
            Err(e) => {
                error!(
                    project = %event.project_full_name,
                    error = %e,
                    "Cannot create notification channel"
                );
                return NotifyOutcome::ChannelUnavailable(e.to_string());
            }
        };

        let deliveries = messages
            .into_iter()
            .map(|message| {
                let result = dispatcher.deliver(&message, &recipients);
                Delivery {
                    message,
                    recipients: recipients.clone(),
                    result,
                }
            })
            .collect();

        NotifyOutcome::Delivered(deliveries)
    }
}

/// 测试连接：发送一条测试消息，失败时返回错误给用户
pub fn test_connection(
    channel: &dyn NotificationChannel,
    rooms: &[String],
    server_url: &str,
) -> Result<String> {
    let targets = channel_targets(rooms);
    let message = NotificationMessage::new(
        format!("Slack/Jenkins plugin: you're all set on {}", server_url),
        ColorTag::Good,
    );

    match channel.publish(&message, &targets) {
        Ok(SendResult::Sent) => Ok("Success".to_string()),
        Ok(SendResult::Failed(reason)) => bail!("Failure: {}", reason),
        Ok(SendResult::Skipped(reason)) => bail!("Failure: skipped ({})", reason),
        Err(e) => bail!("Client error : {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{BuildHistory, BuildResult, Cause, ChangeLogEntry};
    use crate::changes::NoUpstream;
    use crate::config::{DirectMessageMode, NotificationFlags};
    use crate::notification::builder::NotificationBuilder;
    use anyhow::anyhow;
    use std::sync::{Arc, Mutex};

    /// 记录所有发送的 mock 渠道
    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<(NotificationMessage, Vec<String>)>>,
    }

    impl NotificationChannel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        fn publish(&self, message: &NotificationMessage, targets: &[String]) -> Result<SendResult> {
            self.sent
                .lock()
                .unwrap()
                .push((message.clone(), targets.to_vec()));
            Ok(SendResult::Sent)
        }
    }

    /// 总是返回同一个 RecordingChannel 的提供者
    struct SharedProvider(Arc<RecordingChannel>);

    impl ChannelProvider for SharedProvider {
        fn channel(&self, _config: &EffectiveConfig) -> Result<Arc<dyn NotificationChannel>> {
            Ok(self.0.clone())
        }
    }

    struct FailingEnvironment;

    impl EnvironmentSource for FailingEnvironment {
        fn environment(&self, _event: &BuildEvent) -> Result<EnvVars> {
            Err(anyhow!("agent offline"))
        }
    }

    struct StaticEnvironment(EnvVars);

    impl EnvironmentSource for StaticEnvironment {
        fn environment(&self, _event: &BuildEvent) -> Result<EnvVars> {
            Ok(self.0.clone())
        }
    }

    fn global() -> GlobalConfig {
        GlobalConfig {
            team_domain: Some("acme".to_string()),
            auth_token: Some("secret".to_string()),
            room: Some("#ci".to_string()),
            build_server_url: Some("http://host".to_string()),
            ..Default::default()
        }
    }

    fn notifier(channel: Arc<RecordingChannel>) -> BuildNotifier {
        NotificationBuilder::new(global())
            .channel_provider(SharedProvider(channel))
            .environment(StaticEnvironment(EnvVars::new()))
            .build_lookup(NoUpstream)
            .build()
    }

    fn failed_build() -> BuildEvent {
        let mut event = BuildEvent::new("X", 12, "job/X/12/");
        event.result = Some(BuildResult::Failure);
        event.history = BuildHistory::new(vec![BuildResult::Success]);
        event.duration = Some("3 min".to_string());
        event
    }

    #[test]
    fn test_missing_job_config_takes_no_action() {
        let channel = Arc::new(RecordingChannel::default());
        let notifier = notifier(channel.clone());

        assert_eq!(notifier.on_completed(&failed_build(), None), NotifyOutcome::NotConfigured);
        assert_eq!(notifier.on_started(&failed_build(), None), NotifyOutcome::NotConfigured);
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_completed_failure_sends_danger() {
        let channel = Arc::new(RecordingChannel::default());
        let notifier = notifier(channel.clone());
        let job = JobConfig {
            flags: NotificationFlags {
                notify_failure: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let outcome = notifier.on_completed(&failed_build(), Some(&job));
        assert_eq!(outcome.deliveries().len(), 1);

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.text.ends_with("Failure after 3 min (<http://host/job/X/12/|Open>)"));
        assert_eq!(sent[0].0.color, ColorTag::Danger);
        assert_eq!(sent[0].1, vec!["#ci"]);
    }

    #[test]
    fn test_completed_suppressed_without_flag() {
        let channel = Arc::new(RecordingChannel::default());
        let notifier = notifier(channel.clone());

        let outcome = notifier.on_completed(&failed_build(), Some(&JobConfig::default()));
        assert_eq!(outcome, NotifyOutcome::Suppressed);
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_commit_list_sent_after_status() {
        let channel = Arc::new(RecordingChannel::default());
        let notifier = notifier(channel.clone());
        let job = JobConfig {
            flags: NotificationFlags {
                notify_failure: true,
                show_commit_list: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let mut event = failed_build();
        event.change_set = Some(vec![ChangeLogEntry {
            message: "break things".to_string(),
            author: "Alice".to_string(),
            affected_files: vec![],
        }]);

        notifier.on_completed(&event, Some(&job));

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].0.text.contains("Failure"));
        assert_eq!(sent[1].0.text, "X - #12 Changes:\n- break things [Alice]");
        assert_eq!(sent[1].0.color, ColorTag::Danger);
    }

    #[test]
    fn test_environment_failure_is_not_fatal() {
        let channel = Arc::new(RecordingChannel::default());
        let notifier = NotificationBuilder::new(global())
            .channel_provider(SharedProvider(channel.clone()))
            .environment(FailingEnvironment)
            .build();
        let job = JobConfig {
            room: Some("$ROOM".to_string()),
            flags: NotificationFlags {
                notify_failure: true,
                include_custom_message: true,
                custom_message: Some("Branch $BRANCH".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        let outcome = notifier.on_completed(&failed_build(), Some(&job));
        assert_eq!(outcome.deliveries().len(), 1);

        let sent = channel.sent.lock().unwrap();
        assert!(sent[0].0.text.ends_with("\nBranch $BRANCH"));
        assert_eq!(sent[0].1, vec!["$ROOM"]);
    }

    #[test]
    fn test_user_mode_without_handle_is_inert() {
        let channel = Arc::new(RecordingChannel::default());
        let notifier = notifier(channel.clone());
        let job = JobConfig {
            send_direct_message: Some("user".to_string()),
            flags: NotificationFlags {
                notify_failure: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let outcome = notifier.on_completed(&failed_build(), Some(&job));
        let deliveries = outcome.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].recipients, Recipients::Inert);
        assert!(matches!(deliveries[0].result, SendResult::Skipped(_)));
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_both_mode_with_handle() {
        let channel = Arc::new(RecordingChannel::default());
        let mut global = global();
        global.users.insert("alice.smith".to_string(), "alice".to_string());
        global.direct_message = Some(DirectMessageMode::Both);
        let notifier = NotificationBuilder::new(global)
            .channel_provider(SharedProvider(channel.clone()))
            .environment(StaticEnvironment(EnvVars::new()))
            .build();
        let job = JobConfig {
            flags: NotificationFlags {
                notify_failure: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let mut event = failed_build();
        event.causes = vec![Cause::user("alice.smith", "Started by user Alice")];
        notifier.on_completed(&event, Some(&job));

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent[0].1, vec!["#ci", "@alice"]);
    }

    #[test]
    fn test_started_uses_cause_and_previous_color() {
        let channel = Arc::new(RecordingChannel::default());
        let notifier = notifier(channel.clone());
        let job = JobConfig {
            flags: NotificationFlags {
                start_notification: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let mut event = BuildEvent::new("X", 13, "job/X/13/");
        event.building = true;
        event.history = BuildHistory::new(vec![BuildResult::Failure]);
        event.causes = vec![Cause::user("bob", "Started by user Bob")];

        notifier.on_started(&event, Some(&job));

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0.text, "X - #13 Started by user Bob (<http://host/job/X/13/|Open>)");
        assert_eq!(sent[0].0.color, ColorTag::Danger);
    }

    #[test]
    fn test_started_suppressed_for_scm_trigger() {
        let channel = Arc::new(RecordingChannel::default());
        let notifier = notifier(channel.clone());
        let job = JobConfig {
            flags: NotificationFlags {
                start_notification: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let mut event = BuildEvent::new("X", 13, "job/X/13/");
        event.causes = vec![Cause::scm("Started by an SCM change")];

        assert_eq!(notifier.on_started(&event, Some(&job)), NotifyOutcome::Suppressed);
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_channel_unavailable() {
        let notifier = NotificationBuilder::new(GlobalConfig::default())
            .environment(StaticEnvironment(EnvVars::new()))
            .build();
        let job = JobConfig {
            flags: NotificationFlags {
                notify_failure: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let outcome = notifier.on_completed(&failed_build(), Some(&job));
        assert!(matches!(outcome, NotifyOutcome::ChannelUnavailable(_)));
    }

    #[test]
    fn test_connection_success_and_failure() {
        let channel = RecordingChannel::default();
        let rooms = vec!["#ci".to_string()];

        let result = test_connection(&channel, &rooms, "http://host/").unwrap();
        assert_eq!(result, "Success");
        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent[0].0.text, "Slack/Jenkins plugin: you're all set on http://host/");
        drop(sent);

        // 没有频道时发到 hook 默认频道
        test_connection(&channel, &[], "http://host/").unwrap();
        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent[1].1, vec![String::new()]);
    }

    /// 总是失败的渠道
    struct FailingChannel;

    impl NotificationChannel for FailingChannel {
        fn name(&self) -> &str {
            "failing"
        }

        fn publish(&self, _message: &NotificationMessage, _targets: &[String]) -> Result<SendResult> {
            Ok(SendResult::Failed("invalid token".to_string()))
        }
    }

    #[test]
    fn test_connection_failure_is_error() {
        let err = test_connection(&FailingChannel, &[], "http://host/").unwrap_err();
        assert!(err.to_string().contains("invalid token"));
    }

    #[test]
    fn test_team_and_token_only_posts_to_default_channel() {
        let channel = Arc::new(RecordingChannel::default());
        let global = GlobalConfig {
            team_domain: Some("acme".to_string()),
            auth_token: Some("secret".to_string()),
            ..Default::default()
        };
        let notifier = NotificationBuilder::new(global)
            .channel_provider(SharedProvider(channel.clone()))
            .environment(StaticEnvironment(EnvVars::new()))
            .build();
        let job = JobConfig {
            flags: NotificationFlags {
                notify_failure: true,
                ..Default::default()
            },
            ..Default::default()
        };

        let outcome = notifier.on_completed(&failed_build(), Some(&job));
        assert_eq!(outcome.deliveries()[0].result, SendResult::Sent);

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent[0].1, vec![String::new()]);
    }
}
