//! Build Notifier - 构建开始 / 完成时向团队聊天发送通知

pub mod build;
pub mod changes;
pub mod cli;
pub mod config;
pub mod notification;
pub mod notifier;

pub use build::{BuildEvent, BuildHistory, BuildResult, Cause, ChangeLogEntry, TestResultSummary};
pub use changes::{BuildLookup, ChangeAggregator, ChangeSummary, JsonBuildArchive, NoUpstream};
pub use config::{
    DirectMessageMode, EffectiveConfig, EnvVars, EnvironmentSource, GlobalConfig, JobConfig,
    NotificationFlags, ProcessEnvironment,
};
pub use notification::{
    ColorTag, NotificationBuilder, NotificationChannel, NotificationMessage, Recipients,
    SendResult, UserDirectory,
};
pub use notifier::{test_connection, BuildNotifier, Delivery, NotifyOutcome};
