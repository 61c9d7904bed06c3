//! 通知器构建器 - 组装渠道、环境、用户目录和上游查找

use super::channel::NotificationChannel;
use super::channels::slack::{SlackChannel, SlackConfig};
use super::router::UserDirectory;
use crate::changes::{BuildLookup, NoUpstream};
use crate::config::{EffectiveConfig, EnvironmentSource, GlobalConfig, ProcessEnvironment};
use crate::notifier::BuildNotifier;
use anyhow::Result;
use std::sync::Arc;

/// 按生效配置创建投递渠道
///
/// team_domain / token 每个事件都可能不同，所以渠道按事件创建。
pub trait ChannelProvider {
    fn channel(&self, config: &EffectiveConfig) -> Result<Arc<dyn NotificationChannel>>;
}

/// Slack 渠道提供者
#[derive(Debug, Clone, Default)]
pub struct SlackChannelProvider {
    send_as: Option<String>,
}

impl SlackChannelProvider {
    pub fn new(send_as: Option<String>) -> Self {
        Self { send_as }
    }

    pub fn from_global(global: &GlobalConfig) -> Self {
        Self::new(global.send_as.clone())
    }
}

impl ChannelProvider for SlackChannelProvider {
    fn channel(&self, config: &EffectiveConfig) -> Result<Arc<dyn NotificationChannel>> {
        let channel = SlackChannel::new(SlackConfig {
            team_domain: config.team_domain.clone(),
            token: config.auth_token.clone(),
            send_as: self.send_as.clone(),
            ..Default::default()
        })?;
        Ok(Arc::new(channel))
    }
}

/// 通知器构建器
pub struct NotificationBuilder {
    global: GlobalConfig,
    channels: Option<Box<dyn ChannelProvider>>,
    environment: Box<dyn EnvironmentSource>,
    users: Option<Box<dyn UserDirectory>>,
    builds: Box<dyn BuildLookup>,
    dry_run: bool,
}

impl NotificationBuilder {
    /// 以全局配置快照创建构建器
    pub fn new(global: GlobalConfig) -> Self {
        Self {
            global,
            channels: None,
            environment: Box::new(ProcessEnvironment::new()),
            users: None,
            builds: Box::new(NoUpstream),
            dry_run: false,
        }
    }

    /// 设置渠道提供者（默认 Slack）
    pub fn channel_provider(mut self, provider: impl ChannelProvider + 'static) -> Self {
        self.channels = Some(Box::new(provider));
        self
    }

    /// 设置环境变量来源
    pub fn environment(mut self, source: impl EnvironmentSource + 'static) -> Self {
        self.environment = Box::new(source);
        self
    }

    /// 设置用户目录（默认使用全局配置中的 users）
    pub fn user_directory(mut self, directory: impl UserDirectory + 'static) -> Self {
        self.users = Some(Box::new(directory));
        self
    }

    /// 设置上游构建查找
    pub fn build_lookup(mut self, lookup: impl BuildLookup + 'static) -> Self {
        self.builds = Box::new(lookup);
        self
    }

    /// 设置 dry-run 模式
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn build(self) -> BuildNotifier {
        let channels: Box<dyn ChannelProvider> = match self.channels {
            Some(provider) => provider,
            None => Box::new(SlackChannelProvider::from_global(&self.global)),
        };
        let users: Box<dyn UserDirectory> = match self.users {
            Some(directory) => directory,
            None => Box::new(self.global.clone()),
        };

        BuildNotifier::new(
            self.global,
            channels,
            self.environment,
            users,
            self.builds,
            self.dry_run,
        )
    }
}
