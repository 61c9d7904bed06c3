// src/cli/connection.rs
//! test-connection 命令 - 用给定（或全局）凭据发送一条测试消息

use crate::config::{self, EffectiveConfig, EnvVars, GlobalConfig, JobConfig};
use crate::notification::builder::{ChannelProvider, SlackChannelProvider};
use crate::notifier::test_connection;
use anyhow::Result;
use clap::Args;
use tracing::info;

/// test-connection 命令参数
#[derive(Args)]
pub struct TestConnectionArgs {
    /// Team subdomain (defaults to the global config)
    #[arg(long)]
    pub team_domain: Option<String>,

    /// Integration token (defaults to the global config)
    #[arg(long)]
    pub token: Option<String>,

    /// Comma-separated rooms (defaults to the global config)
    #[arg(long)]
    pub room: Option<String>,
}

/// 表单值优先，其次全局配置
pub fn connection_config(args: &TestConnectionArgs, global: &GlobalConfig) -> EffectiveConfig {
    let job = JobConfig {
        team_domain: args.team_domain.clone(),
        token: args.token.clone(),
        room: args.room.clone(),
        ..Default::default()
    };
    config::resolve(&job, global, &EnvVars::new())
}

/// 处理 test-connection 命令
pub fn handle_test_connection(args: TestConnectionArgs, global: GlobalConfig) -> Result<()> {
    let config = connection_config(&args, &global);
    let server_url = global.build_server_url();

    info!(
        team_domain = %config.team_domain,
        rooms = ?config.rooms,
        "Testing connection"
    );

    let channel = SlackChannelProvider::from_global(&global).channel(&config)?;
    let result = test_connection(channel.as_ref(), &config.rooms, &server_url)?;
    println!("{}", result);
    Ok(())
}
