//! Build Notifier CLI
//!
//! 把调度器导出的构建事件转换成团队聊天通知

use anyhow::Result;
use build_notifier::cli::{
    handle_completed, handle_started, handle_test_connection, EventArgs, TestConnectionArgs,
};
use build_notifier::GlobalConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "bnotify")]
#[command(about = "Build Notifier - 构建开始 / 完成时发送团队聊天通知")]
#[command(version)]
struct Cli {
    /// 全局配置文件 (默认: ~/.config/build-notifier/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 只打印将要发送的消息，不实际发送
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 处理构建开始事件
    Started(EventArgs),
    /// 处理构建完成事件
    Completed(EventArgs),
    /// 发送测试消息验证凭据
    TestConnection(TestConnectionArgs),
}

fn main() -> Result<()> {
    // 日志输出到 stderr，stdout 留给命令结果
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("build_notifier=info,bnotify=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(GlobalConfig::default_path);
    let global = GlobalConfig::load(&config_path)?;
    debug!(path = %config_path.display(), "Loaded global config");

    match cli.command {
        Commands::Started(args) => handle_started(args, global, cli.dry_run)?,
        Commands::Completed(args) => handle_completed(args, global, cli.dry_run)?,
        Commands::TestConnection(args) => handle_test_connection(args, global)?,
    }

    Ok(())
}
