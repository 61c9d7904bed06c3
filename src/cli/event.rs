// src/cli/event.rs
//! started / completed 命令 - 从 JSON 文件读取构建事件并通知
//!
//! 通知失败不影响退出码，只有输入文件不可读时才返回错误。

use super::output::format_outcome;
use crate::build::BuildEvent;
use crate::changes::JsonBuildArchive;
use crate::config::{GlobalConfig, JobConfig};
use crate::notification::NotificationBuilder;
use crate::notifier::BuildNotifier;
use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// 构建事件命令参数
#[derive(Args)]
pub struct EventArgs {
    /// Build event JSON file ("-" or omitted reads stdin)
    #[arg(long)]
    pub event: Option<PathBuf>,

    /// Job notification config JSON file
    #[arg(long)]
    pub job: Option<PathBuf>,

    /// Directory of archived builds (<project>/<number>.json) for upstream lookup
    #[arg(long)]
    pub archive: Option<PathBuf>,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

/// 处理 started 命令
pub fn handle_started(args: EventArgs, global: GlobalConfig, dry_run: bool) -> Result<()> {
    let event = read_event(args.event.as_deref())?;
    let job = read_job(args.job.as_deref())?;
    let notifier = notifier(global, args.archive, dry_run);

    let outcome = notifier.on_started(&event, job.as_ref());
    println!("{}", format_outcome(&outcome, args.json));
    Ok(())
}

/// 处理 completed 命令
pub fn handle_completed(args: EventArgs, global: GlobalConfig, dry_run: bool) -> Result<()> {
    let event = read_event(args.event.as_deref())?;
    let job = read_job(args.job.as_deref())?;
    let notifier = notifier(global, args.archive, dry_run);

    let outcome = notifier.on_completed(&event, job.as_ref());
    println!("{}", format_outcome(&outcome, args.json));
    Ok(())
}

fn notifier(global: GlobalConfig, archive: Option<PathBuf>, dry_run: bool) -> BuildNotifier {
    let builder = NotificationBuilder::new(global).dry_run(dry_run);
    match archive {
        Some(root) => builder.build_lookup(JsonBuildArchive::new(root)).build(),
        None => builder.build(),
    }
}

/// 读取构建事件，路径为空或 `-` 时读 stdin
pub fn read_event(path: Option<&Path>) -> Result<BuildEvent> {
    let content = match path {
        Some(p) if p != Path::new("-") => fs::read_to_string(p)
            .with_context(|| format!("Failed to read build event: {}", p.display()))?,
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read build event from stdin")?;
            buf
        }
    };

    let event: BuildEvent =
        serde_json::from_str(&content).context("Failed to parse build event")?;
    debug!(project = %event.project_full_name, build = event.number, "Loaded build event");
    Ok(event)
}

/// 读取 job 配置，未指定时视为该 job 未配置通知
pub fn read_job(path: Option<&Path>) -> Result<Option<JobConfig>> {
    path.map(JobConfig::load).transpose()
}
