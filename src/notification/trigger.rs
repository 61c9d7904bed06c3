//! 通知触发决策 - 根据当前 / 上一个结果和 job 开关决定是否通知

use super::color::{color_for, ColorTag};
use crate::build::{BuildEvent, BuildResult};
use crate::config::NotificationFlags;

/// 完成事件是否需要通知，需要时返回颜色
///
/// 纯函数：相同输入总是得到相同输出。
pub fn should_notify(
    current: Option<BuildResult>,
    previous: BuildResult,
    flags: &NotificationFlags,
) -> Option<ColorTag> {
    use crate::build::BuildResult::*;

    let current_result = current?;

    let fire = match current_result {
        Aborted => flags.notify_aborted,
        Failure if previous == Failure => flags.notify_failure && flags.notify_repeated_failure,
        Failure => flags.notify_failure,
        NotBuilt => flags.notify_not_built,
        Success => {
            let back_to_normal =
                matches!(previous, Failure | Unstable) && flags.notify_back_to_normal;
            back_to_normal || flags.notify_success
        }
        Unstable => flags.notify_unstable,
    };

    fire.then(|| color_for(current))
}

/// 开始事件是否需要通知
///
/// SCM 轮询触发的构建不发开始通知，避免重复噪音。
pub fn should_notify_start(event: &BuildEvent, flags: &NotificationFlags) -> bool {
    flags.start_notification && !event.has_scm_cause()
}

/// 开始通知的颜色：取最近一次已完成构建的结果，从未完成过则为 good
pub fn start_color(event: &BuildEvent) -> ColorTag {
    match event.history.last_completed() {
        Some(result) => color_for(Some(result)),
        None => ColorTag::Good,
    }
}
