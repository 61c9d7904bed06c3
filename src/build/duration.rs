//! 构建耗时格式化，与 CI 服务器显示格式一致（"3 min 2 sec"、"1.5 sec"）

use std::time::Duration;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// 格式化耗时
///
/// 只显示最高的两个单位；高位 >= 10 时省略低位。
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    let days = total_secs / SECS_PER_DAY;
    let hours = (total_secs % SECS_PER_DAY) / SECS_PER_HOUR;
    let minutes = (total_secs % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let seconds = total_secs % SECS_PER_MINUTE;

    if days > 0 {
        span(days, if days == 1 { "day" } else { "days" }, hours, "hr")
    } else if hours > 0 {
        span(hours, "hr", minutes, "min")
    } else if minutes > 0 {
        span(minutes, "min", seconds, "sec")
    } else if seconds >= 10 {
        format!("{} sec", seconds)
    } else if seconds >= 1 {
        format!("{}.{} sec", seconds, millis / 100)
    } else {
        format!("{} ms", millis)
    }
}

fn span(big: u64, big_unit: &str, small: u64, small_unit: &str) -> String {
    if big < 10 {
        format!("{} {} {} {}", big, big_unit, small, small_unit)
    } else {
        format!("{} {}", big, big_unit)
    }
}
