//! 分层配置解析：job（展开环境变量后）→ 全局

use super::{DirectMessageMode, EnvVars, GlobalConfig, JobConfig};
use tracing::trace;

/// 单个事件的最终生效配置
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub team_domain: String,
    pub auth_token: String,
    /// 有序频道列表（不去重）
    pub rooms: Vec<String>,
    pub direct_message_mode: DirectMessageMode,
}

/// 按顺序返回第一个存在且非空的值
pub fn first_present<I>(layers: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    layers
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
}

/// 合并 job 配置、环境变量和全局配置
pub fn resolve(job: &JobConfig, global: &GlobalConfig, env: &EnvVars) -> EffectiveConfig {
    let expand = |value: &Option<String>| value.as_deref().map(|v| env.expand(v));

    let team_domain = first_present([expand(&job.team_domain), global.team_domain.clone()])
        .unwrap_or_default();
    let auth_token = first_present([expand(&job.token), global.auth_token.clone()])
        .unwrap_or_default();
    let room = first_present([expand(&job.room), global.room.clone()]).unwrap_or_default();

    let direct_message_mode = match first_present([expand(&job.send_direct_message)]) {
        Some(mode) => DirectMessageMode::parse(&mode),
        None => global.direct_message.unwrap_or_default(),
    };

    let config = EffectiveConfig {
        team_domain,
        auth_token,
        rooms: split_rooms(&room),
        direct_message_mode,
    };

    trace!(
        team_domain = %config.team_domain,
        rooms = ?config.rooms,
        direct_message = config.direct_message_mode.as_str(),
        "Resolved effective notification config"
    );

    config
}

/// 拆分逗号分隔的频道列表，保持顺序
fn split_rooms(room: &str) -> Vec<String> {
    room.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}
