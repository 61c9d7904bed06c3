//! 私信路由 - 根据私信模式和触发用户计算最终接收者

use crate::build::BuildEvent;
use crate::config::{DirectMessageMode, GlobalConfig};
use tracing::{debug, error};

/// 最终接收者
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    /// 有序目标列表：频道原样，私信目标以 `@` 开头
    Targets(Vec<String>),
    /// 不投递（只私信模式但找不到用户名）
    Inert,
}

impl Recipients {
    pub fn is_inert(&self) -> bool {
        matches!(self, Recipients::Inert)
    }

    pub fn targets(&self) -> &[String] {
        match self {
            Recipients::Targets(targets) => targets,
            Recipients::Inert => &[],
        }
    }
}

/// 平台用户 -> 聊天用户名目录（外部协作者）
pub trait UserDirectory {
    fn lookup_chat_handle(&self, user_id: &str) -> Option<String>;
}

impl UserDirectory for GlobalConfig {
    fn lookup_chat_handle(&self, user_id: &str) -> Option<String> {
        self.users.get(user_id).cloned()
    }
}

/// 解析触发用户的聊天用户名（只有用户手动触发时才有）
pub fn resolve_username(event: &BuildEvent, directory: &dyn UserDirectory) -> Option<String> {
    let user_id = event.triggering_user_id()?;
    let handle = directory
        .lookup_chat_handle(user_id)
        .map(|h| h.trim().trim_start_matches('@').to_string())
        .filter(|h| !h.is_empty());

    if handle.is_none() {
        debug!(user_id = %user_id, "No chat username mapped for user");
    }
    handle
}

/// 频道目标：没有配置任何频道时用一个空目标，表示 hook 自带的默认频道
pub fn channel_targets(rooms: &[String]) -> Vec<String> {
    if rooms.is_empty() {
        vec![String::new()]
    } else {
        rooms.to_vec()
    }
}

/// 计算接收者
pub fn route(rooms: &[String], mode: DirectMessageMode, username: Option<&str>) -> Recipients {
    let username = username.filter(|u| !u.is_empty());

    match (mode, username) {
        (DirectMessageMode::None, _) => Recipients::Targets(channel_targets(rooms)),
        (DirectMessageMode::User, Some(name)) => Recipients::Targets(vec![format!("@{}", name)]),
        (DirectMessageMode::User, None) => {
            error!(
                direct_message = mode.as_str(),
                "Direct message requested but no chat username mapped for triggering user"
            );
            Recipients::Inert
        }
        (DirectMessageMode::Both, Some(name)) => {
            let mut targets = channel_targets(rooms);
            targets.push(format!("@{}", name));
            Recipients::Targets(targets)
        }
        (DirectMessageMode::Both, None) => {
            error!(
                direct_message = mode.as_str(),
                "Direct message requested but no chat username mapped for triggering user"
            );
            Recipients::Targets(rooms.to_vec())
        }
    }
}
