//! 通知层 - 触发决策、消息渲染、接收者路由和渠道投递
//!
//! # 组成
//! 1. `trigger`: 根据当前 / 上一个结果和 job 开关决定是否通知
//! 2. `message`: 按固定顺序拼接并转义消息文本
//! 3. `router`: 根据私信模式计算接收者
//! 4. `NotificationChannel` + `NotificationDispatcher`: 统一的投递接口
//!
//! # 使用示例
//! ```ignore
//! use build_notifier::config::GlobalConfig;
//! use build_notifier::notification::NotificationBuilder;
//!
//! let notifier = NotificationBuilder::new(GlobalConfig::load(&GlobalConfig::default_path())?)
//!     .dry_run(true)
//!     .build();
//!
//! let outcome = notifier.on_completed(&event, Some(&job));
//! ```

pub mod builder;
pub mod channel;
pub mod channels;
pub mod color;
pub mod dispatcher;
pub mod message;
pub mod router;
pub mod trigger;

pub use builder::{ChannelProvider, NotificationBuilder, SlackChannelProvider};
pub use channel::{NotificationChannel, NotificationMessage, SendResult};
pub use color::{color_for, ColorTag};
pub use dispatcher::NotificationDispatcher;
pub use message::MessageBuilder;
pub use router::{Recipients, UserDirectory};
pub use trigger::{should_notify, should_notify_start, start_color};
