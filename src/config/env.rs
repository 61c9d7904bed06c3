//! 构建环境变量 - `$VAR` / `${VAR}` 展开

use crate::build::BuildEvent;
use anyhow::Result;
use std::collections::HashMap;

/// 构建环境变量快照
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvVars {
    vars: HashMap<String, String>,
}

impl EnvVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// 展开 `$VAR` 和 `${VAR}` 引用，未定义的变量原样保留
    pub fn expand(&self, input: &str) -> String {
        shellexpand::env_with_context_no_errors(input, |name| self.vars.get(name)).into_owned()
    }
}

impl From<HashMap<String, String>> for EnvVars {
    fn from(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// 获取构建环境的外部协作者
///
/// 调用可能阻塞或失败；失败时调用方记录日志并使用空环境。
pub trait EnvironmentSource {
    fn environment(&self, event: &BuildEvent) -> Result<EnvVars>;
}

/// 进程环境 + 事件自带的环境变量 + 构建标准变量
#[derive(Debug, Clone, Default)]
pub struct ProcessEnvironment {
    /// 是否合并当前进程的环境变量
    pub include_process_env: bool,
}

impl ProcessEnvironment {
    pub fn new() -> Self {
        Self {
            include_process_env: true,
        }
    }
}

impl EnvironmentSource for ProcessEnvironment {
    fn environment(&self, event: &BuildEvent) -> Result<EnvVars> {
        let mut env = EnvVars::new();

        if self.include_process_env {
            for (key, value) in std::env::vars() {
                env.insert(key, value);
            }
        }

        env.insert("JOB_NAME", event.project_full_name.clone());
        env.insert("BUILD_NUMBER", event.number.to_string());
        env.insert("BUILD_DISPLAY_NAME", event.display_name.clone());

        // 事件自带的变量优先
        if let Some(vars) = &event.environment {
            for (key, value) in vars {
                env.insert(key.clone(), value.clone());
            }
        }

        Ok(env)
    }
}
