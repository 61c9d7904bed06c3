//! 构建历史 - 计算"上一个结果"

use super::BuildResult;
use serde::{Deserialize, Serialize};

/// 同一 job 之前已完成构建的结果（按时间从旧到新）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildHistory {
    results: Vec<BuildResult>,
}

impl BuildHistory {
    pub fn new(results: Vec<BuildResult>) -> Self {
        Self { results }
    }

    /// 向后查找第一个非 ABORTED 的结果，没有则视为 SUCCESS
    ///
    /// ABORTED 构建不参与 back-to-normal / repeated-failure 的比较。
    pub fn previous_result(&self) -> BuildResult {
        self.results
            .iter()
            .rev()
            .copied()
            .find(|r| *r != BuildResult::Aborted)
            .unwrap_or(BuildResult::Success)
    }

    /// 最近一次已完成构建的结果（包括 ABORTED）
    pub fn last_completed(&self) -> Option<BuildResult> {
        self.results.last().copied()
    }
}

impl From<Vec<BuildResult>> for BuildHistory {
    fn from(results: Vec<BuildResult>) -> Self {
        Self::new(results)
    }
}
