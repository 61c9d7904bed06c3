//! 变更汇总 - 从构建变更集提取作者 / 提交列表
//!
//! 变更集为空且由上游构建触发时，沿上游链递归查找变更。
//! 上游图是否无环由外部保证，这里仍限制递归深度并检测环。

use crate::build::{AffectedFile, BuildEvent};
use anyhow::{bail, Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace, warn};

/// 上游递归的最大深度
pub const MAX_UPSTREAM_DEPTH: usize = 16;

/// 根据 job 名和构建号查找构建（外部协作者）
pub trait BuildLookup {
    fn find_build(&self, project: &str, number: u32) -> Option<BuildEvent>;
}

/// 不提供任何上游构建
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUpstream;

impl BuildLookup for NoUpstream {
    fn find_build(&self, _project: &str, _number: u32) -> Option<BuildEvent> {
        None
    }
}

/// 基于目录的构建归档：`<root>/<project>/<number>.json`
#[derive(Debug, Clone)]
pub struct JsonBuildArchive {
    root: PathBuf,
}

impl JsonBuildArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 归档中的记录路径，job 名只允许普通路径段（不能跳出归档目录）
    fn path_for(&self, project: &str, number: u32) -> Result<PathBuf> {
        let relative = Path::new(project);
        let is_normal = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if project.is_empty() || !is_normal {
            bail!("Invalid project name for build archive: {:?}", project);
        }
        Ok(self.root.join(relative).join(format!("{}.json", number)))
    }

    fn load(&self, project: &str, number: u32) -> Result<BuildEvent> {
        let path = self.path_for(project, number)?;
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read build record: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse build record: {}", path.display()))
    }
}

impl BuildLookup for JsonBuildArchive {
    fn find_build(&self, project: &str, number: u32) -> Option<BuildEvent> {
        match self.load(project, number) {
            Ok(event) => Some(event),
            Err(e) => {
                debug!(project = %project, build = number, error = %e, "Upstream build not found in archive");
                None
            }
        }
    }
}

/// 变更来源构建（用于渲染标题）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeOrigin {
    pub project_full_name: String,
    pub display_name: String,
    pub url: String,
}

impl ChangeOrigin {
    fn of(event: &BuildEvent) -> Self {
        Self {
            project_full_name: event.project_full_name.clone(),
            display_name: event.display_name.clone(),
            url: event.url.clone(),
        }
    }
}

/// 变更汇总
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSummary {
    /// 没有变更（或尚未计算）
    NoChanges,
    /// 开始通知使用：作者 + 变更文件数
    Authors {
        authors: Vec<String>,
        changed_files: usize,
    },
    /// 提交列表：`<message> [<author>]`
    Commits {
        origin: ChangeOrigin,
        lines: Vec<String>,
    },
}

/// 变更汇总器
pub struct ChangeAggregator<'a> {
    lookup: &'a dyn BuildLookup,
}

impl<'a> ChangeAggregator<'a> {
    pub fn new(lookup: &'a dyn BuildLookup) -> Self {
        Self { lookup }
    }

    /// 开始通知的变更汇总（不追溯上游）
    pub fn start_summary(&self, event: &BuildEvent) -> ChangeSummary {
        let entries = match &event.change_set {
            Some(entries) => entries,
            None => {
                trace!(project = %event.project_full_name, "No change set computed");
                return ChangeSummary::NoChanges;
            }
        };

        if entries.is_empty() {
            trace!(project = %event.project_full_name, "Empty change set");
            return ChangeSummary::NoChanges;
        }

        let authors = dedup_preserving_order(entries.iter().map(|e| e.author.clone()));
        let files: HashSet<&AffectedFile> = entries
            .iter()
            .flat_map(|e| e.affected_files.iter())
            .collect();

        ChangeSummary::Authors {
            authors,
            changed_files: files.len(),
        }
    }

    /// 提交列表汇总（变更集为空时追溯上游）
    pub fn summarize(&self, event: &BuildEvent) -> ChangeSummary {
        let mut visited = HashSet::new();
        self.summarize_inner(event, &mut visited, 0)
    }

    fn summarize_inner(
        &self,
        event: &BuildEvent,
        visited: &mut HashSet<(String, u32)>,
        depth: usize,
    ) -> ChangeSummary {
        if !visited.insert((event.project_full_name.clone(), event.number)) {
            warn!(
                project = %event.project_full_name,
                build = event.number,
                "Upstream cycle detected while collecting changes"
            );
            return ChangeSummary::NoChanges;
        }

        let entries = match &event.change_set {
            Some(entries) => entries,
            None => {
                trace!(project = %event.project_full_name, "No change set computed");
                return ChangeSummary::NoChanges;
            }
        };

        if !entries.is_empty() {
            let lines = dedup_preserving_order(
                entries
                    .iter()
                    .map(|e| format!("{} [{}]", e.message, e.author)),
            );
            return ChangeSummary::Commits {
                origin: ChangeOrigin::of(event),
                lines,
            };
        }

        let upstream = match event.upstream_ref() {
            Some(upstream) => upstream,
            None => return ChangeSummary::NoChanges,
        };

        if depth >= MAX_UPSTREAM_DEPTH {
            warn!(
                project = %event.project_full_name,
                depth,
                "Upstream chain too deep, giving up on change list"
            );
            return ChangeSummary::NoChanges;
        }

        match self.lookup.find_build(&upstream.project, upstream.build) {
            Some(upstream_event) => {
                debug!(
                    project = %event.project_full_name,
                    upstream = %upstream.project,
                    upstream_build = upstream.build,
                    "Empty change set, following upstream build"
                );
                self.summarize_inner(&upstream_event, visited, depth + 1)
            }
            None => {
                warn!(
                    upstream = %upstream.project,
                    upstream_build = upstream.build,
                    "Upstream build not found"
                );
                ChangeSummary::NoChanges
            }
        }
    }
}

/// 去重并保持首次出现的顺序
fn dedup_preserving_order<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{Cause, ChangeLogEntry, EditType};
    use std::collections::HashMap;

    /// 测试用的内存构建查找
    #[derive(Default)]
    struct MockLookup {
        builds: HashMap<(String, u32), BuildEvent>,
    }

    impl MockLookup {
        fn with(mut self, event: BuildEvent) -> Self {
            self.builds
                .insert((event.project_full_name.clone(), event.number), event);
            self
        }
    }

    impl BuildLookup for MockLookup {
        fn find_build(&self, project: &str, number: u32) -> Option<BuildEvent> {
            self.builds.get(&(project.to_string(), number)).cloned()
        }
    }

    fn entry(message: &str, author: &str, files: &[&str]) -> ChangeLogEntry {
        ChangeLogEntry {
            message: message.to_string(),
            author: author.to_string(),
            affected_files: files
                .iter()
                .map(|p| AffectedFile {
                    path: p.to_string(),
                    edit_type: EditType::Edit,
                })
                .collect(),
        }
    }

    fn event_with_changes(project: &str, number: u32, entries: Vec<ChangeLogEntry>) -> BuildEvent {
        let mut event = BuildEvent::new(project, number, format!("job/{}/{}/", project, number));
        event.change_set = Some(entries);
        event
    }

    #[test]
    fn test_not_computed_is_no_changes() {
        let event = BuildEvent::new("X", 1, "job/X/1/");
        let aggregator = ChangeAggregator::new(&NoUpstream);
        assert_eq!(aggregator.start_summary(&event), ChangeSummary::NoChanges);
        assert_eq!(aggregator.summarize(&event), ChangeSummary::NoChanges);
    }

    #[test]
    fn test_start_summary_counts_distinct_files() {
        let event = event_with_changes(
            "X",
            1,
            vec![
                entry("fix", "Alice", &["a.rs", "b.rs"]),
                entry("more", "Bob", &["b.rs"]),
                entry("again", "Alice", &["c.rs"]),
            ],
        );

        let aggregator = ChangeAggregator::new(&NoUpstream);
        assert_eq!(
            aggregator.start_summary(&event),
            ChangeSummary::Authors {
                authors: vec!["Alice".to_string(), "Bob".to_string()],
                changed_files: 3,
            }
        );
    }

    #[test]
    fn test_commit_lines_deduplicated() {
        let event = event_with_changes(
            "X",
            1,
            vec![
                entry("fix", "Alice", &[]),
                entry("fix", "Alice", &[]),
                entry("fix", "Bob", &[]),
            ],
        );

        let aggregator = ChangeAggregator::new(&NoUpstream);
        match aggregator.summarize(&event) {
            ChangeSummary::Commits { lines, origin } => {
                assert_eq!(lines, vec!["fix [Alice]", "fix [Bob]"]);
                assert_eq!(origin.project_full_name, "X");
            }
            other => panic!("unexpected summary: {:?}", other),
        }
    }

    #[test]
    fn test_empty_without_upstream_is_no_changes() {
        let event = event_with_changes("X", 1, vec![]);
        let aggregator = ChangeAggregator::new(&NoUpstream);
        assert_eq!(aggregator.summarize(&event), ChangeSummary::NoChanges);
    }

    #[test]
    fn test_upstream_summary_equivalence() {
        let upstream = event_with_changes("P", 5, vec![entry("feat", "Carol", &["x.rs"])]);
        let lookup = MockLookup::default().with(upstream.clone());

        let mut downstream = event_with_changes("D", 9, vec![]);
        downstream.causes = vec![Cause::upstream("P", 5)];

        let aggregator = ChangeAggregator::new(&lookup);
        assert_eq!(aggregator.summarize(&downstream), aggregator.summarize(&upstream));
    }

    #[test]
    fn test_missing_upstream_is_no_changes() {
        let mut downstream = event_with_changes("D", 9, vec![]);
        downstream.causes = vec![Cause::upstream("P", 5)];

        let aggregator = ChangeAggregator::new(&NoUpstream);
        assert_eq!(aggregator.summarize(&downstream), ChangeSummary::NoChanges);
    }

    #[test]
    fn test_upstream_cycle_is_no_changes() {
        let mut a = event_with_changes("A", 1, vec![]);
        a.causes = vec![Cause::upstream("B", 1)];
        let mut b = event_with_changes("B", 1, vec![]);
        b.causes = vec![Cause::upstream("A", 1)];

        let lookup = MockLookup::default().with(a.clone()).with(b);
        let aggregator = ChangeAggregator::new(&lookup);
        assert_eq!(aggregator.summarize(&a), ChangeSummary::NoChanges);
    }

    #[test]
    fn test_upstream_depth_is_capped() {
        // 每个构建都指向下一个构建号，链长超过上限
        let mut lookup = MockLookup::default();
        for n in 0..(MAX_UPSTREAM_DEPTH as u32 + 5) {
            let mut event = event_with_changes("Chain", n, vec![]);
            event.causes = vec![Cause::upstream("Chain", n + 1)];
            lookup = lookup.with(event);
        }
        let tail = event_with_changes("Chain", MAX_UPSTREAM_DEPTH as u32 + 5, vec![entry("x", "y", &[])]);
        lookup = lookup.with(tail);

        let start = lookup.find_build("Chain", 0).unwrap();
        let aggregator = ChangeAggregator::new(&lookup);
        assert_eq!(aggregator.summarize(&start), ChangeSummary::NoChanges);
    }

    #[test]
    fn test_json_archive_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let upstream = event_with_changes("P", 5, vec![entry("feat", "Carol", &[])]);
        let project_dir = dir.path().join("P");
        fs::create_dir_all(&project_dir).unwrap();
        fs::write(
            project_dir.join("5.json"),
            serde_json::to_string(&upstream).unwrap(),
        )
        .unwrap();

        let archive = JsonBuildArchive::new(dir.path());
        assert_eq!(archive.find_build("P", 5), Some(upstream));
        assert_eq!(archive.find_build("P", 6), None);
    }

    #[test]
    fn test_json_archive_stays_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("archive");
        let upstream = event_with_changes("secret", 5, vec![entry("leak", "Eve", &[])]);
        let json = serde_json::to_string(&upstream).unwrap();

        // 归档目录外的记录
        fs::create_dir_all(dir.path().join("secret")).unwrap();
        fs::write(dir.path().join("secret").join("5.json"), &json).unwrap();
        // 文件夹中的 job
        fs::create_dir_all(root.join("team").join("app")).unwrap();
        fs::write(root.join("team").join("app").join("5.json"), &json).unwrap();

        let archive = JsonBuildArchive::new(&root);
        assert_eq!(archive.find_build("../secret", 5), None);
        assert_eq!(archive.find_build("team/../../secret", 5), None);
        let absolute = dir.path().join("secret");
        assert_eq!(archive.find_build(&absolute.to_string_lossy(), 5), None);
        assert_eq!(archive.find_build("", 5), None);
        assert!(archive.find_build("team/app", 5).is_some());
    }
}
