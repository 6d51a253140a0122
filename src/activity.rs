//! Development activity per issue and the run-wide hotspot tallies.
//!
//! Commits, branches and deployments linked to an issue are summarised into
//! [`ActivityMetrics`]. While walking them, every non-merge commit also feeds
//! the [`HotspotMaps`] owned by the caller.

use crate::types::{Component, DevelopmentDetails};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Counters keyed by `"<repository>:<path>"` or by component name.
pub type Tally = BTreeMap<String, u64>;

/// Frequency maps accumulated across every issue of one report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HotspotMaps {
    /// Non-merge commits touching each file.
    pub commits: Tally,
    /// Lines added plus removed for each file, across non-merge commits.
    #[serde(rename = "file")]
    pub churn: Tally,
    /// Issues attached to each component.
    pub components: Tally,
}

impl HotspotMaps {
    pub fn is_empty(&self) -> bool {
        self.commits.is_empty() && self.churn.is_empty() && self.components.is_empty()
    }

    /// Adds every counter of `other` into `self`.
    pub fn merge(&mut self, other: &HotspotMaps) {
        for (target, source) in [
            (&mut self.commits, &other.commits),
            (&mut self.churn, &other.churn),
            (&mut self.components, &other.components),
        ] {
            for (key, count) in source {
                *target.entry(key.clone()).or_insert(0) += count;
            }
        }
    }

    /// The `n` largest entries of `tally`, largest first; ties by key.
    pub fn top(tally: &Tally, n: usize) -> Vec<(&str, u64)> {
        let mut entries: Vec<(&str, u64)> = tally.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries.truncate(n);
        entries
    }
}

/// Per-issue development activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityMetrics {
    pub repo_count: u64,
    pub branch_count: u64,
    pub file_count: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub pipeline_count: u64,
    pub component_count: u64,
}

/// Hotspot key for a file within a repository.
pub fn hotspot_key(repository: &str, path: &str) -> String {
    format!("{}:{}", repository, path)
}

/// Summarises one issue's development details and components, updating `hotspots`.
///
/// Merge commits are skipped entirely. `file_count` counts file touches, so a
/// file changed by two commits counts twice.
pub fn aggregate(
    details: &DevelopmentDetails,
    components: &[Component],
    hotspots: &mut HotspotMaps,
) -> ActivityMetrics {
    let mut metrics = ActivityMetrics::default();
    let mut repositories = HashSet::new();

    for repository in details
        .instance_types
        .iter()
        .flat_map(|instance| instance.repositories.iter())
    {
        repositories.insert(repository.name.as_str());
        metrics.branch_count += repository.branches.len() as u64;

        for commit in repository.commits.iter().filter(|c| !c.is_merge) {
            for file in &commit.files {
                metrics.file_count += 1;
                metrics.lines_added += file.lines_added;
                metrics.lines_removed += file.lines_removed;

                let key = hotspot_key(&repository.name, &file.path);
                *hotspots.commits.entry(key.clone()).or_insert(0) += 1;
                *hotspots.churn.entry(key).or_insert(0) += file.lines_added + file.lines_removed;
            }
        }
    }
    metrics.repo_count = repositories.len() as u64;

    metrics.pipeline_count = details
        .deployment_providers
        .iter()
        .map(|provider| provider.deployments.len() as u64)
        .sum();

    for component in components {
        *hotspots.components.entry(component.name.clone()).or_insert(0) += 1;
    }
    metrics.component_count = components.len() as u64;

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Commit, CommitFile, DeploymentProvider, InstanceType, Repository};
    use serde::de::IgnoredAny;

    fn file(path: &str, added: u64, removed: u64) -> CommitFile {
        CommitFile {
            path: path.to_string(),
            lines_added: added,
            lines_removed: removed,
        }
    }

    fn commit(is_merge: bool, files: Vec<CommitFile>) -> Commit {
        Commit { is_merge, files }
    }

    fn repository(name: &str, branches: usize, commits: Vec<Commit>) -> Repository {
        Repository {
            name: name.to_string(),
            branches: vec![IgnoredAny; branches],
            commits,
        }
    }

    fn details(repositories: Vec<Repository>, deployments: usize) -> DevelopmentDetails {
        DevelopmentDetails {
            instance_types: vec![InstanceType { repositories }],
            deployment_providers: vec![DeploymentProvider {
                deployments: vec![IgnoredAny; deployments],
            }],
        }
    }

    fn component(name: &str) -> Component {
        Component {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_merge_commits_are_excluded() {
        let details = details(
            vec![repository(
                "repoA",
                2,
                vec![
                    commit(
                        true,
                        vec![file("a.py", 5, 5), file("b.py", 1, 1), file("c.py", 2, 0)],
                    ),
                    commit(false, vec![file("a.py", 6, 4), file("d.py", 4, 0)]),
                ],
            )],
            1,
        );
        let mut hotspots = HotspotMaps::default();

        let metrics = aggregate(&details, &[], &mut hotspots);

        assert_eq!(metrics.file_count, 2);
        assert_eq!(metrics.lines_added, 10);
        assert_eq!(metrics.lines_removed, 4);
        assert_eq!(metrics.branch_count, 2);
        assert_eq!(metrics.repo_count, 1);
        assert_eq!(metrics.pipeline_count, 1);
        assert_eq!(hotspots.commits.get("repoA:a.py"), Some(&1));
        assert_eq!(hotspots.churn.get("repoA:a.py"), Some(&10));
        assert!(!hotspots.commits.contains_key("repoA:b.py"));
    }

    #[test]
    fn test_hotspots_accumulate_across_issues() {
        let first = details(
            vec![repository("repoA", 0, vec![commit(false, vec![file("file.py", 3, 1)])])],
            0,
        );
        let second = details(
            vec![repository("repoA", 1, vec![commit(false, vec![file("file.py", 2, 2)])])],
            2,
        );

        let mut forward = HotspotMaps::default();
        aggregate(&first, &[component("api")], &mut forward);
        aggregate(&second, &[component("api"), component("ui")], &mut forward);

        let mut backward = HotspotMaps::default();
        aggregate(&second, &[component("api"), component("ui")], &mut backward);
        aggregate(&first, &[component("api")], &mut backward);

        assert_eq!(forward, backward);
        assert_eq!(forward.commits.get("repoA:file.py"), Some(&2));
        assert_eq!(forward.churn.get("repoA:file.py"), Some(&8));
        assert_eq!(forward.components.get("api"), Some(&2));
        assert_eq!(forward.components.get("ui"), Some(&1));
    }

    #[test]
    fn test_repositories_and_deployments_are_counted_across_providers() {
        let mut details = details(
            vec![
                repository("repoA", 1, vec![]),
                repository("repoB", 3, vec![]),
            ],
            2,
        );
        details.instance_types.push(InstanceType {
            repositories: vec![repository("repoC", 0, vec![])],
        });
        details.deployment_providers.push(DeploymentProvider {
            deployments: vec![IgnoredAny],
        });

        let metrics = aggregate(&details, &[component("api")], &mut HotspotMaps::default());

        assert_eq!(metrics.repo_count, 3);
        assert_eq!(metrics.branch_count, 4);
        assert_eq!(metrics.pipeline_count, 3);
        assert_eq!(metrics.component_count, 1);
    }

    #[test]
    fn test_empty_details() {
        let mut hotspots = HotspotMaps::default();
        let metrics = aggregate(&DevelopmentDetails::default(), &[], &mut hotspots);

        assert_eq!(metrics, ActivityMetrics::default());
        assert!(hotspots.is_empty());
    }

    #[test]
    fn test_merge_and_top() {
        let mut left = HotspotMaps::default();
        left.commits.insert("r:a".to_string(), 2);
        left.commits.insert("r:b".to_string(), 5);
        let mut right = HotspotMaps::default();
        right.commits.insert("r:a".to_string(), 4);
        right.components.insert("api".to_string(), 1);

        left.merge(&right);

        assert_eq!(left.commits.get("r:a"), Some(&6));
        assert_eq!(left.components.get("api"), Some(&1));
        assert_eq!(HotspotMaps::top(&left.commits, 1), vec![("r:a", 6)]);
        assert_eq!(HotspotMaps::top(&left.commits, 5), vec![("r:a", 6), ("r:b", 5)]);
    }

    #[test]
    fn test_serialized_keys() {
        let json = serde_json::to_value(HotspotMaps::default()).unwrap();
        assert!(json.get("commits").is_some());
        assert!(json.get("file").is_some());
        assert!(json.get("components").is_some());
    }
}
