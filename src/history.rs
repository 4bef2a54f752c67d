// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Per-service change history: structural diffs between consecutive committed revisions.

use crate::domain::{diff, Diff, Graph};
use crate::repository::{last_of_each_day, RevisionError, RevisionMeta, RevisionRepository};

/// Changes of one service between two revisions. `from` is `None` for the service's first revision.
#[derive(Clone, Debug)]
pub struct RevisionDiff {
    pub from: Option<RevisionMeta>,
    pub to: RevisionMeta,
    pub diff: Diff,
}

/// Returns up to `limit` diffs for `service`, newest first.
///
/// Extras are nodes added by the newer revision, missings are nodes it removed. Revisions that
/// leave the service untouched are skipped. With `by_day`, only the last revision of each day is
/// considered.
pub async fn service_history(
    repo: &dyn RevisionRepository,
    service: &str,
    limit: usize,
    by_day: bool,
) -> Result<Vec<RevisionDiff>, RevisionError> {
    let mut revisions = repo.list().await?;
    if by_day {
        revisions = last_of_each_day(&revisions);
    }
    revisions.retain(|meta| meta.services.iter().any(|s| s == service));

    let mut history = Vec::new();
    let mut previous: Option<(RevisionMeta, Graph)> = None;
    for meta in revisions {
        let graph = repo
            .load_rev(&meta.id)
            .await?
            .graphs
            .remove(service)
            .unwrap_or_default();

        let (from, older) = match previous.take() {
            Some((from, older)) => (Some(from), older),
            None => (None, Graph::new()),
        };
        if from.is_none() || older != graph {
            history.push(RevisionDiff {
                from,
                to: meta.clone(),
                diff: diff_graphs(&graph, &older),
            });
        }
        previous = Some((meta, graph));
    }

    history.reverse();
    history.truncate(limit);
    Ok(history)
}

/// Diffs `newer` against `older` below the region both share.
pub fn diff_graphs(newer: &Graph, older: &Graph) -> Diff {
    let root = newer.region_root().or_else(|_| older.region_root());
    match root {
        Ok(root) => diff(&root, newer, older),
        Err(err) => {
            tracing::debug!(%err, "no region to diff from");
            Diff::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Node, ResourceType, Triple};
    use crate::repository::InMemoryRevisionRepository;

    fn infra(vpcs: &[&str]) -> Graph {
        let region = Node::new(ResourceType::Region, "eu-west-1");
        let mut graph = Graph::new();
        graph.add(Triple::has_type(&region));
        for id in vpcs {
            let vpc = Node::new(ResourceType::Vpc, *id);
            graph.add(Triple::has_type(&vpc));
            graph.add(Triple::parent_of(&region, &vpc));
        }
        graph
    }

    fn repo() -> InMemoryRevisionRepository {
        InMemoryRevisionRepository::in_memory(vec!["infra".into(), "access".into()])
    }

    #[tokio::test]
    async fn diffs_consecutive_revisions_newest_first() {
        let repo = repo();
        repo.commit_service("infra", &infra(&["vpc_1"])).await.unwrap();
        repo.commit_service("infra", &infra(&["vpc_1", "vpc_2"])).await.unwrap();
        repo.commit_service("infra", &infra(&["vpc_2"])).await.unwrap();

        let history = service_history(&repo, "infra", 10, false).await.unwrap();
        assert_eq!(history.len(), 3);

        let latest = &history[0];
        assert!(latest.diff.extras().is_empty());
        assert_eq!(latest.diff.missings(), &[Node::new(ResourceType::Vpc, "vpc_1")]);

        let added = &history[1];
        assert_eq!(added.diff.extras(), &[Node::new(ResourceType::Vpc, "vpc_2")]);

        let first = &history[2];
        assert!(first.from.is_none());
        assert_eq!(first.diff.extras(), &[Node::new(ResourceType::Vpc, "vpc_1")]);
    }

    #[tokio::test]
    async fn skips_revisions_of_other_services() {
        let repo = repo();
        repo.commit_service("infra", &infra(&["vpc_1"])).await.unwrap();
        repo.commit_service("access", &infra(&[])).await.unwrap();
        repo.commit_service("infra", &infra(&["vpc_1", "vpc_2"])).await.unwrap();

        let history = service_history(&repo, "infra", 10, false).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|entry| entry.diff.has_diffs()));

        let limited = service_history(&repo, "infra", 1, false).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].to.id, history[0].to.id);
    }

    #[tokio::test]
    async fn unknown_service_has_no_history() {
        let repo = repo();
        repo.commit_service("infra", &infra(&["vpc_1"])).await.unwrap();
        assert!(service_history(&repo, "storage", 10, true)
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn graphs_without_region_diff_to_nothing() {
        let empty = Graph::new();
        assert!(!diff_graphs(&empty, &empty).has_diffs());
        assert!(diff_graphs(&infra(&["vpc_1"]), &empty).has_diffs());
    }
}
