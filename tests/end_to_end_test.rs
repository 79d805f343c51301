mod common;

use async_trait::async_trait;
use common::*;
use serde_json::Value;
use std::collections::BTreeSet;

use smell_of_stars::config::TerminationPolicy;
use smell_of_stars::discovery::{DiscoveryQuery, RepositoryDiscovery};
use smell_of_stars::models::Repository;
use smell_of_stars::orchestration::{run_crawl, WorkerPool};

struct FixedDiscovery(Vec<Repository>);

#[async_trait]
impl RepositoryDiscovery for FixedDiscovery {
    async fn discover(&self, query: &DiscoveryQuery) -> Vec<Repository> {
        self.0.iter().take(query.count).cloned().collect()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn crawl_writes_only_successful_repositories() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("results").join("python.json");

    let discovery = FixedDiscovery(vec![
        repository("alice", "foo", 120),
        repository("bob", "bar", 4),
    ]);
    let scanner = ScriptedScanner::new(Script::AlwaysSucceed)
        .with_script("bob:bar", Script::AlwaysFail)
        .into_arc();
    let pool = WorkerPool::new(pool_config(2, TerminationPolicy::Drain), scanner.clone());

    let report = run_crawl(&discovery, &pool, &DiscoveryQuery::new(2), &output)
        .await
        .unwrap();

    assert_eq!(report.results.len(), 1);
    assert!(report.results.contains_key("alice:foo"));
    assert_eq!(report.failed, vec!["bob:bar"]);
    assert_eq!(scanner.calls_for("alice:foo"), 1);
    assert_eq!(scanner.calls_for("bob:bar"), 3);

    let written: Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let keys: BTreeSet<&str> = written
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, BTreeSet::from(["alice:foo"]));

    let alice = &written["alice:foo"];
    assert_eq!(alice["ncloc"], "100");
    assert_eq!(alice["stars"], 120);
    assert_eq!(alice["norm_code_smells"], 0.04);
    assert_eq!(alice["norm_cognitive_complexity"], 0.12);
}

#[tokio::test]
async fn crawl_with_nothing_discovered_still_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("empty.json");

    let pool = WorkerPool::new(
        pool_config(4, TerminationPolicy::Drain),
        ScriptedScanner::new(Script::AlwaysSucceed).into_arc(),
    );
    let report = run_crawl(&FixedDiscovery(Vec::new()), &pool, &DiscoveryQuery::new(10), &output)
        .await
        .unwrap();

    assert!(report.results.is_empty());
    assert!(report.failed.is_empty());
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "{}");
}

#[tokio::test]
async fn crawl_where_everything_fails_writes_empty_object() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("failed.json");

    let pool = WorkerPool::new(
        pool_config(2, TerminationPolicy::Eager),
        ScriptedScanner::new(Script::AlwaysFail).into_arc(),
    );
    let report = run_crawl(
        &FixedDiscovery(repositories(3)),
        &pool,
        &DiscoveryQuery::new(3),
        &output,
    )
    .await
    .unwrap();

    let failed: BTreeSet<&str> = report.failed.iter().map(String::as_str).collect();
    assert_eq!(
        failed,
        BTreeSet::from(["owner:repo0", "owner:repo1", "owner:repo2"])
    );
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "{}");
}
