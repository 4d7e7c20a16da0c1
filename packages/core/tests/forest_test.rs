//! Forest Tests
//!
//! Integration tests for the tree registry.
//!
//! ## Coverage
//! - Build, info and name listing
//! - Targeted rebuilds with refresh_tree
//! - Containment of failing and panicking builders
//! - Background refresh start/stop

#[cfg(test)]
mod forest_tests {
    use anyhow::{bail, Result};
    use ruleforest_core::processors::{JsonProcessor, Processor};
    use ruleforest_core::{builder, Forest, RealizeMode, Rule, Tree, TreeBuilder, TreeError};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Builder whose tree records how many times it was built
    fn counted(name: &'static str, builds: &Arc<AtomicUsize>) -> TreeBuilder {
        let builds = Arc::clone(builds);
        builder(move || {
            let generation = builds.fetch_add(1, Ordering::SeqCst) + 1;
            let rule = Rule::new(
                "/",
                vec![JsonProcessor::set_raw("generation", generation.to_string()).into_ref()],
            );
            Ok(Tree::json(RealizeMode::Eager, name, "{}", vec![rule])?)
        })
    }

    fn generation(forest: &Forest, name: &str) -> Result<Value> {
        let doc: Value = serde_json::from_slice(&forest.get_val(name, "/")?)?;
        Ok(doc["generation"].clone())
    }

    #[test]
    fn test_info_lists_trees() {
        let builds = Arc::new(AtomicUsize::new(0));
        let forest = Forest::new([counted("tree_1", &builds), counted("tree_2", &builds)]);

        assert_eq!(forest.len(), 2);
        assert_eq!(forest.names(), vec!["tree_1", "tree_2"]);
        let info = forest.info();
        assert!(info.contains("2 tree"), "{}", info);
        assert!(info.contains("tree_1") && info.contains("tree_2"), "{}", info);
    }

    #[test]
    fn test_refresh_tree_replaces_one_entry() -> Result<()> {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let forest = Forest::new([counted("tree_1", &first), counted("tree_2", &second)]);
        let untouched = forest.get("tree_2").unwrap();

        assert!(forest.refresh_tree("tree_1"));
        assert_eq!(generation(&forest, "tree_1")?, json!(2));
        assert_eq!(generation(&forest, "tree_2")?, json!(1));
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&untouched, &forest.get("tree_2").unwrap()));

        assert!(!forest.refresh_tree("missing"));
        Ok(())
    }

    #[test]
    fn test_build_rebuilds_everything() -> Result<()> {
        let builds = Arc::new(AtomicUsize::new(0));
        let forest = Forest::new([counted("tree_1", &builds)]);
        forest.build().build();
        assert_eq!(generation(&forest, "tree_1")?, json!(3));

        forest.refresh(None);
        assert_eq!(generation(&forest, "tree_1")?, json!(4));
        Ok(())
    }

    #[test]
    fn test_panicking_builder_is_contained() -> Result<()> {
        let builds = Arc::new(AtomicUsize::new(0));
        let forest = Forest::new([
            builder(|| panic!("rule source exploded")),
            counted("healthy", &builds),
        ]);

        assert_eq!(forest.names(), vec!["healthy"]);
        assert_eq!(generation(&forest, "healthy")?, json!(1));

        // Still usable for later builds
        forest.build();
        assert_eq!(generation(&forest, "healthy")?, json!(2));
        Ok(())
    }

    #[test]
    fn test_failing_builder_is_skipped() {
        let builds = Arc::new(AtomicUsize::new(0));
        let forest = Forest::new([builder(|| bail!("no rules today")), counted("ok", &builds)]);
        assert_eq!(forest.names(), vec!["ok"]);
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_tree() -> Result<()> {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let flaky = builder(move || {
            if counter.fetch_add(1, Ordering::SeqCst) > 0 {
                bail!("source went away");
            }
            Ok(Tree::json(RealizeMode::Eager, "flaky", r#"{"v":1}"#, vec![])?)
        });

        let forest = Forest::new([flaky]);
        assert!(!forest.refresh_tree("flaky"));
        assert_eq!(forest.get_val("flaky", "/")?, br#"{"v":1}"#.to_vec());
        Ok(())
    }

    #[test]
    fn test_get_val_unknown_tree() {
        let forest = Forest::default();
        assert!(forest.get("nope").is_none());
        assert!(matches!(
            forest.get_val("nope", "/a"),
            Err(TreeError::TreeNotFound(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_set_bypasses_builders() -> Result<()> {
        let forest = Forest::default();
        forest.set(Tree::json(RealizeMode::Lazy, "manual", r#"{"m":true}"#, vec![])?);
        assert_eq!(forest.get_val("manual", "/x/y")?, br#"{"m":true}"#.to_vec());
        assert!(!forest.refresh_tree("manual"));
        Ok(())
    }

    #[tokio::test]
    async fn test_spawn_refresh_runs_until_shutdown() -> Result<()> {
        let builds = Arc::new(AtomicUsize::new(0));
        let forest = Arc::new(Forest::new([counted("tree_1", &builds)]));
        assert_eq!(builds.load(Ordering::SeqCst), 1);

        let handle = forest.spawn_refresh(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!handle.is_finished());
        handle.shutdown().await;

        let after_shutdown = builds.load(Ordering::SeqCst);
        assert!(after_shutdown > 1, "refresh never ran");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(builds.load(Ordering::SeqCst), after_shutdown);
        assert_eq!(
            generation(&forest, "tree_1")?,
            json!(after_shutdown)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_refresh() {
        let builds = Arc::new(AtomicUsize::new(0));
        let forest = Arc::new(Forest::new([counted("tree_1", &builds)]));

        drop(forest.spawn_refresh(Duration::from_millis(10)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        let settled = builds.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(builds.load(Ordering::SeqCst), settled);
    }
}
