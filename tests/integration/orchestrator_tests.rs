//! Orchestrator integration tests
//!
//! Full runs over in-memory storage: caching, deduplication, retries,
//! failure manifests and checkpoint outages.

#[cfg(test)]
mod tests {
    use crate::common::{FailingStore, ItemFactory, ScriptedCall, TestEngine, test_config};
    use resumable_batch::{
        BatchError, CacheConfig, ErrorClass, ItemState, OrchestratorConfig, RemoteError,
        RunStatus,
    };
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    // ==================== Idempotency ====================

    /// A second run over a completed key makes no calls and reports the same outcome
    #[tokio::test]
    async fn test_rerun_of_completed_key_is_free() {
        let engine = TestEngine::new();
        let call = ScriptedCall::echo();
        let cancel = CancellationToken::new();

        let first = engine
            .orchestrator
            .run("nightly", ItemFactory::distinct(5), &call, &cancel)
            .await
            .unwrap();
        assert_eq!(call.calls(), 5);

        let second = engine
            .orchestrator
            .run("nightly", ItemFactory::distinct(5), &call, &cancel)
            .await
            .unwrap();

        assert_eq!(call.calls(), 5);
        assert!(first.same_outcome(&second));
        assert_eq!(second.stats.already_terminal, 5);
        assert_eq!(second.stats.remote_calls, 0);
    }

    /// Three items with two distinct fingerprints cost two calls
    #[tokio::test]
    async fn test_shared_fingerprints_cost_one_call() {
        let engine = TestEngine::new();
        let call = ScriptedCall::echo();
        let items = vec![
            ItemFactory::keyword("a", "running shoes"),
            ItemFactory::keyword("b", "running shoes").with_payload(json!({"row": 7})),
            ItemFactory::keyword("c", "trail shoes"),
        ];

        let result = engine
            .orchestrator
            .run("dedup", items, &call, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(call.calls(), 2);
        assert_eq!(result.succeeded.len(), 3);
        // The leader's id reached the call; the follower reuses its response
        assert_eq!(call.calls_for("b"), 0);
        assert_eq!(result.succeeded["a"], result.succeeded["b"]);
    }

    /// The cache serves other runs until the entry expires
    #[tokio::test]
    async fn test_cache_shared_across_runs_until_ttl() {
        let config = test_config().with_cache(
            CacheConfig::default().with_operation_ttl("keyword_metrics", Duration::from_secs(3600)),
        );
        let engine = TestEngine::with_config(config);
        let call = ScriptedCall::echo();
        let cancel = CancellationToken::new();
        let item = || vec![ItemFactory::keyword("k", "running shoes")];

        engine.orchestrator.run("monday", item(), &call, &cancel).await.unwrap();
        engine.orchestrator.run("tuesday", item(), &call, &cancel).await.unwrap();
        assert_eq!(call.calls(), 1);

        engine.clock.advance(Duration::from_secs(3600));
        let result = engine.orchestrator.run("wednesday", item(), &call, &cancel).await.unwrap();
        assert_eq!(call.calls(), 2);
        assert_eq!(result.stats.cache_hits, 0);
    }

    /// With the cache disabled every run pays for its calls
    #[tokio::test]
    async fn test_disabled_cache_always_calls() {
        let config = test_config().with_cache(CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        });
        let engine = TestEngine::with_config(config);
        let call = ScriptedCall::echo();
        let cancel = CancellationToken::new();

        engine.orchestrator.run("a", ItemFactory::distinct(2), &call, &cancel).await.unwrap();
        engine.orchestrator.run("b", ItemFactory::distinct(2), &call, &cancel).await.unwrap();

        assert_eq!(call.calls(), 4);
        assert_eq!(engine.orchestrator.cache().stats().writes, 0);
    }

    // ==================== Failures ====================

    /// Mixed outcomes: success, permanent failure, exhausted retries, late success
    #[tokio::test]
    async fn test_failure_manifest() {
        let engine = TestEngine::new();
        let call = ScriptedCall::new(|item, previous| match item.id() {
            "item-01" => Err(RemoteError::invalid_request("unknown location code")),
            "item-02" => Err(RemoteError::server(503, "service unavailable")),
            "item-03" if previous == 0 => Err(RemoteError::connection_reset("reset by peer")),
            _ => Ok(json!({ "id": item.id() })),
        });

        let result = engine
            .orchestrator
            .run("mixed", ItemFactory::distinct(4), &call, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.status, RunStatus::Completed);
        assert!(result.has_failures());
        assert_eq!(result.succeeded.len(), 2);
        assert_eq!(result.failed.len(), 2);

        let permanent = &result.failed["item-01"];
        assert_eq!(permanent.attempts, 1);
        assert_eq!(permanent.class, Some(ErrorClass::NonRetryable));
        assert_eq!(call.calls_for("item-01"), 1);

        let exhausted = &result.failed["item-02"];
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.class, Some(ErrorClass::Retryable));
        assert_eq!(exhausted.error.status, Some(503));
        assert_eq!(call.calls_for("item-02"), 3);

        assert_eq!(call.calls_for("item-03"), 2);
        assert_eq!(result.stats.retries, 3);
    }

    /// Backoff delays double from the base and honor retry hints
    #[tokio::test]
    async fn test_backoff_schedule() {
        let engine = TestEngine::new();
        let call = ScriptedCall::new(|_, previous| match previous {
            0 => Err(RemoteError::timeout("slow upstream")),
            1 => Err(RemoteError::rate_limited(
                "too many requests",
                Some(Duration::from_millis(1500)),
            )),
            _ => Ok(json!("done")),
        });

        let result = engine
            .orchestrator
            .run("backoff", ItemFactory::distinct(1), &call, &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.failed.is_empty());
        assert_eq!(
            engine.clock.sleeps(),
            vec![Duration::from_millis(100), Duration::from_millis(1500)]
        );
    }

    /// A failed item's response is never cached
    #[tokio::test]
    async fn test_failures_not_cached() {
        let engine = TestEngine::new();
        let failing = ScriptedCall::new(|_, _| Err(RemoteError::not_found("no such keyword")));
        let cancel = CancellationToken::new();

        engine
            .orchestrator
            .run("first", ItemFactory::distinct(1), &failing, &cancel)
            .await
            .unwrap();

        let working = ScriptedCall::echo();
        let result = engine
            .orchestrator
            .run("second", ItemFactory::distinct(1), &working, &cancel)
            .await
            .unwrap();

        assert_eq!(working.calls(), 1);
        assert_eq!(result.succeeded.len(), 1);
    }

    // ==================== Checkpoint Outages ====================

    /// Registration fails fast when the checkpoint cannot be written
    #[tokio::test]
    async fn test_checkpoint_unavailable_aborts_before_any_call() {
        let store = Arc::new(FailingStore::new("checkpoint/"));
        let config = test_config().with_orchestrator(OrchestratorConfig {
            checkpoint_write_attempts: 2,
            ..OrchestratorConfig::default()
        });
        let engine = TestEngine::with_store(config, store.clone());
        let call = ScriptedCall::echo();

        let err = engine
            .orchestrator
            .run("outage", ItemFactory::distinct(3), &call, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            BatchError::CheckpointUnavailable { run_key, .. } if run_key == "outage"
        ));
        assert!(err.is_fatal_to_run());
        assert_eq!(call.calls(), 0);
        assert_eq!(store.rejected_writes(), 2);
    }

    /// After the outage clears the same run key goes through
    #[tokio::test]
    async fn test_run_recovers_after_outage() {
        let store = Arc::new(FailingStore::new("checkpoint/"));
        let engine = TestEngine::with_store(test_config(), store.clone());
        let call = ScriptedCall::echo();
        let cancel = CancellationToken::new();

        assert!(
            engine
                .orchestrator
                .run("outage", ItemFactory::distinct(2), &call, &cancel)
                .await
                .is_err()
        );

        store.heal();
        let result = engine
            .orchestrator
            .run("outage", ItemFactory::distinct(2), &call, &cancel)
            .await
            .unwrap();
        assert!(result.is_complete());
        assert_eq!(result.succeeded.len(), 2);

        let checkpoint = engine.orchestrator.checkpoints().load("outage").await.unwrap();
        assert_eq!(checkpoint.count(ItemState::Succeeded), 2);
    }

    /// Cache write failures do not fail the item
    #[tokio::test]
    async fn test_cache_outage_is_not_fatal() {
        let store = Arc::new(FailingStore::new("cache/"));
        let engine = TestEngine::with_store(test_config(), store.clone());
        let call = ScriptedCall::echo();

        let result = engine
            .orchestrator
            .run("no-cache", ItemFactory::distinct(2), &call, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result.succeeded.len(), 2);
        assert_eq!(store.rejected_writes(), 2);
        assert_eq!(engine.orchestrator.cache().stats().errors, 2);
    }
}
