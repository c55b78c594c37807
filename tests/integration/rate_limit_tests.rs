//! Rate limiting integration tests
//!
//! Runs under paused tokio time so window waits complete instantly while
//! elapsed time is still measurable.

#[cfg(test)]
mod tests {
    use crate::common::{ItemFactory, ScriptedCall, TestEngine, test_config};
    use resumable_batch::{EngineConfig, OrchestratorConfig, RateLimitConfig, RunStatus, WorkItem};
    use std::time::Duration;
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    fn scrape_config(limit: RateLimitConfig) -> EngineConfig {
        test_config()
            .with_rate_limit("firecrawl", limit)
            .with_orchestrator(OrchestratorConfig::default().with_max_workers(8))
    }

    fn pages(count: usize) -> Vec<WorkItem> {
        (0..count)
            .map(|i| ItemFactory::scrape(&format!("page-{}", i), &format!("https://example.com/{}", i)))
            .collect()
    }

    /// More workers than slots never exceeds the class concurrency cap
    #[tokio::test(start_paused = true)]
    async fn test_concurrency_cap_holds_under_load() {
        let engine = TestEngine::with_config(scrape_config(RateLimitConfig::new(
            100,
            Duration::from_secs(60),
            2,
        )));
        let call = ScriptedCall::echo().with_latency(Duration::from_secs(1));
        let started = Instant::now();

        let result = engine
            .orchestrator
            .run("scrape", pages(6), &call, &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_complete());
        assert_eq!(call.calls(), 6);
        assert_eq!(call.peak_concurrency(), 2);
        assert!(started.elapsed() >= Duration::from_secs(3));

        let status = engine.orchestrator.limiter().status("firecrawl").unwrap();
        assert_eq!(status.in_flight, 0);
        assert_eq!(status.window_used, 6);
    }

    /// Dispatches beyond the window budget wait for the window to roll
    #[tokio::test(start_paused = true)]
    async fn test_window_budget_spreads_dispatches() {
        let engine = TestEngine::with_config(scrape_config(RateLimitConfig::new(
            2,
            Duration::from_secs(10),
            5,
        )));
        let call = ScriptedCall::echo();
        let started = Instant::now();

        let result = engine
            .orchestrator
            .run("scrape", pages(5), &call, &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_complete());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(20), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(30), "elapsed {:?}", elapsed);
    }

    /// Cache hits are answered without touching the window
    #[tokio::test(start_paused = true)]
    async fn test_cache_hits_bypass_budget() {
        let engine = TestEngine::with_config(scrape_config(RateLimitConfig::new(
            1,
            Duration::from_secs(3600),
            1,
        )));
        let call = ScriptedCall::echo();
        let cancel = CancellationToken::new();
        let started = Instant::now();

        engine.orchestrator.run("first", pages(1), &call, &cancel).await.unwrap();
        let result = engine.orchestrator.run("second", pages(1), &call, &cancel).await.unwrap();

        assert!(result.is_complete());
        assert_eq!(call.calls(), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    /// Cancelling while workers wait on the window abandons the waits
    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_window_wait() {
        let engine = TestEngine::with_config(scrape_config(RateLimitConfig::new(
            1,
            Duration::from_secs(60),
            4,
        )));
        let call = ScriptedCall::echo();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });
        let started = Instant::now();

        let result = engine
            .orchestrator
            .run("scrape", pages(3), &call, &cancel)
            .await
            .unwrap();

        assert_eq!(result.status, RunStatus::Cancelled);
        assert_eq!(call.calls(), 1);
        assert_eq!(result.pending.len(), 2);
        assert!(started.elapsed() < Duration::from_secs(60));

        // Abandoned waits took no window slots
        let status = engine.orchestrator.limiter().status("firecrawl").unwrap();
        assert_eq!(status.window_used, 1);
    }
}
