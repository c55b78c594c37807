//! File storage integration tests
//!
//! Checkpoints and cache entries written through the file backend survive
//! reopening the directory.

#[cfg(test)]
mod tests {
    use crate::common::{ItemFactory, ScriptedCall, TestEngine, test_config};
    use resumable_batch::{
        CacheStore, CheckpointStore, FileKvStore, ItemState, KvStore, WorkItem,
    };
    use std::sync::Arc;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    async fn open(dir: &TempDir) -> Arc<FileKvStore> {
        Arc::new(FileKvStore::new(dir.path()).await.unwrap())
    }

    #[tokio::test]
    async fn test_completed_run_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let call = ScriptedCall::echo();
        let cancel = CancellationToken::new();

        let first = {
            let engine = TestEngine::with_store(test_config(), open(&dir).await);
            engine
                .orchestrator
                .run("daily/2024-06-01", ItemFactory::distinct(4), &call, &cancel)
                .await
                .unwrap()
        };

        let engine = TestEngine::with_store(test_config(), open(&dir).await);
        let second = engine
            .orchestrator
            .run("daily/2024-06-01", ItemFactory::distinct(4), &call, &cancel)
            .await
            .unwrap();

        assert_eq!(call.calls(), 4);
        assert!(first.same_outcome(&second));
    }

    #[tokio::test]
    async fn test_cache_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let item = ItemFactory::keyword("k", "running shoes");
        let response = serde_json::json!({"volume": 12000});

        {
            let cache = CacheStore::new(open(&dir).await, test_config().cache);
            cache
                .put(
                    &item.fingerprint(),
                    item.operation(),
                    &response,
                    cache.ttl_for(item.operation()),
                )
                .await;
        }

        let cache = CacheStore::new(open(&dir).await, test_config().cache);
        let entry = cache.get(&item.fingerprint()).await.unwrap();
        assert_eq!(entry.response, response);
        assert_eq!(entry.operation, "keyword_metrics");
    }

    #[tokio::test]
    async fn test_list_and_clear_runs() {
        let dir = TempDir::new().unwrap();
        let checkpoints = CheckpointStore::new(open(&dir).await);
        let items: Vec<WorkItem> = ItemFactory::distinct(3);

        checkpoints.register("alpha", &items).await.unwrap();
        checkpoints.register("beta/weekly", &items[..1]).await.unwrap();

        let reopened = CheckpointStore::new(open(&dir).await);
        let mut runs: Vec<String> = reopened
            .list_runs()
            .await
            .unwrap()
            .into_iter()
            .map(|summary| summary.run_key)
            .collect();
        runs.sort();
        assert_eq!(runs, vec!["alpha", "beta/weekly"]);

        let alpha = reopened.progress("alpha").await.unwrap();
        assert_eq!(alpha.total, 3);
        assert_eq!(alpha.pending, 3);

        assert_eq!(reopened.clear("alpha").await.unwrap(), 3);
        let runs = reopened.list_runs().await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_key, "beta/weekly");
    }

    #[tokio::test]
    async fn test_odd_item_ids_round_trip() {
        let dir = TempDir::new().unwrap();
        let checkpoints = CheckpointStore::new(open(&dir).await);
        let items = vec![
            ItemFactory::keyword("https://example.com/a?b=c", "a"),
            ItemFactory::keyword("../../etc/passwd", "b"),
            ItemFactory::keyword("ключ", "c"),
        ];

        checkpoints.register("odd", &items).await.unwrap();

        let loaded = CheckpointStore::new(open(&dir).await)
            .load("odd")
            .await
            .unwrap();
        assert_eq!(loaded.items.len(), 3);
        for item in &items {
            assert_eq!(loaded.get(item.id()).unwrap().state, ItemState::Pending);
        }
    }

    #[tokio::test]
    async fn test_long_url_ids_run_and_resume() {
        let dir = TempDir::new().unwrap();
        let url = format!(
            "https://www.example.com/catalogue/{}?utm_source=newsletter&page=2",
            "running-shoes/".repeat(16)
        );
        assert!(url.len() > 200);
        let call = ScriptedCall::echo();
        let cancel = CancellationToken::new();

        let first = {
            let engine = TestEngine::with_store(test_config(), open(&dir).await);
            engine
                .orchestrator
                .run("batch-1", vec![ItemFactory::scrape(&url, &url)], &call, &cancel)
                .await
                .unwrap()
        };
        assert!(first.is_complete());
        assert!(first.succeeded.contains_key(&url));
        assert_eq!(call.calls(), 1);

        let checkpoint = CheckpointStore::new(open(&dir).await)
            .load("batch-1")
            .await
            .unwrap();
        assert_eq!(checkpoint.get(&url).unwrap().state, ItemState::Succeeded);

        let engine = TestEngine::with_store(test_config(), open(&dir).await);
        let second = engine
            .orchestrator
            .run("batch-1", vec![ItemFactory::scrape(&url, &url)], &call, &cancel)
            .await
            .unwrap();
        assert_eq!(call.calls(), 1);
        assert!(first.same_outcome(&second));
    }

    #[tokio::test]
    async fn test_health_check_and_backend_name() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir).await;
        assert!(store.health_check().await.is_ok());
        assert_eq!(store.name(), "file");
    }
}
