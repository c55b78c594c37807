//! Configuration integration tests
//!
//! Loading YAML from disk, validation failures and wiring an orchestrator
//! straight from a configuration file.

#[cfg(test)]
mod tests {
    use crate::common::{ItemFactory, ScriptedCall};
    use resumable_batch::config::Validate;
    use resumable_batch::{BatchError, EngineConfig, Orchestrator, StorageBackend};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    fn write_config(dir: &TempDir, yaml: &str) -> std::path::PathBuf {
        let path = dir.path().join("engine.yaml");
        std::fs::write(&path, yaml).unwrap();
        path
    }

    // ==================== Loading ====================

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"
orchestrator:
  max_workers: 4
rate_limits:
  firecrawl:
    requests_per_window: 10
    window_secs: 1
    max_concurrent: 2
default_rate_limit:
  requests_per_window: 2000
  window_secs: 60
  max_concurrent: 30
retry:
  max_attempts: 5
  base_delay_ms: 250
  max_delay_ms: 10000
  jitter: 0.2
cache:
  default_ttl_secs: 600
  ttl_per_operation:
    serp_scrape: 3600
storage:
  backend: memory
"#,
        );

        let config = EngineConfig::from_file(&path).await.unwrap();
        assert_eq!(config.orchestrator.max_workers, 4);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.cache.ttl_for("serp_scrape"), Duration::from_secs(3600));
        assert_eq!(config.cache.ttl_for("keyword_metrics"), Duration::from_secs(600));
        assert_eq!(
            config.rate_limit_for("firecrawl").unwrap().max_concurrent,
            2
        );
        // Unlisted classes fall back to the default limit
        assert_eq!(
            config.rate_limit_for("dataforseo").unwrap().requests_per_window,
            2000
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = EngineConfig::from_file(dir.path().join("absent.yaml"))
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::Config(_)));
    }

    // ==================== Validation ====================

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            "orchestrator:\n  max_workers: 0\n",
            "retry:\n  max_attempts: 0\n",
            "retry:\n  jitter: 1.5\n",
            "retry:\n  base_delay_ms: 5000\n  max_delay_ms: 100\n",
            "rate_limits:\n  firecrawl:\n    requests_per_window: 0\n",
            "rate_limits:\n  firecrawl:\n    max_concurrent: 0\n",
        ];
        for yaml in cases {
            let err = EngineConfig::from_yaml_str(yaml).unwrap_err();
            assert!(matches!(err, BatchError::Config(_)), "accepted: {}", yaml);
        }
    }

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.storage.backend, StorageBackend::File);
    }

    // ==================== Wiring ====================

    #[tokio::test]
    async fn test_orchestrator_from_config_file() {
        let dir = TempDir::new().unwrap();
        let state = dir.path().join("state");
        let path = write_config(
            &dir,
            &format!(
                r#"
default_rate_limit:
  requests_per_window: 100
  window_secs: 60
  max_concurrent: 4
storage:
  backend: file
  path: "{}"
"#,
                state.display()
            ),
        );

        let config = EngineConfig::from_file(&path).await.unwrap();
        let orchestrator = Orchestrator::from_config(config).await.unwrap();
        let call = ScriptedCall::echo();

        let result = orchestrator
            .run("from-file", ItemFactory::distinct(2), &call, &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_complete());
        assert!(state.is_dir());
        assert_eq!(orchestrator.config().max_workers, EngineConfig::default().orchestrator.max_workers);
    }
}
