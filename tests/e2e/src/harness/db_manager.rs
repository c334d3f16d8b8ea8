//! Test Database Manager
//!
//! Isolated engine instances for journey tests. Each instance lives in
//! its own temporary project directory and is deleted on drop.

use std::sync::Arc;

use tempfile::TempDir;

use engram_core::{EntryInput, FtsTokenizer, MemoryConfig, MemoryService};

/// One isolated memory engine rooted in a temp project directory.
///
/// The temp dir is kept alive for the lifetime of the harness so the
/// database file is not deleted under the engine.
pub struct TestMemory {
    pub service: Arc<MemoryService>,
    _temp_dir: TempDir,
}

impl TestMemory {
    /// Fresh engine with default configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Fresh engine after applying a config tweak.
    pub async fn with_config(tweak: impl FnOnce(&mut MemoryConfig)) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp directory");
        let mut config = MemoryConfig::for_project(temp_dir.path());
        tweak(&mut config);

        let service = MemoryService::new(config);
        service.initialize().await.expect("failed to initialize");

        Self {
            service: Arc::new(service),
            _temp_dir: temp_dir,
        }
    }

    /// Fresh engine with the CJK-safe trigram tokenizer.
    pub async fn cjk() -> Self {
        Self::with_config(|config| config.tokenizer = FtsTokenizer::Trigram).await
    }

    /// Fresh engine with a small-dimension vector index for seeding by hand.
    pub async fn with_dimensions(dimensions: usize) -> Self {
        Self::with_config(|config| config.index.dimensions = dimensions).await
    }

    /// Seed a batch of plain entries into one namespace.
    pub async fn seed(&self, namespace: &str, count: usize) {
        for i in 0..count {
            self.service
                .store_entry(EntryInput::new(
                    namespace,
                    format!("seed-{i}"),
                    format!("seeded entry number {i}"),
                ))
                .await
                .expect("failed to seed entry");
        }
    }
}
