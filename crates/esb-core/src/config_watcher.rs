//! Config Watcher: polls a directory of configuration files, revalidates
//! changed ones, and atomically swaps the corresponding Registry entries.
//!
//! A `tokio::time::interval` poll loop races a `broadcast` shutdown
//! receiver via `tokio::select!`; each tick scans file mtimes under
//! `tokio::fs` rather than subscribing to filesystem events directly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use esb_common::{EsbError, Result};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::registry::Registry;

/// Parses one changed config file into a sequence/endpoint/routing
/// artifact and installs it into the registry. Parsing itself (XML/JSON,
/// schema validation) is deliberately left to the caller; this is the
/// seam a future config-parsing crate plugs into.
pub trait ConfigLoader: Send + Sync {
    fn load(&self, path: &Path, bytes: &[u8], registry: &Registry) -> Result<()>;
}

pub struct ConfigWatcherConfig {
    pub directory: PathBuf,
    pub poll_interval: Duration,
}

impl Default for ConfigWatcherConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Watches `directory` for files whose mtime has advanced since the last
/// poll, then hands the changed file to a `ConfigLoader`.
///
/// Atomicity: the loader constructs the new artifact fully before
/// `Registry::put_*` swaps the slot, so an in-flight mediation never
/// observes a half-replaced sequence.
pub struct ConfigWatcher {
    config: ConfigWatcherConfig,
    registry: Arc<Registry>,
    loader: Arc<dyn ConfigLoader>,
    last_modified: Mutex<HashMap<PathBuf, SystemTime>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl ConfigWatcher {
    pub fn new(config: ConfigWatcherConfig, registry: Arc<Registry>, loader: Arc<dyn ConfigLoader>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            registry,
            loader,
            last_modified: Mutex::new(HashMap::new()),
            shutdown_tx,
        }
    }

    /// Spawn the polling task; returns immediately. The task stops when
    /// `stop()` is called or the watcher is dropped.
    pub fn spawn(self: Arc<Self>) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.poll_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.poll_once().await {
                            error!(error = %e, "config watcher poll failed");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("config watcher shutting down");
                        break;
                    }
                }
            }
        });
    }

    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// One poll cycle: scan the directory, load any file whose mtime
    /// advanced since the previous cycle. Exposed directly so tests don't
    /// need to wait on the ticker.
    pub async fn poll_once(&self) -> Result<()> {
        let mut entries = tokio::fs::read_dir(&self.config.directory)
            .await
            .map_err(|e| EsbError::config(format!("reading config directory: {e}")))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| EsbError::config(format!("reading directory entry: {e}")))?
        {
            let path = entry.path();
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not stat config file, skipping");
                    continue;
                }
            };
            let modified = match metadata.modified() {
                Ok(m) => m,
                Err(_) => continue,
            };

            let changed = {
                let mut seen = self.last_modified.lock();
                let changed = seen.get(&path).map(|prev| *prev != modified).unwrap_or(true);
                if changed {
                    seen.insert(path.clone(), modified);
                }
                changed
            };

            if !changed {
                continue;
            }

            debug!(path = %path.display(), "config file changed, reloading");
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| EsbError::config(format!("reading '{}': {e}", path.display())))?;

            if let Err(e) = self.loader.load(&path, &bytes, &self.registry) {
                warn!(path = %path.display(), error = %e, "config reload failed, keeping previous state");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Sequence;

    struct InstallEmptySequence;
    impl ConfigLoader for InstallEmptySequence {
        fn load(&self, path: &Path, _bytes: &[u8], registry: &Registry) -> Result<()> {
            let name = path.file_stem().unwrap().to_string_lossy().to_string();
            registry.put_sequence(Sequence::new(name, vec![]));
            Ok(())
        }
    }

    #[tokio::test]
    async fn reload_is_observed_by_next_poll_only() {
        let dir = std::env::temp_dir().join(format!("esb-config-watcher-test-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let file_path = dir.join("s.conf");
        tokio::fs::write(&file_path, b"v1").await.unwrap();

        let registry = Arc::new(Registry::new());
        let watcher = ConfigWatcher::new(
            ConfigWatcherConfig {
                directory: dir.clone(),
                poll_interval: Duration::from_secs(3600),
            },
            registry.clone(),
            Arc::new(InstallEmptySequence),
        );

        watcher.poll_once().await.unwrap();
        assert!(registry.get_sequence("s").is_some());

        registry.remove_sequence("s");
        watcher.poll_once().await.unwrap();
        assert!(registry.get_sequence("s").is_none(), "unchanged file should not reload");

        tokio::fs::write(&file_path, b"v2").await.unwrap();
        watcher.poll_once().await.unwrap();
        assert!(registry.get_sequence("s").is_some(), "changed mtime should reload");

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
