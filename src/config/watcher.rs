//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

/// Monitors the configuration file and pushes fresh configs on change.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Create a new watcher. Returns the watcher and the receiver for
    /// configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching on a background thread. The thread exits when the
    /// receiver side is dropped.
    pub fn spawn(self) {
        std::thread::spawn(move || {
            let (event_tx, event_rx) = std::sync::mpsc::channel::<notify::Result<Event>>();
            let mut watcher: RecommendedWatcher = match notify::recommended_watcher(event_tx) {
                Ok(watcher) => watcher,
                Err(error) => {
                    tracing::error!(error = %error, "Failed to create config watcher");
                    return;
                }
            };
            if let Err(error) = watcher.watch(&self.path, RecursiveMode::NonRecursive) {
                tracing::error!(path = %self.path.display(), error = %error, "Failed to watch config file");
                return;
            }

            for event in event_rx {
                match event {
                    Ok(Event {
                        kind: EventKind::Modify(_) | EventKind::Create(_),
                        ..
                    }) => match load_config(&self.path) {
                        Ok(config) => {
                            tracing::info!(path = %self.path.display(), "Configuration reloaded");
                            if self.update_tx.send(config).is_err() {
                                return;
                            }
                        }
                        Err(error) => {
                            tracing::warn!(error = %error, "Ignoring unparseable config change");
                        }
                    },
                    Ok(_) => {}
                    Err(error) => {
                        tracing::warn!(error = %error, "Config watch error");
                    }
                }
            }
        });
    }
}
