use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::Config;

/// Application root: owns the configuration and the shutdown signal shared
/// by every background task (cache sweeper, auto-refresh scheduler).
pub struct App {
    config: Arc<Config>,
    shutdown: CancellationToken,
}

impl App {
    /// Create a new application instance from the on-disk configuration
    pub fn new() -> Result<Self> {
        let (config, _) = Config::load_validated()?;
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shared_config(&self) -> Arc<Config> {
        self.config.clone()
    }

    /// Token for a background task; cancelled by [`App::shutdown`].
    pub fn task_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Cancel every background task handed a token by this app
    pub fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        tracing::info!("Shutting down application");
        self.shutdown.cancel();
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_cancels_task_tokens() {
        let app = App::with_config(Config::default());
        let token = app.task_token();
        assert!(!token.is_cancelled());

        app.shutdown();

        assert!(token.is_cancelled());
        assert!(app.is_shutting_down());
    }

    #[test]
    fn test_drop_cancels_task_tokens() {
        let app = App::with_config(Config::default());
        let token = app.task_token();
        drop(app);
        assert!(token.is_cancelled());
    }
}
