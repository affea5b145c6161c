//! CLI execution context.

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use builder_data::{ReqwestTransport, StoreClient};
use builder_engine::{BuilderEngine, NavigationError, Navigator};

use crate::config::{BuilderConfig, CONFIG_FILE_NAMES};
use crate::output::Output;

/// Execution context for CLI commands.
pub struct Context {
    pub config: BuilderConfig,
    pub output: Output,
    /// Where the config came from, if a file was found.
    pub config_path: Option<PathBuf>,
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from an explicit config file, or the nearest one found.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (config, config_path) = match config_path {
            Some(path) => (BuilderConfig::load(path)?, Some(PathBuf::from(path))),
            None => match Self::find_config(&cwd) {
                Some((config, path)) => (config, Some(path)),
                None => (BuilderConfig::default(), None),
            },
        };

        Ok(Self {
            config: config.with_env_overrides(),
            output,
            config_path,
            cwd,
        })
    }

    /// Find config file in directory tree.
    fn find_config(start: &Path) -> Option<(BuilderConfig, PathBuf)> {
        let mut current = start.to_path_buf();
        loop {
            for name in CONFIG_FILE_NAMES {
                let path = current.join(name);
                if path.exists() {
                    if let Ok(config) = BuilderConfig::load(path.to_str()?) {
                        return Some((config, path));
                    }
                }
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// A fresh engine session over the configured store.
    pub fn engine(&self) -> Result<BuilderEngine> {
        let timeout = Duration::from_secs(self.config.session.timeout_secs);
        let transport = ReqwestTransport::new(timeout).context("Failed to create HTTP client")?;
        let store = Rc::new(StoreClient::new(Rc::new(transport), self.config.store.clone()));
        let navigator = Rc::new(TerminalNavigator {
            output: self.output.clone(),
        });

        self.output
            .debug(&format!("Store API: {}", self.config.store.base_url));

        Ok(BuilderEngine::new(
            self.config.engine_config(),
            self.config.slots.clone(),
            store.clone(),
            store,
            navigator,
        ))
    }
}

/// "Navigates" by telling the user which page to open.
struct TerminalNavigator {
    output: Output,
}

impl Navigator for TerminalNavigator {
    fn navigate(&self, url: &str) -> Result<(), NavigationError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(NavigationError(format!("refusing to open {url}")));
        }
        self.output.info(&format!("Open {url} to review your cart"));
        Ok(())
    }
}
