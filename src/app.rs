//! Application container for symgate

use std::path::{Path, PathBuf};

use crate::cli::OutputContext;
use crate::models::config::SymgateConfig;
use crate::services::tools::SymbolTools;

pub struct App {
    root: PathBuf,
    pub(crate) output: OutputContext,
    pub(crate) tools: SymbolTools,
    config: SymgateConfig,
}

impl App {
    /// `root` is the working directory: relative paths resolve against it and
    /// it is the default allowed directory.
    pub fn new(config: SymgateConfig, root: PathBuf) -> Self {
        tracing::debug!("Initializing symgate at {:?}", root);

        let tools = SymbolTools::new(&config, &root);

        tracing::info!(
            "symgate initialized (backend: {}, allowed: {:?})",
            config.lsp.mode,
            tools.policy().allowed()
        );

        Self {
            root,
            output: OutputContext::new(),
            tools,
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SymgateConfig {
        &self.config
    }
}
