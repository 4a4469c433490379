use std::sync::Arc;

use dcfm_merge::StagingArea;
use dcfm_model::Workbook;

use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Shared, read-only state: the parsed template and the configuration.
#[derive(Clone, Debug)]
pub struct AppState {
    pub template: Arc<Workbook>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(template: Workbook, config: ServerConfig) -> Self {
        Self {
            template: Arc::new(template),
            config: Arc::new(config),
        }
    }

    /// Load the template named by `config`.
    pub fn load(config: ServerConfig) -> ServerResult<Self> {
        let template = dcfm_merge::load_template(&config.template_path)?;
        Ok(Self::new(template, config))
    }

    pub fn staging_area(&self) -> std::io::Result<StagingArea> {
        match &self.config.staging_root {
            Some(root) => StagingArea::new_in(root),
            None => StagingArea::new(),
        }
    }
}
