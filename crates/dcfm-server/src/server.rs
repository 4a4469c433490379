use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// DCF Merge HTTP server.
pub struct DcfMergeServer {
    state: AppState,
}

impl DcfMergeServer {
    /// Load the template and prepare the server. Fails when the template is
    /// unreadable or lacks the "DCF Model" sheet.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        Ok(Self { state: AppState::load(config)? })
    }

    pub fn with_state(state: AppState) -> Self {
        Self { state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Serve until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let addr = self.state.config.bind_addr;
        let app = build_router(self.state);
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("DCF Merge server listening on {}", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("shutting down");
                }
            })
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcfm_model::Workbook;

    #[test]
    fn missing_template_fails_construction() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            template_path: dir.path().join("absent.xlsx"),
            ..ServerConfig::default()
        };
        assert!(DcfMergeServer::new(config).is_err());
    }

    #[test]
    fn router_builds() {
        let mut template = Workbook::empty();
        template.create_sheet("DCF Model").unwrap();
        let server = DcfMergeServer::with_state(AppState::new(template, ServerConfig::default()));
        assert_eq!(server.config().bind_addr.port(), 8000);
        let _router = server.router();
    }
}
