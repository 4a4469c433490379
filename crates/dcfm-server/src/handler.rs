use axum::body::Bytes;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Json};
use dcfm_merge::SheetOrigin;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": "dcfm-server",
        "version": env!("CARGO_PKG_VERSION"),
        "template_sheets": state.template.sheet_names(),
        "public_company_precedence": state.config.public_company_precedence,
    }))
}

/// The two files a merge request carries.
#[derive(Debug, Default)]
struct Uploads {
    consensus: Option<Bytes>,
    profile: Option<Bytes>,
}

async fn read_uploads(mut multipart: Multipart) -> ServerResult<Uploads> {
    let mut uploads = Uploads::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::Multipart(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServerError::Multipart(e.to_string()))?;
        match name.as_str() {
            "consensus" => uploads.consensus = Some(bytes),
            // A form submitted without choosing a file sends an empty part.
            "profile" if !bytes.is_empty() => uploads.profile = Some(bytes),
            "profile" => {}
            other => debug!(field = other, "ignoring unknown upload field"),
        }
    }
    Ok(uploads)
}

/// `POST /upload`: merge the uploaded workbooks with the template and return
/// the result as an attachment.
pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServerResult<impl IntoResponse> {
    let multipart = multipart.map_err(|e| ServerError::Multipart(e.body_text()))?;
    let uploads = read_uploads(multipart).await?;
    let consensus = uploads
        .consensus
        .ok_or(ServerError::MissingField(SheetOrigin::Consensus.as_str()))?;

    let staging = state.staging_area()?;
    let consensus_path = staging.stage(SheetOrigin::Consensus.as_str(), &consensus)?;
    let profile_path = uploads
        .profile
        .map(|bytes| staging.stage(SheetOrigin::Profile.as_str(), &bytes))
        .transpose()?;
    info!(
        consensus_bytes = consensus.len(),
        has_profile = profile_path.is_some(),
        "merge requested"
    );

    let template = state.template.clone();
    let options = state.config.merge_options();
    let merged = tokio::task::spawn_blocking(move || {
        let result = dcfm_merge::build_output_from_paths(
            &consensus_path,
            profile_path.as_deref(),
            &template,
            &options,
        );
        drop(staging);
        result
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))??;

    let disposition = format!("attachment; filename={}", state.config.output_filename);
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        merged,
    ))
}
