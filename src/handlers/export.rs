use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::header;
use axum::response::{IntoResponse, Response};

use super::json_body;
use crate::error::Result;
use crate::export::export;
use crate::models::ExportRequest;

pub async fn export_tutorial(
    payload: std::result::Result<Json<ExportRequest>, JsonRejection>,
) -> Result<Response> {
    let request = json_body(payload)?;
    let doc = export(&request.tutorial, request.format)?;
    tracing::info!(format = ?request.format, filename = %doc.filename, "Exported tutorial");

    Ok((
        [
            (header::CONTENT_TYPE, doc.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", doc.filename),
            ),
        ],
        doc.content,
    )
        .into_response())
}
