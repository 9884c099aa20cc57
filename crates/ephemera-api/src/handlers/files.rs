use crate::constants::{
    CREATED_AT_HEADER, DEFAULT_CONTENT_TYPE, EXPIRES_AT_HEADER, PASSWORD_HEADER, PRIVATE_HEADER,
};
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use ephemera_core::{AppError, FileId, FileListEntry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIdResponse {
    pub id: FileId,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, AppError> {
    headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| AppError::InvalidInput(format!("Header {} is not valid UTF-8", name)))
        })
        .transpose()
}

fn parse_id(raw: &str) -> Result<FileId, AppError> {
    raw.parse::<FileId>()
        .map_err(|_| AppError::InvalidInput(format!("Invalid file id '{}'", raw)))
}

/// `POST /files`: store the raw request body.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    query: Result<Query<UploadParams>, QueryRejection>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, HttpAppError> {
    let Query(params) = query?;
    let body = body?;

    let content_type = header_str(&headers, header::CONTENT_TYPE.as_str())?
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_CONTENT_TYPE);
    let password = header_str(&headers, PASSWORD_HEADER)?.unwrap_or_default();

    tracing::debug!(
        size_bytes = body.len(),
        content_type = %content_type,
        is_private = params.private,
        "Upload received"
    );

    let id = state
        .files
        .upload(
            body.to_vec(),
            params.private,
            password,
            content_type,
            Utc::now(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(FileIdResponse { id })))
}

/// `GET /files`: live public entries ordered by id.
///
/// Private files stay downloadable by id but are left out of the listing.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<FileListEntry>>, HttpAppError> {
    let mut public = state.files.list_public(Utc::now()).await?;
    public.sort_by_key(|entry| entry.id.value());
    Ok(Json(public))
}

/// `GET /files/{id}`: content with its metadata in headers.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, HttpAppError> {
    let id = parse_id(&id)?;
    let (content, meta) = state.files.download(id, Utc::now()).await?;

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, meta.content_type())
        .header(
            CREATED_AT_HEADER,
            meta.created_at().to_rfc3339_opts(SecondsFormat::Secs, true),
        )
        .header(PRIVATE_HEADER, meta.is_private().to_string());
    // Absent when the record never expires.
    if let Some(expires_at) = state.files.expires_at(meta.created_at()) {
        builder = builder.header(
            EXPIRES_AT_HEADER,
            expires_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        );
    }

    let response = builder
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!(error = %e, file.id = %id, "Failed to build response");
            AppError::Internal(e.to_string())
        })?;

    Ok(response)
}

/// `DELETE /files/{id}`: a missing password header means the empty password.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<FileIdResponse>, HttpAppError> {
    let id = parse_id(&id)?;
    let password = header_str(&headers, PASSWORD_HEADER)?.unwrap_or_default();

    let id = state.files.delete(id, password, Utc::now()).await?;

    Ok(Json(FileIdResponse { id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("12").unwrap(), FileId::new(12));
        assert!(matches!(parse_id("abc"), Err(AppError::InvalidInput(_))));
        assert!(matches!(parse_id(""), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_header_str() {
        let mut headers = HeaderMap::new();
        headers.insert(PASSWORD_HEADER, HeaderValue::from_static("pass"));
        headers.insert(
            CREATED_AT_HEADER,
            HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap(),
        );

        assert_eq!(header_str(&headers, PASSWORD_HEADER).unwrap(), Some("pass"));
        assert_eq!(header_str(&headers, "x-missing").unwrap(), None);
        assert!(header_str(&headers, CREATED_AT_HEADER).is_err());
    }
}
