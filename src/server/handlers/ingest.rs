use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::core::config::SUPPORTED_EXTENSIONS;
use crate::core::errors::ApiError;
use crate::ingest::loader::{FileKind, LoadError};
use crate::state::AppState;

fn load_error_to_api(err: LoadError) -> ApiError {
    match err {
        LoadError::NotFound(path) => ApiError::NotFound(format!("not found: {}", path)),
        LoadError::UnsupportedFormat(ext) => ApiError::BadRequest(format!(
            "Unsupported file type: .{}. Supported: {}",
            ext,
            SUPPORTED_EXTENSIONS.join(", ")
        )),
        LoadError::FileTooLarge { size, limit } => ApiError::PayloadTooLarge(format!(
            "file is {} bytes, limit is {}",
            size, limit
        )),
        LoadError::Parse { path, reason } => {
            ApiError::BadRequest(format!("failed to parse {}: {}", path, reason))
        }
        LoadError::Io(err) => ApiError::internal(err),
    }
}

/// Upload one document and index it.
///
/// The extension and size are validated before anything touches disk; the
/// file is parsed off the async runtime via `spawn_blocking`.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("invalid multipart body: {}", err)))?
    {
        if let Some(filename) = field.file_name().map(str::to_string) {
            let data = field
                .bytes()
                .await
                .map_err(|err| ApiError::BadRequest(format!("failed to read upload: {}", err)))?;
            upload = Some((filename, data.to_vec()));
            break;
        }
    }

    let (filename, data) =
        upload.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;

    let ext = filename
        .rsplit('.')
        .next()
        .filter(|ext| *ext != filename)
        .unwrap_or("")
        .to_ascii_lowercase();
    if FileKind::from_extension(&ext).is_none() {
        return Err(load_error_to_api(LoadError::UnsupportedFormat(ext)));
    }
    if data.len() as u64 > state.settings.max_file_size {
        return Err(load_error_to_api(LoadError::FileTooLarge {
            size: data.len() as u64,
            limit: state.settings.max_file_size,
        }));
    }

    let temp_path =
        std::env::temp_dir().join(format!("context-agent-upload-{}.{}", Uuid::new_v4(), ext));
    tokio::fs::write(&temp_path, &data)
        .await
        .map_err(ApiError::internal)?;

    let loader = state.loader.clone();
    let load_path = temp_path.clone();
    let loaded = tokio::task::spawn_blocking(move || loader.load_path(&load_path))
        .await
        .map_err(ApiError::internal)?;
    let _ = tokio::fs::remove_file(&temp_path).await;

    let mut documents = loaded.map_err(load_error_to_api)?;

    // The loader saw a synthetic temp name; restore the uploaded one.
    for document in &mut documents {
        document
            .metadata
            .insert("source".to_string(), Value::String(filename.clone()));
        document
            .metadata
            .insert("file_path".to_string(), Value::String(filename.clone()));
    }

    let chunk_count = state.vector_store.add_documents(&documents).await?;
    tracing::info!("Ingested '{}' as {} chunks", filename, chunk_count);

    Ok(Json(json!({
        "filename": filename,
        "status": "success",
        "message": format!("Successfully processed {} document chunks", chunk_count),
        "document_count": chunk_count,
    })))
}

#[derive(Debug, Deserialize)]
pub struct DirectoryRequest {
    pub directory_path: String,
}

/// Ingest every supported file in a directory, tolerating per-file
/// failures.
pub async fn ingest_directory(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DirectoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let dir = PathBuf::from(&payload.directory_path);
    let loader = state.loader.clone();
    let loaded = tokio::task::spawn_blocking(move || loader.load_directory(&dir))
        .await
        .map_err(ApiError::internal)?
        .map_err(load_error_to_api)?;

    if loaded.documents.is_empty() {
        return Ok(Json(json!({
            "message": "No supported documents found in directory",
            "directory": payload.directory_path,
            "document_count": 0,
            "skipped_files": loaded.skipped,
        })));
    }

    let document_count = loaded.documents.len();
    let chunk_count = state.vector_store.add_documents(&loaded.documents).await?;

    Ok(Json(json!({
        "message": format!("Successfully processed {} documents", document_count),
        "directory": payload.directory_path,
        "document_count": document_count,
        "chunk_count": chunk_count,
        "skipped_files": loaded.skipped,
    })))
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store_stats = state.vector_store.stats().await;
    Json(json!({
        "vector_store": store_stats,
        "supported_formats": SUPPORTED_EXTENSIONS,
        "max_file_size_mb": state.settings.max_file_size / (1024 * 1024),
    }))
}

pub async fn clear_documents(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let removed = state.vector_store.delete_all().await?;
    tracing::info!("Cleared {} chunks from the vector store", removed);
    Ok(Json(json!({
        "message": "All documents cleared from vector store",
        "removed_chunks": removed,
    })))
}
