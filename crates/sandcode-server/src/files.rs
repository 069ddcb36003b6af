//! Project bookkeeping and the file manager.
//!
//! File manager paths are relative to the current sandbox directory, or to
//! the workspaces root when no sandbox is set.

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sandcode_util::path::safe_join;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::fs;
use tracing::{debug, info};

/// Extensions the editor may open and save.
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "py", "js", "json", "html", "css", "csv", "log", "xml", "yml", "yaml", "ini",
    "conf",
];

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn file_type(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp" => "image",
        "pdf" | "doc" | "docx" | "txt" | "ppt" | "pptx" | "xls" | "xlsx" => "document",
        "mp4" | "avi" | "mov" | "wmv" | "mkv" => "video",
        "mp3" | "wav" | "ogg" | "flac" => "audio",
        "zip" | "rar" | "tar" | "gz" | "7z" => "archive",
        _ => "default",
    }
}

/// Human readable size such as `1.5 KB`.
fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["", "K", "M", "G", "T", "P", "E", "Z"] {
        if size.abs() < 1024.0 {
            return format!("{size:.1} {unit}B");
        }
        size /= 1024.0;
    }
    format!("{size:.1} YB")
}

fn io_failure(err: std::io::Error) -> crate::error::ApiFailure {
    ApiError::internal(err.to_string())
}

/// Base directory of the file manager.
async fn root_dir(state: &AppState) -> PathBuf {
    let sandbox = state.sandbox.lock().await;
    sandbox
        .sandbox_dir()
        .unwrap_or_else(|_| state.workspace_root.clone())
}

async fn resolve(state: &AppState, rel: &str) -> ApiResult<PathBuf> {
    let root = root_dir(state).await;
    safe_join(&root, rel).map_err(|_| ApiError::bad_request("Invalid path"))
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

// =============================================================================
// Projects
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectBody {
    name: String,
}

pub(crate) async fn project_create(
    State(state): State<AppState>,
    Json(body): Json<ProjectBody>,
) -> ApiResult<impl IntoResponse> {
    let name = Path::new(body.name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("Invalid project name"))?
        .to_string();

    fs::create_dir_all(&state.workspace_root)
        .await
        .map_err(io_failure)?;
    match fs::create_dir(state.workspace_root.join(&name)).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(ApiError::bad_request("Project already exists"));
        }
        Err(e) => return Err(io_failure(e)),
    }

    info!(project = %name, "Created project");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "success": true, "path": format!("/{name}") })),
    ))
}

pub(crate) async fn project_list(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let mut projects = Vec::new();
    let mut entries = match fs::read_dir(&state.workspace_root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Ok(Json(serde_json::json!({ "projects": projects })));
        }
        Err(e) => return Err(io_failure(e)),
    };
    while let Some(entry) = entries.next_entry().await.map_err(io_failure)? {
        if entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            projects.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    projects.sort();
    Ok(Json(serde_json::json!({ "projects": projects })))
}

// =============================================================================
// File manager
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct PathQuery {
    #[serde(default = "root_path")]
    path: String,
}

fn root_path() -> String {
    "/".to_string()
}

#[derive(Debug, Serialize)]
struct FileInfo {
    name: String,
    size: String,
    #[serde(rename = "type")]
    kind: &'static str,
    /// Seconds since the epoch.
    modified: String,
}

#[derive(Debug, Serialize)]
struct FolderInfo {
    name: String,
    path: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ListResponse {
    files: Vec<FileInfo>,
    folders: Vec<FolderInfo>,
}

pub(crate) async fn list(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<ListResponse>> {
    let dir = resolve(&state, &query.path).await?;
    let mut entries = match fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ApiError::not_found("Path does not exist"));
        }
        Err(e) => return Err(io_failure(e)),
    };

    let base = query.path.trim_end_matches('/');
    let mut response = ListResponse {
        files: Vec::new(),
        folders: Vec::new(),
    };
    while let Some(entry) = entries.next_entry().await.map_err(io_failure)? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if meta.is_dir() {
            response.folders.push(FolderInfo {
                path: format!("{base}/{name}").replace('\\', "/"),
                name,
            });
        } else {
            let modified = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs_f64())
                .unwrap_or_default();
            response.files.push(FileInfo {
                size: format_size(meta.len()),
                kind: file_type(&name),
                modified: modified.to_string(),
                name,
            });
        }
    }
    response.files.sort_by(|a, b| a.name.cmp(&b.name));
    response.folders.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(response))
}

pub(crate) async fn read(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> ApiResult<impl IntoResponse> {
    let path = resolve(&state, &query.path).await?;
    if !is_file(&path).await {
        return Err(ApiError::not_found("File not found"));
    }
    if !is_text_file(&path) {
        return Err(ApiError::bad_request("Not a text file"));
    }
    let bytes = fs::read(&path).await.map_err(io_failure)?;
    Ok(Json(
        serde_json::json!({ "content": String::from_utf8_lossy(&bytes) }),
    ))
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveBody {
    path: String,
    #[serde(default)]
    content: String,
}

pub(crate) async fn save(
    State(state): State<AppState>,
    Json(body): Json<SaveBody>,
) -> ApiResult<impl IntoResponse> {
    let path = resolve(&state, &body.path).await?;
    if !is_file(&path).await {
        return Err(ApiError::not_found("File not found"));
    }
    if !is_text_file(&path) {
        return Err(ApiError::bad_request("Not a text file"));
    }
    fs::write(&path, body.content).await.map_err(io_failure)?;
    debug!(path = %path.display(), "Saved file");
    Ok(Json(serde_json::json!({ "success": true })))
}

pub(crate) async fn create_file(
    State(state): State<AppState>,
    Json(body): Json<SaveBody>,
) -> ApiResult<impl IntoResponse> {
    let rel = body.path.trim();
    if rel.is_empty() || rel.ends_with('/') {
        return Err(ApiError::bad_request("Invalid file path"));
    }
    let root = root_dir(&state).await;
    let path = safe_join(&root, rel).map_err(|_| ApiError::bad_request("Invalid path"))?;
    if path == root {
        return Err(ApiError::bad_request("Invalid file path"));
    }
    if fs::try_exists(&path).await.unwrap_or(false) {
        return Err(ApiError::bad_request("File already exists"));
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(io_failure)?;
    }
    fs::write(&path, body.content).await.map_err(io_failure)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RenameBody {
    path: String,
    new_name: String,
}

pub(crate) async fn rename(
    State(state): State<AppState>,
    Json(body): Json<RenameBody>,
) -> ApiResult<impl IntoResponse> {
    let path = resolve(&state, &body.path).await?;
    if !fs::try_exists(&path).await.unwrap_or(false) {
        return Err(ApiError::not_found("File/folder not found"));
    }
    let new_name = Path::new(body.new_name.trim())
        .file_name()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("Invalid new name"))?;
    let parent = path
        .parent()
        .ok_or_else(|| ApiError::bad_request("Invalid path"))?;

    fs::rename(&path, parent.join(new_name))
        .await
        .map_err(io_failure)?;
    Ok(Json(serde_json::json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeleteBody {
    path: String,
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    Json(body): Json<DeleteBody>,
) -> ApiResult<impl IntoResponse> {
    let root = root_dir(&state).await;
    let path = safe_join(&root, &body.path).map_err(|_| ApiError::bad_request("Invalid path"))?;
    if path == root {
        return Err(ApiError::bad_request("Invalid path"));
    }
    let meta = match fs::metadata(&path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ApiError::not_found("File/folder not found"));
        }
        Err(e) => return Err(io_failure(e)),
    };

    if meta.is_dir() {
        fs::remove_dir(&path)
            .await
            .map_err(|_| ApiError::bad_request("Directory not empty"))?;
    } else {
        fs::remove_file(&path).await.map_err(io_failure)?;
    }
    info!(path = %path.display(), "Deleted");
    Ok(Json(serde_json::json!({ "success": true })))
}
