//! Sandbox lifecycle routes.

use crate::{
    error::{ApiError, ApiResult},
    state::AppState,
};
use axum::{extract::State, response::IntoResponse, Json};
use sandcode_sandbox::{is_excluded, CommandOutput, FileCache, SandboxMeta};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct InitBody {
    project: Option<String>,
    timeout_ms: Option<u64>,
    api_key: Option<String>,
}

impl InitBody {
    fn project(&self) -> ApiResult<&str> {
        self.project
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::bad_request("Missing project name"))
    }
}

pub(crate) async fn init(
    State(state): State<AppState>,
    Json(body): Json<InitBody>,
) -> ApiResult<Json<SandboxMeta>> {
    let project = body.project()?;
    let meta = state
        .sandbox
        .lock()
        .await
        .init(project, body.api_key.clone(), body.timeout_ms)
        .await
        .map_err(ApiError::from_sandbox)?;
    info!(project = %project, "Sandbox initialised");
    Ok(Json(meta))
}

pub(crate) async fn start(
    State(state): State<AppState>,
    Json(body): Json<InitBody>,
) -> ApiResult<Json<SandboxMeta>> {
    let project = body.project()?;
    let mut sandbox = state.sandbox.lock().await;
    if sandbox.meta().map(|meta| meta.sandbox_id.as_str()) != Some(project) {
        return Err(ApiError::bad_request(
            "Sandbox not initialised for this project",
        ));
    }
    let meta = sandbox.start_dev().await.map_err(ApiError::from_sandbox)?;
    Ok(Json(meta))
}

pub(crate) async fn create(
    State(state): State<AppState>,
    Json(body): Json<InitBody>,
) -> ApiResult<Json<SandboxMeta>> {
    let project = body.project()?;
    let meta = state
        .sandbox
        .lock()
        .await
        .create(project, body.api_key.clone(), body.timeout_ms)
        .await
        .map_err(ApiError::from_sandbox)?;
    Ok(Json(meta))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CodeFile {
    path: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplyCodeBody {
    #[serde(default)]
    files: Vec<CodeFile>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApplyCodeResponse {
    files_created: usize,
    files_updated: usize,
}

/// Write a batch of files into the running sandbox.
pub(crate) async fn apply_code(
    State(state): State<AppState>,
    Json(body): Json<ApplyCodeBody>,
) -> ApiResult<Json<ApplyCodeResponse>> {
    let mut sandbox = state.sandbox.lock().await;
    if !sandbox.is_active() {
        return Err(ApiError::bad_request("No active sandbox. Create first."));
    }

    info!(files = body.files.len(), "Applying code");
    let mut response = ApplyCodeResponse {
        files_created: 0,
        files_updated: 0,
    };
    for file in &body.files {
        if is_excluded(&file.path) {
            debug!(path = %file.path, "Skipping excluded path");
            continue;
        }
        if sandbox.cached(&file.path).is_some() {
            response.files_updated += 1;
        } else {
            response.files_created += 1;
        }
        sandbox
            .write_file_and_cache(&file.path, &file.content)
            .await
            .map_err(ApiError::from_sandbox)?;
    }
    Ok(Json(response))
}

pub(crate) async fn files(State(state): State<AppState>) -> ApiResult<Json<FileCache>> {
    let mut sandbox = state.sandbox.lock().await;
    if !sandbox.is_active() {
        return Err(ApiError::bad_request("No active sandbox"));
    }
    let files = sandbox.read_files().await.map_err(ApiError::from_sandbox)?;
    Ok(Json(files))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ExecBody {
    cmd: Option<String>,
    /// Seconds.
    timeout: Option<u64>,
}

pub(crate) async fn exec(
    State(state): State<AppState>,
    Json(body): Json<ExecBody>,
) -> ApiResult<Json<CommandOutput>> {
    let cmd = body
        .cmd
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing cmd"))?;

    let sandbox = state.sandbox.lock().await;
    if !sandbox.has_sandbox() {
        return Err(ApiError::bad_request("Sandbox not initialised"));
    }

    debug!(cmd = %cmd, "Running sandbox command");
    let output = sandbox
        .run_command(cmd, body.timeout.map(Duration::from_secs))
        .await
        .map_err(ApiError::from_sandbox)?;
    Ok(Json(output))
}

/// Tear down the sandbox if its dev server is running.
pub(crate) async fn kill(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let mut sandbox = state.sandbox.lock().await;
    if sandbox.is_active() {
        sandbox.kill().await.map_err(ApiError::from_sandbox)?;
    }
    Ok(Json(serde_json::json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use crate::testing::{send, TestApp};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_init_requires_project() {
        let app = TestApp::new().await;
        let (status, body) = send(&app.router, "POST", "/api/sandbox/init", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing project name");

        let (status, _) = send(
            &app.router,
            "POST",
            "/api/sandbox/init",
            Some(json!({"project": "../up"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_init_returns_metadata() {
        let app = TestApp::new().await;
        let (status, body) = send(
            &app.router,
            "POST",
            "/api/sandbox/init",
            Some(json!({"project": "demo", "timeoutMs": 1000, "apiKey": "k"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sandboxId"], "demo");
        assert_eq!(body["url"], "http://localhost:5173");
        assert_eq!(body["timeoutMs"], 1000);
        assert!(app.root.path().join("workspaces/demo/package.json").exists());
    }

    #[tokio::test]
    async fn test_start_requires_matching_project() {
        let app = TestApp::new().await;
        send(
            &app.router,
            "POST",
            "/api/sandbox/init",
            Some(json!({"project": "demo"})),
        )
        .await;

        let (status, body) = send(
            &app.router,
            "POST",
            "/api/sandbox/start",
            Some(json!({"project": "other"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Sandbox not initialised for this project");
    }

    #[tokio::test]
    async fn test_inactive_sandbox_rejects_code_and_files() {
        let app = TestApp::new().await;
        let (status, _) = send(
            &app.router,
            "POST",
            "/api/sandbox/apply-code",
            Some(json!({"files": [{"path": "a.txt", "content": "x"}]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app.router, "GET", "/api/sandbox/files", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app.router, "POST", "/api/sandbox/kill", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
    }

    #[tokio::test]
    async fn test_exec_preconditions() {
        let app = TestApp::new().await;
        let (status, body) = send(&app.router, "POST", "/api/sandbox/exec", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing cmd");

        let (status, body) = send(
            &app.router,
            "POST",
            "/api/sandbox/exec",
            Some(json!({"cmd": "ls"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Sandbox not initialised");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exec_runs_in_sandbox() {
        let app = TestApp::new().await;
        send(
            &app.router,
            "POST",
            "/api/sandbox/init",
            Some(json!({"project": "demo"})),
        )
        .await;

        let (status, body) = send(
            &app.router,
            "POST",
            "/api/sandbox/exec",
            Some(json!({"cmd": "cat package.json | grep -c sandbox-app"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stdout"].as_str().unwrap().trim(), "1");
        assert_eq!(body["code"], 0);

        let (_, body) = send(
            &app.router,
            "POST",
            "/api/sandbox/exec",
            Some(json!({"cmd": "exit 1"})),
        )
        .await;
        assert_eq!(body["code"], 1);
        assert_eq!(body["stdout"], "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_create_apply_files_kill() {
        let app = TestApp::new().await;
        let (status, body) = send(
            &app.router,
            "POST",
            "/api/sandbox/create",
            Some(json!({"project": "live"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sandboxId"], "live");

        let (status, body) = send(
            &app.router,
            "POST",
            "/api/sandbox/apply-code",
            Some(json!({"files": [
                {"path": "src/App.jsx", "content": "export default () => null;"},
                {"path": "src/App.jsx", "content": "export default () => 1;"},
                {"path": "node_modules/pkg/index.js", "content": "module.exports = 1;"}
            ]})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"filesCreated": 1, "filesUpdated": 1}));

        let (status, body) = send(&app.router, "GET", "/api/sandbox/files", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["src/App.jsx"]["content"], "export default () => 1;");
        assert!(body.get("node_modules/pkg/index.js").is_none());
        assert!(!app
            .root
            .path()
            .join("workspaces/live/node_modules/pkg/index.js")
            .exists());

        let (status, _) = send(&app.router, "POST", "/api/sandbox/kill", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(!app.root.path().join("workspaces/live").exists());
        assert!(!app.sandbox_active().await);
    }
}
