//! Starter project written into a freshly created sandbox directory.

use serde_json::json;
use std::path::Path;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::SandboxResult;

const INDEX_HTML: &str = "<!DOCTYPE html><html><head><title>Sandbox</title></head><body><div id='root'></div><script type='module' src='/src/main.jsx'></script></body></html>";

const MAIN_JSX: &str = "import React from 'react'; import ReactDOM from 'react-dom/client'; import App from './App';\nReactDOM.createRoot(document.getElementById('root')).render(<App/>);";

const APP_JSX: &str = "export default function App() { return <h1>Hello Sandbox</h1>; }";

/// Write a minimal Vite + React app into `dir`.
pub async fn write_scaffold(dir: &Path) -> SandboxResult<()> {
    let package = json!({
        "name": "sandbox-app",
        "version": "0.1.0",
        "scripts": {"dev": "vite"},
        "dependencies": {"react": "^18.2.0", "react-dom": "^18.2.0"},
        "devDependencies": {"vite": "^5.0.0"}
    });
    let package = serde_json::to_string_pretty(&package)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    fs::write(dir.join("package.json"), package).await?;
    fs::write(dir.join("index.html"), INDEX_HTML).await?;

    let src = dir.join("src");
    fs::create_dir_all(&src).await?;
    fs::write(src.join("main.jsx"), MAIN_JSX).await?;
    fs::write(src.join("App.jsx"), APP_JSX).await?;

    debug!(dir = %dir.display(), "Wrote sandbox scaffold");
    Ok(())
}

/// Create `dir/venv` with `python -m venv venv` if it does not exist.
///
/// Never fails: a missing interpreter or a failed run is only logged.
pub async fn ensure_venv(dir: &Path, python: &str) {
    if fs::try_exists(dir.join("venv")).await.unwrap_or(false) {
        return;
    }

    match Command::new(python)
        .args(["-m", "venv", "venv"])
        .current_dir(dir)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await
    {
        Ok(status) if status.success() => {
            debug!(dir = %dir.display(), "Created Python virtual environment");
        }
        Ok(status) => {
            warn!(dir = %dir.display(), code = ?status.code(), "Creating venv failed");
        }
        Err(e) => {
            warn!(python = %python, error = %e, "Python interpreter not available, skipping venv");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_scaffold() {
        let dir = tempdir().unwrap();
        write_scaffold(dir.path()).await.unwrap();

        let package: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("package.json")).unwrap())
                .unwrap();
        assert_eq!(package["name"], "sandbox-app");
        assert_eq!(package["scripts"]["dev"], "vite");
        assert_eq!(package["devDependencies"]["vite"], "^5.0.0");

        let index = std::fs::read_to_string(dir.path().join("index.html")).unwrap();
        assert!(index.contains("id='root'"));
        assert!(index.contains("/src/main.jsx"));

        let app = std::fs::read_to_string(dir.path().join("src/App.jsx")).unwrap();
        assert!(app.contains("Hello Sandbox"));
    }

    #[tokio::test]
    async fn test_ensure_venv_tolerates_missing_python() {
        let dir = tempdir().unwrap();
        ensure_venv(dir.path(), "definitely-not-a-python-binary").await;
        assert!(!dir.path().join("venv").exists());
    }
}
