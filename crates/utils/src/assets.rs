use std::path::PathBuf;

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");

fn expand_tilde(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

fn ensure_dir(path: PathBuf) -> PathBuf {
    if !path.exists() {
        if let Err(e) = std::fs::create_dir_all(&path) {
            tracing::warn!(path = ?path, error = %e, "Failed to create directory");
        }
    }
    path
}

pub fn asset_dir() -> PathBuf {
    let path = if cfg!(debug_assertions) {
        PathBuf::from(PROJECT_ROOT).join("../../dev_assets")
    } else {
        match ProjectDirs::from("dev", "failure-excerpt", "failure-excerpt") {
            Some(dirs) => dirs.data_dir().to_path_buf(),
            None => std::env::temp_dir().join("failure-excerpt"),
        }
    };

    ensure_dir(path)
    // ✔ macOS → ~/Library/Application Support/failure-excerpt
    // ✔ Linux → ~/.local/share/failure-excerpt   (respects XDG_DATA_HOME)
    // ✔ Windows → %APPDATA%\failure-excerpt
}

/// Get the configuration directory path.
///
/// Respects the `FX_CONFIG_DIR` environment variable for custom locations.
/// Supports tilde expansion (e.g., `~/failure-excerpt/config`).
///
/// Default: `{asset_dir}`
pub fn config_dir() -> PathBuf {
    if let Ok(path) = std::env::var("FX_CONFIG_DIR") {
        return ensure_dir(expand_tilde(&path));
    }
    asset_dir()
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Get the database file path.
///
/// Respects the `FX_DATABASE_PATH` environment variable for custom locations.
///
/// Default: `{asset_dir}/db.sqlite`
pub fn database_path() -> PathBuf {
    if let Ok(path) = std::env::var("FX_DATABASE_PATH") {
        return expand_tilde(&path);
    }
    asset_dir().join("db.sqlite")
}

/// Default: `{asset_dir}/logs`
pub fn log_dir() -> PathBuf {
    if let Ok(path) = std::env::var("FX_LOG_DIR") {
        return expand_tilde(&path);
    }
    asset_dir().join("logs")
}
