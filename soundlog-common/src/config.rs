//! Configuration loading and root folder resolution
//!
//! Every soundlog process resolves one root folder and finds the event
//! database at `<root>/soundlog.db`.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable consulted when no CLI root folder is given.
pub const ROOT_FOLDER_ENV: &str = "SOUNDLOG_ROOT";

/// Database file name inside the root folder.
pub const DATABASE_FILE_NAME: &str = "soundlog.db";

/// Root folder resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file (`root_folder` key)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>, env_var_name: &str) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(PathBuf::from(path));
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = find_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(root_folder) = config.get("root_folder").and_then(|v| v.as_str()) {
                    return Ok(PathBuf::from(root_folder));
                }
            }
        }
    }

    // Priority 4: OS-dependent compiled default
    Ok(default_root_folder())
}

/// Full path of the event database inside `root`.
pub fn database_path(root: &Path) -> PathBuf {
    root.join(DATABASE_FILE_NAME)
}

/// Locate the platform config file (`soundlog/config.toml`)
fn find_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        // Try ~/.config/soundlog/config.toml first, then /etc/soundlog/config.toml
        if let Some(path) = dirs::config_dir().map(|d| d.join("soundlog").join("config.toml")) {
            if path.exists() {
                return Ok(path);
            }
        }
        let system_config = PathBuf::from("/etc/soundlog/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
        return Err(Error::Config("no config file found".to_string()));
    }

    let path = dirs::config_dir()
        .map(|d| d.join("soundlog").join("config.toml"))
        .ok_or_else(|| Error::Config("could not determine config directory".to_string()))?;

    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!("config file not found: {:?}", path)))
    }
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/soundlog (or /var/lib/soundlog for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("soundlog"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/soundlog"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/soundlog
        dirs::data_dir()
            .map(|d| d.join("soundlog"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/soundlog"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\soundlog
        dirs::data_local_dir()
            .map(|d| d.join("soundlog"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\soundlog"))
    } else {
        PathBuf::from("./soundlog_data")
    }
}
