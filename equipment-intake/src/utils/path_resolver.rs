use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "equipment-intake";

/// Resolve deployment folder (absolute path)
pub fn resolve_deployment_folder() -> Result<PathBuf> {
    // Prefer the folder where the binary is running from (works in dev and deployed)
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(dir) = exe_path.parent() {
            return Ok(dir.to_path_buf());
        }
    }

    // Fallback: current working directory
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    Ok(cwd)
}

/// Resolve log folder (absolute path), creating it when missing.
///
/// Order: `INTAKE_LOG_DIR`, the platform data dir (`<data_local>/equipment-intake/logs`), then
/// `Intake_Log/` next to the binary.
pub fn resolve_log_folder() -> Result<PathBuf> {
    let candidate = match std::env::var_os("INTAKE_LOG_DIR").filter(|v| !v.is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => match dirs::data_local_dir() {
            Some(base) => base.join(APP_DIR).join("logs"),
            None => resolve_deployment_folder()?.join("Intake_Log"),
        },
    };

    ensure_dir(&candidate)?;
    Ok(candidate)
}

/// Resolve the settings file to read, if any.
///
/// An explicit path (from `--config`) wins, then `INTAKE_CONFIG`, then
/// `<config_dir>/equipment-intake/config.toml` when that file exists.
pub fn resolve_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    if let Some(p) = std::env::var_os("INTAKE_CONFIG").filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(p));
    }
    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join("config.toml"))
        .filter(|p| p.is_file())
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log folder: {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_config_path_wins() {
        let p = Path::new("/tmp/intake-explicit.toml");
        assert_eq!(resolve_config_file(Some(p)), Some(p.to_path_buf()));
    }

    #[test]
    fn deployment_folder_is_absolute() {
        let dir = resolve_deployment_folder().expect("deployment folder");
        assert!(dir.is_absolute() || dir == PathBuf::from("."));
    }

    #[test]
    fn ensure_dir_creates_nested_folders() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let nested = tmp.path().join("a").join("b");
        ensure_dir(&nested).expect("create");
        assert!(nested.is_dir());
    }
}
