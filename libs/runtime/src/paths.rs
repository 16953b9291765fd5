use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HomeDirError {
    #[error("cannot determine the user home directory ({0} is not set)")]
    MissingEnv(&'static str),

    #[error("failed to create directory '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(target_os = "windows")]
const HOME_ENV: &str = "APPDATA";
#[cfg(not(target_os = "windows"))]
const HOME_ENV: &str = "HOME";

fn platform_home() -> Result<PathBuf, HomeDirError> {
    std::env::var_os(HOME_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or(HomeDirError::MissingEnv(HOME_ENV))
}

/// Expand a leading `~` into the platform home directory.
fn expand_tilde(raw: &str) -> Result<PathBuf, HomeDirError> {
    if raw == "~" {
        return platform_home();
    }
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        return Ok(platform_home()?.join(rest));
    }
    Ok(PathBuf::from(raw))
}

/// Resolve the application home directory.
///
/// - `None` resolves to `<platform home>/<default_subdir>`.
/// - `~` prefixes are expanded, relative paths are anchored at the current dir.
/// - With `create`, the directory is created if missing.
pub fn resolve_home_dir(
    configured: Option<String>,
    default_subdir: &str,
    create: bool,
) -> Result<PathBuf, HomeDirError> {
    let mut path = match configured {
        Some(raw) => expand_tilde(raw.trim())?,
        None => platform_home()?.join(default_subdir),
    };

    if path.is_relative() {
        let cwd = std::env::current_dir().map_err(|source| HomeDirError::Create {
            path: path.clone(),
            source,
        })?;
        path = cwd.join(path);
    }

    if create {
        ensure_dir(&path)?;
    }
    Ok(path)
}

fn ensure_dir(path: &Path) -> Result<(), HomeDirError> {
    std::fs::create_dir_all(path).map_err(|source| HomeDirError::Create {
        path: path.to_path_buf(),
        source,
    })
}
