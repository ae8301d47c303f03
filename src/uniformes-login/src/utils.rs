//! Utility functions for the uniformes-login crate.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::constants::{DATA_DIR_NAME, HOME_ENV_VAR};

/// Mask a bearer token for safe display.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "***".to_string();
    }
    let prefix: String = chars[..6].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}***{suffix}")
}

/// Resolve the data directory: `$UNIFORMES_HOME`, else `~/.uniformes`.
pub fn default_data_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(HOME_ENV_VAR)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::home_dir().map(|home| home.join(DATA_DIR_NAME))
}

/// Set restrictive file permissions (0600 on Unix).
pub(crate) fn set_file_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms)
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }

    #[cfg(not(unix))]
    {
        let _ = path;
    }

    Ok(())
}
