use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        fn state_home() -> Result<PathBuf> {
            env::var("APPDATA")
                .map(PathBuf::from)
                .map_err(|_| anyhow!("APPDATA should be present on Windows"))
        }
    } else {
        fn state_home() -> Result<PathBuf> {
            env::var("XDG_STATE_HOME")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .or_else(|| dirs::home_dir().map(|home| home.join(".local/state")))
                .ok_or_else(|| anyhow!("Couldn't find neither XDG_STATE_HOME nor a home directory"))
        }
    }
}

/// Directory for application state that isn't the tracked data itself, currently only logs.
pub fn create_application_default_path() -> Result<PathBuf> {
    let mut path = state_home()?;
    path.push("trckr");

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}
