use crate::model::{Language, PlayerContext};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    env, fs, io,
    path::{Path, PathBuf},
};
use tracing::warn;

pub(crate) const DATA_DIR_ENV: &str = "NERO_DATA_DIR";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub(crate) struct Settings {
    pub(crate) language: Language,
    pub(crate) fps_cap: u32,
    pub(crate) enable_color: bool,
    pub(crate) enable_glitch: bool,
    pub(crate) seed: u64,
    pub(crate) nickname: String,
    pub(crate) hobby: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: Language::En,
            fps_cap: 30,
            enable_color: true,
            enable_glitch: true,
            seed: 0xC0FFEE_u64,
            nickname: String::new(),
            hobby: String::new(),
        }
    }
}

impl Settings {
    pub(crate) fn player(&self) -> Option<PlayerContext> {
        if self.nickname.trim().is_empty() {
            return None;
        }
        Some(PlayerContext {
            nickname: self.nickname.trim().to_string(),
            hobby: self.hobby.trim().to_string(),
        })
    }
}

pub(crate) struct Paths {
    pub(crate) store_dir: PathBuf,
    pub(crate) settings_path: PathBuf,
    pub(crate) log_path: PathBuf,
}

impl Paths {
    pub(crate) fn under(dir: &Path) -> Self {
        Self {
            store_dir: dir.join("store"),
            settings_path: dir.join("settings.json"),
            log_path: dir.join("nero.log"),
        }
    }
}

/// Resolves the data directory: explicit override, then `NERO_DATA_DIR`, then the
/// platform's per-user data dir.
pub(crate) fn project_paths(override_dir: Option<&Path>) -> Result<Paths> {
    let dir = match override_dir {
        Some(d) => d.to_path_buf(),
        None => match env::var_os(DATA_DIR_ENV) {
            Some(d) if !d.is_empty() => PathBuf::from(d),
            _ => ProjectDirs::from("com", "nero", "Nero")
                .context("could not resolve project directories")?
                .data_local_dir()
                .to_path_buf(),
        },
    };
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    Ok(Paths::under(&dir))
}

pub(crate) fn load_settings(path: &Path) -> Settings {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Settings::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read settings");
            return Settings::default();
        }
    };
    match serde_json::from_str::<Settings>(&raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed settings");
            Settings::default()
        }
    }
}

pub(crate) fn save_settings_atomic(path: &Path, s: &Settings) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(s)?;
    fs::write(&tmp, data).with_context(|| format!("writing {}", tmp.display()))?;
    atomic_rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

pub(crate) fn atomic_rename(from: &Path, to: &Path) -> io::Result<()> {
    // rename(2) replaces the target on Unix; Windows needs the old file gone first.
    if cfg!(windows) && to.exists() {
        let _ = fs::remove_file(to);
    }
    fs::rename(from, to)
}
