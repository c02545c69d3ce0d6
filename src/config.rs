use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, io::Write, path::PathBuf};

use crate::manifest::DEFAULT_LOGO_ATTRIBUTE;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub hotkey: KeyChord,
    pub menu: MenuOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyChord {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub key: String,
}

impl Default for KeyChord {
    fn default() -> Self {
        Self {
            ctrl: true,
            alt: true,
            shift: false,
            key: "T".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuOptions {
    pub show_icons: bool,
    /// Manifest attribute naming the logo used for packaged apps.
    pub logo_attribute: String,
    pub max_label_chars: usize,
}

impl Default for MenuOptions {
    fn default() -> Self {
        Self {
            show_icons: true,
            logo_attribute: DEFAULT_LOGO_ATTRIBUTE.into(),
            max_label_chars: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Paths {
    pub cfg_file: PathBuf,
    pub cfg_dir: PathBuf,
    pub log_dir: PathBuf,
}

pub fn project_paths() -> Result<Paths> {
    let dirs = ProjectDirs::from("com", "TopMost", "TopMost")
        .context("Failed to determine project directories")?;
    let cfg_dir = dirs.config_dir().to_path_buf();
    let cfg_file = cfg_dir.join("settings.json");
    let log_dir = dirs.data_local_dir().join("logs");
    Ok(Paths {
        cfg_file,
        cfg_dir,
        log_dir,
    })
}

pub fn load_or_default() -> Result<(Config, Paths)> {
    let paths = project_paths()?;
    fs::create_dir_all(&paths.cfg_dir).ok();
    fs::create_dir_all(&paths.log_dir).ok();
    let cfg = load_from(&paths);
    Ok((cfg, paths))
}

/// Reads the config file; a missing or unparsable file yields defaults.
pub fn load_from(paths: &Paths) -> Config {
    match fs::read_to_string(&paths.cfg_file) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
            tracing::warn!(error=%e, file=?paths.cfg_file, "invalid config, using defaults");
            Config::default()
        }),
        Err(_) => Config::default(),
    }
}

pub fn save_atomic(cfg: &Config, paths: &Paths) -> Result<()> {
    fs::create_dir_all(&paths.cfg_dir).ok();
    let tmp = paths.cfg_file.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(cfg)?;
    {
        let mut f = fs::File::create(&tmp).context("create temp cfg")?;
        f.write_all(&data).context("write temp cfg")?;
        f.sync_all().ok();
    }
    fs::rename(&tmp, &paths.cfg_file).context("rename temp to final")?;
    Ok(())
}
