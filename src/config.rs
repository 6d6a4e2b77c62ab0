use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "marginalia";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Characters of surrounding text captured with each selection.
    #[serde(default = "default_context_chars")]
    pub context_chars: usize,

    /// Delay between document load and the restore pass.
    #[serde(default = "default_restore_delay_ms")]
    pub restore_delay_ms: u64,

    /// How long a jumped-to marker keeps the flash color.
    #[serde(default = "default_flash_duration_ms")]
    pub flash_duration_ms: u64,

    #[serde(default = "default_highlight_color")]
    pub highlight_color: String,

    #[serde(default = "default_mark_color")]
    pub mark_color: String,

    #[serde(default = "default_note_color")]
    pub note_color: String,

    /// Author recorded on new comments.
    #[serde(default)]
    pub author: String,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_context_chars() -> usize {
    20
}

fn default_restore_delay_ms() -> u64 {
    400
}

fn default_flash_duration_ms() -> u64 {
    600
}

fn default_highlight_color() -> String {
    "#FFFF00".to_string()
}

fn default_mark_color() -> String {
    "#FF4444".to_string()
}

fn default_note_color() -> String {
    "#FFE066".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            context_chars: default_context_chars(),
            restore_delay_ms: default_restore_delay_ms(),
            flash_duration_ms: default_flash_duration_ms(),
            highlight_color: default_highlight_color(),
            mark_color: default_mark_color(),
            note_color: default_note_color(),
            author: String::new(),
        }
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Load settings from the platform config dir, creating the file with
/// defaults on first run. Unreadable or unparsable files fall back to
/// defaults without failing startup.
pub fn load_settings() {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };

    if path.exists() {
        load_settings_from_path(&path);
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        if let Err(e) = save_settings() {
            warn!("Failed to write default settings: {e}");
        }
    }
}

fn load_settings_from_path(path: &Path) {
    let parsed = fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|content| serde_yaml::from_str::<Settings>(&content).map_err(Into::into));

    match parsed {
        Ok(settings) => {
            if let Ok(mut guard) = SETTINGS.write() {
                *guard = settings;
            }
        }
        Err(e) => warn!("Failed to load settings from {path:?}, using defaults: {e}"),
    }
}

pub fn save_settings() -> anyhow::Result<()> {
    let Some(path) = preferred_config_path() else {
        anyhow::bail!("could not determine config directory");
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let settings = get();
    let yaml = serde_yaml::to_string(&settings)?;
    fs::write(&path, yaml)?;
    Ok(())
}

pub fn get() -> Settings {
    SETTINGS
        .read()
        .map(|guard| guard.clone())
        .unwrap_or_default()
}

pub fn update(apply: impl FnOnce(&mut Settings)) {
    if let Ok(mut guard) = SETTINGS.write() {
        apply(&mut guard);
    }
}
