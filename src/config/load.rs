use std::env;
use std::path::{Path, PathBuf};

use ::config::{Config, ConfigError, Environment, File};

use super::schema::Settings;

/// Directory name used under the XDG config and data homes.
const APP_DIR: &str = "encore";
/// Overrides are read from `ENCORE__<SECTION>__<KEY>`.
const ENV_PREFIX: &str = "ENCORE";
const CONFIG_PATH_VAR: &str = "ENCORE_CONFIG_PATH";

impl Settings {
    /// Layer the config file (if any) under environment overrides, on top
    /// of the struct defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(resolve_config_path().as_deref())
    }

    /// Like [`Settings::load`] with an explicit file. A missing file is not
    /// an error.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(p) = path {
            builder = builder.add_source(File::from(p).required(false));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Every problem found, joined into one message.
    pub fn validate(&self) -> Result<(), String> {
        let mut problems = Vec::new();
        if self.engine.tick_ms == 0 {
            problems.push("engine.tick_ms must be >= 1");
        }
        if self.controller.progress_interval_ms == 0 {
            problems.push("controller.progress_interval_ms must be >= 1");
        }
        let named = self
            .library
            .extensions
            .iter()
            .any(|e| !e.trim().trim_start_matches('.').is_empty());
        if !named {
            problems.push("library.extensions must name at least one extension");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }
}

pub fn resolve_config_path() -> Option<PathBuf> {
    env::var_os(CONFIG_PATH_VAR)
        .map(PathBuf::from)
        .or_else(default_config_path)
}

/// `$XDG_CONFIG_HOME/encore/config.toml`, else `~/.config/encore/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    app_dir("XDG_CONFIG_HOME", &[".config"]).map(|d| d.join("config.toml"))
}

/// `$<xdg_var>/encore`, falling back to `$HOME/<home_rel...>/encore`.
pub(super) fn app_dir(xdg_var: &str, home_rel: &[&str]) -> Option<PathBuf> {
    let base = match env::var_os(xdg_var) {
        Some(xdg) => PathBuf::from(xdg),
        None => home_rel
            .iter()
            .fold(PathBuf::from(env::var_os("HOME")?), |p, part| p.join(part)),
    };
    Some(base.join(APP_DIR))
}
