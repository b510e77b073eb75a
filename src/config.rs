//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/doctree/doctree.toml`
//! 3. Local config: `<dir>/.doctree.toml`
//! 4. Environment variables: `DOCTREE_*` prefix (`__` separates sections)

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{RenderOptions, UserId};

/// How trees are printed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Append node ids to labels
    pub show_ids: bool,
    /// Append sibling order to labels
    pub show_order: bool,
}

/// Raw display config; `None` means "not specified, inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawDisplayConfig {
    pub show_ids: Option<bool>,
    pub show_order: Option<bool>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub layout: Option<PathBuf>,
    pub owner: Option<String>,
    pub display: RawDisplayConfig,
}

/// Unified configuration for doctree.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Layout file used when none is given on the command line
    pub layout: Option<PathBuf>,
    /// UUID of the user creating nodes; random per run when unset
    pub owner: Option<String>,
    pub display: DisplayConfig,
}

/// Get the XDG config directory for doctree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "doctree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("doctree.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".doctree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables leave the input as is.
fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            layout: overlay.layout.clone().or_else(|| self.layout.clone()),
            owner: overlay.owner.clone().or_else(|| self.owner.clone()),
            display: DisplayConfig {
                show_ids: overlay.display.show_ids.unwrap_or(self.display.show_ids),
                show_order: overlay
                    .display
                    .show_order
                    .unwrap_or(self.display.show_order),
            },
        }
    }

    fn expand_paths(&mut self) {
        if let Some(layout) = &self.layout {
            let expanded = expand_env_vars(layout.to_string_lossy().as_ref());
            self.layout = Some(PathBuf::from(expanded));
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.doctree.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply DOCTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("DOCTREE")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("layout") {
            settings.layout = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("owner") {
            settings.owner = Some(val);
        }
        if let Ok(val) = config.get_bool("display.show_ids") {
            settings.display.show_ids = val;
        }
        if let Ok(val) = config.get_bool("display.show_order") {
            settings.display.show_order = val;
        }

        Ok(settings)
    }

    /// Parsed owner id, `None` when unset.
    pub fn owner_id(&self) -> Result<Option<UserId>, ApplicationError> {
        self.owner
            .as_deref()
            .map(|raw| raw.parse::<UserId>())
            .transpose()
            .map_err(|e| ApplicationError::Config {
                message: format!("owner: {}", e),
            })
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            show_ids: self.display.show_ids,
            show_order: self.display.show_order,
        }
    }

    /// Render as TOML for display.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize settings: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_overlay_with_partial_display_when_merged_then_unset_fields_inherited() {
        let base = Settings {
            layout: Some(PathBuf::from("base.toml")),
            owner: None,
            display: DisplayConfig {
                show_ids: true,
                show_order: true,
            },
        };
        let overlay = RawSettings {
            layout: None,
            owner: Some("x".into()),
            display: RawDisplayConfig {
                show_ids: Some(false),
                show_order: None,
            },
        };

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.layout, Some(PathBuf::from("base.toml")));
        assert_eq!(merged.owner.as_deref(), Some("x"));
        assert!(!merged.display.show_ids);
        assert!(merged.display.show_order);
    }

    #[test]
    fn given_invalid_owner_when_parsed_then_config_error() {
        let settings = Settings {
            owner: Some("nope".into()),
            ..Settings::default()
        };
        assert!(matches!(
            settings.owner_id(),
            Err(ApplicationError::Config { .. })
        ));
    }
}
