//! Editor configuration, loadable from TOML.
//!
//! Every section has defaults, so a config file only needs the keys it
//! overrides. `$VAR` references are substituted from the environment before
//! parsing.

use std::{env, fs};

use miette::miette;
use serde::{Deserialize, Serialize};

use crate::attachment::InkColor;

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct UndoConfig {
    /// Oldest steps are dropped past this many.
    pub max_steps: usize,
    /// Typing within this many milliseconds of the previous keystroke joins its undo step.
    pub typing_group_ms: u64,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            max_steps: 100,
            typing_group_ms: 1000,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SaveConfig {
    pub debounce_ms: u64,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self { debounce_ms: 750 }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct DrawingConfig {
    pub min_height: u32,
    pub max_height: u32,
    pub default_height: u32,
    pub default_color: InkColor,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            min_height: 120,
            max_height: 1200,
            default_height: 240,
            default_color: InkColor::Black,
        }
    }
}

impl DrawingConfig {
    pub fn clamp_height(&self, height: u32) -> u32 {
        // a misconfigured range (min > max) resolves to min
        height.min(self.max_height).max(self.min_height)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct CheckboxConfig {
    /// How many chars away from a checkbox a tap still toggles it.
    pub tap_tolerance: usize,
}

impl Default for CheckboxConfig {
    fn default() -> Self {
        Self { tap_tolerance: 1 }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct AutoformatConfig {
    pub bullets: bool,
    pub checkboxes: bool,
    pub code_blocks: bool,
}

impl Default for AutoformatConfig {
    fn default() -> Self {
        Self {
            bullets: true,
            checkboxes: true,
            code_blocks: true,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct EditorConfig {
    pub undo: UndoConfig,
    pub save: SaveConfig,
    pub drawing: DrawingConfig,
    pub checkbox: CheckboxConfig,
    pub autoformat: AutoformatConfig,
}

impl EditorConfig {
    pub fn load(config_file: &str) -> miette::Result<EditorConfig> {
        let config_string = fs::read_to_string(config_file)
            .map_err(|e| miette!("error reading config file {}: {}", config_file, e))?;
        Self::from_toml_str(&config_string)
    }

    pub fn from_toml_str(source: &str) -> miette::Result<EditorConfig> {
        let mut config_string = source.to_string();
        // longest names first so $FOO_BAR is not clobbered by $FOO
        let mut vars: Vec<(String, String)> = env::vars().collect();
        vars.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
        for (k, v) in vars {
            config_string = config_string.replace(&format!("${}", k), &v);
        }

        let config: EditorConfig = toml::from_str(&config_string)
            .map_err(|e| miette!("error parsing config file {}", e))?;
        if config.drawing.min_height > config.drawing.max_height {
            return Err(miette!(
                "drawing.min_height ({}) is greater than drawing.max_height ({})",
                config.drawing.min_height,
                config.drawing.max_height
            ));
        }
        Ok(config)
    }
}
