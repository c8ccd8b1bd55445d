use std::fs;

use serde::Deserialize;

use crate::{
    decorate::{
        range::{DEFAULT_ICON_WIDTH, DEFAULT_PROPAGATE_UP_LEVELS},
        viewer_link::DEFAULT_VIEWER_URL,
    },
    file_format::key_path::KeyPath,
    instrument::{ncnr_refl::INSTRUMENT_ID, NcnrReflOptions},
};

/// Browser settings, read from TOML.  Everything is optional:
///
/// ```toml
/// server = "https://example.org/webreduce/"
/// instrument = "ncnr.refl"
/// viewer_url = "http://ncnr.nist.gov/ipeek/nexus-zip-viewer.html"
///
/// [range]
/// axis = "x"
/// propagate_up_levels = 2
/// icon_width = 75.0
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrowserConfig {
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default = "default_instrument")]
    pub instrument: String,
    #[serde(default = "default_viewer_url")]
    pub viewer_url: String,
    #[serde(default)]
    pub range: RangeConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeConfig {
    /// `/`-delimited key path of the entry field holding axis values.
    #[serde(default = "default_axis")]
    pub axis: String,
    #[serde(default = "default_propagate_up_levels")]
    pub propagate_up_levels: usize,
    #[serde(default = "default_icon_width")]
    pub icon_width: f64,
}

fn default_instrument() -> String {
    INSTRUMENT_ID.to_string()
}

fn default_viewer_url() -> String {
    DEFAULT_VIEWER_URL.to_string()
}

fn default_axis() -> String {
    "x".to_string()
}

fn default_propagate_up_levels() -> usize {
    DEFAULT_PROPAGATE_UP_LEVELS
}

fn default_icon_width() -> f64 {
    DEFAULT_ICON_WIDTH
}

impl Default for RangeConfig {
    fn default() -> Self {
        RangeConfig {
            axis: default_axis(),
            propagate_up_levels: default_propagate_up_levels(),
            icon_width: default_icon_width(),
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            server: None,
            instrument: default_instrument(),
            viewer_url: default_viewer_url(),
            range: RangeConfig::default(),
        }
    }
}

impl BrowserConfig {
    pub fn new(config_str: &str) -> Result<Self, String> {
        let config: BrowserConfig = toml::from_str(config_str).map_err(|err| err.to_string())?;
        if config.range.icon_width <= 0.0 {
            return Err(format!(
                "range.icon_width must be positive, not {}",
                config.range.icon_width
            ));
        }
        // Surface a bad axis now rather than on first browse.
        config.refl_options()?;
        Ok(config)
    }

    pub fn load(path: &str) -> Result<Self, String> {
        let config_str =
            fs::read_to_string(path).map_err(|err| format!("{}: {}", path, err))?;
        BrowserConfig::new(&config_str)
    }

    /// Decorator settings for the reflectometry instrument.
    pub fn refl_options(&self) -> Result<NcnrReflOptions, String> {
        let axis = KeyPath::parse(&self.range.axis).map_err(|err| err.to_string())?;
        Ok(NcnrReflOptions {
            axis,
            propagate_up_levels: self.range.propagate_up_levels,
            icon_width: self.range.icon_width,
            viewer_url: self.viewer_url.clone(),
        })
    }
}
