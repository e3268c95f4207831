//! Export configuration.
//!
//! An [`ExportConfig`] is built once per export call and passed by reference
//! through every stage. Nothing in the pipeline mutates it.

use crate::error::{ExportError, Result};
use crate::options::{CommandOptionSet, OptionPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_MARGIN: &str = "20px";
const DEFAULT_HEADER_HEIGHT: &str = "45px";
const DEFAULT_FOOTER_HEIGHT: &str = "25px";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperFormat {
    #[default]
    A4,
    A3,
    Letter,
}

impl fmt::Display for PaperFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaperFormat::A4 => write!(f, "A4"),
            PaperFormat::A3 => write!(f, "A3"),
            PaperFormat::Letter => write!(f, "Letter"),
        }
    }
}

impl FromStr for PaperFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "A4" => Ok(PaperFormat::A4),
            "A3" => Ok(PaperFormat::A3),
            "Letter" => Ok(PaperFormat::Letter),
            other => Err(ExportError::Config(format!(
                "unknown paper format `{}` (expected A4, A3 or Letter)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Portrait => write!(f, "portrait"),
            Orientation::Landscape => write!(f, "landscape"),
        }
    }
}

impl FromStr for Orientation {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            other => Err(ExportError::Config(format!(
                "unknown orientation `{}` (expected portrait or landscape)",
                other
            ))),
        }
    }
}

/// Page margin, either per side or as a single literal.
///
/// A literal starting with `{` is passed through as an object expression;
/// any other literal is a quoted length such as `1cm`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Margin {
    Sides {
        top: String,
        right: String,
        bottom: String,
        left: String,
    },
    Literal(String),
}

impl Margin {
    pub fn uniform(value: &str) -> Self {
        Margin::Sides {
            top: value.to_string(),
            right: value.to_string(),
            bottom: value.to_string(),
            left: value.to_string(),
        }
    }
}

impl Default for Margin {
    fn default() -> Self {
        Margin::uniform(DEFAULT_MARGIN)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub format: PaperFormat,
    pub orientation: Orientation,
    pub margin: Margin,
}

/// Header or footer band settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandConfig {
    pub height: String,
}

fn default_header() -> BandConfig {
    BandConfig {
        height: DEFAULT_HEADER_HEIGHT.to_string(),
    }
}

fn default_footer() -> BandConfig {
    BandConfig {
        height: DEFAULT_FOOTER_HEIGHT.to_string(),
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Page geometry handed to the layout script generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLayout {
    pub format: PaperFormat,
    pub orientation: Orientation,
    pub margin: Margin,
    pub header_height: String,
    pub footer_height: String,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            format: PaperFormat::default(),
            orientation: Orientation::default(),
            margin: Margin::default(),
            header_height: DEFAULT_HEADER_HEIGHT.to_string(),
            footer_height: DEFAULT_FOOTER_HEIGHT.to_string(),
        }
    }
}

/// Complete configuration for one export call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub page: PageConfig,
    #[serde(default = "default_header")]
    pub header: BandConfig,
    #[serde(default = "default_footer")]
    pub footer: BandConfig,
    /// Renderer command-line options, in the order they are passed.
    #[serde(default)]
    pub renderer: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub option_policy: OptionPolicy,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Where temporary script and body files are created.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    /// Renderer working directory; defaults to the output file's directory.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page: PageConfig::default(),
            header: default_header(),
            footer: default_footer(),
            renderer: serde_json::Map::new(),
            option_policy: OptionPolicy::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temp_dir: None,
            working_dir: None,
        }
    }
}

impl ExportConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ExportError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ExportError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(ExportError::Config("timeout_secs must be positive".into()));
        }
        if self.header.height.trim().is_empty() || self.footer.height.trim().is_empty() {
            return Err(ExportError::Config(
                "header and footer heights must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn page_layout(&self) -> PageLayout {
        PageLayout {
            format: self.page.format,
            orientation: self.page.orientation,
            margin: self.page.margin.clone(),
            header_height: self.header.height.clone(),
            footer_height: self.footer.height.clone(),
        }
    }

    /// Validates the renderer options against the option schema.
    pub fn command_options(&self) -> Result<CommandOptionSet> {
        CommandOptionSet::from_config(&self.renderer, self.option_policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ExportConfig::from_json_str("{}").unwrap();
        assert_eq!(config, ExportConfig::default());

        let layout = config.page_layout();
        assert_eq!(layout.format, PaperFormat::A4);
        assert_eq!(layout.orientation, Orientation::Portrait);
        assert_eq!(layout.margin, Margin::uniform("20px"));
        assert_eq!(layout.header_height, "45px");
        assert_eq!(layout.footer_height, "25px");
        assert_eq!(config.timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_full_config() {
        let config = ExportConfig::from_json_str(
            r#"{
                "page": {"format": "Letter", "orientation": "landscape", "margin": "1cm"},
                "header": {"height": "30px"},
                "renderer": {"load-images": false, "proxy-type": "none"},
                "option_policy": "lenient",
                "timeout_secs": 5
            }"#,
        )
        .unwrap();

        assert_eq!(config.page.format, PaperFormat::Letter);
        assert_eq!(config.page.orientation, Orientation::Landscape);
        assert_eq!(config.page.margin, Margin::Literal("1cm".into()));
        assert_eq!(config.header.height, "30px");
        assert_eq!(config.footer.height, "25px");
        assert_eq!(config.option_policy, OptionPolicy::Lenient);
        assert_eq!(
            config.command_options().unwrap().serialize(),
            vec!["--load-images=false", "--proxy-type=none"]
        );
    }

    #[test]
    fn test_margin_object() {
        let config = ExportConfig::from_json_str(
            r#"{"page": {"margin": {"top": "1cm", "right": "2cm", "bottom": "1cm", "left": "2cm"}}}"#,
        )
        .unwrap();
        assert!(matches!(config.page.margin, Margin::Sides { ref right, .. } if right == "2cm"));
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(ExportConfig::from_json_str(r#"{"page": {"format": "B5"}}"#).is_err());
        assert!("B5".parse::<PaperFormat>().is_err());
        assert_eq!("A3".parse::<PaperFormat>().unwrap(), PaperFormat::A3);
        assert_eq!(
            "landscape".parse::<Orientation>().unwrap(),
            Orientation::Landscape
        );
    }

    #[test]
    fn test_rejects_zero_timeout() {
        assert!(ExportConfig::from_json_str(r#"{"timeout_secs": 0}"#).is_err());
    }
}
