//! Application configuration.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SlidecastError;
use crate::time::{to_ticks, Tick};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default layout and credit settings.
    pub render: RenderDefaults,

    /// External tools invoked during conversion.
    pub tools: ExternalTools,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default render parameters, overridable per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// Output canvas width in pixels.
    pub width: u32,

    /// Output canvas height in pixels.
    pub height: u32,

    /// Margin around and between content boxes, in pixels.
    pub margin: u32,

    /// Width reserved for the webcam.
    pub webcam_width: WebcamWidth,

    /// How long a still-image credit is shown when no duration is given (seconds).
    pub still_credit_secs: u64,
}

/// External command-line tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalTools {
    /// SVG rasterizer, invoked as `<cmd> -w W -h H -o OUT IN.svg`.
    pub rasterizer: String,

    /// Media probe, invoked as `<cmd> -of json ... FILE`.
    pub probe: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "slidecast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            margin: 0,
            webcam_width: WebcamWidth::Percent(25),
            still_credit_secs: 3,
        }
    }
}

impl RenderDefaults {
    /// Still-credit duration as ticks.
    pub fn still_credit_duration(&self) -> Result<Tick, SlidecastError> {
        Tick::checked_from_secs(self.still_credit_secs).ok_or_else(|| {
            SlidecastError::config(format!(
                "still_credit_secs {} is out of range",
                self.still_credit_secs
            ))
        })
    }
}

impl Default for ExternalTools {
    fn default() -> Self {
        Self {
            rasterizer: "rsvg-convert".to_string(),
            probe: "ffprobe".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("slidecast").join("config.json")
}

/// Width of the webcam column, absolute or relative to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebcamWidth {
    /// Percentage of the canvas content width, `0..100`.
    Percent(u32),
    /// Fixed width in pixels.
    Pixels(u32),
}

impl WebcamWidth {
    /// Resolve to pixels against the available content width.
    pub fn resolve(self, content_width: u32) -> u32 {
        match self {
            Self::Percent(p) => ((content_width as u64 * p as u64 + 50) / 100) as u32,
            Self::Pixels(px) => px,
        }
    }
}

/// Per-run layout parameters consumed by the timeline assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub webcam_width: WebcamWidth,

    /// Stretch the webcam source to 16:9 before fitting.
    #[serde(default)]
    pub stretch_webcam: bool,
}

impl LayoutConfig {
    pub fn from_defaults(defaults: &RenderDefaults) -> Self {
        Self {
            width: defaults.width,
            height: defaults.height,
            margin: defaults.margin,
            webcam_width: defaults.webcam_width,
            stretch_webcam: false,
        }
    }

    /// Canvas width minus the outer margins.
    pub fn content_width(&self) -> u32 {
        self.width.saturating_sub(self.margin.saturating_mul(2))
    }

    /// Canvas height minus the outer margins.
    pub fn content_height(&self) -> u32 {
        self.height.saturating_sub(self.margin.saturating_mul(2))
    }

    /// Reject layouts that would produce an empty fit box.
    pub fn validate(&self) -> Result<(), SlidecastError> {
        if self.width == 0 || self.height == 0 {
            return Err(SlidecastError::config(format!(
                "canvas must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.content_width() == 0 || self.content_height() == 0 {
            return Err(SlidecastError::config(format!(
                "margin {} leaves no room on a {}x{} canvas",
                self.margin, self.width, self.height
            )));
        }
        if let WebcamWidth::Percent(p) = self.webcam_width {
            if p >= 100 {
                return Err(SlidecastError::config(format!(
                    "webcam size must be below 100%, got {p}%"
                )));
            }
        }
        let cam = self.webcam_width.resolve(self.content_width());
        if cam.saturating_add(self.margin) >= self.content_width() {
            return Err(SlidecastError::config(format!(
                "webcam width {cam}px leaves no room for slides"
            )));
        }
        Ok(())
    }
}

/// An opening or closing credit: `FILE[:DURATION]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditSpec {
    pub path: PathBuf,

    /// Explicit duration; otherwise derived from the asset.
    pub duration: Option<Tick>,
}

impl FromStr for CreditSpec {
    type Err = SlidecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(SlidecastError::config("empty credit file reference"));
        }
        match s.rsplit_once(':') {
            Some((path, duration)) if !path.is_empty() => Ok(Self {
                path: PathBuf::from(path),
                duration: Some(to_ticks(duration)?),
            }),
            _ => Ok(Self {
                path: PathBuf::from(s),
                duration: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_valid() {
        let layout = LayoutConfig::from_defaults(&RenderDefaults::default());
        assert!(layout.validate().is_ok());
        assert_eq!(layout.webcam_width.resolve(layout.content_width()), 480);
    }

    #[test]
    fn test_layout_rejects_oversized_margin() {
        let layout = LayoutConfig {
            margin: 600,
            ..LayoutConfig::from_defaults(&RenderDefaults::default())
        };
        assert!(matches!(layout.validate(), Err(SlidecastError::Config { .. })));
    }

    #[test]
    fn test_layout_rejects_full_width_webcam() {
        let layout = LayoutConfig {
            webcam_width: WebcamWidth::Pixels(1920),
            ..LayoutConfig::from_defaults(&RenderDefaults::default())
        };
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_layout_rejects_extreme_values_without_panicking() {
        let base = LayoutConfig::from_defaults(&RenderDefaults::default());
        let huge_margin = LayoutConfig {
            margin: u32::MAX,
            ..base.clone()
        };
        assert_eq!(huge_margin.content_width(), 0);
        assert!(huge_margin.validate().is_err());

        let huge_cam = LayoutConfig {
            webcam_width: WebcamWidth::Pixels(u32::MAX),
            margin: 10,
            ..base.clone()
        };
        assert!(huge_cam.validate().is_err());

        let huge_percent = LayoutConfig {
            webcam_width: WebcamWidth::Percent(u32::MAX),
            ..base
        };
        assert!(huge_percent.validate().is_err());
    }

    #[test]
    fn test_still_credit_duration_range() {
        let defaults = RenderDefaults::default();
        assert_eq!(
            defaults.still_credit_duration().unwrap(),
            Tick::from_secs(3)
        );

        let absurd = RenderDefaults {
            still_credit_secs: u64::MAX,
            ..RenderDefaults::default()
        };
        assert!(matches!(
            absurd.still_credit_duration(),
            Err(SlidecastError::Config { .. })
        ));
    }

    #[test]
    fn test_credit_spec_with_duration() {
        let spec: CreditSpec = "intro.png:4.5".parse().unwrap();
        assert_eq!(spec.path, PathBuf::from("intro.png"));
        assert_eq!(spec.duration, Some(Tick(4_500_000_000)));
    }

    #[test]
    fn test_credit_spec_splits_on_last_colon() {
        let spec: CreditSpec = "dir:with:colons/outro.webm:2".parse().unwrap();
        assert_eq!(spec.path, PathBuf::from("dir:with:colons/outro.webm"));
        assert_eq!(spec.duration, Some(Tick::from_secs(2)));
    }

    #[test]
    fn test_credit_spec_without_duration() {
        let spec: CreditSpec = "outro.webm".parse().unwrap();
        assert_eq!(spec.duration, None);
    }

    #[test]
    fn test_credit_spec_rejects_bad_duration() {
        assert!(matches!(
            "intro.png:soon".parse::<CreditSpec>(),
            Err(SlidecastError::Parse { .. })
        ));
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let json = serde_json::to_string(&AppConfig::default()).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.render.width, 1920);
        assert_eq!(parsed.tools.rasterizer, "rsvg-convert");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: AppConfig = serde_json::from_str(r#"{"render":{"margin":16}}"#).unwrap();
        assert_eq!(parsed.render.margin, 16);
        assert_eq!(parsed.render.height, 1080);
        assert_eq!(parsed.logging.level, "info");
    }
}
