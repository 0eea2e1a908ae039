//! Construction options and their validation.

use crate::sizing::Dimension;

/// Frame rate used when none is configured.
pub const DEFAULT_FRAME_RATE: f64 = 60.0;

/// Highest accepted frame rate; one frame per millisecond.
pub const MAX_FRAME_RATE: f64 = 1000.0;

/// Error raised while building a loop from configuration.
///
/// Configuration errors are the only errors surfaced to the caller; runtime
/// dispatch problems are contained inside the loop.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Frame rate is zero or negative.
    #[error("frame rate must be positive, got {0}")]
    NonPositiveFrameRate(f64),
    /// Frame interval would be shorter than the loop can time.
    #[error("frame rate must be at most {max}, got {fps}")]
    FrameRateTooHigh { fps: f64, max: f64 },
    /// Frame rate is NaN or infinite.
    #[error("frame rate must be a finite number, got {0}")]
    NonFiniteFrameRate(f64),
    /// A width or height value could not be understood.
    #[error("invalid dimension '{value}': {reason}")]
    InvalidDimension { value: String, reason: &'static str },
    /// The TOML document could not be parsed.
    #[cfg(feature = "toml")]
    #[error("invalid config TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Check that `fps` is usable as a target frame rate.
pub fn validate_frame_rate(fps: f64) -> Result<f64, ConfigError> {
    if !fps.is_finite() {
        return Err(ConfigError::NonFiniteFrameRate(fps));
    }
    if fps <= 0.0 {
        return Err(ConfigError::NonPositiveFrameRate(fps));
    }
    if fps > MAX_FRAME_RATE {
        return Err(ConfigError::FrameRateTooHigh {
            fps,
            max: MAX_FRAME_RATE,
        });
    }
    Ok(fps)
}

/// Options accepted when constructing a [`Rune`](crate::Rune).
///
/// Every field is optional. Only `frame_rate` reaches the scheduler; `width`,
/// `height` and `container` are handed to a
/// [`DimensionResolver`](crate::DimensionResolver).
///
/// ## Example
///
/// ```rust
/// use rune_loop::{Dimension, RuneConfig};
///
/// let config = RuneConfig::new()
///     .frame_rate(30.0)
///     .width(Dimension::Percent(100.0))
///     .height(Dimension::Pixels(200))
///     .container(".stage");
///
/// assert_eq!(config.frame_rate_or_default().unwrap(), 30.0);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct RuneConfig {
    pub frame_rate: Option<f64>,
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub container: Option<String>,
}

impl RuneConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target frame rate in frames per second.
    pub fn frame_rate(mut self, fps: f64) -> Self {
        self.frame_rate = Some(fps);
        self
    }

    pub fn width(mut self, width: Dimension) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: Dimension) -> Self {
        self.height = Some(height);
        self
    }

    /// Selector of the element the surface is sized against.
    pub fn container(mut self, selector: impl Into<String>) -> Self {
        self.container = Some(selector.into());
        self
    }

    /// The validated frame rate, or [`DEFAULT_FRAME_RATE`] when unset.
    pub fn frame_rate_or_default(&self) -> Result<f64, ConfigError> {
        validate_frame_rate(self.frame_rate.unwrap_or(DEFAULT_FRAME_RATE))
    }

    /// Validate every field without building anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.frame_rate_or_default()?;
        for dim in [self.width, self.height].into_iter().flatten() {
            dim.validate()?;
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    ///
    /// Keys use the same camelCase names as the JSON-style options, e.g.
    /// `frameRate = 30` and `width = "100%"`.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
