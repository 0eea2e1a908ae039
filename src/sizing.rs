//! Surface sizing from configuration, percentages, or a container element.

use std::fmt;
use std::str::FromStr;

use crate::config::{ConfigError, RuneConfig};

/// Width used when nothing better is known.
pub const DEFAULT_WIDTH: u32 = 640;
/// Height used when nothing better is known.
pub const DEFAULT_HEIGHT: u32 = 480;

/// A configured width or height.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawDimension", into = "RawDimension")
)]
pub enum Dimension {
    /// Absolute size in pixels.
    Pixels(u32),
    /// Percentage of the container's size, e.g. `100.0` for `"100%"`.
    Percent(f64),
}

impl Dimension {
    /// Check that the value describes a positive size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Dimension::Pixels(0) => Err(invalid(self.to_string(), "size must be positive")),
            Dimension::Percent(p) if !p.is_finite() || p <= 0.0 => {
                Err(invalid(self.to_string(), "percentage must be positive"))
            }
            _ => Ok(()),
        }
    }

    /// Build a pixel dimension from a plain number.
    pub fn from_number(value: f64) -> Result<Self, ConfigError> {
        if !value.is_finite() || value < 1.0 || value > u32::MAX as f64 {
            return Err(invalid(value.to_string(), "size must be a positive number"));
        }
        Ok(Dimension::Pixels(value.round() as u32))
    }

    /// Resolve against a container length in pixels.
    ///
    /// Returns `None` for a percentage when there is no container to measure.
    pub fn resolve(&self, container_len: Option<u32>) -> Option<u32> {
        match *self {
            Dimension::Pixels(px) => Some(px),
            Dimension::Percent(p) => {
                container_len.map(|len| ((len as f64 * p / 100.0).round() as u32).max(1))
            }
        }
    }
}

fn invalid(value: String, reason: &'static str) -> ConfigError {
    ConfigError::InvalidDimension { value, reason }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Pixels(px) => write!(f, "{}px", px),
            Dimension::Percent(p) => write!(f, "{}%", p),
        }
    }
}

/// Parses `"640"`, `"640px"` and `"100%"`.
impl FromStr for Dimension {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(pct) = trimmed.strip_suffix('%') {
            let value: f64 = pct
                .trim()
                .parse()
                .map_err(|_| invalid(s.to_string(), "expected a number before '%'"))?;
            let dim = Dimension::Percent(value);
            dim.validate()?;
            return Ok(dim);
        }

        let digits = trimmed.strip_suffix("px").unwrap_or(trimmed).trim();
        let value: f64 = digits
            .parse()
            .map_err(|_| invalid(s.to_string(), "expected pixels or a percentage"))?;
        Dimension::from_number(value)
    }
}

/// Wire form of [`Dimension`]: a bare number or a string.
#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum RawDimension {
    Number(f64),
    Text(String),
}

#[cfg(feature = "serde")]
impl TryFrom<RawDimension> for Dimension {
    type Error = ConfigError;

    fn try_from(raw: RawDimension) -> Result<Self, Self::Error> {
        match raw {
            RawDimension::Number(n) => Dimension::from_number(n),
            RawDimension::Text(s) => s.parse(),
        }
    }
}

#[cfg(feature = "serde")]
impl From<Dimension> for RawDimension {
    fn from(dim: Dimension) -> Self {
        match dim {
            Dimension::Pixels(px) => RawDimension::Number(px as f64),
            Dimension::Percent(_) => RawDimension::Text(dim.to_string()),
        }
    }
}

/// Resolved drawing surface size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceDimensions {
    pub width: u32,
    pub height: u32,
}

impl SurfaceDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width divided by height.
    #[inline]
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl Default for SurfaceDimensions {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

/// Turns sizing options into concrete surface dimensions.
///
/// Implementations differ only in how they find and measure the container;
/// [`resolve_with_container`] holds the shared rules.
pub trait DimensionResolver {
    fn resolve(&self, config: &RuneConfig) -> SurfaceDimensions;
}

/// Apply the sizing rules given the measured container size, if any.
///
/// - explicit pixels are used as-is
/// - percentages scale the container's size
/// - anything unresolved (no value, or a percentage without a measurable
///   container) falls back to 640 × 480
///
/// ## Example
///
/// ```rust
/// use rune_loop::{Dimension, RuneConfig, SurfaceDimensions};
/// use rune_loop::sizing::resolve_with_container;
///
/// let config = RuneConfig::new()
///     .width(Dimension::Percent(50.0))
///     .height(Dimension::Percent(100.0));
///
/// let dims = resolve_with_container(&config, Some((800, 600)));
/// assert_eq!(dims, SurfaceDimensions::new(400, 600));
///
/// let headless = resolve_with_container(&config, None);
/// assert_eq!(headless, SurfaceDimensions::new(640, 480));
/// ```
pub fn resolve_with_container(
    config: &RuneConfig,
    container: Option<(u32, u32)>,
) -> SurfaceDimensions {
    let container = container.filter(|&(w, h)| w > 0 && h > 0);
    let width = config
        .width
        .and_then(|d| d.resolve(container.map(|c| c.0)))
        .unwrap_or(DEFAULT_WIDTH);
    let height = config
        .height
        .and_then(|d| d.resolve(container.map(|c| c.1)))
        .unwrap_or(DEFAULT_HEIGHT);
    SurfaceDimensions::new(width, height)
}

/// Resolver for environments without a document: no container ever matches.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessResolver;

impl DimensionResolver for HeadlessResolver {
    fn resolve(&self, config: &RuneConfig) -> SurfaceDimensions {
        if let Some(selector) = config.container.as_deref() {
            log::debug!("no document available, ignoring container '{}'", selector);
        }
        resolve_with_container(config, None)
    }
}

/// Resolver that measures containers through a lookup function.
///
/// The lookup maps a selector to the container's `(width, height)`, or `None`
/// when nothing matches.
pub struct ContainerResolver<F> {
    lookup: F,
}

impl<F> ContainerResolver<F>
where
    F: Fn(&str) -> Option<(u32, u32)>,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }
}

impl<F> DimensionResolver for ContainerResolver<F>
where
    F: Fn(&str) -> Option<(u32, u32)>,
{
    fn resolve(&self, config: &RuneConfig) -> SurfaceDimensions {
        let measured = config.container.as_deref().and_then(|selector| {
            let found = (self.lookup)(selector);
            if found.is_none() {
                log::debug!("container '{}' not found", selector);
            }
            found
        });
        resolve_with_container(config, measured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dimensions() {
        assert_eq!("640".parse::<Dimension>().unwrap(), Dimension::Pixels(640));
        assert_eq!(" 320px ".parse::<Dimension>().unwrap(), Dimension::Pixels(320));
        assert_eq!("100%".parse::<Dimension>().unwrap(), Dimension::Percent(100.0));
        assert_eq!("12.5 %".parse::<Dimension>().unwrap(), Dimension::Percent(12.5));

        for bad in ["", "wide", "0", "-10px", "%", "0%", "-5%"] {
            assert!(bad.parse::<Dimension>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Dimension::Pixels(10).to_string(), "10px");
        assert_eq!(Dimension::Percent(50.0).to_string(), "50%");
    }

    #[test]
    fn test_headless_defaults() {
        let config = RuneConfig::new().container(".parent");
        let dims = HeadlessResolver.resolve(&config);
        assert_eq!(dims, SurfaceDimensions::new(640, 480));
    }

    #[test]
    fn test_headless_percentages_fall_back() {
        let config = RuneConfig::new()
            .width(Dimension::Percent(100.0))
            .height(Dimension::Percent(100.0))
            .container(".parent");
        assert_eq!(HeadlessResolver.resolve(&config), SurfaceDimensions::default());
    }

    #[test]
    fn test_explicit_pixels_win() {
        let config = RuneConfig::new()
            .width(Dimension::Pixels(300))
            .height(Dimension::Pixels(150))
            .container(".parent");
        let resolver = ContainerResolver::new(|_: &str| Some((1000, 1000)));
        assert_eq!(resolver.resolve(&config), SurfaceDimensions::new(300, 150));
    }

    #[test]
    fn test_percentages_of_container() {
        let resolver = ContainerResolver::new(|selector: &str| match selector {
            ".parent" => Some((1024, 768)),
            ".collapsed" => Some((0, 0)),
            _ => None,
        });
        let full = RuneConfig::new()
            .width(Dimension::Percent(100.0))
            .height(Dimension::Percent(100.0));

        let dims = resolver.resolve(&full.clone().container(".parent"));
        assert_eq!(dims, SurfaceDimensions::new(1024, 768));

        let half = RuneConfig::new()
            .width(Dimension::Percent(50.0))
            .height(Dimension::Percent(25.0))
            .container(".parent");
        assert_eq!(resolver.resolve(&half), SurfaceDimensions::new(512, 192));

        // Unmeasurable or missing containers fall back to the default size.
        assert_eq!(
            resolver.resolve(&full.clone().container(".collapsed")),
            SurfaceDimensions::default()
        );
        assert_eq!(
            resolver.resolve(&full.container(".missing")),
            SurfaceDimensions::default()
        );
    }

    #[test]
    fn test_unspecified_uses_default_even_with_container() {
        let resolver = ContainerResolver::new(|_: &str| Some((1024, 768)));
        let config = RuneConfig::new().container(".parent");
        assert_eq!(resolver.resolve(&config), SurfaceDimensions::default());
    }

    #[test]
    fn test_aspect_ratio() {
        let dims = SurfaceDimensions::default();
        assert!((dims.aspect_ratio() - 4.0 / 3.0).abs() < 1e-9);
    }
}
