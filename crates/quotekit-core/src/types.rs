//! # Domain Types
//!
//! Fixed-point value types and the singleton settings documents.
//!
//! ## Fixed-Point Scales
//! ```text
//! ┌──────────────┬──────────────┬──────────────────┬──────────────────────┐
//! │ Type         │ Inner        │ Scale            │ Document form        │
//! ├──────────────┼──────────────┼──────────────────┼──────────────────────┤
//! │ Money        │ i64 cents    │ 100 = $1.00      │ 250.0                │
//! │ Percent      │ u32 bps      │ 10000 = 100%     │ 8.25                 │
//! │ Multiplier   │ u32          │ 10000 = ×1.0     │ 1.5                  │
//! │ Hours        │ i64          │ 100 = 1h         │ 7.75                 │
//! └──────────────┴──────────────┴──────────────────┴──────────────────────┘
//! ```

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::ValidationResult;

// =============================================================================
// Scaled Decimal Serialization
// =============================================================================

/// Implements decimal (de)serialization for a fixed-point newtype.
macro_rules! scaled_decimal_serde {
    ($ty:ident, $inner:ty, $scale:expr) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_f64(self.0 as f64 / $scale)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = f64::deserialize(deserializer)?;
                let scaled = (value * $scale).round();
                if !scaled.is_finite()
                    || scaled < <$inner>::MIN as f64
                    || scaled > <$inner>::MAX as f64
                {
                    return Err(de::Error::custom(format!(
                        "{} out of range: {}",
                        stringify!($ty),
                        value
                    )));
                }
                Ok($ty(scaled as $inner))
            }
        }
    };
}

// =============================================================================
// Percent
// =============================================================================

/// A percentage in basis points (1 bps = 0.01%).
///
/// Used for markup, inventory discount and tax rate.
///
/// ## Example
/// ```rust
/// use quotekit_core::types::Percent;
///
/// let tax = Percent::from_bps(825);
/// assert_eq!(tax.to_string(), "8.25%");
/// assert_eq!(Percent::from_whole(10).bps(), 1000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, TS)]
#[ts(export)]
pub struct Percent(#[ts(type = "number")] u32);

impl Percent {
    /// 100% in basis points.
    pub const FULL_BPS: u32 = 10_000;

    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    pub const fn from_whole(percent: u32) -> Self {
        Percent(percent * 100)
    }

    pub const fn zero() -> Self {
        Percent(0)
    }

    pub const fn bps(&self) -> u32 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parses a decimal percent such as `8.25`.
    pub fn from_decimal(percent: f64) -> Option<Self> {
        let bps = (percent * 100.0).round();
        if !bps.is_finite() || bps < 0.0 || bps > u32::MAX as f64 {
            return None;
        }
        Some(Percent(bps as u32))
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}%", whole)
        } else if frac % 10 == 0 {
            write!(f, "{}.{}%", whole, frac / 10)
        } else {
            write!(f, "{}.{:02}%", whole, frac)
        }
    }
}

scaled_decimal_serde!(Percent, u32, 100.0);

// =============================================================================
// Multiplier
// =============================================================================

/// A price multiplier in ten-thousandths (10000 = ×1.0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, TS)]
#[ts(export)]
pub struct Multiplier(#[ts(type = "number")] u32);

impl Multiplier {
    /// ×1.0
    pub const ONE: Multiplier = Multiplier(10_000);
    pub const SCALE: u32 = 10_000;

    pub const fn from_ten_thousandths(value: u32) -> Self {
        Multiplier(value)
    }

    pub const fn ten_thousandths(&self) -> u32 {
        self.0
    }

    pub fn from_decimal(factor: f64) -> Option<Self> {
        let scaled = (factor * Self::SCALE as f64).round();
        if !scaled.is_finite() || scaled < 0.0 || scaled > u32::MAX as f64 {
            return None;
        }
        Some(Multiplier(scaled as u32))
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Multiplier::ONE
    }
}

scaled_decimal_serde!(Multiplier, u32, 10_000.0);

// =============================================================================
// Hours
// =============================================================================

/// Labor hours in hundredths of an hour (the form steps in quarters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, TS)]
#[ts(export)]
pub struct Hours(#[ts(type = "number")] i64);

impl Hours {
    pub const fn from_hundredths(value: i64) -> Self {
        Hours(value)
    }

    pub const fn whole(hours: i64) -> Self {
        Hours(hours * 100)
    }

    pub const fn hundredths(&self) -> i64 {
        self.0
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn from_decimal(hours: f64) -> Option<Self> {
        let scaled = (hours * 100.0).round();
        if !scaled.is_finite() {
            return None;
        }
        Some(Hours(scaled as i64))
    }
}

scaled_decimal_serde!(Hours, i64, 100.0);

// =============================================================================
// Color Scheme
// =============================================================================

/// The eight gradient pairs offered for quote headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ColorScheme {
    #[default]
    Purple,
    Blue,
    Green,
    Red,
    Orange,
    Teal,
    Navy,
    Burgundy,
}

impl ColorScheme {
    pub const ALL: [ColorScheme; 8] = [
        ColorScheme::Purple,
        ColorScheme::Blue,
        ColorScheme::Green,
        ColorScheme::Red,
        ColorScheme::Orange,
        ColorScheme::Teal,
        ColorScheme::Navy,
        ColorScheme::Burgundy,
    ];

    /// Returns the `(primary, secondary)` hex colors of the gradient.
    pub const fn colors(&self) -> (&'static str, &'static str) {
        match self {
            ColorScheme::Purple => ("#667eea", "#764ba2"),
            ColorScheme::Blue => ("#4facfe", "#00f2fe"),
            ColorScheme::Green => ("#43e97b", "#38f9d7"),
            ColorScheme::Red => ("#fa709a", "#fee140"),
            ColorScheme::Orange => ("#fad961", "#f76b1c"),
            ColorScheme::Teal => ("#30cfd0", "#330867"),
            ColorScheme::Navy => ("#1e3c72", "#2a5298"),
            ColorScheme::Burgundy => ("#eb3349", "#f45c43"),
        }
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            ColorScheme::Purple => "Purple",
            ColorScheme::Blue => "Blue",
            ColorScheme::Green => "Green",
            ColorScheme::Red => "Red",
            ColorScheme::Orange => "Orange",
            ColorScheme::Teal => "Teal",
            ColorScheme::Navy => "Navy",
            ColorScheme::Burgundy => "Burgundy",
        }
    }
}

// =============================================================================
// Logo
// =============================================================================

/// Company logo embedded as a base64 data URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Logo {
    pub file_name: String,
    /// `data:<mime>;base64,<payload>`
    pub data_url: String,
}

impl Logo {
    /// Encodes raw image bytes into a data URL.
    pub fn from_bytes(file_name: impl Into<String>, mime: &str, bytes: &[u8]) -> Self {
        Logo {
            file_name: file_name.into(),
            data_url: format!("data:{};base64,{}", mime, BASE64.encode(bytes)),
        }
    }

    /// Returns the MIME type declared by the data URL.
    pub fn mime_type(&self) -> Option<&str> {
        self.data_url
            .strip_prefix("data:")?
            .split_once(";base64,")
            .map(|(mime, _)| mime)
    }

    /// Decodes the image bytes.
    pub fn decode(&self) -> ValidationResult<Vec<u8>> {
        let payload = self
            .data_url
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .map(|(_, payload)| payload)
            .ok_or_else(|| ValidationError::InvalidFormat {
                field: "logo".to_string(),
                reason: "expected a base64 data URL".to_string(),
            })?;

        BASE64
            .decode(payload)
            .map_err(|e| ValidationError::InvalidFormat {
                field: "logo".to_string(),
                reason: e.to_string(),
            })
    }
}

// =============================================================================
// App Config
// =============================================================================

/// Default labor rate for new labor lines ($75.00/hour).
pub const DEFAULT_LABOR_RATE: Money = Money::from_cents(7500);

/// Company identity and quoting defaults (document key `appConfig`).
///
/// Created by first-run setup and read by every quote-building flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct AppConfig {
    pub company_name: String,
    pub company_address: String,
    pub company_phone: String,
    pub company_email: String,
    pub company_website: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<Logo>,
    pub default_markup: Percent,
    pub default_labor_rate: Money,
    pub tax_rate: Percent,
    pub color_scheme: ColorScheme,
    /// Set once the setup flow has been completed.
    pub configured: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            company_name: String::new(),
            company_address: String::new(),
            company_phone: String::new(),
            company_email: String::new(),
            company_website: String::new(),
            logo: None,
            default_markup: Percent::zero(),
            default_labor_rate: DEFAULT_LABOR_RATE,
            tax_rate: Percent::zero(),
            color_scheme: ColorScheme::default(),
            configured: false,
        }
    }
}

impl AppConfig {
    /// True when quotes can be saved (company name present).
    pub fn is_ready_for_quotes(&self) -> bool {
        !self.company_name.trim().is_empty()
    }

    /// Validates the settings form.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.company_name.trim().is_empty() {
            return Err(ValidationError::required("companyName"));
        }
        if let Some(logo) = &self.logo {
            logo.decode()?;
        }
        Ok(())
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// External mirror preferences (document key `storageSettings`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default)]
#[ts(export)]
pub struct StorageSettings {
    /// Folder that receives the mirror file; empty means "not chosen".
    pub shared_storage_path: String,
    pub auto_sync_enabled: bool,
    pub sync_on_startup: bool,
    /// True once a writable folder has been granted.
    pub has_directory_handle: bool,
}

impl StorageSettings {
    /// Returns the shared folder if one has been granted.
    pub fn shared_folder(&self) -> Option<&str> {
        let path = self.shared_storage_path.trim();
        (self.has_directory_handle && !path.is_empty()).then_some(path)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_display() {
        assert_eq!(Percent::from_bps(825).to_string(), "8.25%");
        assert_eq!(Percent::from_bps(850).to_string(), "8.5%");
        assert_eq!(Percent::from_whole(10).to_string(), "10%");
    }

    #[test]
    fn test_percent_rejects_negative_documents() {
        let p: Percent = serde_json::from_str("8.25").unwrap();
        assert_eq!(p.bps(), 825);
        assert!(serde_json::from_str::<Percent>("-1").is_err());
    }

    #[test]
    fn test_multiplier_round_trip() {
        let m: Multiplier = serde_json::from_str("1.5").unwrap();
        assert_eq!(m.ten_thousandths(), 15_000);
        assert_eq!(serde_json::to_string(&Multiplier::ONE).unwrap(), "1.0");
    }

    #[test]
    fn test_hours_parse_quarters() {
        let h: Hours = serde_json::from_str("7.75").unwrap();
        assert_eq!(h.hundredths(), 775);
    }

    #[test]
    fn test_color_scheme_wire_names() {
        let json = serde_json::to_string(&ColorScheme::Burgundy).unwrap();
        assert_eq!(json, "\"burgundy\"");
        assert_eq!(ColorScheme::Navy.colors(), ("#1e3c72", "#2a5298"));
        assert_eq!(ColorScheme::ALL.len(), 8);
    }

    #[test]
    fn test_logo_round_trip() {
        let logo = Logo::from_bytes("logo.png", "image/png", &[0x89, 0x50, 0x4e, 0x47]);
        assert_eq!(logo.mime_type(), Some("image/png"));
        assert_eq!(logo.decode().unwrap(), vec![0x89, 0x50, 0x4e, 0x47]);
    }

    #[test]
    fn test_logo_rejects_plain_text() {
        let logo = Logo {
            file_name: "x.png".to_string(),
            data_url: "not a data url".to_string(),
        };
        assert!(logo.decode().is_err());
    }

    #[test]
    fn test_app_config_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.default_labor_rate, DEFAULT_LABOR_RATE);
        assert!(!config.is_ready_for_quotes());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shared_folder_requires_handle() {
        let mut settings = StorageSettings {
            shared_storage_path: "/mnt/share".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.shared_folder(), None);
        settings.has_directory_handle = true;
        assert_eq!(settings.shared_folder(), Some("/mnt/share"));
    }
}
