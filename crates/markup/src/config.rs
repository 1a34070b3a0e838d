//! Parser configuration.
//!
//! A `ParserConfig` is a plain value: every `Document` holds an `Arc` snapshot
//! of the configuration it was created with. The process-wide default lives
//! behind `ParserConfig::global()`; changing it only affects documents created
//! afterwards.

use std::borrow::Cow;
use std::str::FromStr;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::char_ref::ReferenceKind;
use crate::tag_type::{TagType, TagTypeRegistry};

pub const DEFAULT_MAX_ATTRIBUTE_ERRORS: usize = 2;
pub const DEFAULT_MAX_ENCLOSURE_DEPTH: usize = 32;

/// Highest code point an unterminated reference of one kind may decode to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Threshold {
    AcceptNone,
    AcceptAll,
    /// Accept code points up to and including the given value.
    UpTo(u32),
}

impl Threshold {
    pub fn accepts(self, code_point: u32) -> bool {
        match self {
            Threshold::AcceptNone => false,
            Threshold::AcceptAll => true,
            Threshold::UpTo(max) => code_point <= max,
        }
    }
}

/// Unterminated-reference thresholds for one context (inside or outside
/// attribute values).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnterminatedSettings {
    pub named: Threshold,
    pub decimal: Threshold,
    pub hex: Threshold,
}

impl UnterminatedSettings {
    pub const ACCEPT_ALL: Self = Self::uniform(Threshold::AcceptAll);
    pub const ACCEPT_NONE: Self = Self::uniform(Threshold::AcceptNone);

    pub const fn uniform(threshold: Threshold) -> Self {
        Self {
            named: threshold,
            decimal: threshold,
            hex: threshold,
        }
    }

    pub fn threshold(&self, kind: ReferenceKind) -> Threshold {
        match kind {
            ReferenceKind::Named => self.named,
            ReferenceKind::Decimal => self.decimal,
            ReferenceKind::Hex => self.hex,
        }
    }
}

/// A named bundle of tolerances emulating one consumer of markup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompatibilityProfile {
    pub name: Cow<'static, str>,
    pub field_names_case_insensitive: bool,
    pub inside_attribute_value: UnterminatedSettings,
    pub outside_attribute_value: UnterminatedSettings,
}

impl CompatibilityProfile {
    pub fn ie() -> Self {
        Self {
            name: Cow::Borrowed("IE"),
            field_names_case_insensitive: true,
            inside_attribute_value: UnterminatedSettings::ACCEPT_ALL,
            outside_attribute_value: UnterminatedSettings {
                named: Threshold::UpTo(0xFF),
                decimal: Threshold::AcceptAll,
                hex: Threshold::AcceptNone,
            },
        }
    }

    pub fn mozilla() -> Self {
        Self {
            name: Cow::Borrowed("Mozilla"),
            field_names_case_insensitive: false,
            inside_attribute_value: UnterminatedSettings::ACCEPT_ALL,
            outside_attribute_value: UnterminatedSettings::ACCEPT_ALL,
        }
    }

    pub fn opera() -> Self {
        let settings = UnterminatedSettings {
            named: Threshold::UpTo(0x3E),
            decimal: Threshold::AcceptAll,
            hex: Threshold::AcceptAll,
        };
        Self {
            name: Cow::Borrowed("Opera"),
            field_names_case_insensitive: true,
            inside_attribute_value: settings,
            outside_attribute_value: settings,
        }
    }

    pub fn xhtml() -> Self {
        Self {
            name: Cow::Borrowed("XHTML"),
            field_names_case_insensitive: false,
            inside_attribute_value: UnterminatedSettings::ACCEPT_NONE,
            outside_attribute_value: UnterminatedSettings::ACCEPT_NONE,
        }
    }

    pub fn unterminated(&self, inside_attribute_value: bool) -> &UnterminatedSettings {
        if inside_attribute_value {
            &self.inside_attribute_value
        } else {
            &self.outside_attribute_value
        }
    }

    /// Compare two form-field-like names under this profile's case rules.
    pub fn field_names_match(&self, a: &str, b: &str) -> bool {
        if self.field_names_case_insensitive {
            a.eq_ignore_ascii_case(b)
        } else {
            a == b
        }
    }
}

impl Default for CompatibilityProfile {
    fn default() -> Self {
        Self::ie()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown compatibility profile `{0}` (expected IE, Mozilla, Opera or XHTML)")]
pub struct ProfileParseError(pub String);

impl FromStr for CompatibilityProfile {
    type Err = ProfileParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let profile = match s.trim().to_ascii_lowercase().as_str() {
            "ie" => Self::ie(),
            "mozilla" => Self::mozilla(),
            "opera" => Self::opera(),
            "xhtml" => Self::xhtml(),
            _ => return Err(ProfileParseError(s.to_string())),
        };
        Ok(profile)
    }
}

/// Everything a `Document` consults while recognizing markup.
#[derive(Clone, Debug)]
pub struct ParserConfig {
    pub registry: TagTypeRegistry,
    /// Minor attribute syntax errors tolerated before a start tag is rejected.
    pub max_attribute_errors: usize,
    pub profile: CompatibilityProfile,
    /// Encode `'` as `&#39;` instead of leaving it literal.
    pub encode_apostrophe: bool,
    /// Decode references to U+00A0 as a plain space.
    pub convert_nbsp: bool,
    /// Types inside which ordinary tags are not recognized on demand.
    pub suppressing_types: Vec<TagType>,
    /// Let the unregistered sentinels construct tags that no registered type
    /// accepted.
    pub recognize_unregistered: bool,
    /// Bound on nested suppression checks (comment inside CDATA inside comment ...).
    pub max_enclosure_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            registry: TagTypeRegistry::default(),
            max_attribute_errors: DEFAULT_MAX_ATTRIBUTE_ERRORS,
            profile: CompatibilityProfile::default(),
            encode_apostrophe: false,
            convert_nbsp: false,
            suppressing_types: vec![TagType::comment(), TagType::cdata_section()],
            recognize_unregistered: false,
            max_enclosure_depth: DEFAULT_MAX_ENCLOSURE_DEPTH,
        }
    }
}

static GLOBAL: LazyLock<RwLock<Arc<ParserConfig>>> =
    LazyLock::new(|| RwLock::new(Arc::new(ParserConfig::default())));

impl ParserConfig {
    /// Snapshot of the process-wide configuration.
    pub fn global() -> Arc<ParserConfig> {
        GLOBAL
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_global(config: ParserConfig) {
        *GLOBAL.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
    }

    /// Edit the process-wide configuration in place.
    pub fn update_global<R>(f: impl FnOnce(&mut ParserConfig) -> R) -> R {
        let mut guard = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
        f(Arc::make_mut(&mut guard))
    }

    pub fn reset_global() {
        Self::set_global(ParserConfig::default());
    }

    pub fn is_suppressing(&self, tag_type: &TagType) -> bool {
        self.suppressing_types.iter().any(|t| t == tag_type)
    }
}
