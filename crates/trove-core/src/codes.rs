//! Asset code types, validation strategies and generation
//!
//! Each supported code format is a strategy with two capabilities:
//! validating a provided code and (optionally) generating a fresh one.
//! The set of formats is closed and small, so dispatch goes through the
//! [`CodeType`] enum rather than open-ended trait objects handed in by
//! callers.

use crate::damm32::Damm32;
use crate::error::{Error, Result};
use crate::rng::CodeRng;
use serde::{Deserialize, Serialize};

/// Available asset code formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodeType {
    /// Any non-empty string, no synthesis capability
    Arbitrary,
    /// `XXX-XXX-XXX` with a check digit and a namespaced prefix
    Checksummed,
    /// Retired `sr`-tagged format, accepted on import only
    Legacy,
}

impl CodeType {
    /// All code types, in wire-tag order
    pub const ALL: [CodeType; 3] = [CodeType::Arbitrary, CodeType::Checksummed, CodeType::Legacy];

    /// Single-character tag persisted in the store
    pub fn tag(&self) -> &'static str {
        match self {
            CodeType::Arbitrary => "A",
            CodeType::Checksummed => "D",
            CodeType::Legacy => "S",
        }
    }

    /// Parse a persisted tag
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "A" => Ok(CodeType::Arbitrary),
            "D" => Ok(CodeType::Checksummed),
            "S" => Ok(CodeType::Legacy),
            other => Err(Error::UnknownCodeType(other.to_string())),
        }
    }
}

/// Configuration for the checksummed code format.
///
/// Different installations mint codes under different prefixes so that
/// merged datasets cannot collide. The configuration is passed to the
/// registry explicitly, letting differently-configured registries
/// coexist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeConfig {
    /// Prefix used when generating new codes
    pub default_prefix: String,
    /// Prefixes accepted during validation
    pub allowed_prefixes: Vec<String>,
}

impl CodeConfig {
    /// Create a configuration, normalising prefixes to upper case
    pub fn new(default_prefix: impl Into<String>, allowed_prefixes: Vec<String>) -> Self {
        Self {
            default_prefix: default_prefix.into().to_ascii_uppercase(),
            allowed_prefixes: allowed_prefixes
                .into_iter()
                .map(|p| p.to_ascii_uppercase())
                .collect(),
        }
    }

    /// Whether a prefix is accepted.
    ///
    /// The default prefix is always accepted, so generated codes never
    /// fail their own prefix check.
    pub fn allows(&self, prefix: &str) -> bool {
        prefix == self.default_prefix || self.allowed_prefixes.iter().any(|p| p == prefix)
    }
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self::new("INV", vec!["INV".to_string()])
    }
}

/// A single asset code format
pub trait CodeStrategy {
    /// Human-readable name of the format
    fn name(&self) -> &'static str;

    /// Validate a provided code
    fn validate(&self, code: &str) -> Result<()>;

    /// Generate a new code, or `None` if the format cannot be synthesised
    fn generate(&self, rng: &mut CodeRng) -> Option<String> {
        let _ = rng;
        None
    }
}

/// Accepts any non-empty string
#[derive(Debug, Default)]
pub struct ArbitraryStrategy;

impl CodeStrategy for ArbitraryStrategy {
    fn name(&self) -> &'static str {
        "Arbitrary String"
    }

    fn validate(&self, code: &str) -> Result<()> {
        if code.is_empty() {
            return Err(Error::EmptyCode);
        }
        Ok(())
    }
}

/// `XXX-XXX-XXX`: nine alphanumerics in three groups, the last being a
/// check digit, the first three a deployment prefix.
#[derive(Debug)]
pub struct ChecksummedStrategy {
    d32: Damm32,
    config: CodeConfig,
}

impl ChecksummedStrategy {
    /// Length of the random part of a generated code.
    const SUFFIX_LEN: usize = 5;

    /// Create a strategy with the given prefix configuration
    pub fn new(config: CodeConfig) -> Self {
        Self {
            d32: Damm32::primary(),
            config,
        }
    }

    /// Strip the grouped format down to its nine bare characters.
    fn ungroup(code: &str) -> Option<String> {
        let bytes = code.as_bytes();
        if !code.is_ascii() || bytes.len() != 11 || bytes[3] != b'-' || bytes[7] != b'-' {
            return None;
        }
        let groups = [&code[0..3], &code[4..7], &code[8..11]];
        if groups
            .iter()
            .any(|g| !g.bytes().all(|b| b.is_ascii_alphanumeric()))
        {
            return None;
        }
        Some(groups.concat().to_ascii_uppercase())
    }

    /// Regroup nine bare characters with hyphens.
    fn group(bare: &str) -> String {
        format!("{}-{}-{}", &bare[0..3], &bare[3..6], &bare[6..9])
    }
}

impl CodeStrategy for ChecksummedStrategy {
    fn name(&self) -> &'static str {
        "Checksummed"
    }

    fn validate(&self, code: &str) -> Result<()> {
        let bare = Self::ungroup(code).ok_or_else(|| Error::InvalidFormat(code.to_string()))?;

        if !self.d32.verify(&bare)? {
            return Err(Error::InvalidCheckDigit {
                expected: self.d32.calculate(&bare[..8])?,
            });
        }

        let prefix = &bare[..3];
        if !self.config.allows(prefix) {
            return Err(Error::InvalidPrefix(prefix.to_string()));
        }
        Ok(())
    }

    fn generate(&self, rng: &mut CodeRng) -> Option<String> {
        if self.config.default_prefix.len() != 3 {
            return None;
        }
        let alphabet = self.d32.alphabet();
        let mut bare = self.config.default_prefix.clone();
        for _ in 0..Self::SUFFIX_LEN {
            bare.push(*rng.pick(alphabet)? as char);
        }
        // A default prefix outside the alphabet cannot carry a check digit.
        let check = self.d32.calculate(&bare).ok()?;
        bare.push(check);
        Some(Self::group(&bare))
    }
}

/// Retired import-only format: `sr` tag, four to six alphanumerics and
/// a final check character over the legacy alphabet.
#[derive(Debug)]
pub struct LegacyStrategy {
    d32: Damm32,
}

impl LegacyStrategy {
    /// Two-letter tag carried by every legacy code.
    const TAG: &'static str = "sr";

    /// Create the legacy strategy
    pub fn new() -> Self {
        Self {
            d32: Damm32::legacy(),
        }
    }
}

impl Default for LegacyStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeStrategy for LegacyStrategy {
    fn name(&self) -> &'static str {
        "Legacy"
    }

    fn validate(&self, code: &str) -> Result<()> {
        let tagged = code.is_ascii() && code.len() >= 2 && code[..2].eq_ignore_ascii_case(Self::TAG);
        if !tagged {
            return Err(Error::InvalidFormat(code.to_string()));
        }
        let body = &code[2..];
        // Four to six payload characters plus the check character.
        if body.len() < 5 || body.len() > 7 || !body.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(Error::InvalidFormat(code.to_string()));
        }

        let bare = body.to_ascii_uppercase();
        if !self.d32.verify(&bare)? {
            return Err(Error::InvalidCheckDigit {
                expected: self.d32.calculate(&bare[..bare.len() - 1])?,
            });
        }
        Ok(())
    }
}

/// Registry dispatching code types to their strategies
pub struct CodeRegistry {
    arbitrary: ArbitraryStrategy,
    checksummed: ChecksummedStrategy,
    legacy: LegacyStrategy,
}

impl CodeRegistry {
    /// Create a registry with the given checksummed-code configuration
    pub fn new(config: CodeConfig) -> Self {
        Self {
            arbitrary: ArbitraryStrategy,
            checksummed: ChecksummedStrategy::new(config),
            legacy: LegacyStrategy::new(),
        }
    }

    /// The strategy for a code type
    pub fn strategy(&self, code_type: CodeType) -> &dyn CodeStrategy {
        match code_type {
            CodeType::Arbitrary => &self.arbitrary,
            CodeType::Checksummed => &self.checksummed,
            CodeType::Legacy => &self.legacy,
        }
    }

    /// Validate a code under a code type
    pub fn validate(&self, code_type: CodeType, code: &str) -> Result<()> {
        self.strategy(code_type).validate(code)
    }

    /// Generate a code of the given type, if the format supports it
    pub fn generate(&self, code_type: CodeType, rng: &mut CodeRng) -> Option<String> {
        self.strategy(code_type).generate(rng)
    }
}

impl Default for CodeRegistry {
    fn default() -> Self {
        Self::new(CodeConfig::default())
    }
}
