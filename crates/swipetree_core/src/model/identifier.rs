//! Person identifier codec.
//!
//! # Responsibility
//! - Parse raw identifier strings into base id and suffix parts.
//! - Format derived integers back into fixed-width base ids.
//!
//! # Invariants
//! - `base_id` is ASCII decimal digits only and is never trimmed or re-padded.
//! - Suffix and partner hint are non-empty ASCII alphanumerics, so the
//!   displayed id is always a single flat artifact name component.
//! - Every formatted base id has exactly the requested width.
//! - `partner_hint` is carried through parse/display but never interpreted.
//!
//! # See also
//! - `crate::model::relation` for the algebra built on this codec.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Largest base id width whose values always fit in `u64` arithmetic
/// (including the `* 10` step used by the relationship algebra).
pub const MAX_DIGIT_WIDTH: usize = 18;

/// First suffix value marking "spouse of base id".
pub const SPOUSE_SUFFIX: &str = "1";

pub type IdResult<T> = Result<T, IdError>;

/// Identifier parse/format errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// Blank input, a base id that is not purely decimal digits or has an
    /// unsupported width, or a suffix segment that is not alphanumeric.
    MalformedId(String),
    /// Formatting would need more digits than the fixed width allows.
    Overflow { value: u64, width: usize },
}

impl Display for IdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedId(raw) => write!(f, "malformed identifier: `{raw}`"),
            Self::Overflow { value, width } => {
                write!(f, "value {value} does not fit in {width} digits")
            }
        }
    }
}

impl Error for IdError {}

/// Parsed person identifier, e.g. `140000`, `140000.1`, `140000.1.2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier {
    base_id: String,
    /// Raw first suffix segment; `Some("1")` marks a spouse.
    suffix: Option<String>,
    partner_hint: Option<String>,
}

impl Identifier {
    /// Builds a plain identifier from an already validated base id.
    pub fn from_base(base_id: impl Into<String>) -> IdResult<Self> {
        let base_id = base_id.into();
        validate_base_id(&base_id)?;
        Ok(Self {
            base_id,
            suffix: None,
            partner_hint: None,
        })
    }

    /// Parses `raw` and checks that the base id has exactly `width` digits.
    pub fn with_width(raw: &str, width: usize) -> IdResult<Self> {
        let parsed = parse(raw)?;
        if parsed.width() != width {
            return Err(IdError::MalformedId(raw.trim().to_string()));
        }
        Ok(parsed)
    }

    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    /// Returns whether the first suffix marks this id as "spouse of base id".
    pub fn is_spouse(&self) -> bool {
        self.suffix.as_deref() == Some(SPOUSE_SUFFIX)
    }

    /// Reserved disambiguator; parsed but inert.
    pub fn partner_hint(&self) -> Option<&str> {
        self.partner_hint.as_deref()
    }

    /// Digit width of the base id.
    pub fn width(&self) -> usize {
        self.base_id.len()
    }

    /// Integer value of the base id.
    pub fn base_value(&self) -> u64 {
        // Width is capped at MAX_DIGIT_WIDTH, so this cannot overflow.
        self.base_id
            .bytes()
            .fold(0_u64, |acc, digit| acc * 10 + u64::from(digit - b'0'))
    }

    /// Trailing zero count of the base id (generation depth code).
    pub fn depth_code(&self) -> usize {
        trailing_zero_count(&self.base_id)
    }

    /// Returns the base person without any suffix.
    pub fn base(&self) -> Self {
        Self {
            base_id: self.base_id.clone(),
            suffix: None,
            partner_hint: None,
        }
    }

    /// Returns the canonical first spouse slot `<base_id>.1`.
    pub fn spouse(&self) -> Self {
        Self {
            base_id: self.base_id.clone(),
            suffix: Some(SPOUSE_SUFFIX.to_string()),
            partner_hint: None,
        }
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.base_id)?;
        if let Some(suffix) = &self.suffix {
            write!(f, ".{suffix}")?;
        }
        if let Some(hint) = &self.partner_hint {
            write!(f, ".{hint}")?;
        }
        Ok(())
    }
}

impl FromStr for Identifier {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse(&value)
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.to_string()
    }
}

/// Parses a raw identifier string.
///
/// Splits on `.` into at most three parts: base id, first suffix and partner
/// hint.
///
/// # Errors
/// - `IdError::MalformedId` when `raw` is blank, the base id is not decimal
///   digits or is wider than [`MAX_DIGIT_WIDTH`], a suffix segment is empty
///   or not ASCII alphanumeric, or there are more than three segments.
pub fn parse(raw: &str) -> IdResult<Identifier> {
    let trimmed = raw.trim();
    let malformed = || IdError::MalformedId(trimmed.to_string());

    let mut parts = trimmed.split('.');
    let base_id = parts.next().unwrap_or_default();
    validate_base_id(base_id).map_err(|_| malformed())?;

    let suffix = parts.next();
    let partner_hint = parts.next();
    if parts.next().is_some() {
        return Err(malformed());
    }
    for segment in suffix.iter().chain(partner_hint.iter()) {
        if !is_suffix_segment(segment) {
            return Err(malformed());
        }
    }

    Ok(Identifier {
        base_id: base_id.to_string(),
        suffix: suffix.map(str::to_string),
        partner_hint: partner_hint.map(str::to_string),
    })
}

/// Zero-left-pads `value` to exactly `width` digits.
///
/// # Errors
/// - `IdError::Overflow` when `value` needs more than `width` digits.
pub fn format(value: u64, width: usize) -> IdResult<String> {
    let natural = value.to_string();
    if natural.len() > width {
        return Err(IdError::Overflow { value, width });
    }
    Ok(format!("{natural:0>width$}"))
}

/// Counts `'0'` characters at the end of `digits`.
///
/// An all-zero string yields its full length (the root marker).
pub fn trailing_zero_count(digits: &str) -> usize {
    digits.bytes().rev().take_while(|byte| *byte == b'0').count()
}

fn validate_base_id(base_id: &str) -> IdResult<()> {
    if base_id.is_empty()
        || base_id.len() > MAX_DIGIT_WIDTH
        || !base_id.bytes().all(|byte| byte.is_ascii_digit())
    {
        return Err(IdError::MalformedId(base_id.to_string()));
    }
    Ok(())
}

fn is_suffix_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|byte| byte.is_ascii_alphanumeric())
}
