//! # Document Numbering
//!
//! Formats, parses and allocates SAR, KW and SPD document numbers.
//!
//! ## Schemes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Scheme   Format              Example          Year position           │
//! │  ──────   ─────────────────   ──────────────   ─────────────           │
//! │  SAR      NNNN/SAR/YYYY       0042/SAR/2026    suffix                   │
//! │  KW       KW/YYYY/NNNN        KW/2026/0007     prefix                   │
//! │  SPD      SPD/YYYY/NNN        SPD/2026/012     prefix                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Allocation
//! ```text
//! existing numbers ──► parse (drop anything off-pattern or other year)
//!                          │
//!                          ▼
//!                    max(seq) + 1   (1 when nothing matches)
//!                          │
//!                          ▼
//!                    format with zero padding
//! ```
//! The allocated sequence is strictly greater than every matching one, so
//! it can never collide with an existing number of the same scheme/year.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::InvoiceKind;

/// Which document family a number belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SchemeKind {
    Sar,
    Kw,
    Spd,
}

impl SchemeKind {
    /// Literal tag inside the number.
    pub fn tag(&self) -> &'static str {
        match self {
            SchemeKind::Sar => "SAR",
            SchemeKind::Kw => "KW",
            SchemeKind::Spd => "SPD",
        }
    }

    /// Lowercase storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemeKind::Sar => "sar",
            SchemeKind::Kw => "kw",
            SchemeKind::Spd => "spd",
        }
    }

    /// Default zero-padding width.
    pub fn default_width(&self) -> usize {
        match self {
            SchemeKind::Sar | SchemeKind::Kw => 4,
            SchemeKind::Spd => 3,
        }
    }
}

impl fmt::Display for SchemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for SchemeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sar" => Ok(SchemeKind::Sar),
            "kw" => Ok(SchemeKind::Kw),
            "spd" => Ok(SchemeKind::Spd),
            other => Err(format!("unknown numbering scheme '{}'", other)),
        }
    }
}

impl From<InvoiceKind> for SchemeKind {
    fn from(kind: InvoiceKind) -> Self {
        match kind {
            InvoiceKind::Sar => SchemeKind::Sar,
            InvoiceKind::Kw => SchemeKind::Kw,
        }
    }
}

/// The numeric parts of a parsed document number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SequenceNumber {
    pub year: i32,
    pub seq: u32,
}

/// A numbering scheme with its padding width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NumberScheme {
    pub kind: SchemeKind,
    pub width: usize,
}

impl NumberScheme {
    /// Scheme with the default width for its kind.
    pub fn new(kind: SchemeKind) -> Self {
        NumberScheme {
            kind,
            width: kind.default_width(),
        }
    }

    /// Overrides the zero-padding width.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width.max(1);
        self
    }

    pub fn sar() -> Self {
        NumberScheme::new(SchemeKind::Sar)
    }

    pub fn kw() -> Self {
        NumberScheme::new(SchemeKind::Kw)
    }

    pub fn spd() -> Self {
        NumberScheme::new(SchemeKind::Spd)
    }

    /// Renders a number.
    ///
    /// ```rust
    /// use niaga_core::numbering::NumberScheme;
    ///
    /// assert_eq!(NumberScheme::sar().format(2026, 42).unwrap(), "0042/SAR/2026");
    /// assert_eq!(NumberScheme::kw().format(2026, 7).unwrap(), "KW/2026/0007");
    /// assert_eq!(NumberScheme::spd().format(2026, 12).unwrap(), "SPD/2026/012");
    /// ```
    pub fn format(&self, year: i32, seq: u32) -> CoreResult<String> {
        check_year(year)?;
        let w = self.width;
        Ok(match self.kind {
            SchemeKind::Sar => format!("{:0w$}/SAR/{:04}", seq, year, w = w),
            SchemeKind::Kw => format!("KW/{:04}/{:0w$}", year, seq, w = w),
            SchemeKind::Spd => format!("SPD/{:04}/{:0w$}", year, seq, w = w),
        })
    }

    /// Parses a number of this scheme. Returns `None` for anything that
    /// does not match the pattern.
    ///
    /// ```rust
    /// use niaga_core::numbering::{NumberScheme, SequenceNumber};
    ///
    /// let parsed = NumberScheme::sar().parse(" 0042/SAR/2026 ");
    /// assert_eq!(parsed, Some(SequenceNumber { year: 2026, seq: 42 }));
    /// assert_eq!(NumberScheme::sar().parse("KW/2026/0042"), None);
    /// ```
    pub fn parse(&self, number: &str) -> Option<SequenceNumber> {
        let parts: Vec<&str> = number.trim().split('/').collect();
        let [a, b, c] = parts.as_slice() else {
            return None;
        };
        let (tag, year, seq) = match self.kind {
            SchemeKind::Sar => (*b, *c, *a),
            SchemeKind::Kw | SchemeKind::Spd => (*a, *b, *c),
        };
        if !tag.eq_ignore_ascii_case(self.kind.tag()) {
            return None;
        }
        if year.len() != 4 || !is_digits(year) || !is_digits(seq) {
            return None;
        }
        Some(SequenceNumber {
            year: year.parse().ok()?,
            seq: seq.parse().ok()?,
        })
    }

    /// Highest sequence among `existing` numbers for `year`.
    pub fn highest<I, S>(&self, existing: I, year: i32) -> Option<u32>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        existing
            .into_iter()
            .filter_map(|n| self.parse(n.as_ref()))
            .filter(|p| p.year == year)
            .map(|p| p.seq)
            .max()
    }

    /// The next sequence after `highest`, or 1 when there is none.
    pub fn sequence_after(&self, highest: Option<u32>, year: i32) -> CoreResult<u32> {
        match highest {
            None => Ok(1),
            Some(h) => h.checked_add(1).ok_or_else(|| CoreError::SequenceExhausted {
                scheme: self.kind.tag().to_string(),
                year,
            }),
        }
    }

    /// `max(matching sequences for year) + 1`.
    pub fn next_sequence<I, S>(&self, existing: I, year: i32) -> CoreResult<u32>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        check_year(year)?;
        self.sequence_after(self.highest(existing, year), year)
    }

    /// Formatted next number for `year`.
    ///
    /// ```rust
    /// use niaga_core::numbering::NumberScheme;
    ///
    /// let existing = ["0001/SAR/2026", "0007/SAR/2026", "0099/SAR/2025", "junk"];
    /// let next = NumberScheme::sar().allocate(existing, 2026).unwrap();
    /// assert_eq!(next, "0008/SAR/2026");
    /// ```
    pub fn allocate<I, S>(&self, existing: I, year: i32) -> CoreResult<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let seq = self.next_sequence(existing, year)?;
        self.format(year, seq)
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn check_year(year: i32) -> CoreResult<()> {
    if (1..=9999).contains(&year) {
        Ok(())
    } else {
        Err(CoreError::InvalidYear(year))
    }
}
