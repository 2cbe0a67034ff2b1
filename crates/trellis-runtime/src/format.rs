#![forbid(unsafe_code)]

//! Locale-aware float formatting and parsing.
//!
//! The numeric editor and the range validator render floats with a decimal
//! separator and 3-digit grouping taken from a [`NumberFormat`]. Parsing is
//! the inverse: grouping separators are stripped, the decimal separator is
//! normalized, and the result goes through the standard float parser.
//!
//! # Invariants
//!
//! 1. `parse(format_grouped(x, p))` recovers `x` up to `p` decimal places.
//! 2. Non-finite floats (`NaN`, `±inf`) format as their plain text form and
//!    never receive separators.
//! 3. Grouping applies to the integer digits only, in groups of three from
//!    the right, never directly after the sign.

use std::env;
use std::num::ParseFloatError;

/// Decimal and grouping separators for one locale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NumberFormat {
    pub decimal_sep: char,
    pub group_sep: char,
}

impl Default for NumberFormat {
    fn default() -> Self {
        Self {
            decimal_sep: '.',
            group_sep: ',',
        }
    }
}

impl NumberFormat {
    /// Separators for a normalized locale tag (`"de"`, `"fr-FR"`, ...).
    ///
    /// Unknown languages fall back to the default (period/comma).
    #[must_use]
    pub fn for_locale(tag: &str) -> Self {
        let language = tag
            .split(['-', '_'])
            .next()
            .unwrap_or(tag)
            .to_ascii_lowercase();
        match language.as_str() {
            // Comma-decimal languages; French and Russian group with a space.
            "fr" | "ru" | "uk" | "pl" | "cs" | "sv" | "fi" | "nb" | "no" => Self {
                decimal_sep: ',',
                group_sep: ' ',
            },
            "de" | "es" | "it" | "pt" | "nl" | "da" | "tr" | "id" | "ro" | "hr" | "sl" => Self {
                decimal_sep: ',',
                group_sep: '.',
            },
            _ => Self::default(),
        }
    }

    /// Detect from `LC_NUMERIC`, `LC_ALL`, then `LANG`.
    #[must_use]
    pub fn detect() -> Self {
        let lc_numeric = env::var("LC_NUMERIC").ok();
        let lc_all = env::var("LC_ALL").ok();
        let lang = env::var("LANG").ok();
        Self::detect_from(lc_numeric.as_deref(), lc_all.as_deref(), lang.as_deref())
    }

    fn detect_from(lc_numeric: Option<&str>, lc_all: Option<&str>, lang: Option<&str>) -> Self {
        lc_numeric
            .or(lc_all)
            .or(lang)
            .map(strip_locale_suffixes)
            .filter(|tag| !tag.is_empty())
            .map(|tag| Self::for_locale(&tag))
            .unwrap_or_default()
    }

    /// Format with `prec` decimal places and no grouping.
    #[must_use]
    pub fn format(&self, value: f64, prec: usize) -> String {
        self.render(value, prec, false)
    }

    /// Format with `prec` decimal places and 3-digit grouping.
    #[must_use]
    pub fn format_grouped(&self, value: f64, prec: usize) -> String {
        self.render(value, prec, true)
    }

    fn render(&self, value: f64, prec: usize, grouped: bool) -> String {
        if !value.is_finite() {
            return value.to_string();
        }

        let plain = format!("{value:.prec$}");
        let (sign, digits) = match plain.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", plain.as_str()),
        };

        // Split off ".fraction"; prec == 0 means there is none.
        let (int_part, fraction) = match digits.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (digits, None),
        };

        let mut out = String::with_capacity(plain.len() + int_part.len() / 3);
        out.push_str(sign);
        if grouped {
            let first = int_part.len() % 3;
            if first != 0 {
                out.push_str(&int_part[..first]);
            }
            for (i, chunk) in int_part.as_bytes()[first..].chunks(3).enumerate() {
                if first != 0 || i != 0 {
                    out.push(self.group_sep);
                }
                // chunks of an ASCII digit string
                out.push_str(std::str::from_utf8(chunk).unwrap_or(""));
            }
        } else {
            out.push_str(int_part);
        }
        if let Some(fraction) = fraction {
            out.push(self.decimal_sep);
            out.push_str(fraction);
        }
        out
    }

    /// Parse a float in this format: grouping separators are removed, the
    /// decimal separator becomes `.`.
    pub fn parse(&self, text: &str) -> Result<f64, ParseFloatError> {
        let mut normalized = String::with_capacity(text.len());
        for c in text.trim().chars() {
            if c == self.group_sep {
                continue;
            }
            if c == self.decimal_sep {
                normalized.push('.');
            } else {
                normalized.push(c);
            }
        }
        normalized.parse::<f64>()
    }
}

/// [`NumberFormat::format`] with the default separators.
#[must_use]
pub fn format_float(value: f64, prec: usize) -> String {
    NumberFormat::default().format(value, prec)
}

/// [`NumberFormat::format_grouped`] with the default separators.
#[must_use]
pub fn format_float_grouped(value: f64, prec: usize) -> String {
    NumberFormat::default().format_grouped(value, prec)
}

/// [`NumberFormat::parse`] with the default separators.
pub fn parse_float(text: &str) -> Result<f64, ParseFloatError> {
    NumberFormat::default().parse(text)
}


fn strip_locale_suffixes(raw: &str) -> String {
    // "de_DE.UTF-8@euro" → "de_DE"
    let raw = raw.split('@').next().unwrap_or(raw);
    let raw = raw.split('.').next().unwrap_or(raw);
    raw.trim().to_string()
}
