//! Statement-text parsing: per-provider line grammar plus date and amount
//! normalization.
//!
//! Statements routinely contain headers, footers and totals that are not
//! transactions; lines that fail the grammar are skipped without error.

use chrono::NaiveDate;
use regex::Regex;

use crate::types::{ProviderId, TollTransaction};

/// Named-capture grammar for one provider's transaction lines.
///
/// A line is anchored on: transaction date, optional posted date, plate
/// (may be empty), transponder (may be empty), free-text description and a
/// trailing amount token.
#[derive(Debug, Clone)]
pub struct LineGrammar {
    regex: Regex,
}

/// Structured output of one matched statement line.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub transaction_date: NaiveDate,
    pub posted_date: Option<NaiveDate>,
    pub plate: Option<String>,
    pub transponder: Option<String>,
    pub description: Option<String>,
    pub amount_cents: i64,
}

impl LineGrammar {
    /// Grammar with a transaction date followed by an optional posted date.
    pub fn with_posted_date() -> Self {
        Self {
            regex: Regex::new(
                r"(?P<txn_date>\d{2}/\d{2}/\d{4})\s+(?:(?P<posted_date>\d{2}/\d{2}/\d{4})\s+)?(?P<plate>[A-Z0-9-]*)\s+(?P<transponder>[A-Z0-9-]*)\s+(?P<description>[A-Za-z0-9\s\-]+?)\s+(?P<amount>-?\$?\d+,?\d*\.\d{2})$",
            )
            .unwrap(),
        }
    }

    /// Grammar with a single transaction date and no posted date column.
    pub fn transaction_date_only() -> Self {
        Self {
            regex: Regex::new(
                r"(?P<txn_date>\d{2}/\d{2}/\d{4})\s+(?P<plate>[A-Z0-9-]*)\s+(?P<transponder>[A-Z0-9-]*)\s+(?P<description>[A-Za-z0-9\s\-]+?)\s+(?P<amount>-?\$?\d+,?\d*\.\d{2})$",
            )
            .unwrap(),
        }
    }

    /// Match one trimmed line. `None` means the line is not a transaction.
    pub fn parse_line(&self, line: &str) -> Option<ParsedLine> {
        let caps = self.regex.captures(line)?;

        // A date that does not normalize rejects the line; dates are never
        // invented.
        let transaction_date = normalize_date(caps.name("txn_date")?.as_str())?;
        let posted_date = match caps.name("posted_date") {
            Some(m) => Some(normalize_date(m.as_str())?),
            None => None,
        };
        let amount_cents = amount_to_cents(caps.name("amount")?.as_str())?;

        Some(ParsedLine {
            transaction_date,
            posted_date,
            plate: non_empty(caps.name("plate").map(|m| m.as_str())),
            transponder: non_empty(caps.name("transponder").map(|m| m.as_str())),
            description: non_empty(caps.name("description").map(|m| m.as_str())),
            amount_cents,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Normalize a statement date to a calendar date.
///
/// Canonical `YYYY-MM-DD` passes through; `MM/DD/YYYY` and `MM-DD-YYYY` are
/// reordered. Anything else is rejected.
pub fn normalize_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    for format in ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return Some(date);
        }
    }

    None
}

/// Normalize an amount token to signed integer cents.
///
/// Strips currency symbols and thousands separators, keeping digits, the
/// decimal point and a single leading minus, then rounds half away from zero
/// on the decimal digits. Working on digits rather than an intermediate
/// float keeps values like `1.005` from rounding down through a float
/// artifact.
pub fn amount_to_cents(raw: &str) -> Option<i64> {
    let filtered: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    let negative = filtered.starts_with('-');
    let unsigned = filtered.trim_start_matches('-');
    if unsigned.contains('-') {
        return None;
    }

    let (whole, frac) = match unsigned.split_once('.') {
        Some((w, f)) => (w, f),
        None => (unsigned, ""),
    };
    if frac.contains('.') || (whole.is_empty() && frac.is_empty()) {
        return None;
    }

    let whole_cents = if whole.is_empty() {
        0
    } else {
        whole.parse::<i64>().ok()?.checked_mul(100)?
    };

    let digit = |c: char| c as i64 - '0' as i64;
    let mut frac_digits = frac.chars();
    let tenths = frac_digits.next().map(digit).unwrap_or(0);
    let hundredths = frac_digits.next().map(digit).unwrap_or(0);
    let thousandths = frac_digits.next().map(digit).unwrap_or(0);

    let mut cents = whole_cents + tenths * 10 + hundredths;
    if thousandths >= 5 {
        cents += 1;
    }

    Some(if negative { -cents } else { cents })
}

/// Split statement text into trimmed non-empty lines and collect every line
/// matching the grammar as a transaction tagged with the statement's key.
pub fn parse_statement_text(
    grammar: &LineGrammar,
    provider: ProviderId,
    statement_date: NaiveDate,
    text: &str,
) -> Vec<TollTransaction> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| grammar.parse_line(line))
        .map(|parsed| TollTransaction {
            provider,
            statement_date,
            transaction_date: parsed.transaction_date,
            posted_date: parsed.posted_date,
            plate: parsed.plate,
            transponder: parsed.transponder,
            location: None,
            description: parsed.description,
            amount_cents: parsed.amount_cents,
        })
        .collect()
}
