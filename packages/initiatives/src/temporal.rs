//! Temporal normalization of extracted time references.
//!
//! Converts raw temporal expressions (explicit dates, fiscal-quarter
//! references, relative phrases) plus the anchoring document's fiscal
//! period into calendar date ranges. Ambiguous relative expressions
//! resolve against the document's own period, never the analysis run
//! time. Unresolvable expressions fall back to the document's publish
//! date, flagged as approximate.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::document::{Document, FiscalPeriod};

static QUARTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bq([1-4])\s*(?:of\s+)?(?:fy\s*)?(\d{4})\b").unwrap());
static FISCAL_YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bfy\s*(\d{4})\b").unwrap());
static HALF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bh([12])\s*(?:of\s+)?(\d{4})\b").unwrap());
static BARE_YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20\d{2})\b").unwrap());
static NEXT_N_YEARS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:over\s+)?the\s+next\s+(\d+|two|three|four|five)\s+years?\b").unwrap()
});

/// A normalized calendar period attached to a mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionDate {
    pub start: NaiveDate,
    pub end: NaiveDate,

    /// True when the expression could not be resolved and the document
    /// anchor was substituted.
    pub approximate: bool,
}

impl MentionDate {
    /// An exact single day.
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
            approximate: false,
        }
    }

    /// Cover a fiscal period.
    pub fn period(period: FiscalPeriod) -> Self {
        Self {
            start: period.start_date(),
            end: period.end_date(),
            approximate: false,
        }
    }

    /// Human-readable timeline description, e.g. "Q3 2024" or
    /// "Jul 2024 – Dec 2026".
    pub fn describe(&self) -> String {
        let prefix = if self.approximate { "~" } else { "" };
        if let Some(q) = same_quarter(self.start, self.end) {
            return format!("{prefix}{q}");
        }
        if self.start == self.end {
            return format!("{prefix}{}", self.start.format("%b %d, %Y"));
        }
        format!(
            "{prefix}{} – {}",
            self.start.format("%b %Y"),
            self.end.format("%b %Y")
        )
    }
}

fn same_quarter(start: NaiveDate, end: NaiveDate) -> Option<FiscalPeriod> {
    let q = FiscalPeriod::quarter(start.year(), (start.month0() / 3) + 1);
    (q.start_date() == start && q.end_date() == end).then_some(q)
}

/// The reference frame for resolving relative expressions: the document's
/// fiscal period, falling back to its publication date.
#[derive(Debug, Clone, Copy)]
pub struct TemporalAnchor {
    pub fiscal: Option<FiscalPeriod>,
    pub published: NaiveDate,
}

impl TemporalAnchor {
    /// Anchor for a document.
    pub fn for_document(doc: &Document) -> Self {
        Self {
            fiscal: doc.fiscal_period,
            published: doc.published_at,
        }
    }

    /// The period relative phrases count from.
    fn base_period(&self) -> FiscalPeriod {
        self.fiscal.unwrap_or_else(|| {
            FiscalPeriod::quarter(self.published.year(), (self.published.month0() / 3) + 1)
        })
    }

    /// The single date stamped on evidence from this document.
    pub fn mention_date(&self) -> NaiveDate {
        self.fiscal.map(|p| p.end_date()).unwrap_or(self.published)
    }

    /// Fallback when an expression cannot be resolved.
    fn fallback(&self) -> MentionDate {
        MentionDate {
            start: self.mention_date(),
            end: self.mention_date(),
            approximate: true,
        }
    }
}

/// Resolve a raw temporal expression against a document anchor.
///
/// Never returns nothing: an absent or unresolvable expression yields the
/// anchor date flagged approximate.
pub fn normalize(expr: Option<&str>, anchor: &TemporalAnchor) -> MentionDate {
    let Some(raw) = expr else {
        return anchor.fallback();
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return anchor.fallback();
    }

    // Explicit quarter: "Q3 2024", "Q3 of FY2024"
    if let Some(caps) = QUARTER_RE.captures(raw) {
        let quarter: u32 = caps[1].parse().unwrap_or(1);
        let year: i32 = caps[2].parse().unwrap_or(anchor.base_period().year);
        return MentionDate::period(FiscalPeriod::quarter(year, quarter));
    }

    // Half-year: "H2 2025"
    if let Some(caps) = HALF_RE.captures(raw) {
        let half: u32 = caps[1].parse().unwrap_or(1);
        let year: i32 = caps[2].parse().unwrap_or(anchor.base_period().year);
        let (start_q, end_q) = if half == 1 { (1, 2) } else { (3, 4) };
        return MentionDate {
            start: FiscalPeriod::quarter(year, start_q).start_date(),
            end: FiscalPeriod::quarter(year, end_q).end_date(),
            approximate: false,
        };
    }

    // Fiscal year: "FY2025"
    if let Some(caps) = FISCAL_YEAR_RE.captures(raw) {
        let year: i32 = caps[1].parse().unwrap_or(anchor.base_period().year);
        return MentionDate::period(FiscalPeriod::year(year));
    }

    let lower = raw.to_lowercase();
    let base = anchor.base_period();

    // Relative phrases, anchored on the document's own period
    if lower.contains("next quarter") {
        let next = FiscalPeriod::quarter(base.year, base.quarter.unwrap_or(4)).next();
        return MentionDate::period(next);
    }
    if lower.contains("next fiscal year") || lower.contains("next year") {
        return MentionDate::period(FiscalPeriod::year(base.year + 1));
    }
    if let Some(caps) = NEXT_N_YEARS_RE.captures(&lower) {
        let n: i32 = match &caps[1] {
            "two" => 2,
            "three" => 3,
            "four" => 4,
            "five" => 5,
            digits => digits.parse().unwrap_or(1),
        };
        return MentionDate {
            start: anchor.mention_date(),
            end: FiscalPeriod::year(base.year + n).end_date(),
            approximate: false,
        };
    }
    if lower.contains("end of the year") || lower.contains("end of this year") || lower.contains("year-end") {
        return MentionDate {
            start: anchor.mention_date(),
            end: FiscalPeriod::year(base.year).end_date(),
            approximate: false,
        };
    }
    if lower.contains("second half") {
        return MentionDate {
            start: FiscalPeriod::quarter(base.year, 3).start_date(),
            end: FiscalPeriod::year(base.year).end_date(),
            approximate: false,
        };
    }
    if lower.contains("this year") || lower.contains("this fiscal year") {
        return MentionDate::period(FiscalPeriod::year(base.year));
    }

    // Bare year, checked last so "FY2025" and "Q3 2024" win first
    if let Some(caps) = BARE_YEAR_RE.captures(raw) {
        if let Ok(year) = caps[1].parse::<i32>() {
            return MentionDate::period(FiscalPeriod::year(year));
        }
    }

    anchor.fallback()
}
