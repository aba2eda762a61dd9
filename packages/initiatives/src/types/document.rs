//! Document and fiscal-period types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Types of corporate disclosure documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    EarningsCall,
    AnnualReport,
    QuarterlyReport,
    InvestorPresentation,
    PressRelease,
    SecFiling,
    Other,
}

impl Default for DocumentType {
    fn default() -> Self {
        Self::Other
    }
}

/// Source file formats accepted by the text-extraction seam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Pdf,
    Docx,
    Pptx,
    Txt,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Pptx => "pptx",
            Self::Txt => "txt",
        };
        write!(f, "{s}")
    }
}

/// Document processing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl Default for ProcessingStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// A fiscal period: a year, optionally narrowed to a quarter.
///
/// Fiscal quarters are treated as calendar quarters; company-specific
/// fiscal calendars are resolved upstream before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub year: i32,
    pub quarter: Option<u32>,
}

impl FiscalPeriod {
    /// A full fiscal year.
    pub fn year(year: i32) -> Self {
        Self { year, quarter: None }
    }

    /// A specific quarter.
    pub fn quarter(year: i32, quarter: u32) -> Self {
        debug_assert!((1..=4).contains(&quarter));
        Self {
            year,
            quarter: Some(quarter),
        }
    }

    /// First calendar day of the period.
    pub fn start_date(&self) -> NaiveDate {
        let month = match self.quarter {
            Some(q) => (q - 1) * 3 + 1,
            None => 1,
        };
        NaiveDate::from_ymd_opt(self.year, month, 1).expect("valid fiscal period start")
    }

    /// Last calendar day of the period.
    pub fn end_date(&self) -> NaiveDate {
        let (year, month) = match self.quarter {
            Some(4) | None => (self.year, 12),
            Some(q) => (self.year, q * 3),
        };
        let last_day = match month {
            3 | 12 => 31,
            6 => 30,
            9 => 30,
            _ => unreachable!(),
        };
        NaiveDate::from_ymd_opt(year, month, last_day).expect("valid fiscal period end")
    }

    /// The period immediately after this one.
    pub fn next(&self) -> Self {
        match self.quarter {
            Some(4) => Self::quarter(self.year + 1, 1),
            Some(q) => Self::quarter(self.year, q + 1),
            None => Self::year(self.year + 1),
        }
    }
}

impl std::fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.quarter {
            Some(q) => write!(f, "Q{} {}", q, self.year),
            None => write!(f, "FY{}", self.year),
        }
    }
}

/// A corporate disclosure document.
///
/// Created on upload in `Pending` status; mutated by the ingestion pipeline
/// as it progresses. Immutable once `Completed` except via an explicit
/// reprocess request, which resets it to `Pending` and invalidates derived
/// chunks and index entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub doc_type: DocumentType,
    pub format: SourceFormat,

    /// Fiscal period the document reports on (temporal anchor)
    pub fiscal_period: Option<FiscalPeriod>,

    /// Publication date (fallback temporal anchor)
    pub published_at: NaiveDate,

    pub status: ProcessingStatus,
    pub chunk_count: usize,

    /// Human-readable reason when `status == Failed`
    pub failure_reason: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a new pending document.
    pub fn new(
        company_id: Uuid,
        title: impl Into<String>,
        doc_type: DocumentType,
        format: SourceFormat,
        published_at: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            company_id,
            title: title.into(),
            doc_type,
            format,
            fiscal_period: None,
            published_at,
            status: ProcessingStatus::Pending,
            chunk_count: 0,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the fiscal period.
    pub fn with_fiscal_period(mut self, period: FiscalPeriod) -> Self {
        self.fiscal_period = Some(period);
        self
    }

    /// Transition to `Processing`.
    pub fn mark_processing(&mut self) {
        self.status = ProcessingStatus::Processing;
        self.failure_reason = None;
        self.updated_at = Utc::now();
    }

    /// Transition to `Completed` with the final chunk count.
    pub fn mark_completed(&mut self, chunk_count: usize) {
        self.status = ProcessingStatus::Completed;
        self.chunk_count = chunk_count;
        self.failure_reason = None;
        self.updated_at = Utc::now();
    }

    /// Transition to `Failed` with a human-readable reason.
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = ProcessingStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.updated_at = Utc::now();
    }

    /// Reset to `Pending` for reprocessing. Derived chunks and index
    /// entries must be cleared by the caller before re-ingesting.
    pub fn reset_for_reprocess(&mut self) {
        self.status = ProcessingStatus::Pending;
        self.chunk_count = 0;
        self.failure_reason = None;
        self.updated_at = Utc::now();
    }

    /// Whether ingestion has completed successfully.
    pub fn is_processed(&self) -> bool {
        self.status == ProcessingStatus::Completed
    }

    /// The date used to anchor relative temporal expressions: the end of
    /// the fiscal period when known, otherwise the publication date.
    pub fn anchor_date(&self) -> NaiveDate {
        self.fiscal_period
            .map(|p| p.end_date())
            .unwrap_or(self.published_at)
    }
}
