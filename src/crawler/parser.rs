//! Record extractor for rendered transaction tables
//!
//! A table row is exactly three cells: `account | transaction | amountAndCurrency`.
//! Cells are consumed from the end of the surface, three at a time, so the last
//! cell of each group is the combined amount and currency field.

use crate::render::Surface;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use thiserror::Error;

/// Cells contributed by every table row
pub const CELLS_PER_RECORD: usize = 3;

/// Leading non-digit run, digit/separator run, trailing non-digit run.
///
/// Digits are ASCII only; other scripts' digits count as currency text.
#[allow(clippy::expect_used)]
static AMOUNT_AND_CURRENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([^0-9]*)([0-9][.,\s0-9]*)([^0-9]*)").expect("amount regex is valid") // Static pattern, safe to panic
});

/// One transaction row
///
/// Amount and currency stay as text: no numeric parsing is attempted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Record {
    #[serde(rename = "Account")]
    pub account: String,

    #[serde(rename = "Transaction")]
    pub transaction: String,

    #[serde(rename = "Amount")]
    pub amount: String,

    #[serde(rename = "Currency")]
    pub currency: String,
}

/// A row that could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("No amount found in cell '{cell}'")]
    UnparseableAmount { cell: String },
}

/// Everything extracted from one surface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Records in consumption order (last table row first)
    pub records: Vec<Record>,

    /// Rows consumed but rejected
    pub rejected: Vec<ExtractError>,

    /// Cells left over when the cell count is not a multiple of three
    pub leftover_cells: usize,
}

impl Extraction {
    /// Number of records kept
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Splits a combined field such as `"€1 234,56"` or `"-12.50 USD"`
///
/// The currency is the leading non-digit run joined with the trailing one,
/// both trimmed together; the amount is the digit run, trimmed.
///
/// # Examples
///
/// ```
/// use pagesweep::crawler::split_amount_and_currency;
///
/// let (amount, currency) = split_amount_and_currency("73€").unwrap();
/// assert_eq!(amount, "73");
/// assert_eq!(currency, "€");
/// ```
pub fn split_amount_and_currency(cell: &str) -> Result<(String, String), ExtractError> {
    let captures =
        AMOUNT_AND_CURRENCY
            .captures(cell)
            .ok_or_else(|| ExtractError::UnparseableAmount {
                cell: cell.to_string(),
            })?;

    let left = captures.get(1).map_or("", |m| m.as_str());
    let amount = captures.get(2).map_or("", |m| m.as_str());
    let right = captures.get(3).map_or("", |m| m.as_str());

    Ok((
        amount.trim().to_string(),
        format!("{}{}", left, right).trim().to_string(),
    ))
}

/// Extracts records from a flat list of cell texts
///
/// Cells are consumed from the end in groups of `(amountAndCurrency,
/// transaction, account)`. When the count is not a multiple of three the
/// remaining one or two cells at the start are dropped and reported in
/// [`Extraction::leftover_cells`]. A group whose amount cannot be matched is
/// reported in [`Extraction::rejected`] without shifting the following groups.
pub fn extract_records(cells: &[String]) -> Extraction {
    let mut extraction = Extraction::default();

    let mut groups = cells.rchunks_exact(CELLS_PER_RECORD);
    for group in groups.by_ref() {
        let (account, transaction, amount_and_currency) = (&group[0], &group[1], &group[2]);

        match split_amount_and_currency(amount_and_currency) {
            Ok((amount, currency)) => extraction.records.push(Record {
                account: account.trim().to_string(),
                transaction: transaction.trim().to_string(),
                amount,
                currency,
            }),
            Err(e) => {
                tracing::warn!("Skipping malformed row: {}", e);
                extraction.rejected.push(e);
            }
        }
    }

    extraction.leftover_cells = groups.remainder().len();
    if extraction.leftover_cells > 0 {
        tracing::warn!(
            "Dropping {} leftover cell(s) that do not form a full row",
            extraction.leftover_cells
        );
    }

    extraction
}

/// Picks the first candidate surface that yields records
///
/// Surfaces are offered one at a time, in order, so the caller can stop
/// producing them as soon as one is accepted. Surfaces without records only
/// contribute their diagnostics.
#[derive(Debug, Default)]
pub struct SurfaceSelection {
    tried: usize,
    empty: Extraction,
}

impl SurfaceSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts from `surface`, returning the extraction if it holds records
    pub fn offer(&mut self, surface: &Surface) -> Option<Extraction> {
        self.tried += 1;
        let extraction = extract_records(&surface.extract_cells());

        if !extraction.is_empty() {
            tracing::trace!(
                "Surface {} yielded {} records",
                surface.source,
                extraction.len()
            );
            return Some(extraction);
        }

        self.empty.rejected.extend(extraction.rejected);
        self.empty.leftover_cells += extraction.leftover_cells;
        None
    }

    /// Number of surfaces offered so far
    pub fn tried(&self) -> usize {
        self.tried
    }

    /// Ends a selection where no surface had records
    ///
    /// The result is empty and carries the diagnostics of every surface tried.
    pub fn finish(self) -> Extraction {
        self.empty
    }
}
