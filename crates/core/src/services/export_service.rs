use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::allocation::{total_allocated, Allocation};

/// Memo used when the user didn't type any notes.
const DEFAULT_MEMO: &str = "Profit allocation transfer";

/// The account credited as the source of every allocation transfer.
const SOURCE_ACCOUNT: &str = "Operating Account";

/// A file ready for the frontend to hand to the user (download blob,
/// disk write, clipboard — the core doesn't care).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub mime_type: String,
    pub contents: String,
}

/// Renders an allocation result into the two export artifacts: a
/// journal-entry CSV (QuickBooks-style, imports into most accounting
/// software) and a human-readable plaintext report.
///
/// Monetary values are rounded to two decimals here and nowhere else.
/// Both exports refuse to run on an empty allocation list — no partial
/// files are ever produced.
pub struct ExportService;

impl ExportService {
    pub fn new() -> Self {
        Self
    }

    /// Build the journal-entry CSV: one credit line against the operating
    /// account for the full allocated total, then one debit line per
    /// bucket with a positive amount.
    ///
    /// Zero-amount buckets get no debit line but still count toward the
    /// credited total, so the entry always balances.
    pub fn journal_entry_csv(
        &self,
        allocations: &[Allocation],
        notes: &str,
        date: NaiveDate,
    ) -> Result<ExportFile, CoreError> {
        if allocations.is_empty() {
            return Err(CoreError::ExportPreconditionFailed);
        }

        let today = date.format("%Y-%m-%d");
        let memo = if notes.is_empty() { DEFAULT_MEMO } else { notes };
        let total = total_allocated(allocations);

        let mut csv = String::from("*Date,*Account,Debit,Credit,*Description,Name\n");

        // Credit the operating account (source)
        csv.push_str(&format!(
            "{today},{SOURCE_ACCOUNT},,{total:.2},\"{}\",\n",
            escape_quotes(memo)
        ));

        // Debit each allocation bucket
        for allocation in allocations {
            if allocation.amount > 0.0 {
                csv.push_str(&format!(
                    "{today},{},{:.2},,\"{} - {}\",\n",
                    allocation.account,
                    allocation.amount,
                    escape_quotes(memo),
                    allocation.bucket_name,
                ));
            }
        }

        Ok(ExportFile {
            filename: format!("profit-allocation-{today}.csv"),
            mime_type: "text/csv".to_string(),
            contents: csv,
        })
    }

    /// Build the plaintext report: a fixed-width allocation table, the
    /// totals, optional notes, and the five-step posting instructions.
    pub fn detailed_report(
        &self,
        allocations: &[Allocation],
        profit_amount: f64,
        identity: &str,
        notes: &str,
        date: NaiveDate,
    ) -> Result<ExportFile, CoreError> {
        if allocations.is_empty() {
            return Err(CoreError::ExportPreconditionFailed);
        }

        let today = date.format("%Y-%m-%d");
        let total = total_allocated(allocations);

        let mut report = String::from("Profit Allocation Report\n");
        report.push_str(&format!("Date: {today}\n"));
        report.push_str(&format!("User: {identity}\n"));
        report.push('\n');
        report.push_str(&format!("Total Profit: ${profit_amount:.2}\n"));
        report.push('\n');
        report.push_str("Allocations:\n");
        report.push_str("----------------------------------------\n");

        for a in allocations {
            // name padded to 25, percentage to one decimal, amount to
            // two decimals right-aligned in a 12-char column
            report.push_str(&format!(
                "{:<25} {:.1}%  ${:>12}\n",
                a.bucket_name,
                a.percentage,
                format!("{:.2}", a.amount),
            ));
        }

        report.push_str("----------------------------------------\n");
        report.push_str(&format!("Total Allocated: ${total:.2}\n"));
        report.push('\n');

        if !notes.is_empty() {
            report.push_str(&format!("Notes: {notes}\n"));
        }

        report.push('\n');
        report.push_str("Journal Entry Instructions:\n");
        report.push_str("1. Import the CSV file into your accounting software\n");
        report.push_str("2. Review the entries for accuracy\n");
        report.push_str("3. Post the journal entry\n");
        report.push_str("4. Make the actual bank transfers\n");
        report.push_str("5. Match the transfers in your bank feed\n");

        Ok(ExportFile {
            filename: format!("profit-allocation-report-{today}.txt"),
            mime_type: "text/plain".to_string(),
            contents: report,
        })
    }
}

impl Default for ExportService {
    fn default() -> Self {
        Self::new()
    }
}

/// CSV-escape double quotes inside an already-quoted field.
fn escape_quotes(field: &str) -> String {
    field.replace('"', "\"\"")
}
