//! Workbook emission for customer reports and raw table dumps.

use std::path::{Path, PathBuf};

use nodetally_io_xlsx::{
    SpecXlsxSheetWriteOptions, SpecXlsxWriteOptions, XlsxWriter, derive_default_xlsx_formats,
};
use polars::prelude::DataFrame;

use crate::error::Result;
use crate::report::{CustomerReport, derive_report_header_grid};

/// Sheet used when there is no customer to report.
pub const C_SHEET_NAME_EMPTY: &str = "Summary";

/// What was written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitSummary {
    pub path: PathBuf,
    /// `(requested name, sheet names written)` per report.
    pub sheets: Vec<(String, Vec<String>)>,
    pub warnings: Vec<String>,
}

impl EmitSummary {
    pub fn log(&self) {
        for (c_requested, l_written) in &self.sheets {
            tracing::info!(customer = %c_requested, sheets = ?l_written, "sheet written");
        }
        if !self.warnings.is_empty() {
            tracing::warn!(count = self.warnings.len(), "workbook written with warnings");
        }
    }
}

fn derive_report_sheet_options(report: &CustomerReport) -> SpecXlsxSheetWriteOptions {
    SpecXlsxSheetWriteOptions {
        col_freeze: 2,
        if_merge_header: true,
        if_keep_missing_values: Some(false),
        rows_emphasized: vec![report.rows.len()],
        ..Default::default()
    }
}

/// Write one sheet per report to `path`; the workbook is saved before returning.
///
/// With no reports a single empty report is written so the workbook is never sheetless.
pub fn emit_customer_reports(reports: &[CustomerReport], path: &Path) -> Result<EmitSummary> {
    let mut writer = XlsxWriter::new(
        path,
        derive_default_xlsx_formats(),
        SpecXlsxWriteOptions::default(),
    );
    let l_header_grid = derive_report_header_grid();

    let report_empty;
    let l_reports: Vec<&CustomerReport> = if reports.is_empty() {
        tracing::warn!("no customer reports; writing an empty summary sheet");
        report_empty = CustomerReport::finalize(C_SHEET_NAME_EMPTY, Vec::new());
        vec![&report_empty]
    } else {
        reports.iter().collect()
    };

    let mut summary = EmitSummary {
        path: writer.file_out().to_path_buf(),
        ..Default::default()
    };
    for report in l_reports {
        let df = report.to_dataframe()?;
        let sheet_report = writer.write_sheet(
            &df,
            &report.customer_name,
            Some(l_header_grid.as_slice()),
            &derive_report_sheet_options(report),
        )?;
        summary.sheets.push((
            sheet_report.sheet_name_requested.clone(),
            sheet_report
                .sheets
                .iter()
                .map(|slice| slice.sheet_name.clone())
                .collect(),
        ));
        summary.warnings.extend(sheet_report.warnings);
    }

    writer.close()?;
    tracing::info!(path = %path.display(), sheets = summary.sheets.len(), "report workbook saved");
    Ok(summary)
}

/// Write `df` as-is to `path` on a sheet named after `table`.
pub fn dump_table(df: &DataFrame, table: &str, path: &Path) -> Result<()> {
    let mut writer = XlsxWriter::new(
        path,
        derive_default_xlsx_formats(),
        SpecXlsxWriteOptions::default(),
    );
    writer.write_sheet(df, table, None, &SpecXlsxSheetWriteOptions::default())?;
    writer.close()?;
    tracing::info!(table, path = %path.display(), rows = df.height(), "table dumped");
    Ok(())
}
