//! XLSX writer kernel that lays polars frames out as styled worksheets.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use polars::prelude::{AnyValue, DataFrame};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};

use crate::error::{Result, XlsxWriteError};
use crate::spec::{
    EnumAutofitColumnsRule, EnumCellValue, SpecAutofitCellsPolicy, SpecCellFormat,
    SpecFormatPresets, SpecSheetSlice, SpecXlsxReport, SpecXlsxValuePolicy, SpecXlsxWriteOptions,
};
use crate::util::{
    apply_vertical_run_text_blankout, convert_cell_value, derive_horizontal_merge_tracker,
    derive_unique_sheet_name, plan_horizontal_merges, plan_sheet_slices,
    plan_vertical_visual_merge_borders, sanitize_sheet_name, validate_unique_columns,
};

/// Per-sheet call options.
#[derive(Default, Debug, Clone)]
pub struct SpecXlsxSheetWriteOptions {
    /// Number of frozen columns.
    pub col_freeze: usize,
    /// Frozen row index; defaults to header height when `None`.
    pub row_freeze: Option<usize>,
    /// Enable merged multi-row header behavior.
    pub if_merge_header: bool,
    /// Override writer-level keep-missing behavior.
    pub if_keep_missing_values: Option<bool>,
    /// Column autofit policy.
    pub policy_autofit: SpecAutofitCellsPolicy,
    /// Body row indices (0-based, header excluded) drawn with the emphasis patch.
    pub rows_emphasized: Vec<usize>,
}

/// Stateful workbook writer.
pub struct XlsxWriter {
    path_file_out: PathBuf,
    workbook: Workbook,
    formats: SpecFormatPresets,
    write_options: SpecXlsxWriteOptions,
    set_sheet_names_existing: BTreeSet<String>,
    l_reports: Vec<SpecXlsxReport>,
    if_closed: bool,
}

impl XlsxWriter {
    /// Create writer bound to output path and format/options presets.
    ///
    /// The workbook is buffered in memory until [`Self::close`] is called.
    pub fn new(
        path_file_out: impl Into<PathBuf>,
        formats: SpecFormatPresets,
        write_options: SpecXlsxWriteOptions,
    ) -> Self {
        Self {
            path_file_out: path_file_out.into(),
            workbook: Workbook::new(),
            formats,
            write_options,
            set_sheet_names_existing: BTreeSet::new(),
            l_reports: Vec::new(),
            if_closed: false,
        }
    }

    /// Output file path.
    pub fn file_out(&self) -> &Path {
        &self.path_file_out
    }

    /// Per-sheet write reports collected so far.
    pub fn report(&self) -> &[SpecXlsxReport] {
        &self.l_reports
    }

    /// Flush workbook to disk. Idempotent.
    pub fn close(&mut self) -> Result<()> {
        if self.if_closed {
            return Ok(());
        }
        self.workbook
            .save(&self.path_file_out)
            .map_err(|source| XlsxWriteError::Save {
                path: self.path_file_out.clone(),
                source,
            })?;
        self.if_closed = true;
        tracing::debug!(path = %self.path_file_out.display(), "workbook saved");
        Ok(())
    }

    /// Write one logical sheet from an in-memory frame.
    ///
    /// `header_grid` replaces the default single header row (the column names). Every
    /// row of the grid must be exactly as wide as `df_data`.
    pub fn write_sheet(
        &mut self,
        df_data: &DataFrame,
        sheet_name: &str,
        header_grid: Option<&[Vec<String>]>,
        options: &SpecXlsxSheetWriteOptions,
    ) -> Result<SpecXlsxReport> {
        if self.if_closed {
            return Err(XlsxWriteError::Closed);
        }
        validate_policy_autofit(&options.policy_autofit)?;

        let if_keep_missing_values = options
            .if_keep_missing_values
            .unwrap_or(self.write_options.keep_missing_values);

        let l_colnames_df: Vec<String> = df_data
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        validate_unique_columns(&l_colnames_df)?;

        let n_width_df = l_colnames_df.len();
        let n_height_df = df_data.height();

        let l_header_grid = match header_grid {
            None => vec![l_colnames_df.clone()],
            Some(l_rows) => {
                if l_rows.is_empty() {
                    return Err(XlsxWriteError::InvalidInput(
                        "header_grid must have >= 1 row.".to_string(),
                    ));
                }
                if l_rows.iter().any(|row| row.len() != n_width_df) {
                    return Err(XlsxWriteError::InvalidInput(format!(
                        "header_grid rows must be {n_width_df} cells wide."
                    )));
                }
                l_rows.to_vec()
            }
        };
        let n_rows_header = l_header_grid.len();

        let (set_cols_idx_numeric, set_cols_idx_integer) = if self.write_options.infer_numeric_cols
        {
            derive_numeric_column_indices(df_data)
        } else {
            (BTreeSet::new(), BTreeSet::new())
        };
        let set_rows_emphasized: BTreeSet<usize> =
            options.rows_emphasized.iter().copied().collect();

        let mut report = SpecXlsxReport {
            sheet_name_requested: sheet_name.to_string(),
            ..Default::default()
        };

        let c_sheet_name_clean = sanitize_sheet_name(sheet_name, "_");
        if c_sheet_name_clean != sheet_name {
            report.warn(format!(
                "Sheet name {sheet_name:?} sanitized to {c_sheet_name_clean:?}."
            ));
        }

        let l_sheet_parts = plan_sheet_slices(
            n_height_df,
            n_width_df,
            n_rows_header,
            &c_sheet_name_clean,
            &mut report,
        )?;

        let n_row_freeze = options.row_freeze.unwrap_or(n_rows_header);
        let l_cols = df_data.get_columns();
        let value_policy = &self.write_options.value_policy;

        for sheet_slice in l_sheet_parts {
            let sheet_name_unique =
                derive_unique_sheet_name(&sheet_slice.sheet_name, &mut self.set_sheet_names_existing);
            if sheet_name_unique != sheet_slice.sheet_name {
                report.warn(format!(
                    "Sheet name {:?} already used; wrote {sheet_name_unique:?}.",
                    sheet_slice.sheet_name
                ));
            }

            let worksheet = self.workbook.add_worksheet();
            worksheet.set_name(&sheet_name_unique)?;

            let l_cols_idx_abs: Vec<usize> =
                (sheet_slice.col_start_inclusive..sheet_slice.col_end_exclusive).collect();

            let l_fmt_spec_by_col: Vec<SpecCellFormat> = l_cols_idx_abs
                .iter()
                .map(|n_idx_col| {
                    if set_cols_idx_integer.contains(n_idx_col) {
                        self.formats.integer.clone()
                    } else if set_cols_idx_numeric.contains(n_idx_col) {
                        self.formats.decimal.clone()
                    } else {
                        self.formats.text.clone()
                    }
                })
                .collect();
            let l_fmt_data_by_col: Vec<Format> = l_fmt_spec_by_col
                .iter()
                .map(derive_rust_xlsx_format)
                .collect();
            let l_fmt_emphasis_by_col: Vec<Format> = l_fmt_spec_by_col
                .iter()
                .map(|fmt| derive_rust_xlsx_format(&fmt.merge(&self.formats.emphasis)))
                .collect();

            let l_header_grid_slice: Vec<Vec<String>> = l_header_grid
                .iter()
                .map(|row| {
                    row[sheet_slice.col_start_inclusive..sheet_slice.col_end_exclusive].to_vec()
                })
                .collect();

            let n_width_slice = l_cols_idx_abs.len();
            let mut l_width_by_col_header = vec![0usize; n_width_slice];
            let mut l_width_by_col_body = vec![0usize; n_width_slice];
            let if_autofit_columns = !matches!(
                options.policy_autofit.rule_columns,
                EnumAutofitColumnsRule::None
            );

            if if_autofit_columns {
                for row in &l_header_grid_slice {
                    for (n_idx_col, value) in row.iter().enumerate() {
                        l_width_by_col_header[n_idx_col] = usize::max(
                            l_width_by_col_header[n_idx_col],
                            estimate_unicode_string_width(value),
                        );
                    }
                }
            }

            write_header(
                worksheet,
                l_header_grid_slice,
                options.if_merge_header,
                &self.formats.header,
            )?;

            worksheet.set_freeze_panes(
                cast_row_num(n_row_freeze)?,
                cast_col_num(usize::min(options.col_freeze, n_width_slice))?,
            )?;

            let n_rows_inferred_max = options
                .policy_autofit
                .height_body_inferred_max
                .unwrap_or(usize::MAX);

            for (n_row_local, n_row_abs) in
                (sheet_slice.row_start_inclusive..sheet_slice.row_end_exclusive).enumerate()
            {
                let if_emphasized = set_rows_emphasized.contains(&n_row_abs);
                for (n_idx_col, n_idx_col_abs) in l_cols_idx_abs.iter().enumerate() {
                    let if_is_numeric_col = set_cols_idx_numeric.contains(n_idx_col_abs);
                    let value_raw = derive_cell_value_from_any_value(
                        l_cols[*n_idx_col_abs].get(n_row_abs)?,
                    );
                    let value = convert_cell_value(
                        &value_raw,
                        if_is_numeric_col,
                        if_keep_missing_values,
                        value_policy,
                    );

                    if if_autofit_columns && n_row_local < n_rows_inferred_max {
                        l_width_by_col_body[n_idx_col] = usize::max(
                            l_width_by_col_body[n_idx_col],
                            estimate_width_len(
                                &value,
                                set_cols_idx_integer.contains(n_idx_col_abs),
                                if_keep_missing_values,
                                value_policy,
                            ),
                        );
                    }

                    let fmt_cell = if if_emphasized {
                        &l_fmt_emphasis_by_col[n_idx_col]
                    } else {
                        &l_fmt_data_by_col[n_idx_col]
                    };
                    write_cell_with_format(
                        worksheet,
                        n_rows_header + n_row_local,
                        n_idx_col,
                        &value,
                        fmt_cell,
                    )?;
                }
            }

            if if_autofit_columns {
                let n_min = usize::max(1, options.policy_autofit.width_cell_min);
                let n_max = usize::min(
                    255,
                    usize::max(n_min, options.policy_autofit.width_cell_max),
                );
                let n_pad = options.policy_autofit.width_cell_padding;

                for n_idx_col in 0..n_width_slice {
                    let n_width_recorded = match options.policy_autofit.rule_columns {
                        EnumAutofitColumnsRule::Body => l_width_by_col_body[n_idx_col],
                        EnumAutofitColumnsRule::All => usize::max(
                            l_width_by_col_header[n_idx_col],
                            l_width_by_col_body[n_idx_col],
                        ),
                        EnumAutofitColumnsRule::Header | EnumAutofitColumnsRule::None => {
                            l_width_by_col_header[n_idx_col]
                        }
                    };
                    let n_width_final =
                        usize::min(n_max, usize::max(n_min, n_width_recorded + n_pad));
                    worksheet.set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)?;
                }
            }

            tracing::debug!(
                sheet = %sheet_name_unique,
                rows = sheet_slice.row_end_exclusive - sheet_slice.row_start_inclusive,
                cols = n_width_slice,
                "worksheet written"
            );

            report.sheets.push(SpecSheetSlice {
                sheet_name: sheet_name_unique,
                ..sheet_slice
            });
        }

        for c_warning in &report.warnings {
            tracing::warn!(sheet = %sheet_name, "{c_warning}");
        }
        self.l_reports.push(report.clone());
        Ok(report)
    }
}

/// Estimate displayed width units for one normalized cell value.
pub fn estimate_width_len(
    value: &EnumCellValue,
    if_is_integer_col: bool,
    if_keep_missing_values: bool,
    value_policy: &SpecXlsxValuePolicy,
) -> usize {
    match value {
        EnumCellValue::None => {
            if if_keep_missing_values {
                value_policy.missing_value_str.len()
            } else {
                0
            }
        }
        EnumCellValue::String(s) => estimate_unicode_string_width(s),
        EnumCellValue::Number(n) => {
            if if_is_integer_col {
                (*n as i64).to_string().len()
            } else {
                format!("{n:.2}").len()
            }
        }
    }
}

fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

fn validate_policy_autofit(policy_autofit: &SpecAutofitCellsPolicy) -> Result<()> {
    if policy_autofit.width_cell_min == 0 {
        return Err(XlsxWriteError::InvalidInput(
            "policy_autofit.width_cell_min must be >= 1.".to_string(),
        ));
    }
    if policy_autofit.width_cell_max < policy_autofit.width_cell_min {
        return Err(XlsxWriteError::InvalidInput(
            "policy_autofit.width_cell_max must be >= policy_autofit.width_cell_min.".to_string(),
        ));
    }
    Ok(())
}

/// Return `(numeric, integer)` column index sets inferred from dtypes.
fn derive_numeric_column_indices(df: &DataFrame) -> (BTreeSet<usize>, BTreeSet<usize>) {
    let mut set_numeric = BTreeSet::new();
    let mut set_integer = BTreeSet::new();
    for (n_idx, col) in df.get_columns().iter().enumerate() {
        let dtype = col.dtype();
        if dtype.is_numeric() {
            set_numeric.insert(n_idx);
            if dtype.is_integer() {
                set_integer.insert(n_idx);
            }
        }
    }
    (set_numeric, set_integer)
}

fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::Boolean(val) => {
            EnumCellValue::String(if val { "True" } else { "False" }.to_string())
        }
        AnyValue::UInt32(val) => EnumCellValue::Number(val as f64),
        AnyValue::UInt64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Int64(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float32(val) => EnumCellValue::Number(val as f64),
        AnyValue::Float64(val) => EnumCellValue::Number(val),
        _ => EnumCellValue::String(value.to_string()),
    }
}

fn write_header(
    worksheet: &mut Worksheet,
    mut header_grid: Vec<Vec<String>>,
    if_merge: bool,
    fmt_header: &SpecCellFormat,
) -> Result<()> {
    let fmt_header_base = derive_rust_xlsx_format(fmt_header);

    let (dict_vertical_borders, dict_horizontal_merges_by_row, set_merged_cells) = if if_merge {
        let dict_vertical_borders = plan_vertical_visual_merge_borders(&header_grid);
        apply_vertical_run_text_blankout(&mut header_grid);
        let dict_horizontal_merges_by_row = plan_horizontal_merges(&header_grid);
        let set_merged_cells = derive_horizontal_merge_tracker(&dict_horizontal_merges_by_row);
        (
            dict_vertical_borders,
            dict_horizontal_merges_by_row,
            set_merged_cells,
        )
    } else {
        (BTreeMap::new(), BTreeMap::new(), BTreeSet::new())
    };

    for (row_idx, row_values) in header_grid.iter().enumerate() {
        for (col_idx, cell_value) in row_values.iter().enumerate() {
            if set_merged_cells.contains(&(row_idx, col_idx)) {
                continue;
            }

            let value = if cell_value.is_empty() {
                EnumCellValue::None
            } else {
                EnumCellValue::String(cell_value.clone())
            };
            match dict_vertical_borders.get(&(row_idx, col_idx)) {
                Some(border) => write_cell_with_format(
                    worksheet,
                    row_idx,
                    col_idx,
                    &value,
                    &derive_rust_xlsx_format(&fmt_header.with_border(border)),
                )?,
                None => write_cell_with_format(worksheet, row_idx, col_idx, &value, &fmt_header_base)?,
            }
        }

        if let Some(l_merges) = dict_horizontal_merges_by_row.get(&row_idx) {
            for merge in l_merges {
                worksheet.merge_range(
                    cast_row_num(row_idx)?,
                    cast_col_num(merge.col_idx_start)?,
                    cast_row_num(row_idx)?,
                    cast_col_num(merge.col_idx_end)?,
                    &merge.text,
                    &fmt_header_base,
                )?;
            }
        }
    }

    Ok(())
}

fn write_cell_with_format(
    worksheet: &mut Worksheet,
    row_idx: usize,
    col_idx: usize,
    value: &EnumCellValue,
    format: &Format,
) -> Result<()> {
    let n_row = cast_row_num(row_idx)?;
    let n_col = cast_col_num(col_idx)?;
    match value {
        EnumCellValue::None => {
            worksheet.write_blank(n_row, n_col, format)?;
        }
        EnumCellValue::String(val) => {
            worksheet.write_string_with_format(n_row, n_col, val, format)?;
        }
        EnumCellValue::Number(val) => {
            worksheet.write_number_with_format(n_row, n_col, *val, format)?;
        }
    }
    Ok(())
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }

    for c_align in [&spec.align, &spec.valign].into_iter().flatten() {
        if let Some(align) = derive_format_align(c_align) {
            format = format.set_align(align);
        }
    }

    if let Some(val) = &spec.num_format {
        format = format.set_num_format(val.clone());
    }
    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }

    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }
    if let Some(val) = spec.top {
        format = format.set_border_top(derive_format_border(val));
    }
    if let Some(val) = spec.bottom {
        format = format.set_border_bottom(derive_format_border(val));
    }
    if let Some(val) = spec.left {
        format = format.set_border_left(derive_format_border(val));
    }
    if let Some(val) = spec.right {
        format = format.set_border_right(derive_format_border(val));
    }

    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    match align.trim().to_ascii_lowercase().as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "center_across" => Some(FormatAlign::CenterAcross),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| XlsxWriteError::IndexOverflow { axis: "row", value })
}

fn cast_col_num(value: usize) -> Result<u16> {
    u16::try_from(value).map_err(|_| XlsxWriteError::IndexOverflow {
        axis: "column",
        value,
    })
}
