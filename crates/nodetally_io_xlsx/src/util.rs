//! Stateless helper utilities used by the XLSX writer kernel.

use std::collections::{BTreeMap, BTreeSet};

use crate::conf::{
    C_SHEET_NAME_FALLBACK, C_SHEET_NAME_RESERVED, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX,
    TUP_EXCEL_ILLEGAL,
};
use crate::error::{Result, XlsxWriteError};
use crate::spec::{
    EnumCellValue, SpecCellBorder, SpecSheetHorizontalMerge, SpecSheetSlice, SpecXlsxReport,
    SpecXlsxValuePolicy,
};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Convert `NaN`/`Inf` to policy string; `None` for finite values.
pub fn convert_nan_inf_to_str(x: f64, value_policy: &SpecXlsxValuePolicy) -> Option<String> {
    if x.is_nan() {
        return Some(value_policy.nan_str.clone());
    }
    if x.is_infinite() {
        return Some(if x.is_sign_positive() {
            value_policy.posinf_str.clone()
        } else {
            value_policy.neginf_str.clone()
        });
    }
    None
}

/// Normalize cell value according to column kind and value policy.
pub fn convert_cell_value(
    value: &EnumCellValue,
    if_is_numeric_col: bool,
    if_keep_missing_values: bool,
    value_policy: &SpecXlsxValuePolicy,
) -> EnumCellValue {
    match value {
        EnumCellValue::None => {
            if if_keep_missing_values {
                EnumCellValue::String(value_policy.missing_value_str.clone())
            } else {
                EnumCellValue::None
            }
        }
        EnumCellValue::String(s) => EnumCellValue::String(s.clone()),
        EnumCellValue::Number(n) if !if_is_numeric_col => EnumCellValue::String(n.to_string()),
        EnumCellValue::Number(n) => match convert_nan_inf_to_str(*n, value_policy) {
            None => EnumCellValue::Number(*n),
            Some(c_text) if if_keep_missing_values => EnumCellValue::String(c_text),
            Some(_) => EnumCellValue::None,
        },
    }
}

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<()> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter(|(_, l_pos)| l_pos.len() > 1)
        .map(|(c_name, l_pos)| format!("{c_name:?} x{} at indices {l_pos:?}", l_pos.len()))
        .collect::<Vec<_>>()
        .join("; ");

    Err(XlsxWriteError::InvalidInput(format!(
        "Duplicate column names detected: {c_msg}"
    )))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to a valid Excel sheet name.
///
/// Excel also rejects names that begin or end with an apostrophe, and the reserved
/// name `History` in any case, which gets a trailing `_`.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    let c_name: String = c_name
        .trim()
        .trim_matches('\'')
        .trim()
        .chars()
        .take(N_LEN_EXCEL_SHEET_NAME_MAX)
        .collect();
    let c_name = c_name.trim_end_matches('\'');

    if c_name.is_empty() {
        C_SHEET_NAME_FALLBACK.to_string()
    } else if c_name.eq_ignore_ascii_case(C_SHEET_NAME_RESERVED) {
        format!("{c_name}_")
    } else {
        c_name.to_string()
    }
}

/// Return `name` or the first free `name__N` variant, registering the result.
///
/// Excel compares sheet names case-insensitively, so `existing` holds lowercase names.
pub fn derive_unique_sheet_name(name: &str, existing: &mut BTreeSet<String>) -> String {
    if existing.insert(name.to_lowercase()) {
        return name.to_string();
    }

    let mut n_idx = 2usize;
    loop {
        let c_suffix = format!("__{n_idx}");
        let n_len_base_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_suffix.len());
        let c_base: String = name.chars().take(usize::max(1, n_len_base_max)).collect();
        let candidate = format!("{}{c_suffix}", c_base.trim_end_matches('\''));
        if existing.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n_idx += 1;
    }
}

/// Split logical table range into Excel-compliant sheet slices.
pub fn plan_sheet_slices(
    height_df: usize,
    width_df: usize,
    height_header: usize,
    sheet_name: &str,
    report: &mut SpecXlsxReport,
) -> Result<Vec<SpecSheetSlice>> {
    if height_header == 0 {
        return Err(XlsxWriteError::InvalidInput(
            "height_header must be >= 1.".to_string(),
        ));
    }

    let n_rows_data_max = N_NROWS_EXCEL_MAX.saturating_sub(height_header);
    if n_rows_data_max == 0 {
        return Err(XlsxWriteError::InvalidInput(format!(
            "Header too tall: height_header={height_header} exceeds Excel limit."
        )));
    }

    let mut l_col_slices = Vec::new();
    let mut n_col_start = 0;
    while n_col_start < width_df {
        let n_col_end = usize::min(width_df, n_col_start + N_NCOLS_EXCEL_MAX);
        l_col_slices.push((n_col_start, n_col_end));
        n_col_start = n_col_end;
    }
    if l_col_slices.is_empty() {
        l_col_slices.push((0, 0));
    }

    let mut l_row_slices = Vec::new();
    let mut n_row_start = 0;
    while n_row_start < height_df {
        let n_row_end = usize::min(height_df, n_row_start + n_rows_data_max);
        l_row_slices.push((n_row_start, n_row_end));
        n_row_start = n_row_end;
    }
    if l_row_slices.is_empty() {
        l_row_slices.push((0, 0));
    }

    let n_parts_total = l_col_slices.len() * l_row_slices.len();

    let mut l_sheet_parts = Vec::with_capacity(n_parts_total);
    let mut n_idx_part = 1;
    for (col_start, col_end) in &l_col_slices {
        for (row_start, row_end) in &l_row_slices {
            let c_part_sheet_name = if n_parts_total == 1 {
                sheet_name.to_string()
            } else {
                create_sheet_identifier(sheet_name, n_idx_part)
            };

            l_sheet_parts.push(SpecSheetSlice {
                sheet_name: c_part_sheet_name,
                row_start_inclusive: *row_start,
                row_end_exclusive: *row_end,
                col_start_inclusive: *col_start,
                col_end_exclusive: *col_end,
            });
            n_idx_part += 1;
        }
    }

    if n_parts_total > 1 {
        report.warn(format!(
            "Excel limit overflow: split into {} sheets (columns-first, then rows).",
            l_sheet_parts.len()
        ));
    }

    Ok(l_sheet_parts)
}

/// Create suffixed sheet name (`base_1`, `base_2`, ...), respecting length cap.
pub fn create_sheet_identifier(base_name: &str, part_idx_1based: usize) -> String {
    let c_sheet_name_suffix = format!("_{part_idx_1based}");
    let n_len_base_name_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len());

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region HeaderMergeUtils

/// Plan horizontal merges for repeated non-empty header text per row.
pub fn plan_horizontal_merges(
    header_grid: &[Vec<String>],
) -> BTreeMap<usize, Vec<SpecSheetHorizontalMerge>> {
    let mut dict_horizontal_merges_map: BTreeMap<usize, Vec<SpecSheetHorizontalMerge>> =
        BTreeMap::new();

    for (n_idx_row, v_str_current_row) in header_grid.iter().enumerate() {
        let n_cols = v_str_current_row.len();
        let mut n_col_idx = 0;

        while n_col_idx < n_cols {
            let c_cell_val = &v_str_current_row[n_col_idx];
            if c_cell_val.is_empty() {
                n_col_idx += 1;
                continue;
            }

            let mut n_col_idx_end = n_col_idx + 1;
            while n_col_idx_end < n_cols && v_str_current_row[n_col_idx_end] == *c_cell_val {
                n_col_idx_end += 1;
            }

            if n_col_idx_end - n_col_idx > 1 {
                dict_horizontal_merges_map
                    .entry(n_idx_row)
                    .or_default()
                    .push(SpecSheetHorizontalMerge {
                        row_idx_start: n_idx_row,
                        col_idx_start: n_col_idx,
                        col_idx_end: n_col_idx_end - 1,
                        text: c_cell_val.clone(),
                    });
            }
            n_col_idx = n_col_idx_end;
        }
    }

    dict_horizontal_merges_map
}

/// Generate contiguous vertical runs `(col, row_start, row_end, text)`.
fn generate_vertical_runs(header_grid: &[Vec<String>]) -> Vec<(usize, usize, usize, String)> {
    let mut v_run_collection = Vec::new();
    let Some(v_header_row_0) = header_grid.first() else {
        return v_run_collection;
    };

    let n_rows = header_grid.len();
    let n_cols = v_header_row_0.len();

    debug_assert!(
        header_grid.iter().all(|row| row.len() == n_cols),
        "All rows must have the same number of columns."
    );

    for n_idx_col in 0..n_cols {
        let mut n_row_idx_start = 0;
        while n_row_idx_start < n_rows {
            let c_val_cell_current = &header_grid[n_row_idx_start][n_idx_col];
            if c_val_cell_current.is_empty() {
                n_row_idx_start += 1;
                continue;
            }

            let mut n_row_idx_next = n_row_idx_start + 1;
            while n_row_idx_next < n_rows
                && header_grid[n_row_idx_next][n_idx_col] == *c_val_cell_current
            {
                n_row_idx_next += 1;
            }

            if n_row_idx_next - n_row_idx_start > 1 {
                v_run_collection.push((
                    n_idx_col,
                    n_row_idx_start,
                    n_row_idx_next - 1,
                    c_val_cell_current.clone(),
                ));
            }

            n_row_idx_start = n_row_idx_next;
        }
    }

    v_run_collection
}

/// Build border plan to simulate vertical merge visuals without merge cells.
pub fn plan_vertical_visual_merge_borders(
    header_grid: &[Vec<String>],
) -> BTreeMap<(usize, usize), SpecCellBorder> {
    let mut dict_plan_vertical_merge_border = BTreeMap::new();

    for (col_idx, row_start, row_end, _) in generate_vertical_runs(header_grid) {
        for row_idx_within_merge in row_start..=row_end {
            dict_plan_vertical_merge_border.insert(
                (row_idx_within_merge, col_idx),
                SpecCellBorder {
                    top: i64::from(row_idx_within_merge == row_start),
                    bottom: i64::from(row_idx_within_merge == row_end),
                    left: 1,
                    right: 1,
                },
            );
        }
    }

    dict_plan_vertical_merge_border
}

/// Clear repeated text in vertical runs, keeping only first row text.
pub fn apply_vertical_run_text_blankout(header_grid: &mut [Vec<String>]) {
    for (col_idx, row_start, row_end, _) in generate_vertical_runs(header_grid) {
        for row in header_grid.iter_mut().take(row_end + 1).skip(row_start + 1) {
            row[col_idx].clear();
        }
    }
}

/// Build lookup set of cells covered by a horizontal merge (excluding anchor).
pub fn derive_horizontal_merge_tracker(
    row_horizontal_merge_mapping: &BTreeMap<usize, Vec<SpecSheetHorizontalMerge>>,
) -> BTreeSet<(usize, usize)> {
    let mut set_merged_cells = BTreeSet::new();

    for (row_idx, horizontal_merges) in row_horizontal_merge_mapping {
        for merge in horizontal_merges {
            for col_idx in (merge.col_idx_start + 1)..=merge.col_idx_end {
                set_merged_cells.insert((*row_idx, col_idx));
            }
        }
    }

    set_merged_cells
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
