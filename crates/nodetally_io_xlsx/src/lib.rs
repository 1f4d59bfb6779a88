//! `nodetally_io_xlsx`:
//! XLSX writer kernel used by the report emitter and the raw table dump.
//!
//! Module layout:
//! - `conf`   : Excel limits and default format presets
//! - `spec`   : formats, policies and write reports
//! - `util`   : pure helpers (sheet names, header merge planning, value conversion)
//! - `error`  : writer error type
//! - `writer` : stateful workbook writer
pub mod conf;
pub mod error;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
    derive_default_xlsx_formats,
};
pub use error::{Result, XlsxWriteError};
pub use spec::{
    EnumAutofitColumnsRule, EnumCellValue, SpecAutofitCellsPolicy, SpecCellBorder,
    SpecCellFormat, SpecFormatPresets, SpecSheetHorizontalMerge, SpecSheetSlice, SpecXlsxReport,
    SpecXlsxValuePolicy, SpecXlsxWriteOptions,
};
pub use util::{
    apply_vertical_run_text_blankout, derive_horizontal_merge_tracker,
    derive_unique_sheet_name, plan_horizontal_merges, plan_sheet_slices,
    plan_vertical_visual_merge_borders, sanitize_sheet_name,
};
pub use writer::{SpecXlsxSheetWriteOptions, XlsxWriter};
