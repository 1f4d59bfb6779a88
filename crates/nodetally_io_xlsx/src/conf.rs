//! XLSX constants and default preset factories.

use crate::spec::{SpecCellFormat, SpecFormatPresets};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];
/// Sheet name used when sanitizing leaves nothing behind.
pub const C_SHEET_NAME_FALLBACK: &str = "Sheet";
/// Sheet name reserved by Excel, compared case-insensitively.
pub const C_SHEET_NAME_RESERVED: &str = "History";

/// Header fill color.
const C_COLOR_HEADER_FILL: &str = "#D9E1F2";

/// Build default format presets used by [`crate::writer::XlsxWriter`].
pub fn derive_default_xlsx_formats() -> SpecFormatPresets {
    let cfg_base_fmt_spec = SpecCellFormat {
        font_name: Some("Calibri".to_string()),
        font_size: Some(11),
        border: Some(1),
        align: Some("left".to_string()),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    };

    SpecFormatPresets {
        text: cfg_base_fmt_spec.clone(),
        integer: cfg_base_fmt_spec.with_(SpecCellFormat {
            num_format: Some("0".to_string()),
            align: Some("center".to_string()),
            ..Default::default()
        }),
        decimal: cfg_base_fmt_spec.with_(SpecCellFormat {
            num_format: Some("0.00".to_string()),
            align: Some("right".to_string()),
            ..Default::default()
        }),
        header: cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            text_wrap: Some(true),
            bg_color: Some(C_COLOR_HEADER_FILL.to_string()),
            ..Default::default()
        }),
        emphasis: SpecCellFormat {
            bold: Some(true),
            top: Some(2),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_presets_share_base_font() {
        let presets = derive_default_xlsx_formats();
        for fmt in [&presets.text, &presets.integer, &presets.decimal, &presets.header] {
            assert_eq!(fmt.font_name.as_deref(), Some("Calibri"));
            assert_eq!(fmt.border, Some(1));
        }
        assert_eq!(presets.integer.num_format.as_deref(), Some("0"));
        assert_eq!(presets.header.bold, Some(true));
        assert_eq!(presets.emphasis.font_name, None);
    }
}
