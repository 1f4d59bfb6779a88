use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

/// Per-customer device counts from the warehouse inventory, one sheet per customer.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Args {
    /// Customer/facility map table
    #[arg(long, env = "CUSTOMER_DETAILS")]
    pub customer_table: String,

    /// Device inventory table
    #[arg(long, env = "NODE_DETAILS")]
    pub node_table: String,

    /// Directory receiving the dated workbook
    #[arg(long, env = "NODETALLY_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Appended to the dated file stem
    #[arg(long, default_value = "")]
    pub suffix: String,

    /// Load both tables from `<dir>/<table>.arrow` instead of the warehouse
    #[arg(long, conflicts_with = "input_xlsx_dir")]
    pub input_dir: Option<PathBuf>,

    /// Load both tables from `<dir>/<table>.xlsx` instead of the warehouse
    #[arg(long)]
    pub input_xlsx_dir: Option<PathBuf>,

    /// Save fetched tables as `<dir>/<table>.arrow`
    #[arg(long)]
    pub snapshot_dir: Option<PathBuf>,

    /// Also write each source table to `<output-dir>/<table>.xlsx`
    #[arg(long)]
    pub dump_tables: bool,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// `<output-dir>/<YYYY-MM-DD><suffix>.xlsx`.
    pub fn report_path(&self, date: NaiveDate) -> PathBuf {
        self.output_dir
            .join(format!("{}{}.xlsx", date.format("%Y-%m-%d"), self.suffix))
    }

    pub fn dump_path(&self, table: &str) -> PathBuf {
        self.output_dir.join(format!("{table}.xlsx"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(l_args: &[&str]) -> Args {
        let mut l_full = vec!["nodetally", "--customer-table", "customer_details", "--node-table", "node_details"];
        l_full.extend_from_slice(l_args);
        Args::try_parse_from(l_full).unwrap()
    }

    #[test]
    fn test_report_path_with_suffix() {
        let args = parse(&["--output-dir", "out", "--suffix", "_v2"]);
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(args.report_path(date), PathBuf::from("out/2024-03-09_v2.xlsx"));
        assert_eq!(args.dump_path("node_details"), PathBuf::from("out/node_details.xlsx"));
    }

    #[test]
    fn test_flags() {
        let args = parse(&["--dump-tables", "-vv", "--input-dir", "snap"]);
        assert!(args.dump_tables);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.input_dir, Some(PathBuf::from("snap")));
        assert_eq!(args.snapshot_dir, None);
        assert_eq!(args.input_xlsx_dir, None);
    }

    #[test]
    fn test_input_sources_are_exclusive() {
        let args = parse(&["--input-xlsx-dir", "sheets"]);
        assert_eq!(args.input_xlsx_dir, Some(PathBuf::from("sheets")));

        let l_full = [
            "nodetally",
            "--customer-table",
            "c",
            "--node-table",
            "n",
            "--input-dir",
            "snap",
            "--input-xlsx-dir",
            "sheets",
        ];
        assert!(Args::try_parse_from(l_full).is_err());
    }
}
