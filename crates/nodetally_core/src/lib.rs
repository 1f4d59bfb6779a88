//! `nodetally_core`:
//! Device inventory to per-customer device-count workbook.
//!
//! - `table`     : typed rows read from the two source frames
//! - `join`      : device-to-facility left join
//! - `classify`  : model identifier to category indicators
//! - `aggregate` : per-facility sums and per-customer partitions
//! - `report`    : finalized customer reports and their frame layout
//! - `pipeline`  : the whole chain plus a run summary
//! - `emit`      : workbook output and raw table dumps
//! - `snapshot`  : Arrow IPC snapshots of source tables
//! - `xlsx_input`: source tables read from flat `.xlsx` files
pub mod aggregate;
pub mod classify;
pub mod emit;
pub mod error;
pub mod join;
pub mod pipeline;
pub mod report;
pub mod snapshot;
pub mod spec;
pub mod table;
pub mod xlsx_input;

pub use aggregate::{FacilityAggregate, aggregate_facilities, partition_by_customer};
pub use classify::{ClassifiedRecord, classify_model, classify_records};
pub use emit::{EmitSummary, dump_table, emit_customer_reports};
pub use error::{Error, Result};
pub use join::{JoinOutcome, JoinedRecord, left_join};
pub use pipeline::{CustomerSummary, PipelineOutput, RunSummary, run_pipeline};
pub use report::{
    CustomerReport, build_customer_reports, derive_report_columns, derive_report_header_grid,
};
pub use snapshot::{derive_snapshot_path, read_snapshot, write_snapshot};
pub use spec::{CategoryCounts, SpecCategory, TUP_CATEGORIES};
pub use table::{DeviceRecord, FacilityRecord, read_device_records, read_facility_records};
pub use xlsx_input::{derive_xlsx_input_path, read_xlsx_frame, read_xlsx_table};
