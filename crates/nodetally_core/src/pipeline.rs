//! Source tables to customer reports: read, join, classify, aggregate, partition, finalize.

use polars::prelude::DataFrame;

use crate::aggregate::{aggregate_facilities, partition_by_customer};
use crate::classify::classify_records;
use crate::error::Result;
use crate::join::left_join;
use crate::report::{CustomerReport, build_customer_reports};
use crate::spec::{C_KEY_UNKNOWN, CategoryCounts};
use crate::table::{read_device_records, read_facility_records};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerSummary {
    pub customer_name: String,
    pub n_facilities: usize,
    pub n_devices: u64,
    /// Emitted-category device total, the Total row's Total cell.
    pub n_classified: u64,
}

/// Counts describing one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub n_devices: usize,
    pub n_facilities_mapped: usize,
    pub n_unmatched: usize,
    pub n_duplicate_facilities: usize,
    /// Devices hitting the intermediate thermostat category.
    pub n_thermostats: u64,
    pub customers: Vec<CustomerSummary>,
}

impl RunSummary {
    pub fn log(&self) {
        tracing::info!(
            devices = self.n_devices,
            facilities = self.n_facilities_mapped,
            unmatched = self.n_unmatched,
            duplicate_facilities = self.n_duplicate_facilities,
            thermostats = self.n_thermostats,
            customers = self.customers.len(),
            "pipeline summary"
        );
        for customer in &self.customers {
            tracing::info!(
                customer = %customer.customer_name,
                facilities = customer.n_facilities,
                devices = customer.n_devices,
                classified = customer.n_classified,
                "customer report"
            );
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub reports: Vec<CustomerReport>,
    pub summary: RunSummary,
}

/// Build verified customer reports from the node inventory and the customer map.
pub fn run_pipeline(df_nodes: &DataFrame, df_customers: &DataFrame) -> Result<PipelineOutput> {
    let l_devices = read_device_records(df_nodes)?;
    let l_facilities = read_facility_records(df_customers)?;
    let n_devices = l_devices.len();
    let n_facilities_mapped = l_facilities.len();

    let outcome = left_join(l_devices, l_facilities);
    debug_assert_eq!(outcome.records.len(), n_devices);
    if outcome.n_unmatched > 0 {
        tracing::warn!(
            unmatched = outcome.n_unmatched,
            "devices without a facility mapping are reported under {C_KEY_UNKNOWN}"
        );
    }

    let l_classified = classify_records(outcome.records);
    let counts_all: CategoryCounts = l_classified.iter().map(|rec| &rec.indicators).sum();

    let reports = build_customer_reports(partition_by_customer(aggregate_facilities(&l_classified)));
    for report in &reports {
        report.verify()?;
    }

    let customers = reports
        .iter()
        .map(|report| CustomerSummary {
            customer_name: report.customer_name.clone(),
            n_facilities: report.rows.len(),
            n_devices: report.n_devices(),
            n_classified: report.total.emitted_total(),
        })
        .collect();

    let summary = RunSummary {
        n_devices,
        n_facilities_mapped,
        n_unmatched: outcome.n_unmatched,
        n_duplicate_facilities: outcome.n_duplicate_facilities,
        n_thermostats: counts_all.get("ThermoStats").unwrap_or(0),
        customers,
    };
    Ok(PipelineOutput { reports, summary })
}
