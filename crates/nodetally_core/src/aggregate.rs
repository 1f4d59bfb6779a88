//! Grouping of classified records into per-facility rows and per-customer partitions.

use std::collections::BTreeMap;

use crate::classify::ClassifiedRecord;
use crate::spec::{C_KEY_UNKNOWN, CategoryCounts};

/// Summed indicators for one (customer, facility) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityAggregate {
    pub customer_name: String,
    pub facility_name: String,
    pub counts: CategoryCounts,
    /// Devices in the group, classified or not.
    pub n_devices: u64,
}

impl FacilityAggregate {
    /// Sum of the emitted category counts.
    pub fn total(&self) -> u64 {
        self.counts.emitted_total()
    }
}

/// Group key for a possibly missing name.
pub fn derive_group_key(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(c_name) if !c_name.is_empty() => c_name.to_string(),
        _ => C_KEY_UNKNOWN.to_string(),
    }
}

/// Sum indicators per (customer, facility), ordered by key.
pub fn aggregate_facilities(records: &[ClassifiedRecord]) -> Vec<FacilityAggregate> {
    let mut dict_groups: BTreeMap<(String, String), (CategoryCounts, u64)> = BTreeMap::new();
    for classified in records {
        let key = (
            derive_group_key(classified.record.customer_name()),
            derive_group_key(classified.record.facility_name()),
        );
        let entry = dict_groups.entry(key).or_default();
        entry.0 += classified.indicators;
        entry.1 += 1;
    }

    dict_groups
        .into_iter()
        .map(
            |((customer_name, facility_name), (counts, n_devices))| FacilityAggregate {
                customer_name,
                facility_name,
                counts,
                n_devices,
            },
        )
        .collect()
}

/// Split aggregates by customer, preserving the incoming row order inside each customer.
pub fn partition_by_customer(
    aggregates: Vec<FacilityAggregate>,
) -> BTreeMap<String, Vec<FacilityAggregate>> {
    let mut dict_by_customer: BTreeMap<String, Vec<FacilityAggregate>> = BTreeMap::new();
    for aggregate in aggregates {
        dict_by_customer
            .entry(aggregate.customer_name.clone())
            .or_default()
            .push(aggregate);
    }
    dict_by_customer
}
