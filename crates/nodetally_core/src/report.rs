//! Per-customer reports: facility rows plus a trailing Total row.

use std::collections::BTreeMap;

use polars::prelude::{Column, DataFrame};

use crate::aggregate::FacilityAggregate;
use crate::error::{Error, Result};
use crate::spec::{
    C_COL_CUSTOMER_NAME, C_COL_FACILITY_NAME, C_COL_TOTAL, C_LABEL_TOTAL_ROW, CategoryCounts,
    emitted_categories,
};

/// One customer's facility rows and their column-wise sum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerReport {
    pub customer_name: String,
    pub rows: Vec<FacilityAggregate>,
    /// Column-wise sum over `rows`; the synthetic Total row.
    pub total: CategoryCounts,
}

impl CustomerReport {
    /// Build a report and compute its Total row. No rows yields an all-zero Total.
    pub fn finalize(customer_name: impl Into<String>, rows: Vec<FacilityAggregate>) -> Self {
        let total: CategoryCounts = rows.iter().map(|row| &row.counts).sum();
        Self {
            customer_name: customer_name.into(),
            rows,
            total,
        }
    }

    /// Devices counted across all facility rows, classified or not.
    pub fn n_devices(&self) -> u64 {
        self.rows.iter().map(|row| row.n_devices).sum()
    }

    /// Check row membership and the Total row against the facility rows.
    pub fn verify(&self) -> Result<()> {
        if let Some(row) = self
            .rows
            .iter()
            .find(|row| row.customer_name != self.customer_name)
        {
            return Err(self.invariant(format!(
                "facility {:?} belongs to {:?}",
                row.facility_name, row.customer_name
            )));
        }
        let sum: CategoryCounts = self.rows.iter().map(|row| &row.counts).sum();
        if sum != self.total {
            return Err(self.invariant("Total row differs from the column sums".to_string()));
        }
        let n_total_rows: u64 = self.rows.iter().map(FacilityAggregate::total).sum();
        if n_total_rows != self.total.emitted_total() {
            return Err(self.invariant("Total column differs from the row totals".to_string()));
        }
        Ok(())
    }

    /// Lay the report out as a frame in output column order, Total row last.
    ///
    /// The Total row has no customer name and `Total` as its facility name.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut l_customer: Vec<Option<&str>> = self
            .rows
            .iter()
            .map(|row| Some(row.customer_name.as_str()))
            .collect();
        l_customer.push(None);

        let mut l_facility: Vec<&str> = self
            .rows
            .iter()
            .map(|row| row.facility_name.as_str())
            .collect();
        l_facility.push(C_LABEL_TOTAL_ROW);

        let mut l_columns = vec![
            Column::new(C_COL_CUSTOMER_NAME.into(), l_customer),
            Column::new(C_COL_FACILITY_NAME.into(), l_facility),
        ];

        let l_row_counts: Vec<&CategoryCounts> = self
            .rows
            .iter()
            .map(|row| &row.counts)
            .chain(std::iter::once(&self.total))
            .collect();
        for cat in emitted_categories() {
            let l_values: Vec<u64> = l_row_counts
                .iter()
                .map(|counts| counts.get(cat.label).unwrap_or(0))
                .collect();
            l_columns.push(Column::new(cat.label.into(), l_values));
        }
        let l_totals: Vec<u64> = l_row_counts
            .iter()
            .map(|counts| counts.emitted_total())
            .collect();
        l_columns.push(Column::new(C_COL_TOTAL.into(), l_totals));

        Ok(DataFrame::new(l_columns)?)
    }

    fn invariant(&self, detail: String) -> Error {
        Error::Invariant {
            customer: self.customer_name.clone(),
            detail,
        }
    }
}

/// Finalize every customer partition into a report, in key order.
pub fn build_customer_reports(
    partitions: BTreeMap<String, Vec<FacilityAggregate>>,
) -> Vec<CustomerReport> {
    partitions
        .into_iter()
        .map(|(customer_name, rows)| CustomerReport::finalize(customer_name, rows))
        .collect()
}

/// Output column names in order.
pub fn derive_report_columns() -> Vec<String> {
    let mut l_columns = vec![C_COL_CUSTOMER_NAME.to_string(), C_COL_FACILITY_NAME.to_string()];
    l_columns.extend(emitted_categories().map(|cat| cat.label.to_string()));
    l_columns.push(C_COL_TOTAL.to_string());
    l_columns
}

/// Two-row header grid aligned with [`derive_report_columns`].
///
/// Grouped columns carry the group label on row 0 and their own label on row 1; every
/// other column repeats its label on both rows so the writer renders it as a vertical run.
pub fn derive_report_header_grid() -> Vec<Vec<String>> {
    let mut l_row_group = vec![C_COL_CUSTOMER_NAME.to_string(), C_COL_FACILITY_NAME.to_string()];
    let mut l_row_label = l_row_group.clone();
    for cat in emitted_categories() {
        l_row_group.push(cat.header_group.unwrap_or(cat.label).to_string());
        l_row_label.push(cat.label.to_string());
    }
    l_row_group.push(C_COL_TOTAL.to_string());
    l_row_label.push(C_COL_TOTAL.to_string());
    vec![l_row_group, l_row_label]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{C_GROUP_THERMOSTATS, category_index};
    use pretty_assertions::assert_eq;

    fn row(customer: &str, facility: &str, l_hits: &[(&str, u64)]) -> FacilityAggregate {
        let mut counts = CategoryCounts::default();
        for (label, n) in l_hits {
            counts.0[category_index(label).unwrap()] = *n;
        }
        FacilityAggregate {
            customer_name: customer.to_string(),
            facility_name: facility.to_string(),
            counts,
            n_devices: l_hits.iter().map(|(_, n)| n).sum(),
        }
    }

    #[test]
    fn test_total_row_is_column_sum() {
        let report = CustomerReport::finalize(
            "Acme",
            vec![
                row("Acme", "HQ", &[("ST898ZB", 1), ("ThermoStats", 1), ("R-Pi", 2)]),
                row("Acme", "Lab", &[("3157100", 3), ("ThermoStats", 3)]),
            ],
        );
        report.verify().unwrap();
        assert_eq!(report.total.get("ST898ZB"), Some(1));
        assert_eq!(report.total.get("3157100"), Some(3));
        assert_eq!(report.total.get("R-Pi"), Some(2));
        assert_eq!(report.total.emitted_total(), 6);

        let df = report.to_dataframe().unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.get_column_names_str(), derive_report_columns());
        let total_col = df.column(C_COL_TOTAL).unwrap().as_materialized_series().u64().unwrap();
        assert_eq!(total_col.get(2), Some(6));
        let facility_col = df.column(C_COL_FACILITY_NAME).unwrap().as_materialized_series().str().unwrap();
        assert_eq!(facility_col.get(2), Some("Total"));
        let customer_col = df.column(C_COL_CUSTOMER_NAME).unwrap().as_materialized_series().str().unwrap();
        assert_eq!(customer_col.get(2), None);
    }

    #[test]
    fn test_empty_report_has_zero_total_row() {
        let report = CustomerReport::finalize("Empty", Vec::new());
        report.verify().unwrap();
        let df = report.to_dataframe().unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.column(C_COL_TOTAL).unwrap().as_materialized_series().u64().unwrap().get(0), Some(0));
    }

    #[test]
    fn test_verify_rejects_tampered_total() {
        let mut report = CustomerReport::finalize("Acme", vec![row("Acme", "HQ", &[("R-Pi", 1)])]);
        report.total.0[0] += 1;
        assert!(matches!(report.verify(), Err(Error::Invariant { .. })));

        let report = CustomerReport::finalize("Acme", vec![row("Beta", "HQ", &[("R-Pi", 1)])]);
        assert!(matches!(report.verify(), Err(Error::Invariant { .. })));
    }

    #[test]
    fn test_header_grid_groups_thermostats() {
        let l_grid = derive_report_header_grid();
        let l_columns = derive_report_columns();
        assert_eq!(l_grid.len(), 2);
        assert_eq!(l_grid[1], l_columns);

        let n_st = l_columns.iter().position(|c| c == "ST898ZB").unwrap();
        assert_eq!(l_grid[0][n_st], C_GROUP_THERMOSTATS);
        assert_eq!(l_grid[0][n_st + 1], C_GROUP_THERMOSTATS);
        assert_eq!(l_grid[1][n_st + 1], "3157100");
        assert_eq!(l_grid[0][0], l_grid[1][0]);
        assert_eq!(l_grid[0].last(), Some(&"Total".to_string()));
    }

    #[test]
    fn test_build_customer_reports_in_key_order() {
        let mut dict_parts = BTreeMap::new();
        dict_parts.insert("Beta".to_string(), vec![row("Beta", "B", &[])]);
        dict_parts.insert("Acme".to_string(), vec![row("Acme", "A", &[])]);
        let l_reports = build_customer_reports(dict_parts);
        let l_names: Vec<_> = l_reports.iter().map(|r| r.customer_name.as_str()).collect();
        assert_eq!(l_names, vec!["Acme", "Beta"]);
    }
}
