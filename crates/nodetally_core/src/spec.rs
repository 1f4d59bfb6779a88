//! Fixed vocabulary: source column names, device categories and report layout.

use std::iter::Sum;
use std::ops::{Add, AddAssign};

////////////////////////////////////////////////////////////////////////////////
// #region SourceColumns

/// Node inventory: facility foreign key.
pub const C_SRC_NODE_FACILITY_ID: &str = "FacilityId";
/// Node inventory: model identifier used for classification.
pub const C_SRC_NODE_MODEL: &str = "oemModel";
/// Node inventory: device id, first present alias wins.
pub const TUP_SRC_NODE_ID: [&str; 2] = ["Id", "NodeId"];
/// Node inventory: device name aliases.
pub const TUP_SRC_NODE_NAME: [&str; 2] = ["Name", "NodeName"];
/// Node inventory: device-type tag aliases.
pub const TUP_SRC_NODE_TYPE: [&str; 2] = ["DeviceType", "Type"];
/// Node inventory: last-seen status aliases.
pub const TUP_SRC_NODE_LAST_SEEN: [&str; 2] = ["LastSeen", "Status"];

/// Customer map: facility key.
pub const C_SRC_MAP_FACILITY_ID: &str = "facility_id";
/// Customer map: facility display name.
pub const C_SRC_MAP_FACILITY_NAME: &str = "facility_name";
/// Customer map: customer id.
pub const C_SRC_MAP_CUSTOMER_ID: &str = "customer_id";
/// Customer map: customer display name.
pub const C_SRC_MAP_CUSTOMER_NAME: &str = "customer_name";

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportLayout

/// Report column: customer.
pub const C_COL_CUSTOMER_NAME: &str = "Customer Name";
/// Report column: facility.
pub const C_COL_FACILITY_NAME: &str = "Facility Name";
/// Report column: per-row device total.
pub const C_COL_TOTAL: &str = "Total";
/// Facility label of the synthetic trailing row.
pub const C_LABEL_TOTAL_ROW: &str = "Total";
/// Group key for missing or blank customer/facility names.
pub const C_KEY_UNKNOWN: &str = "(unknown)";

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Categories

/// One device category and the model identifiers it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecCategory {
    /// Column label.
    pub label: &'static str,
    /// Accepted `oemModel` values; a scalar matcher is a one-element set.
    pub models: &'static [&'static str],
    /// Whether the category becomes a report column and counts toward Total.
    pub if_emitted: bool,
    /// First header row label when the column sits under a shared group.
    pub header_group: Option<&'static str>,
}

impl SpecCategory {
    /// Exact, case-sensitive membership test.
    pub fn matches(&self, model: &str) -> bool {
        self.models.contains(&model)
    }
}

const fn category(label: &'static str, models: &'static [&'static str]) -> SpecCategory {
    SpecCategory {
        label,
        models,
        if_emitted: true,
        header_group: None,
    }
}

/// Header group spanning the two thermostat models.
pub const C_GROUP_THERMOSTATS: &str = "Thermostats";

/// Number of classification categories, intermediate ones included.
pub const N_CATEGORIES: usize = 12;

/// Classification table in display order.
pub const TUP_CATEGORIES: [SpecCategory; N_CATEGORIES] = [
    category("OWM7111", &["OWM7111-GDNT-9-dev"]),
    category("OWM0131", &["OWM0131-GDNT-R"]),
    category("FXA5", &["FXA5000-GCNT-K-dev"]),
    SpecCategory {
        header_group: Some(C_GROUP_THERMOSTATS),
        ..category("ST898ZB", &["ST898ZB"])
    },
    SpecCategory {
        header_group: Some(C_GROUP_THERMOSTATS),
        ..category("3157100", &["3157100"])
    },
    SpecCategory {
        if_emitted: false,
        ..category("ThermoStats", &["3157100", "ST898ZB"])
    },
    category("Centralized Door Sensor", &["3323-G"]),
    category("Centralize Water Sensor", &["3315-G"]),
    category("Centralize Temp & Humidity Sensor", &["3310-G"]),
    category("Centralize Motion Sensor", &["3328-G"]),
    category("R-Pi", &["linuxevb"]),
    category("Common Area Camera", &["ggdemo_camera", "common_area_camera"]),
];

/// Emitted categories in display order.
pub fn emitted_categories() -> impl Iterator<Item = &'static SpecCategory> {
    TUP_CATEGORIES.iter().filter(|cat| cat.if_emitted)
}

/// Index of the category labeled `label`.
pub fn category_index(label: &str) -> Option<usize> {
    TUP_CATEGORIES.iter().position(|cat| cat.label == label)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CategoryCounts

/// Per-category device counts, indexed like [`TUP_CATEGORIES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryCounts(pub [u64; N_CATEGORIES]);

impl CategoryCounts {
    /// Count for `label`, `None` for an unknown label.
    pub fn get(&self, label: &str) -> Option<u64> {
        category_index(label).map(|n_idx| self.0[n_idx])
    }

    /// Emitted `(label, count)` pairs in display order.
    pub fn emitted(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        TUP_CATEGORIES
            .iter()
            .zip(self.0.iter())
            .filter(|(cat, _)| cat.if_emitted)
            .map(|(cat, n)| (cat.label, *n))
    }

    /// Row total: sum over emitted categories only.
    pub fn emitted_total(&self) -> u64 {
        self.emitted().map(|(_, n)| n).sum()
    }
}

impl AddAssign for CategoryCounts {
    fn add_assign(&mut self, rhs: Self) {
        for (n_lhs, n_rhs) in self.0.iter_mut().zip(rhs.0) {
            *n_lhs += n_rhs;
        }
    }
}

impl Add for CategoryCounts {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl Sum for CategoryCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl<'a> Sum<&'a CategoryCounts> for CategoryCounts {
    fn sum<I: Iterator<Item = &'a CategoryCounts>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels_unique_and_intermediate_hidden() {
        let mut l_labels: Vec<_> = TUP_CATEGORIES.iter().map(|cat| cat.label).collect();
        l_labels.sort_unstable();
        l_labels.dedup();
        assert_eq!(l_labels.len(), N_CATEGORIES);

        assert_eq!(emitted_categories().count(), N_CATEGORIES - 1);
        assert!(emitted_categories().all(|cat| cat.label != "ThermoStats"));
    }

    #[test]
    fn test_emitted_total_skips_intermediate() {
        let mut counts = CategoryCounts::default();
        counts.0[category_index("ST898ZB").unwrap()] = 2;
        counts.0[category_index("ThermoStats").unwrap()] = 2;
        counts.0[category_index("R-Pi").unwrap()] = 1;

        assert_eq!(counts.emitted_total(), 3);
        assert_eq!(counts.get("ThermoStats"), Some(2));
        assert_eq!(counts.get("nope"), None);
    }

    #[test]
    fn test_counts_sum() {
        let mut one = CategoryCounts::default();
        one.0[0] = 1;
        let l_counts = [one, one, CategoryCounts::default()];
        let total: CategoryCounts = l_counts.iter().sum();
        assert_eq!(total.0[0], 2);
        assert_eq!(total.emitted_total(), 2);
    }
}
