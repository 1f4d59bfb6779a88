//! Typed row views over the two source tables.

use polars::prelude::{DataFrame, DataType};

use crate::error::{Error, Result};
use crate::spec::{
    C_SRC_MAP_CUSTOMER_ID, C_SRC_MAP_CUSTOMER_NAME, C_SRC_MAP_FACILITY_ID, C_SRC_MAP_FACILITY_NAME,
    C_SRC_NODE_FACILITY_ID, C_SRC_NODE_MODEL, TUP_SRC_NODE_ID, TUP_SRC_NODE_LAST_SEEN,
    TUP_SRC_NODE_NAME, TUP_SRC_NODE_TYPE,
};

/// Table label used in missing-column errors for the device inventory.
pub const C_TABLE_LABEL_NODES: &str = "node details";
/// Table label used in missing-column errors for the customer map.
pub const C_TABLE_LABEL_CUSTOMERS: &str = "customer details";

/// One device row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRecord {
    pub device_id: Option<String>,
    pub device_name: Option<String>,
    pub model: Option<String>,
    pub device_type: Option<String>,
    /// Normalized join key, see [`normalize_join_key`].
    pub facility_id: Option<String>,
    pub last_seen: Option<String>,
}

/// One facility-to-customer mapping row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacilityRecord {
    /// Normalized join key, see [`normalize_join_key`].
    pub facility_id: Option<String>,
    pub facility_name: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
}

/// Read device rows. `FacilityId` and `oemModel` are required.
pub fn read_device_records(df_nodes: &DataFrame) -> Result<Vec<DeviceRecord>> {
    let l_facility_ids = read_required_text(df_nodes, C_TABLE_LABEL_NODES, C_SRC_NODE_FACILITY_ID)?;
    let l_models = read_required_text(df_nodes, C_TABLE_LABEL_NODES, C_SRC_NODE_MODEL)?;
    let l_ids = read_optional_text(df_nodes, &TUP_SRC_NODE_ID)?;
    let l_names = read_optional_text(df_nodes, &TUP_SRC_NODE_NAME)?;
    let l_types = read_optional_text(df_nodes, &TUP_SRC_NODE_TYPE)?;
    let l_last_seen = read_optional_text(df_nodes, &TUP_SRC_NODE_LAST_SEEN)?;

    let l_records = (0..df_nodes.height())
        .map(|n_idx| DeviceRecord {
            device_id: l_ids[n_idx].clone(),
            device_name: l_names[n_idx].clone(),
            model: l_models[n_idx].clone(),
            device_type: l_types[n_idx].clone(),
            facility_id: normalize_join_key(l_facility_ids[n_idx].as_deref()),
            last_seen: l_last_seen[n_idx].clone(),
        })
        .collect();
    Ok(l_records)
}

/// Read facility mapping rows. Only `facility_id` is required.
pub fn read_facility_records(df_customers: &DataFrame) -> Result<Vec<FacilityRecord>> {
    let l_facility_ids =
        read_required_text(df_customers, C_TABLE_LABEL_CUSTOMERS, C_SRC_MAP_FACILITY_ID)?;
    let l_facility_names = read_optional_text(df_customers, &[C_SRC_MAP_FACILITY_NAME])?;
    let l_customer_ids = read_optional_text(df_customers, &[C_SRC_MAP_CUSTOMER_ID])?;
    let l_customer_names = read_optional_text(df_customers, &[C_SRC_MAP_CUSTOMER_NAME])?;

    let l_records = (0..df_customers.height())
        .map(|n_idx| FacilityRecord {
            facility_id: normalize_join_key(l_facility_ids[n_idx].as_deref()),
            facility_name: l_facility_names[n_idx].clone(),
            customer_id: l_customer_ids[n_idx].clone(),
            customer_name: l_customer_names[n_idx].clone(),
        })
        .collect();
    Ok(l_records)
}

/// Canonical text form of a join key.
///
/// Trims whitespace, maps empty to `None` and drops an all-zero fractional part so a float
/// rendering (`"12.0"`) matches the integer one (`"12"`).
pub fn normalize_join_key(raw: Option<&str>) -> Option<String> {
    let c_trimmed = raw?.trim();
    if c_trimmed.is_empty() {
        return None;
    }
    if let Some((c_int, c_frac)) = c_trimmed.split_once('.') {
        let if_integral = !c_int.is_empty()
            && c_int
                .trim_start_matches('-')
                .chars()
                .all(|c| c.is_ascii_digit())
            && c_frac.chars().all(|c| c == '0');
        if if_integral {
            return Some(c_int.to_string());
        }
    }
    Some(c_trimmed.to_string())
}

fn read_required_text(df: &DataFrame, table: &'static str, name: &str) -> Result<Vec<Option<String>>> {
    if !df.get_column_names_str().contains(&name) {
        return Err(Error::MissingColumn {
            table,
            column: name.to_string(),
        });
    }
    read_column_text(df, name)
}

/// First present alias wins; an absent column reads as all-null.
fn read_optional_text(df: &DataFrame, aliases: &[&str]) -> Result<Vec<Option<String>>> {
    let l_names = df.get_column_names_str();
    match aliases.iter().find(|alias| l_names.contains(*alias)) {
        Some(name) => read_column_text(df, name),
        None => Ok(vec![None; df.height()]),
    }
}

fn read_column_text(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let l_values = series
        .str()?
        .into_iter()
        .map(|value| value.map(ToString::to_string))
        .collect();
    Ok(l_values)
}
