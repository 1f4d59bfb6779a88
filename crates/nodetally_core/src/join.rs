//! Left join of device rows onto the facility/customer map.

use std::collections::HashMap;

use crate::table::{DeviceRecord, FacilityRecord};

/// A device and the mapping row it matched, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRecord {
    pub device: DeviceRecord,
    pub facility: Option<FacilityRecord>,
}

impl JoinedRecord {
    pub fn customer_name(&self) -> Option<&str> {
        self.facility.as_ref()?.customer_name.as_deref()
    }

    pub fn facility_name(&self) -> Option<&str> {
        self.facility.as_ref()?.facility_name.as_deref()
    }
}

#[derive(Debug, Clone, Default)]
pub struct JoinOutcome {
    /// One entry per input device, input order preserved.
    pub records: Vec<JoinedRecord>,
    pub n_unmatched: usize,
    /// Mapping rows ignored because an earlier row used the same facility id.
    pub n_duplicate_facilities: usize,
}

/// Join `devices` onto `facilities` on the normalized facility id.
///
/// Duplicate facility ids keep their first row. Devices without a match are kept with no
/// facility.
pub fn left_join(devices: Vec<DeviceRecord>, facilities: Vec<FacilityRecord>) -> JoinOutcome {
    let mut dict_facilities: HashMap<String, FacilityRecord> = HashMap::with_capacity(facilities.len());
    let mut n_duplicate_facilities = 0;
    for facility in facilities {
        let Some(c_key) = facility.facility_id.clone() else {
            continue;
        };
        if dict_facilities.contains_key(&c_key) {
            n_duplicate_facilities += 1;
            tracing::warn!(facility_id = %c_key, "duplicate facility id in customer map; keeping first row");
            continue;
        }
        dict_facilities.insert(c_key, facility);
    }

    let mut n_unmatched = 0;
    let records: Vec<JoinedRecord> = devices
        .into_iter()
        .map(|device| {
            let facility = device
                .facility_id
                .as_ref()
                .and_then(|c_key| dict_facilities.get(c_key))
                .cloned();
            if facility.is_none() {
                n_unmatched += 1;
            }
            JoinedRecord { device, facility }
        })
        .collect();

    tracing::debug!(
        rows = records.len(),
        unmatched = n_unmatched,
        facilities = dict_facilities.len(),
        "devices joined"
    );
    JoinOutcome {
        records,
        n_unmatched,
        n_duplicate_facilities,
    }
}
