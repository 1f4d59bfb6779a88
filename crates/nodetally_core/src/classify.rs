//! Model-identifier classification into category indicators.

use crate::join::JoinedRecord;
use crate::spec::{CategoryCounts, TUP_CATEGORIES};

/// Indicator vector for one model: 1 for every category whose set contains `model`.
///
/// Categories are independent; a null model matches nothing.
pub fn classify_model(model: Option<&str>) -> CategoryCounts {
    let mut counts = CategoryCounts::default();
    let Some(model) = model else {
        return counts;
    };
    for (n_slot, cat) in counts.0.iter_mut().zip(TUP_CATEGORIES.iter()) {
        *n_slot = u64::from(cat.matches(model));
    }
    counts
}

#[derive(Debug, Clone)]
pub struct ClassifiedRecord {
    pub record: JoinedRecord,
    pub indicators: CategoryCounts,
}

pub fn classify_records(records: Vec<JoinedRecord>) -> Vec<ClassifiedRecord> {
    records
        .into_iter()
        .map(|record| {
            let indicators = classify_model(record.device.model.as_deref());
            ClassifiedRecord { record, indicators }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::emitted_categories;

    #[test]
    fn test_single_category_model_sums_to_one() {
        for cat in emitted_categories() {
            for model in cat.models {
                let counts = classify_model(Some(model));
                assert_eq!(counts.emitted_total(), 1, "model {model}");
                assert_eq!(counts.get(cat.label), Some(1));
            }
        }
    }

    #[test]
    fn test_thermostat_models_also_hit_intermediate() {
        let counts = classify_model(Some("ST898ZB"));
        assert_eq!(counts.get("ST898ZB"), Some(1));
        assert_eq!(counts.get("ThermoStats"), Some(1));
        assert_eq!(counts.get("3157100"), Some(0));
        assert_eq!(counts.emitted_total(), 1);
    }

    #[test]
    fn test_unknown_null_and_case_mismatch_match_nothing() {
        assert_eq!(classify_model(Some("XYZ-9")), CategoryCounts::default());
        assert_eq!(classify_model(None), CategoryCounts::default());
        assert_eq!(classify_model(Some("st898zb")), CategoryCounts::default());
        assert_eq!(classify_model(Some("ST898ZB ")), CategoryCounts::default());
    }
}
