use std::collections::BTreeMap;

use crate::model::RawCoverageData;

/// Merge coverage sets from several reports into one record per class.
///
/// Records sharing a qualified class name are combined with
/// [`RawCoverageData::merge`]. The result is sorted by class name and does
/// not depend on the order of the inputs.
pub fn merge_coverage<I>(sets: I) -> Vec<RawCoverageData>
where
    I: IntoIterator<Item = Vec<RawCoverageData>>,
{
    let mut by_class: BTreeMap<String, RawCoverageData> = BTreeMap::new();
    for record in sets.into_iter().flatten() {
        match by_class.remove(&record.class_name) {
            Some(existing) => {
                by_class.insert(record.class_name.clone(), existing.merge(record));
            }
            None => {
                by_class.insert(record.class_name.clone(), record);
            }
        }
    }
    by_class.into_values().collect()
}
