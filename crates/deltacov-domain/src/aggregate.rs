use deltacov_types::{AggregatedRatios, CoverageCounters};
use rayon::prelude::*;

use crate::filter::DeltaCoverageData;

/// Sum delta counters across classes.
pub fn aggregate(data: &[DeltaCoverageData]) -> AggregatedRatios {
    let counters = data
        .iter()
        .map(|d| d.counters)
        .fold(CoverageCounters::default(), CoverageCounters::merge);
    AggregatedRatios::new(counters)
}

/// Same result as [`aggregate`], reduced on the rayon pool.
pub fn aggregate_parallel(data: &[DeltaCoverageData]) -> AggregatedRatios {
    let counters = data
        .par_iter()
        .map(|d| d.counters)
        .reduce(CoverageCounters::default, CoverageCounters::merge);
    AggregatedRatios::new(counters)
}
