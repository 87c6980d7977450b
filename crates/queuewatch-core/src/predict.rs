//! When will a given reception number be called?
//!
//! Starting from the number currently being served, the averaged throughput
//! curve is walked forward bucket by bucket until the served count passes the
//! target.

use serde::{Deserialize, Serialize};

use crate::error::PredictError;
use crate::storage::DailySamples;
use crate::throughput::{aggregate, AveragedCurve, BucketTime};

/// Outcome of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "time", rename_all = "snake_case")]
pub enum Prediction {
    /// The target should have been called by this bucket.
    At(BucketTime),
    /// The curve ends before the target is reached.
    NotFound,
}

/// Walk `curve` from `current_time` until `my_position` has been served.
///
/// Each bucket is checked before its own throughput is added, so the answer
/// is the first bucket at whose start the served count already exceeds
/// `my_position`.
pub fn predict(
    curve: &AveragedCurve,
    my_position: u32,
    current_served: u32,
    current_time: BucketTime,
) -> Prediction {
    let target = f64::from(my_position);
    let mut served = f64::from(current_served);

    for point in curve
        .points()
        .iter()
        .filter(|p| p.time_of_day >= current_time)
    {
        if target < served {
            return Prediction::At(point.time_of_day);
        }
        served += point.mean_delta;
    }

    Prediction::NotFound
}

/// Build the curve from raw history and predict.
///
/// History without a single usable delta is a usage error rather than a
/// `NotFound`.
pub fn forecast(
    days: &DailySamples,
    my_position: u32,
    current_served: u32,
    current_time: BucketTime,
) -> Result<(AveragedCurve, Prediction), PredictError> {
    let curve = aggregate(days);
    if curve.is_empty() {
        return Err(PredictError::EmptyHistory);
    }
    let prediction = predict(&curve, my_position, current_served, current_time);
    Ok((curve, prediction))
}
