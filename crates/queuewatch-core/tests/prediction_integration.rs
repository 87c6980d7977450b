//! Integration tests for the prediction engine over CSV history.

use std::fs;

use chrono::NaiveDate;
use queuewatch_core::{
    aggregate, daily_throughput, forecast, BucketTime, CsvSampleStore, PredictError, Prediction,
    Sample, SampleSink,
};
use tempfile::TempDir;

fn bucket(s: &str) -> BucketTime {
    s.parse().unwrap()
}

fn record_day(store: &CsvSampleStore, day: u32, samples: &[(u32, u32, u32)]) {
    let date = NaiveDate::from_ymd_opt(2019, 3, day).unwrap();
    for &(h, m, counter) in samples {
        let ts = date.and_hms_milli_opt(h, m, 4, 250).unwrap();
        store.append(&Sample::new(ts, counter)).unwrap();
    }
}

#[test]
fn two_identical_days_predict_the_half_hour_after_next() {
    let dir = TempDir::new().unwrap();
    let store = CsvSampleStore::new(dir.path());
    for day in [12, 13] {
        record_day(&store, day, &[(9, 30, 0), (10, 0, 12), (10, 30, 25)]);
    }

    let days = store.read_all().unwrap();
    let (curve, prediction) = forecast(&days, 60, 50, bucket("10:00")).unwrap();

    let points: Vec<_> = curve
        .points()
        .iter()
        .map(|p| (p.time_of_day.to_string(), p.mean_delta))
        .collect();
    assert_eq!(
        points,
        vec![("10:00".to_string(), 12.0), ("10:30".to_string(), 13.0)]
    );
    assert_eq!(prediction, Prediction::At(bucket("10:30")));
}

#[test]
fn irregular_polling_times_share_buckets() {
    let dir = TempDir::new().unwrap();
    let store = CsvSampleStore::new(dir.path());
    record_day(&store, 12, &[(9, 31, 0), (10, 2, 10), (10, 29, 20)]);
    record_day(&store, 14, &[(9, 28, 0), (9, 58, 6), (10, 33, 16)]);

    let curve = aggregate(&store.read_all().unwrap());
    assert_eq!(curve.get(bucket("10:00")).unwrap().mean_delta, 8.0);
    assert_eq!(curve.get(bucket("10:30")).unwrap().mean_delta, 10.0);
    assert_eq!(curve.len(), 2);
}

#[test]
fn day_series_matches_written_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("2019-03-12.csv"),
        "2019-03-12 09:30:01.100000,0\n\
         2019-03-12 10:00:00.900000,12\n\
         2019-03-12 10:30:02.000000,25\n\
         2019-03-12 11:00:01.000000,31\n",
    )
    .unwrap();

    let store = CsvSampleStore::new(dir.path());
    let samples = store
        .read_day(NaiveDate::from_ymd_opt(2019, 3, 12).unwrap())
        .unwrap();
    let deltas: Vec<_> = daily_throughput(&samples).iter().map(|p| p.delta).collect();
    assert_eq!(deltas, vec![12, 13, 6]);
}

#[test]
fn history_of_single_samples_cannot_predict() {
    let dir = TempDir::new().unwrap();
    let store = CsvSampleStore::new(dir.path());
    record_day(&store, 12, &[(10, 0, 5)]);
    record_day(&store, 13, &[(10, 0, 7)]);

    let err = forecast(&store.read_all().unwrap(), 10, 5, bucket("0930")).unwrap_err();
    assert!(matches!(err, PredictError::EmptyHistory));
}

#[test]
fn target_beyond_recorded_day_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = CsvSampleStore::new(dir.path());
    record_day(&store, 12, &[(9, 30, 0), (10, 0, 12), (10, 30, 25)]);

    let (_, prediction) = forecast(&store.read_all().unwrap(), 200, 50, bucket("10:00")).unwrap();
    assert_eq!(prediction, Prediction::NotFound);
}
