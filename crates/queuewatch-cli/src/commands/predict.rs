use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::Args;
use queuewatch_core::{aggregate, daily_throughput, forecast, BucketTime, Prediction};
use serde_json::json;

use super::sample_store;

#[derive(Args)]
pub struct PredictArgs {
    /// Your reception number
    #[arg(long = "my", value_name = "NUMBER")]
    pub my_position: u32,
    /// Reception number currently being served
    #[arg(long = "current", value_name = "NUMBER")]
    pub current_served: u32,
    /// Time of interest, HH:MM or HHMM (defaults to now)
    #[arg(long)]
    pub at: Option<BucketTime>,
    /// Directory with recorded samples (defaults to the configured one)
    #[arg(long)]
    pub samples_dir: Option<PathBuf>,
    /// Also print the average throughput chart
    #[arg(long)]
    pub chart: bool,
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: PredictArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = sample_store(args.samples_dir)?;
    let at = args
        .at
        .unwrap_or_else(|| BucketTime::from(Local::now().time()));

    let days = store.read_all()?;
    let (curve, prediction) = forecast(&days, args.my_position, args.current_served, at)?;

    if args.json {
        let out = json!({
            "my_position": args.my_position,
            "current_served": args.current_served,
            "at": at.to_string(),
            "days": days.len(),
            "predicted": match prediction {
                Prediction::At(t) => Some(t.to_string()),
                Prediction::NotFound => None,
            },
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        match prediction {
            Prediction::At(t) => println!("Number {} should be called around {t}", args.my_position),
            Prediction::NotFound => println!(
                "Cannot predict: the recorded history ends before number {} is reached",
                args.my_position
            ),
        }
        if args.chart {
            print!("{}", curve.render_ascii_chart());
        }
    }
    Ok(())
}

pub fn curve(samples_dir: Option<PathBuf>, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = sample_store(samples_dir)?;
    let days = store.read_all()?;
    let curve = aggregate(&days);

    if as_json {
        let points: Vec<_> = curve
            .points()
            .iter()
            .map(|p| {
                json!({
                    "time": p.time_of_day.to_string(),
                    "average_throughput": p.mean_delta,
                    "samples": p.samples,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&points)?);
    } else if curve.is_empty() {
        println!("No throughput recorded yet ({} day files)", days.len());
    } else {
        println!("{} days recorded", days.len());
        print!("{}", curve.render_ascii_chart());
    }
    Ok(())
}

pub fn day(
    date: &str,
    samples_dir: Option<PathBuf>,
    as_json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{date}': {e}"))?;
    let store = sample_store(samples_dir)?;
    let samples = store.read_day(date)?;
    let points = daily_throughput(&samples);

    if as_json {
        let rows: Vec<_> = samples
            .iter()
            .skip(1)
            .zip(&points)
            .map(|(sample, point)| {
                json!({
                    "time": point.time_of_day.to_string(),
                    "reception_number": sample.counter,
                    "throughput": point.delta,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if samples.is_empty() {
        println!("No samples recorded on {date}");
        return Ok(());
    }

    println!("{date}");
    println!("{:<6} {:>8} {:>10}", "time", "number", "throughput");
    for (sample, point) in samples.iter().skip(1).zip(&points) {
        println!(
            "{:<6} {:>8} {:>10}",
            point.time_of_day.to_string(),
            sample.counter,
            point.delta
        );
    }
    Ok(())
}
