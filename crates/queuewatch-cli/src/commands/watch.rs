use queuewatch_core::error::Result;
use queuewatch_core::{
    Config, CsvSampleStore, HttpPageSource, Monitor, MonitorSettings, PageSource, PersistError,
    Sample, SampleSink, SystemClock,
};
use serde_json::json;

/// Sink for `probe`: a single first-round step never records.
struct Discard;

impl SampleSink for Discard {
    fn append(&self, _sample: &Sample) -> Result<(), PersistError> {
        Ok(())
    }
}

fn monitor_parts(config: &Config) -> Result<(HttpPageSource, MonitorSettings)> {
    config.validate()?;
    let settings = MonitorSettings::from_config(config)?;
    Ok((HttpPageSource::new(&config.monitor.url), settings))
}

async fn watch() -> Result<()> {
    let config = Config::load()?;
    let (source, settings) = monitor_parts(&config)?;
    let store = CsvSampleStore::new(config.samples_dir()?);
    tracing::info!(
        url = source.describe(),
        samples = %store.dir().display(),
        "watching reception page"
    );

    let mut monitor = Monitor::new(source, store, SystemClock, settings);
    Err(monitor.run().await.into())
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    watch().await?;
    Ok(())
}

pub async fn probe(as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let (source, settings) = monitor_parts(&config)?;

    let mut monitor = Monitor::new(source, Discard, SystemClock, settings);
    let cycle = monitor.step().await?;

    if as_json {
        let out = json!({
            "status": cycle.observation.status,
            "counter": cycle.observation.counter,
            "next_check": cycle.next_wakeup.naive_local(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        match cycle.observation.counter {
            Some(counter) => println!("Status: {} (now serving {counter})", cycle.observation.status),
            None => println!("Status: {}", cycle.observation.status),
        }
        println!(
            "Next scheduled check: {}",
            cycle.next_wakeup.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}
