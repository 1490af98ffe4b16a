use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;
use weather_core::calendar::GameDate;
use weather_core::config::Tuning;
use weather_core::io::frame::{summary_line, ForecastFrame};
use weather_core::io::profile::load_regions;
use weather_core::region::RegionProfile;
use weather_core::weather::MAX_FORECAST_HOURS;
use weather_core::Almanac;

#[derive(Parser, Debug)]
#[command(
    name = "forecast",
    about = "Batch runner writing deterministic hourly weather as NDJSON frames"
)]
struct Args {
    /// Region JSON document: one region or an array of them.
    #[arg(long, value_name = "PATH")]
    regions: PathBuf,

    /// First hour to forecast, `YYYY-MM-DD` or `YYYY-MM-DDTHH`.
    #[arg(long, value_name = "DATE")]
    start: GameDate,

    /// Number of hours to forecast for every region.
    #[arg(long, default_value_t = 24)]
    hours: u32,

    /// Output NDJSON file path.
    #[arg(long)]
    out: PathBuf,

    /// Optional path for one daily summary line per region and day.
    #[arg(long, value_name = "PATH")]
    summary: Option<PathBuf>,

    /// Tuning JSON document; missing keys keep their defaults.
    #[arg(long, value_name = "PATH")]
    tuning: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short)]
    verbose: bool,
}

/// Every hourly frame for one region, in time order.
fn region_frames(
    almanac: &Almanac,
    region: &RegionProfile,
    start: &GameDate,
    hours: u32,
) -> Result<Vec<String>> {
    let mut lines = Vec::with_capacity(hours as usize);
    let mut offset = 0u32;
    while offset < hours {
        let chunk = (hours - offset).min(MAX_FORECAST_HOURS);
        let chunk_start = start.advance(i64::from(offset));
        let snapshots = almanac
            .forecast(region, &chunk_start, chunk)
            .with_context(|| format!("forecast failed for region {:?}", region.id))?;
        for (index, weather) in snapshots.into_iter().enumerate() {
            let date = weather.date;
            let sky = almanac.celestial_state(region, &date)?;
            let sea = almanac.sea_state(region, &date, &weather)?;
            let frame = ForecastFrame::new(offset + index as u32, weather, sky)
                .with_snow(almanac.accumulation(region, &date)?)
                .with_ground(almanac.ground_temperature(region, &date)?)
                .with_sea(sea)
                .with_alerts(almanac.environmental_conditions(region, &date)?.alerts);
            lines.push(frame.to_ndjson()?);
        }
        offset += chunk;
    }
    Ok(lines)
}

/// One summary per calendar day touched by the run.
fn region_summaries(
    almanac: &Almanac,
    region: &RegionProfile,
    start: &GameDate,
    hours: u32,
) -> Result<Vec<String>> {
    if hours == 0 {
        return Ok(Vec::new());
    }
    let first = start.absolute_day();
    let last = start.advance(i64::from(hours) - 1).absolute_day();
    (first..=last)
        .map(|day| {
            let summary = almanac.daily_summary(region, &GameDate::from_absolute_day(day))?;
            Ok(summary_line(&summary)?)
        })
        .collect()
}

fn write_lines(path: &Path, lines: impl Iterator<Item = String>) -> Result<usize> {
    let file = File::create(path).with_context(|| format!("failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    let mut count = 0;
    for line in lines {
        writer.write_all(line.as_bytes())?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<()> {
    let tuning = match &args.tuning {
        Some(path) => Tuning::load_from_path(path)?,
        None => Tuning::default(),
    };
    let regions = load_regions(&args.regions)?;
    info!(regions = regions.len(), start = %args.start, hours = args.hours, "starting forecast");

    let almanac = Almanac::new(tuning);
    let frames = regions
        .par_iter()
        .map(|region| region_frames(&almanac, region, &args.start, args.hours))
        .collect::<Result<Vec<_>>>()?;
    let written = write_lines(&args.out, frames.into_iter().flatten())?;
    info!(frames = written, out = ?args.out, "wrote forecast frames");

    if let Some(path) = &args.summary {
        let summaries = regions
            .par_iter()
            .map(|region| region_summaries(&almanac, region, &args.start, args.hours))
            .collect::<Result<Vec<_>>>()?;
        let written = write_lines(path, summaries.into_iter().flatten())?;
        info!(summaries = written, out = ?path, "wrote daily summaries");
    }

    for (name, stats) in almanac.cache_stats() {
        tracing::debug!(
            cache = name,
            entries = stats.entries,
            hits = stats.hits,
            misses = stats.misses,
            "cache usage"
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    run(&args)
}

#[cfg(test)]
mod tests {
    use super::{region_frames, region_summaries, Args};
    use clap::{error::ErrorKind, Parser};
    use std::path::PathBuf;
    use weather_core::calendar::GameDate;
    use weather_core::io::profile::load_regions;
    use weather_core::Almanac;

    fn testdata(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../testdata/regions").join(name)
    }

    #[test]
    fn requires_regions() {
        let err = Args::try_parse_from(["forecast", "--start", "1000-01-01", "--out", "out.ndjson"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_start_dates_with_hours() {
        let args = Args::try_parse_from([
            "forecast",
            "--regions",
            "regions.json",
            "--start",
            "1000-03-15T06",
            "--out",
            "out.ndjson",
            "--hours",
            "48",
            "-v",
        ])
        .expect("arguments parse");
        assert_eq!(args.start, GameDate::new(1000, 3, 15, 6).expect("valid"));
        assert_eq!(args.hours, 48);
        assert!(args.verbose);
        assert!(args.summary.is_none());
    }

    #[test]
    fn rejects_malformed_dates() {
        let err = Args::try_parse_from([
            "forecast",
            "--regions",
            "regions.json",
            "--start",
            "1000-13-01",
            "--out",
            "out.ndjson",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn long_runs_span_forecast_windows() {
        let regions = load_regions(&testdata("temperate_coast.json")).expect("regions load");
        let almanac = Almanac::default();
        let start = GameDate::new(1000, 1, 1, 0).expect("valid");
        let hours = 400;
        let lines = region_frames(&almanac, &regions[0], &start, hours).expect("frames");
        assert_eq!(lines.len(), hours as usize);
        let last: serde_json::Value =
            serde_json::from_str(lines[399].trim_end()).expect("valid json");
        assert_eq!(last.get("t").and_then(|v| v.as_u64()), Some(399));
        assert!(last.get("sea").is_some());

        let summaries = region_summaries(&almanac, &regions[0], &start, hours).expect("summaries");
        assert_eq!(summaries.len(), 17);
    }

    #[test]
    fn paired_runs_are_deterministic() {
        let regions = load_regions(&testdata("mixed_world.json")).expect("regions load");
        let start = GameDate::new(1200, 6, 30, 18).expect("valid");
        let run_once = || {
            let almanac = Almanac::default();
            regions
                .iter()
                .map(|region| region_frames(&almanac, region, &start, 12).expect("frames"))
                .collect::<Vec<_>>()
        };
        assert_eq!(run_once(), run_once());
    }
}
