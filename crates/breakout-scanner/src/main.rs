//! breakout-scanner: run the channel breakout detector over local candle files.
//!
//! Each input file is a JSON array of candles (oldest first). The instrument
//! name defaults to the file stem.
//!
//! Usage:
//!   cargo run -p breakout-scanner -- --file data/BTCUSDT.json
//!   cargo run -p breakout-scanner -- --file btc.json --symbol BTCUSDT --file eth.json --symbol ETHUSDT
//!   cargo run -p breakout-scanner -- --dir data/ --top 10 --min-confidence 0.6
//!   cargo run -p breakout-scanner -- --dir data/ --json
//!   cargo run -p breakout-scanner -- --dir data/4h --timeframe 4h

use analysis_core::{Candle, Timeframe};
use anyhow::{bail, Context};
use channel_breakout::{
    format_signals, top_opportunities, BreakoutScanner, BreakoutSnapshot, ChannelBreakoutDetector,
    DetectorConfig, InstrumentCandles, ScanReport, SignalSummary,
};
use chrono::Utc;
use std::path::{Path, PathBuf};

const DEFAULT_TOP: usize = 5;

#[derive(Debug, Clone, PartialEq)]
struct Source {
    path: PathBuf,
    symbol: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct Args {
    sources: Vec<Source>,
    dir: Option<PathBuf>,
    top: usize,
    min_confidence: f64,
    json: bool,
    timeframe: Timeframe,
}

fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    let mut parsed = Args {
        sources: Vec::new(),
        dir: None,
        top: DEFAULT_TOP,
        min_confidence: 0.0,
        json: false,
        timeframe: Timeframe::default(),
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--file" => {
                let path = iter.next().context("--file needs a path")?;
                parsed.sources.push(Source {
                    path: PathBuf::from(path),
                    symbol: None,
                });
            }
            "--symbol" => {
                let symbol = iter.next().context("--symbol needs a name")?;
                match parsed.sources.last_mut() {
                    Some(source) if source.symbol.is_none() => source.symbol = Some(symbol.clone()),
                    _ => bail!("--symbol must follow a --file"),
                }
            }
            "--dir" => {
                let dir = iter.next().context("--dir needs a directory")?;
                parsed.dir = Some(PathBuf::from(dir));
            }
            "--top" => {
                let value = iter.next().context("--top needs a number")?;
                parsed.top = value.parse().with_context(|| format!("invalid --top value {:?}", value))?;
            }
            "--min-confidence" => {
                let value = iter.next().context("--min-confidence needs a number")?;
                parsed.min_confidence = value
                    .parse()
                    .with_context(|| format!("invalid --min-confidence value {:?}", value))?;
            }
            "--json" => parsed.json = true,
            "--timeframe" => {
                let label = iter.next().context("--timeframe needs a label")?;
                parsed.timeframe =
                    Timeframe::from_label(label).with_context(|| format!("unknown --timeframe {:?}", label))?;
            }
            other => bail!("unknown argument {:?}", other),
        }
    }

    if parsed.sources.is_empty() && parsed.dir.is_none() {
        bail!("no input: pass --file PATH or --dir DIR");
    }

    Ok(parsed)
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  breakout-scanner --file PATH [--symbol NAME] ...   Candle files to scan");
    eprintln!("  breakout-scanner --dir DIR                         Every *.json file in DIR");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --top N             Top opportunities to show (default: {})", DEFAULT_TOP);
    eprintln!("  --min-confidence X  Drop signals below X (default: 0.0)");
    eprintln!("  --timeframe LABEL   Candle interval, e.g. 15m, 1h, 4h (default: 1h)");
    eprintln!("  --json              Print the scan report as JSON");
}

fn symbol_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn load_candles(path: &Path) -> anyhow::Result<Vec<Candle>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let candles: Vec<Candle> =
        serde_json::from_str(&raw).with_context(|| format!("parsing candles from {}", path.display()))?;
    Ok(candles)
}

/// Candles whose open-to-close span differs from the expected interval
fn count_off_timeframe(candles: &[Candle], timeframe: Timeframe) -> usize {
    let expected = timeframe.to_duration();
    candles.iter().filter(|c| c.close_time - c.open_time != expected).count()
}

fn collect_sources(args: &Args) -> anyhow::Result<Vec<Source>> {
    let mut sources = args.sources.clone();

    if let Some(dir) = &args.dir {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("listing {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        sources.extend(paths.into_iter().map(|path| Source { path, symbol: None }));
    }

    Ok(sources)
}

fn print_report(report: &ScanReport, top: usize, timeframe: Timeframe) {
    println!(
        "Channel breakout scan ({} candles) - {}",
        timeframe.label(),
        Utc::now().format("%Y-%m-%d %H:%M UTC")
    );
    println!(
        "Scanned {} instruments in {}ms\n",
        report.instruments_scanned(),
        report.elapsed_ms
    );

    for result in &report.results {
        let snapshot = BreakoutSnapshot::from_signals(&result.signals);
        println!(
            "== {} (bands {:.4} / {:.4}, bias {:?}, {:.0}%)",
            result.instrument,
            result.channel.lower,
            result.channel.upper,
            snapshot.direction,
            snapshot.confidence * 100.0
        );
        print!("{}", format_signals(&result.signals));
        println!();
    }

    for failure in &report.failures {
        println!("!! {}: {}", failure.instrument, failure.error);
    }
    if !report.failures.is_empty() {
        println!();
    }

    print!("{}", SignalSummary::from_signals(&report.signals).render());

    let best = top_opportunities(&report.signals, top);
    if !best.is_empty() {
        println!("\nTop {} opportunities", best.len());
        for (rank, signal) in best.iter().enumerate() {
            println!(
                "  {}. {} {} @ {:.4} ({:.1}%)",
                rank + 1,
                signal.instrument(),
                signal.kind(),
                signal.price(),
                signal.confidence() * 100.0
            );
        }
    }

    let grouped = report.instruments_by_kind();
    if !grouped.is_empty() {
        println!();
        for (kind, instruments) in grouped {
            println!("{} ({}): {}", kind, instruments.len(), instruments.join(", "));
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "breakout_scanner=info,channel_breakout=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {:#}\n", e);
            print_usage();
            std::process::exit(1);
        }
    };

    let config = DetectorConfig::from_env().context("loading detector config")?;
    tracing::info!(
        "breakout-scanner: timeframe={} channel={} window={} k={}",
        args.timeframe.label(),
        config.channel_length,
        config.analysis_window,
        config.deviation_multiplier
    );

    let mut universe = Vec::new();
    for source in collect_sources(&args)? {
        let symbol = source.symbol.clone().unwrap_or_else(|| symbol_from_path(&source.path));
        match load_candles(&source.path) {
            Ok(candles) => {
                tracing::info!("Loaded {} candles for {}", candles.len(), symbol);
                let off = count_off_timeframe(&candles, args.timeframe);
                if off > 0 {
                    tracing::warn!(
                        "{}: {} candles do not span {} ({} minutes)",
                        symbol,
                        off,
                        args.timeframe.label(),
                        args.timeframe.to_minutes()
                    );
                }
                universe.push(InstrumentCandles::new(symbol, candles));
            }
            Err(e) => tracing::warn!("Skipping {}: {:#}", symbol, e),
        }
    }

    if universe.is_empty() {
        bail!("no candle files could be loaded");
    }

    let detector = ChannelBreakoutDetector::with_config(config)?;
    let scanner = BreakoutScanner::new(detector).with_min_confidence(args.min_confidence);
    let report = scanner.scan(&universe);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, args.top, args.timeframe);
    }

    Ok(())
}
