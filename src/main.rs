//! Stint CLI
//!
//! Command-line interface for session files:
//! - Inspect catalogs, laps and details
//! - Dump raw samples and resampled data
//! - Export to CSV
//! - Stage detail updates
//! - Generate a demo session

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stint::{
    format_ticks, parse_ticks, DataPoint, FileSessionReader, FileSessionWriter, Frequency,
    LapType, PhysicalRange, VirtualExpr, VirtualParameter, TICKS_PER_SECOND,
};

#[derive(Parser)]
#[command(name = "stint")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Columnar telemetry session store")]
#[command(
    long_about = "Stint records multi-rate telemetry into immutable session files\nand answers time-windowed, rate-converted queries over them."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json, csv)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a session's catalog, laps and details
    Info {
        /// Session file (.ssn)
        path: PathBuf,
        /// Associated session files to merge (<stem>.<tag>.<nnn>.ssv)
        #[arg(short, long)]
        associated: Vec<String>,
        /// Merge the latest associated session per tag
        #[arg(long)]
        latest: bool,
    },

    /// List laps
    Laps {
        /// Session file
        path: PathBuf,
    },

    /// Dump raw samples of a parameter
    Samples {
        /// Session file
        path: PathBuf,
        /// Parameter identifier (name:group)
        parameter: String,
        /// Restrict to one channel id
        #[arg(short, long)]
        channel: Option<u32>,
        /// Window start (HH:MM:SS[.fff] or ticks; default: session start)
        #[arg(long)]
        start: Option<String>,
        /// Window end (default: session end)
        #[arg(long)]
        end: Option<String>,
        /// Print at most this many samples
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Resample a parameter onto a fixed output grid
    Resample {
        /// Session file
        path: PathBuf,
        /// Parameter identifier (name:group)
        parameter: String,
        /// Target rate in Hz
        #[arg(long)]
        hz: f64,
        /// Hold the previous value instead of interpolating
        #[arg(long)]
        no_interpolate: bool,
        /// Window start (default: session start)
        #[arg(long)]
        start: Option<String>,
        /// Window end (default: session end)
        #[arg(long)]
        end: Option<String>,
        /// Print at most this many samples
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Export raw samples to CSV
    Export {
        /// Session file
        path: PathBuf,
        /// Parameters to export (empty = all)
        #[arg(short, long)]
        parameters: Vec<String>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Update session details (writes the .sse side file)
    SetDetail {
        /// Session file
        path: PathBuf,
        /// Updates in key=value format
        #[arg(required = true)]
        updates: Vec<String>,
    },

    /// Write a demo session for inspection
    Demo {
        /// Output session file
        path: PathBuf,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "stint=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info {
            path,
            associated,
            latest,
        } => {
            let reader = open_session(&path, &associated, latest)?;
            if cli.format == "json" {
                print_info_json(&reader)?;
            } else {
                print_info(&reader);
            }
        }

        Commands::Laps { path } => {
            let reader = FileSessionReader::open(&path)?;
            print_laps(&reader);
        }

        Commands::Samples {
            path,
            parameter,
            channel,
            start,
            end,
            limit,
        } => {
            let reader = FileSessionReader::open(&path)?;
            let (start, end) = resolve_window(&reader, start.as_deref(), end.as_deref())?;
            let samples = match channel {
                Some(id) => reader.get_channel_samples(&parameter, id, start, end)?,
                None => reader.get_samples(&parameter, start, end)?,
            };
            print_points(&samples, limit, &cli.format)?;
        }

        Commands::Resample {
            path,
            parameter,
            hz,
            no_interpolate,
            start,
            end,
            limit,
        } => {
            let reader = FileSessionReader::open(&path)?;
            let (start, end) = resolve_window(&reader, start.as_deref(), end.as_deref())?;
            let data =
                reader.get_data(&parameter, start, end, Frequency::hz(hz), !no_interpolate)?;
            print_points(&data, limit, &cli.format)?;
        }

        Commands::Export {
            path,
            parameters,
            output,
        } => {
            let reader = FileSessionReader::open(&path)?;

            let identifiers: Vec<String> = if parameters.is_empty() {
                reader.parameters().map(|p| p.identifier.clone()).collect()
            } else {
                parameters
                    .iter()
                    .flat_map(|p| p.split(',').map(|s| s.trim().to_string()))
                    .collect()
            };

            let out: Box<dyn std::io::Write> = match &output {
                Some(path) => Box::new(std::fs::File::create(path)?),
                None => Box::new(std::io::stdout()),
            };
            let mut csv_writer = csv::Writer::from_writer(out);
            csv_writer.write_record(["parameter", "time", "value", "label"])?;

            let mut exported = 0usize;
            for identifier in &identifiers {
                let samples =
                    reader.get_samples(identifier, reader.start_time(), reader.end_time())?;
                for point in &samples {
                    let time = format_ticks(point.timestamp);
                    let value = point.value.to_string();
                    csv_writer.write_record([
                        identifier.as_str(),
                        time.as_str(),
                        value.as_str(),
                        point.label.as_deref().unwrap_or(""),
                    ])?;
                }
                exported += samples.len();
            }
            csv_writer.flush()?;

            if let Some(path) = output {
                println!("Exported {} samples to {:?}", exported, path);
            }
        }

        Commands::SetDetail { path, updates } => {
            let mut reader = FileSessionReader::open(&path)?;
            let mut applied = 0;
            for update in &updates {
                match update.split_once('=') {
                    Some((key, value)) => {
                        reader.update_session_detail(key, value)?;
                        applied += 1;
                    }
                    None => {
                        eprintln!("Skipping {:?}: expected key=value", update);
                    }
                }
            }
            reader.close_session()?;
            println!("Updated {} details for {:?}", applied, path);
        }

        Commands::Demo { path } => {
            write_demo_session(&path)?;
            println!("Demo session written to {:?}", path);
            println!();
            println!("Try:");
            println!("  stint info {:?}", path);
            println!("  stint laps {:?}", path);
            println!("  stint samples {:?} vCar:Chassis --limit 10", path);
            println!("  stint resample {:?} vCar:Chassis --hz 1", path);
        }

        Commands::Config { output } => {
            let config = stint::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn open_session(
    path: &Path,
    associated: &[String],
    latest: bool,
) -> anyhow::Result<FileSessionReader> {
    let reader = if !associated.is_empty() {
        FileSessionReader::open_with_associated(path, associated)?
    } else if latest {
        FileSessionReader::open_with_latest_associated(path)?
    } else {
        FileSessionReader::open(path)?
    };
    Ok(reader)
}

fn resolve_window(
    reader: &FileSessionReader,
    start: Option<&str>,
    end: Option<&str>,
) -> anyhow::Result<(i64, i64)> {
    let start = match start {
        Some(s) => parse_time_arg(s)?,
        None => reader.start_time(),
    };
    let end = match end {
        Some(s) => parse_time_arg(s)?,
        None => reader.end_time(),
    };
    Ok((start, end))
}

fn parse_time_arg(s: &str) -> anyhow::Result<i64> {
    parse_ticks(s)
        .ok_or_else(|| anyhow::anyhow!("invalid time {:?}: use HH:MM:SS[.fff] or ticks", s))
}

fn print_info(reader: &FileSessionReader) {
    println!("Session {:?}", reader.path());
    println!(
        "Span: {} - {}",
        format_ticks(reader.start_time()),
        format_ticks(reader.end_time())
    );
    println!();

    let details: Vec<_> = reader.session_items().collect();
    if !details.is_empty() {
        println!("Details:");
        for (key, value) in details {
            println!("  {}: {}", key, value);
        }
        println!();
    }

    println!(
        "{:<24} {:<8} {:<6} {:<10} {:<10}",
        "Parameter", "Units", "Chan", "Rate", "Source"
    );
    println!("{}", "-".repeat(64));
    for parameter in reader.parameters() {
        for channel in parameter.channels() {
            let rate = channel.frequency().to_string();
            println!(
                "{:<24} {:<8} {:<6} {:<10} {:<10}",
                parameter.identifier, parameter.units, channel.id, rate, channel.data_source
            );
        }
    }
    for vp in reader.virtual_parameters() {
        println!(
            "{:<24} {:<8} {:<6} {:<10} {:<10}",
            vp.identifier, "-", "-", "virtual", "-"
        );
    }

    println!();
    println!(
        "{} parameters, {} channels, {} laps",
        reader.parameters().count(),
        reader.channels().count(),
        reader.laps().len()
    );
}

fn print_info_json(reader: &FileSessionReader) -> anyhow::Result<()> {
    let parameters: Vec<_> = reader
        .parameters()
        .map(|p| {
            serde_json::json!({
                "identifier": p.identifier,
                "units": p.units,
                "description": p.description,
                "channels": p.channels().map(|c| serde_json::json!({
                    "id": c.id,
                    "source": c.data_source,
                    "data_type": c.data_type,
                    "interval": c.interval,
                })).collect::<Vec<_>>(),
            })
        })
        .collect();

    let laps: Vec<_> = reader
        .laps()
        .iter()
        .map(|lap| {
            serde_json::json!({
                "number": lap.number,
                "type": lap.lap_type.to_string(),
                "start": lap.start_time,
                "end": lap.end_time,
            })
        })
        .collect();

    let details: Vec<_> = reader
        .session_items()
        .map(|(k, v)| serde_json::json!({ "key": k, "value": v }))
        .collect();

    let value = serde_json::json!({
        "path": reader.path(),
        "start_time": reader.start_time(),
        "end_time": reader.end_time(),
        "parameters": parameters,
        "virtuals": reader.virtual_parameters().map(|v| v.identifier.clone()).collect::<Vec<_>>(),
        "laps": laps,
        "details": details,
    });
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_laps(reader: &FileSessionReader) {
    let laps = reader.laps();
    if laps.is_empty() {
        println!("No laps recorded");
        return;
    }

    println!(
        "{:<5} {:<8} {:<16} {:<16} {}",
        "Lap", "Type", "Start", "End", "Duration"
    );
    println!("{}", "-".repeat(58));
    for lap in laps {
        println!(
            "{:<5} {:<8} {:<16} {:<16} {:.3}s",
            lap.number,
            lap.lap_type.to_string(),
            format_ticks(lap.start_time),
            format_ticks(lap.end_time),
            lap.duration() as f64 / TICKS_PER_SECOND as f64
        );
    }
}

fn print_points(points: &[DataPoint], limit: usize, format: &str) -> anyhow::Result<()> {
    match format {
        "json" => {
            let shown: Vec<_> = points.iter().take(limit).collect();
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        "csv" => {
            println!("time,value,label");
            for point in points.iter().take(limit) {
                println!(
                    "{},{},{}",
                    format_ticks(point.timestamp),
                    point.value,
                    point.label.as_deref().unwrap_or("")
                );
            }
        }
        _ => {
            println!("{:<16} {:<14} {}", "Time", "Value", "Label");
            println!("{}", "-".repeat(40));
            for point in points.iter().take(limit) {
                println!(
                    "{:<16} {:<14} {}",
                    format_ticks(point.timestamp),
                    point.value,
                    point.label.as_deref().unwrap_or("")
                );
            }
            if points.len() > limit {
                println!("... {} of {} samples shown", limit, points.len());
            }
        }
    }
    Ok(())
}

// Demo session: ten minutes from 09:00:00, 100 ms samples, a lap each minute
const DEMO_START: i64 = 32_400_000_000_000;
const DEMO_SAMPLES: usize = 6001;
const DEMO_LAPS: u32 = 9;

fn write_demo_session(path: &Path) -> anyhow::Result<()> {
    let mut writer = FileSessionWriter::create(path)?;

    writer.add_session_details("Driver", "OP")?;
    writer.add_session_details("Team", "Garage 31")?;
    writer.add_session_details("Track", "Silverstone")?;
    writer.add_session_details("Weather", "Dry")?;
    writer.add_session_details("Compound", "C3")?;

    let rate = Frequency::hz(10.0);
    writer
        .build_rational_parameter("Chassis", "vCar", PhysicalRange::new(0.0, 400.0))
        .description("Car speed")
        .units("kph")
        .on_periodic_channel(rate)
        .add_to_session()?;
    writer
        .build_rational_parameter("Power", "nEngine", PhysicalRange::new(0.0, 15_000.0))
        .description("Engine speed")
        .units("rpm")
        .on_periodic_channel(rate)
        .add_to_session()?;
    writer
        .build_rational_parameter("Power", "rThrottle", PhysicalRange::new(0.0, 100.0))
        .description("Throttle position")
        .units("%")
        .on_periodic_channel(rate)
        .add_to_session()?;
    writer
        .build_rational_parameter("Hydraulics", "pBrakeF", PhysicalRange::new(0.0, 250.0))
        .description("Front brake pressure")
        .units("bar")
        .on_periodic_channel(rate)
        .add_to_session()?;
    writer
        .build_rational_parameter("Hydraulics", "pBrakeR", PhysicalRange::new(0.0, 250.0))
        .description("Rear brake pressure")
        .units("bar")
        .on_periodic_channel(rate)
        .add_to_session()?;
    writer
        .build_rational_parameter("Chassis", "aSteer", PhysicalRange::new(-180.0, 180.0))
        .description("Steering angle")
        .units("deg")
        .on_periodic_channel(rate)
        .add_to_session()?;
    writer
        .build_rational_parameter("Power", "TAirbox", PhysicalRange::new(0.0, 120.0))
        .description("Airbox temperature")
        .units("C")
        .on_periodic_channel(rate)
        .add_to_session()?;
    writer
        .build_rational_parameter("Chassis", "gLat", PhysicalRange::new(-6.0, 6.0))
        .description("Lateral acceleration")
        .units("g")
        .on_periodic_channel(rate)
        .add_to_session()?;
    writer
        .build_text_parameter("Aero", "DrsOpen")
        .description("DRS flap state")
        .add_lookup(0.0, "NO")
        .add_lookup(1.0, "YES")
        .default_value("NO")
        .on_periodic_channel(rate)
        .add_to_session()?;
    writer.add_virtual_parameter(
        VirtualParameter::new(
            "vCarMS",
            "Chassis",
            VirtualExpr::scale("vCar:Chassis", 1.0 / 3.6, 0.0),
        )
        .description("Car speed in metres per second"),
    )?;
    writer.commit_parameters()?;

    let channel_ids: Vec<u32> = writer.channels().map(|c| c.id).collect();
    for &channel_id in &channel_ids {
        let mut written = 0;
        while written < DEMO_SAMPLES {
            let burst = 1000.min(DEMO_SAMPLES - written);
            let values: Vec<f64> = (written..written + burst)
                .map(|i| demo_value(channel_id, i))
                .collect();
            let start = DEMO_START + written as i64 * rate.interval();
            writer.write_periodic_values(channel_id, start, &values)?;
            written += burst;
        }
    }

    for lap in 1..=DEMO_LAPS {
        let lap_type = match lap {
            1 => LapType::OutLap,
            DEMO_LAPS => LapType::InLap,
            _ => LapType::Default,
        };
        let timestamp = DEMO_START + (lap as i64 - 1) * 60 * TICKS_PER_SECOND;
        writer.add_lap(lap, timestamp, lap_type)?;
    }

    writer.close_session()?;
    Ok(())
}

fn demo_value(channel: u32, i: usize) -> f64 {
    use std::f64::consts::TAU;
    let t = i as f64 * 0.1; // seconds since session start
    let lap_phase = (t * TAU / 60.0).sin();

    match channel {
        1 => 180.0 + 120.0 * lap_phase,                        // vCar
        2 => 9_000.0 + 4_000.0 * lap_phase,                    // nEngine
        3 => (50.0 + 60.0 * lap_phase).clamp(0.0, 100.0),      // rThrottle
        4 => (40.0 - 90.0 * lap_phase).clamp(0.0, 250.0),      // pBrakeF
        5 => (30.0 - 70.0 * lap_phase).clamp(0.0, 250.0),      // pBrakeR
        6 => 90.0 * (t * TAU / 120.0).sin(),                   // aSteer
        7 => 80.0 + t / 60.0,                                  // TAirbox
        8 => 4.0 * (t * TAU / 30.0).sin(),                     // gLat
        9 => {
            // DRS opens on the straights
            if 180.0 + 120.0 * lap_phase > 250.0 {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}
