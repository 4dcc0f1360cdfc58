/// Soul Render - play a generated tone through the render graph
use anyhow::Result;
use clap::{Parser, Subcommand};
use soul_render::resampling::SrcComplexity;
use soul_render_cli::{config::AppConfig, session, EffectConfig, RunReport};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "soul-render")]
#[command(about = "Soul Render real-time audio output pipeline", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "SOUL_RENDER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides shared by `play` and `render`
#[derive(clap::Args)]
struct ToneArgs {
    /// Tone frequency in Hz
    #[arg(short, long)]
    frequency: Option<f64>,

    /// Tone length in seconds
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Tone sample rate in Hz
    #[arg(long)]
    source_rate: Option<f64>,

    /// Master volume (0.0 to 1.0)
    #[arg(short, long)]
    volume: Option<f32>,

    /// Sample rate converter quality
    #[arg(long, value_parser = parse_complexity)]
    quality: Option<SrcComplexity>,

    /// Effect to append, e.g. `gain:-6`, `delay:250`, `limiter` (repeatable)
    #[arg(short, long = "effect")]
    effects: Vec<String>,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a tone on an output device until it drains
    Play {
        /// Output device name
        #[arg(short, long)]
        device: Option<String>,

        /// Device sample rate to switch to before playing
        #[arg(long)]
        device_rate: Option<f64>,

        #[command(flatten)]
        tone: ToneArgs,
    },
    /// Render a tone offline through a virtual device
    Render {
        /// Virtual device sample rate in Hz
        #[arg(long, default_value_t = 48_000.0)]
        rate: f64,

        /// Virtual device channel count
        #[arg(long, default_value_t = 2)]
        channels: u16,

        /// Frames per render call
        #[arg(long, default_value_t = 512)]
        slice: usize,

        #[command(flatten)]
        tone: ToneArgs,
    },
    /// List output devices
    Devices {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "soul_render=info,soul_render_desktop=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            device,
            device_rate,
            tone,
        } => {
            let mut config = load_config(cli.config.as_deref(), &tone)?;
            if device.is_some() {
                config.device = device;
            }
            if device_rate.is_some() {
                config.device_sample_rate = device_rate;
            }
            config.validate()?;
            print_report(&session::play(&config)?, tone.json)?;
        }
        Commands::Render {
            rate,
            channels,
            slice,
            tone,
        } => {
            let config = load_config(cli.config.as_deref(), &tone)?;
            config.validate()?;
            print_report(
                &session::render_offline(&config, rate, channels, slice.max(1))?,
                tone.json,
            )?;
        }
        Commands::Devices { json } => list_devices(json)?,
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>, args: &ToneArgs) -> Result<AppConfig> {
    let mut config = AppConfig::load(path)?;
    if let Some(frequency) = args.frequency {
        config.tone.frequency = frequency;
    }
    if let Some(seconds) = args.seconds {
        config.tone.seconds = seconds;
    }
    if let Some(rate) = args.source_rate {
        config.tone.sample_rate = rate;
    }
    if let Some(volume) = args.volume {
        config.graph.volume = volume;
    }
    if let Some(quality) = args.quality {
        config.graph.src_complexity = quality;
    }
    for effect in &args.effects {
        config.effects.push(EffectConfig::parse(effect)?);
    }
    Ok(config)
}

fn parse_complexity(value: &str) -> Result<SrcComplexity, String> {
    match value.to_ascii_lowercase().as_str() {
        "linear" => Ok(SrcComplexity::Linear),
        "normal" => Ok(SrcComplexity::Normal),
        "mastering" => Ok(SrcComplexity::Mastering),
        "maximum" => Ok(SrcComplexity::Maximum),
        other => Err(format!(
            "unknown quality '{}' (linear, normal, mastering, maximum)",
            other
        )),
    }
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    let stats = &report.stats;
    println!("Frames rendered: {}", stats.frames_rendered);
    println!("Source frames:   {}", stats.source_frames);
    println!("Silence frames:  {}", stats.silence_frames);
    println!("Render cycles:   {}", stats.cycles);
    println!("Latency:         {:.2} ms", report.latency_seconds * 1000.0);
    println!("Drained:         {}", report.drained);
    if stats.source_errors > 0 || stats.bypassed_units > 0 || stats.source_busy > 0 {
        println!(
            "Warnings:        {} source errors, {} bypassed units, {} busy cycles",
            stats.source_errors, stats.bypassed_units, stats.source_busy
        );
    }
    Ok(())
}

fn list_devices(json: bool) -> Result<()> {
    let devices = soul_render_desktop::list_devices()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }
    if devices.is_empty() {
        println!("No output devices found");
        return Ok(());
    }
    for device in &devices {
        let marker = if device.is_default { "*" } else { " " };
        let range = device
            .sample_rate_range
            .map(|(min, max)| format!(", {}-{} Hz", min, max))
            .unwrap_or_default();
        println!(
            "{} {} ({} Hz, {} ch{})",
            marker, device.name, device.sample_rate, device.channels, range
        );
    }
    Ok(())
}
