/// Building and driving a render graph from configuration
use crate::config::AppConfig;
use anyhow::{Context, Result};
use serde::Serialize;
use soul_render::device::{OutputDevice, VirtualDevice};
use soul_render::graph::{GraphState, RenderGraph, RenderStats};
use soul_render::sources::ToneSource;
use soul_render_desktop::CpalOutput;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Install the configured tone and effect chain on an open graph
pub fn configure_graph(graph: &mut RenderGraph, config: &AppConfig) -> Result<()> {
    let tone = &config.tone;
    let source = ToneSource::new(tone.sample_rate, tone.channels, tone.frequency, tone.seconds)
        .with_amplitude(tone.amplitude);
    graph.set_source(Box::new(source)).context("failed to install tone source")?;

    for effect in &config.effects {
        let handle = graph
            .add_effect_with(&effect.descriptor(), effect.params())
            .with_context(|| format!("failed to add {:?}", effect))?;
        info!(%handle, "Added {:?}", effect);
    }
    Ok(())
}

/// Summary of a finished run
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RunReport {
    pub stats: RenderStats,
    pub drained: bool,
    pub latency_seconds: f64,
}

/// Render the configured tone offline until the graph drains
///
/// Pulls `slice` frames at a time from a virtual device; no hardware involved.
pub fn render_offline(
    config: &AppConfig,
    device_rate: f64,
    device_channels: u16,
    slice: usize,
) -> Result<RunReport> {
    let mut graph_config = config.graph.clone();
    graph_config.stop_when_drained = true;

    let mut graph = RenderGraph::new(graph_config);
    let device: Arc<dyn OutputDevice> =
        Arc::new(VirtualDevice::new("offline", device_rate, device_channels));
    graph.open(device)?;
    configure_graph(&mut graph, config)?;
    graph.start()?;

    let render = graph.render_handle();
    let mut output = vec![0.0f32; slice * usize::from(device_channels)];
    // Bounded by the tone length plus the longest possible effect tail
    let limit = ((config.tone.seconds + 60.0) * device_rate) as u64;
    let mut rendered = 0u64;
    while graph.poll_state() == GraphState::Running && rendered < limit {
        render.render(&mut output, slice);
        rendered += slice as u64;
    }
    if rendered >= limit {
        warn!(frames = rendered, "Offline render stopped before the graph drained");
    }

    let report = RunReport {
        stats: graph.render_stats(),
        drained: graph.is_drained(),
        latency_seconds: graph.latency(),
    };
    if let Some(err) = graph.take_render_error() {
        warn!("Render error during offline run: {}", err);
    }
    graph.close()?;
    Ok(report)
}

/// Play the configured tone on a cpal device until it drains
pub fn play(config: &AppConfig) -> Result<RunReport> {
    let mut graph_config = config.graph.clone();
    graph_config.stop_when_drained = true;

    let mut output = match &config.device {
        Some(name) => {
            let device = soul_render_desktop::find_device(name)?;
            CpalOutput::with_device(device, graph_config)?
        }
        None => CpalOutput::new(graph_config)?,
    };

    if let Some(rate) = config.device_sample_rate {
        output
            .set_sample_rate(rate)
            .with_context(|| format!("failed to set device rate to {} Hz", rate))?;
    }
    configure_graph(output.graph_mut(), config)?;

    info!(
        device = %output.device().name(),
        rate = output.graph().format().sample_rate,
        src = output.graph().is_performing_sample_rate_conversion(),
        "Starting playback"
    );
    output.start()?;

    let deadline = Instant::now() + Duration::from_secs_f64(config.tone.seconds + 60.0);
    while output.poll_state() == GraphState::Running {
        if Instant::now() >= deadline {
            warn!("Playback did not drain before the deadline, stopping");
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    if let Some(err) = output.take_stream_error() {
        warn!("Playback ended by stream error: {}", err);
    }
    output.stop()?;

    let report = RunReport {
        stats: output.graph().render_stats(),
        drained: output.graph().is_drained(),
        latency_seconds: output.graph().latency(),
    };
    if let Some(err) = output.graph().take_render_error() {
        warn!("Render error during playback: {}", err);
    }
    output.close()?;
    Ok(report)
}
