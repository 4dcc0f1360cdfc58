/// CPAL output sink driving a render graph from a dedicated audio thread
use crate::device::{default_device, CpalDevice};
use crate::error::{AudioError, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, Stream};
use crossbeam_channel::{bounded, Receiver, Sender};
use soul_render::device::OutputDevice;
use soul_render::graph::{GraphConfig, GraphState, RenderGraph, RenderHandle, StopHandle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

type Reply = Sender<Result<()>>;

/// Commands sent to the audio thread
enum AudioCommand {
    /// Build the stream if needed and start it
    Start(Reply),
    /// Pause the stream, keeping it built
    Pause(Reply),
    /// Drop the stream and build a new one from the current device properties
    Rebuild(Reply),
    /// Drop the stream and exit the thread
    Shutdown,
}

/// Failure reported by the stream's error callback
#[derive(Debug, Default)]
struct StreamFault {
    failed: AtomicBool,
    message: Mutex<Option<String>>,
}

impl StreamFault {
    /// Record `err` and ask the graph to stop at its next cycle
    fn report(&self, stop: &StopHandle, err: &dyn std::fmt::Display) {
        error!("Audio stream error: {}", err);
        *self.message.lock().unwrap_or_else(PoisonError::into_inner) = Some(err.to_string());
        self.failed.store(true, Ordering::Release);
        stop.request_stop();
    }

    fn is_set(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    fn take(&self) -> Option<String> {
        self.failed.store(false, Ordering::Release);
        self.message
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// CPAL audio output
///
/// Owns a [`RenderGraph`] bound to a [`CpalDevice`]. The device callback pulls
/// every buffer through [`RenderHandle::render`].
///
/// **Architecture**: Uses a dedicated audio thread that owns the CPAL Stream.
/// The control thread communicates with it via channels, avoiding Send/Sync
/// issues with CPAL's Stream type across different platforms.
pub struct CpalOutput {
    graph: RenderGraph,
    device: Arc<CpalDevice>,
    command_tx: Sender<AudioCommand>,
    audio_thread: Option<JoinHandle<()>>,
    fault: Arc<StreamFault>,
}

impl CpalOutput {
    /// Create an output on the default device
    ///
    /// # Errors
    /// Returns an error if no audio device is found or the graph cannot open
    pub fn new(config: GraphConfig) -> Result<Self> {
        Self::with_device(default_device()?, config)
    }

    /// Create an output on a specific device
    pub fn with_device(device: Device, config: GraphConfig) -> Result<Self> {
        let properties = Arc::new(CpalDevice::from_cpal(&device)?);

        let mut graph = RenderGraph::new(config);
        graph.open(Arc::clone(&properties) as Arc<dyn OutputDevice>)?;

        let (command_tx, command_rx) = bounded::<AudioCommand>(32);
        let fault = Arc::new(StreamFault::default());
        let callbacks = StreamCallbacks {
            render: graph.render_handle(),
            stop: graph.stop_handle(),
            fault: Arc::clone(&fault),
        };
        let thread_properties = Arc::clone(&properties);
        let audio_thread = thread::Builder::new()
            .name("soul-render-output".to_string())
            .spawn(move || audio_thread_run(&device, &thread_properties, &callbacks, &command_rx))
            .map_err(|e| AudioError::AudioThread(e.to_string()))?;

        info!(device = %properties.name(), "CPAL output created");
        Ok(Self {
            graph,
            device: properties,
            command_tx,
            audio_thread: Some(audio_thread),
            fault,
        })
    }

    /// The render graph behind this output
    pub fn graph(&self) -> &RenderGraph {
        &self.graph
    }

    /// Mutable access for source and effect changes
    pub fn graph_mut(&mut self) -> &mut RenderGraph {
        &mut self.graph
    }

    /// Device properties
    pub fn device(&self) -> &Arc<CpalDevice> {
        &self.device
    }

    /// Start the graph and the device stream
    ///
    /// If the stream cannot start the graph is stopped again.
    pub fn start(&mut self) -> Result<()> {
        self.graph.start()?;
        if let Some(stale) = self.fault.take() {
            debug!("Clearing earlier stream error: {}", stale);
        }
        if let Err(e) = self.send(AudioCommand::Start) {
            if let Err(stop_err) = self.graph.stop() {
                warn!("Failed to stop graph after stream error: {}", stop_err);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Stop the graph, then pause the device stream
    pub fn stop(&mut self) -> Result<()> {
        self.graph.stop()?;
        self.send(AudioCommand::Pause)
    }

    /// Ask the graph to stop at the next cycle without waiting
    pub fn request_stop(&self) {
        self.graph.request_stop();
    }

    /// Current graph state, observing stop requests made by the render thread
    ///
    /// A stream error stops the graph here; a failed stream may never call
    /// back again to act on the stop request.
    pub fn poll_state(&mut self) -> GraphState {
        if self.fault.is_set()
            && matches!(self.graph.state(), GraphState::Running | GraphState::Stopping)
        {
            if let Err(e) = self.graph.stop() {
                warn!("Failed to stop graph after stream error: {}", e);
            }
        }
        self.graph.poll_state()
    }

    /// Whether the stream reported an error since the last start
    pub fn has_stream_error(&self) -> bool {
        self.fault.is_set()
    }

    /// Take the last stream error, clearing it
    pub fn take_stream_error(&self) -> Option<String> {
        self.fault.take()
    }

    /// Change the device rate, renegotiate the graph and rebuild the stream
    pub fn set_sample_rate(&mut self, rate: f64) -> Result<()> {
        let previous = self.device.sample_rate();
        self.device.set_sample_rate(rate)?;
        if let Err(e) = self.graph.device_format_changed() {
            if let Err(restore_err) = self.device.set_sample_rate(previous) {
                warn!("Failed to restore device rate: {}", restore_err);
            }
            return Err(e.into());
        }
        self.send(AudioCommand::Rebuild)
    }

    /// Shut down the audio thread and close the graph
    ///
    /// Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(audio_thread) = self.audio_thread.take() else {
            return Ok(());
        };
        self.graph.stop()?;
        // The thread may already be gone; joining reports that
        let _ = self.command_tx.send(AudioCommand::Shutdown);
        audio_thread
            .join()
            .map_err(|_| AudioError::AudioThread("audio thread panicked".to_string()))?;
        self.graph.close()?;
        info!("CPAL output closed");
        Ok(())
    }

    fn send(&self, command: impl FnOnce(Reply) -> AudioCommand) -> Result<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.command_tx
            .send(command(reply_tx))
            .map_err(|e| AudioError::AudioThread(format!("failed to send command: {}", e)))?;
        reply_rx
            .recv()
            .map_err(|e| AudioError::AudioThread(format!("no reply: {}", e)))?
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close CPAL output: {}", e);
        }
    }
}

impl std::fmt::Debug for CpalOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpalOutput")
            .field("device", &self.device.name())
            .field("state", &self.graph.state())
            .finish()
    }
}

/// What the stream callbacks need from the graph
struct StreamCallbacks {
    render: RenderHandle,
    stop: StopHandle,
    fault: Arc<StreamFault>,
}

/// Audio thread main loop
///
/// Owns the CPAL Stream and processes commands from the control thread.
fn audio_thread_run(
    device: &Device,
    properties: &Arc<CpalDevice>,
    callbacks: &StreamCallbacks,
    command_rx: &Receiver<AudioCommand>,
) {
    let mut stream: Option<Stream> = None;
    let mut playing = false;

    while let Ok(cmd) = command_rx.recv() {
        match cmd {
            AudioCommand::Start(reply) => {
                let result = match stream.take() {
                    Some(s) => Ok(s),
                    None => build_stream(device, properties, callbacks),
                }
                .and_then(|s| {
                    s.play()?;
                    Ok(s)
                })
                .map(|s| {
                    stream = Some(s);
                    playing = true;
                });
                let _ = reply.send(result);
            }
            AudioCommand::Pause(reply) => {
                let result = match &stream {
                    Some(s) => s.pause().map_err(AudioError::from),
                    None => Ok(()),
                };
                playing = false;
                let _ = reply.send(result);
            }
            AudioCommand::Rebuild(reply) => {
                drop(stream.take());
                let result = build_stream(device, properties, callbacks).and_then(|s| {
                    if playing {
                        s.play()?;
                    }
                    stream = Some(s);
                    Ok(())
                });
                if result.is_err() {
                    playing = false;
                }
                let _ = reply.send(result);
            }
            AudioCommand::Shutdown => {
                drop(stream.take());
                break;
            }
        }
    }
    debug!("Audio thread exiting");
}

fn build_stream(
    device: &Device,
    properties: &Arc<CpalDevice>,
    callbacks: &StreamCallbacks,
) -> Result<Stream> {
    let config = properties.stream_config();
    let channels = usize::from(config.channels).max(1);
    let handle = callbacks.render.clone();
    let stop = callbacks.stop.clone();
    let fault = Arc::clone(&callbacks.fault);
    let latency = Arc::clone(properties);

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], info: &cpal::OutputCallbackInfo| {
            handle.render(data, data.len() / channels);
            let timestamp = info.timestamp();
            if let Some(delay) = timestamp.playback.duration_since(&timestamp.callback) {
                latency.record_latency(delay);
            }
        },
        move |err| fault.report(&stop, &err),
        None,
    )?;

    debug!(
        rate = config.sample_rate,
        channels = config.channels,
        "Built output stream"
    );
    Ok(stream)
}
