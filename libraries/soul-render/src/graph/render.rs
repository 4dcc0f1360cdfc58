//! Real-time render path
//!
//! [`RenderHandle::render`] is the only entry point the device driver calls.
//! It loads one snapshot, pulls from the converter in slices, runs every unit
//! and maps graph channels to device channels. It never allocates, blocks or
//! logs: the source slot and each unit are `try_lock`ed, everything else is an
//! atomic.

use super::output::OutputLevels;
use super::snapshot::GraphSnapshot;
use super::state::{AtomicGraphState, GraphState};
use super::status::{RenderCounters, RenderStats, RenderStatus};
use crate::converter::Converter;
use arc_swap::ArcSwap;
use soul_core::{AudioBufferList, StreamFormat, MAX_CHANNELS};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

/// Mixer input: the converter plus scratch sized for one slice
pub(crate) struct SourceSlot {
    pub converter: Option<Converter>,
    /// Converter output, in the graph format
    pub pull: AudioBufferList,
    /// Interleaved working buffer the units process in place
    pub work: Vec<f32>,
}

impl SourceSlot {
    pub(crate) fn new(format: StreamFormat, max_frames: usize) -> Self {
        Self {
            converter: None,
            pull: AudioBufferList::new(format, max_frames),
            work: vec![0.0; max_frames * usize::from(format.channels)],
        }
    }

    /// Resize scratch for a new format (control context)
    pub(crate) fn resize(&mut self, format: StreamFormat, max_frames: usize) {
        self.pull = AudioBufferList::new(format, max_frames);
        self.work = vec![0.0; max_frames * usize::from(format.channels)];
    }
}

/// State shared between the control context and the render thread
pub(crate) struct GraphShared {
    pub snapshot: ArcSwap<GraphSnapshot>,
    pub slot: Mutex<SourceSlot>,
    pub state: AtomicGraphState,
    pub stop_requested: AtomicBool,
    pub in_render: AtomicBool,
    pub observed_generation: AtomicU64,
    pub levels: OutputLevels,
    pub counters: RenderCounters,
    pub last_status: AtomicU32,
    pub source_error: AtomicBool,
    pub end_of_stream: AtomicBool,
    pub tail_remaining: AtomicU64,
    pub drained: AtomicBool,
    pub stop_when_drained: AtomicBool,
}

impl GraphShared {
    pub(crate) fn new(volume: f32, pre_gain: f32, stop_when_drained: bool) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(GraphSnapshot::closed(0)),
            slot: Mutex::new(SourceSlot::new(StreamFormat::float32(48_000.0, 2), 0)),
            state: AtomicGraphState::new(GraphState::Closed),
            stop_requested: AtomicBool::new(false),
            in_render: AtomicBool::new(false),
            observed_generation: AtomicU64::new(0),
            levels: OutputLevels::new(volume, pre_gain),
            counters: RenderCounters::default(),
            last_status: AtomicU32::new(RenderStatus::NOT_RUNNING.bits()),
            source_error: AtomicBool::new(false),
            end_of_stream: AtomicBool::new(false),
            tail_remaining: AtomicU64::new(0),
            drained: AtomicBool::new(false),
            stop_when_drained: AtomicBool::new(stop_when_drained),
        }
    }

    /// Lock the source slot from the control context
    pub(crate) fn lock_slot(&self) -> MutexGuard<'_, SourceSlot> {
        self.slot
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Forget end-of-stream and error state for a new or rewound source
    pub(crate) fn clear_stream_flags(&self) {
        self.end_of_stream.store(false, Ordering::Release);
        self.tail_remaining.store(0, Ordering::Release);
        self.drained.store(false, Ordering::Release);
        self.source_error.store(false, Ordering::Release);
    }

    pub(crate) fn stats(&self) -> RenderStats {
        self.counters.snapshot()
    }

    fn render(&self, output: &mut [f32], frames: usize) -> RenderStatus {
        if self
            .in_render
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            output.fill(0.0);
            RenderCounters::add(&self.counters.cycles, 1);
            RenderCounters::add(&self.counters.reentrant_calls, 1);
            return RenderStatus::REENTRANT;
        }

        let status = self.render_cycle(output, frames);

        self.in_render.store(false, Ordering::SeqCst);
        self.last_status.store(status.bits(), Ordering::Release);
        status
    }

    fn render_cycle(&self, output: &mut [f32], frames: usize) -> RenderStatus {
        output.fill(0.0);
        RenderCounters::add(&self.counters.cycles, 1);

        let snapshot = self.snapshot.load();
        self.observed_generation
            .store(snapshot.generation, Ordering::Release);

        let mut status = RenderStatus::OK;
        let device_channels = snapshot.device_channels;
        let mut frames = frames;
        if device_channels == 0 {
            return status | RenderStatus::NOT_RUNNING;
        }
        if output.len() < frames * device_channels {
            status |= RenderStatus::SIZE_MISMATCH;
            frames = output.len() / device_channels;
        }

        if snapshot.quiesced {
            return status | RenderStatus::QUIESCED;
        }

        if self.stop_requested.swap(false, Ordering::AcqRel) {
            self.state.transition(GraphState::Running, GraphState::Open);
        }
        if self.state.load() != GraphState::Running {
            return status | RenderStatus::NOT_RUNNING;
        }
        if frames == 0 {
            return status;
        }

        let mut guard = match self.slot.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                RenderCounters::add(&self.counters.source_busy, 1);
                RenderCounters::add(&self.counters.silence_frames, frames as u64);
                return status | RenderStatus::SOURCE_BUSY | RenderStatus::SILENCE_FILLED;
            }
        };
        let SourceSlot {
            converter,
            pull,
            work,
        } = &mut *guard;

        let channels = snapshot.graph_channels();
        let slice_max = snapshot
            .max_frames
            .min(pull.capacity())
            .min(work.len() / channels.max(1));
        if slice_max == 0 || *pull.format() != snapshot.format {
            return status | RenderStatus::SIZE_MISMATCH | RenderStatus::SILENCE_FILLED;
        }

        let pre_gain = self.levels.pre_gain();
        let master = self.levels.volume();
        let mut channel_gain = [1.0f32; MAX_CHANNELS as usize];
        self.levels.load_channel_volumes(&mut channel_gain);

        let mut done = 0;
        while done < frames {
            let n = (frames - done).min(slice_max);
            let work = &mut work[..n * channels];

            let got = self.pull_source(
                converter.as_mut(),
                pull,
                work,
                n,
                channels,
                &snapshot,
                &mut status,
            );

            if pre_gain != 1.0 {
                for sample in work.iter_mut() {
                    *sample *= pre_gain;
                }
            }

            for node in &snapshot.effects {
                match node.unit.try_lock() {
                    Ok(mut unit) => {
                        if unit.is_enabled() {
                            unit.process(work, channels);
                        }
                    }
                    Err(_) => {
                        status |= RenderStatus::UNIT_BYPASSED;
                        RenderCounters::add(&self.counters.bypassed_units, 1);
                    }
                }
            }

            let out = &mut output[done * device_channels..(done + n) * device_channels];
            for (frame_in, frame_out) in work
                .chunks_exact(channels)
                .zip(out.chunks_exact_mut(device_channels))
            {
                for (device_channel, (sample, source)) in
                    frame_out.iter_mut().zip(&snapshot.channel_map).enumerate()
                {
                    if let Some(source) = *source {
                        let gain = channel_gain.get(device_channel).copied().unwrap_or(1.0);
                        *sample = frame_in[source] * master * gain;
                    }
                }
            }

            if got < n {
                RenderCounters::add(&self.counters.silence_frames, (n - got) as u64);
            }
            RenderCounters::add(&self.counters.source_frames, got as u64);
            done += n;
        }

        RenderCounters::add(&self.counters.frames_rendered, frames as u64);
        status
    }

    /// Fill `work` with `n` frames from the converter, zero-filling any shortfall
    fn pull_source(
        &self,
        converter: Option<&mut Converter>,
        pull: &mut AudioBufferList,
        work: &mut [f32],
        n: usize,
        channels: usize,
        snapshot: &GraphSnapshot,
        status: &mut RenderStatus,
    ) -> usize {
        let mut got = 0;

        if let Some(converter) = converter {
            if !self.end_of_stream.load(Ordering::Acquire)
                && !self.source_error.load(Ordering::Acquire)
            {
                got = converter.convert_audio(pull, n);
                if got > 0 {
                    pull.read_f32_interleaved(&mut work[..got * channels]);
                }
                if got < n {
                    if converter.last_error().is_some() {
                        self.source_error.store(true, Ordering::Release);
                        RenderCounters::add(&self.counters.source_errors, 1);
                    } else if converter.is_exhausted() {
                        let tail_frames =
                            (snapshot.tail_time() * snapshot.format.sample_rate).ceil() as u64;
                        self.tail_remaining.store(tail_frames, Ordering::Release);
                        self.end_of_stream.store(true, Ordering::Release);
                    }
                }
            }

            if self.source_error.load(Ordering::Acquire) {
                status.insert(RenderStatus::SOURCE_ERROR);
            }
            if self.end_of_stream.load(Ordering::Acquire) {
                status.insert(RenderStatus::END_OF_STREAM);
                self.count_down_tail((n - got) as u64);
            }
        }

        work[got * channels..].fill(0.0);
        if got < n {
            status.insert(RenderStatus::SILENCE_FILLED);
        }
        got
    }

    /// Silence after end of stream counts against the unit tail
    fn count_down_tail(&self, silent_frames: u64) {
        let remaining = self
            .tail_remaining
            .load(Ordering::Acquire)
            .saturating_sub(silent_frames);
        self.tail_remaining.store(remaining, Ordering::Release);

        if remaining == 0
            && !self.drained.swap(true, Ordering::AcqRel)
            && self.stop_when_drained.load(Ordering::Acquire)
        {
            self.stop_requested.store(true, Ordering::Release);
        }
    }
}

/// Entry point for the device's render thread
///
/// Cheap to clone; every clone drives the same graph. Only one call renders at
/// a time: a concurrent call gets silence and [`RenderStatus::REENTRANT`].
#[derive(Clone)]
pub struct RenderHandle {
    shared: Arc<GraphShared>,
}

impl RenderHandle {
    pub(crate) fn new(shared: Arc<GraphShared>) -> Self {
        Self { shared }
    }

    /// Render `frames` interleaved frames in the device channel count into `output`
    ///
    /// `output` is always fully written: audio where available, silence
    /// elsewhere. If `output` is shorter than `frames` frames only what fits is
    /// rendered and [`RenderStatus::SIZE_MISMATCH`] is set.
    pub fn render(&self, output: &mut [f32], frames: usize) -> RenderStatus {
        self.shared.render(output, frames)
    }

    /// Device channel count the graph renders for (0 while closed)
    pub fn device_channels(&self) -> usize {
        self.shared.snapshot.load().device_channels
    }

    /// Ask the graph to stop at the next cycle boundary
    pub fn request_stop(&self) {
        self.shared.stop_requested.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for RenderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderHandle")
            .field("state", &self.shared.state.load())
            .finish()
    }
}

/// Fire-and-forget stop request, usable from any thread
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<GraphShared>,
}

impl StopHandle {
    pub(crate) fn new(shared: Arc<GraphShared>) -> Self {
        Self { shared }
    }

    /// Request a stop; the next render cycle moves Running → Open
    pub fn request_stop(&self) {
        self.shared.stop_requested.store(true, Ordering::Release);
    }

    /// Current graph state
    pub fn state(&self) -> GraphState {
        self.shared.state.load()
    }
}

impl std::fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopHandle")
            .field("state", &self.shared.state.load())
            .finish()
    }
}
