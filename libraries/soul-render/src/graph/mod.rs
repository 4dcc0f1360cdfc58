//! Render Graph
//!
//! A linear graph `[mixer, effects…, output]` bound to one output device.
//! The control context owns the [`RenderGraph`] and may block or allocate;
//! the device's render thread only ever touches a [`RenderHandle`].
//!
//! ## Publication
//!
//! Topology and negotiated format live in an immutable snapshot published
//! through `arc-swap`. Each render cycle loads one snapshot and uses it for
//! the whole cycle, so it sees the old topology or the new one, never a mix.
//! Replaced snapshots are retired to a control-side list and dropped once no
//! cycle can still hold them, so the render thread never frees a node.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use soul_core::StreamFormat;
//! use soul_render::device::VirtualDevice;
//! use soul_render::graph::{GraphConfig, RenderGraph};
//! use soul_render::sources::MemorySource;
//! use soul_render::units::ComponentDescriptor;
//!
//! let mut graph = RenderGraph::new(GraphConfig::default());
//! graph.open(Arc::new(VirtualDevice::new("offline", 48_000.0, 2))).unwrap();
//! graph
//!     .set_source(Box::new(MemorySource::silence(StreamFormat::pcm_i16(44_100.0, 2), 4_410)))
//!     .unwrap();
//! graph.add_effect(&ComponentDescriptor::builtin(*b"lmtr")).unwrap();
//! graph.start().unwrap();
//!
//! let handle = graph.render_handle();
//! let mut buffer = vec![0.0f32; 512 * 2];
//! let status = handle.render(&mut buffer, 512);
//! assert!(status.is_ok());
//! ```

mod config;
mod output;
mod render;
mod snapshot;
mod state;
mod status;

pub use config::{GraphConfig, MAX_FRAMES_PER_SLICE};
pub use render::{RenderHandle, StopHandle};
pub use snapshot::NodeHandle;
pub use state::GraphState;
pub use status::{RenderStats, RenderStatus};

use crate::converter::Converter;
use crate::device::OutputDevice;
use crate::resampling::SrcComplexity;
use crate::units::{AudioUnit, ComponentDescriptor, UnitInfo, UnitRegistry};
use output::default_channel_map;
use render::GraphShared;
use snapshot::{EffectNode, GraphSnapshot};
use soul_core::{ChannelLayout, DecoderSource, Result, SoulError, StreamFormat, MAX_SAMPLE_RATE};
use std::any::Any;
use std::sync::atomic::Ordering;
use std::sync::{Arc, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Control-side owner of a render graph
pub struct RenderGraph {
    shared: Arc<GraphShared>,
    config: GraphConfig,
    registry: UnitRegistry,
    device: Option<Arc<dyn OutputDevice>>,
    /// Snapshots swapped out but possibly still held by a render cycle
    retired: Vec<Arc<GraphSnapshot>>,
    custom_channel_map: Option<Vec<Option<usize>>>,
    generation: u64,
    next_handle: u64,
}

impl RenderGraph {
    /// Create a closed graph with the built-in units
    pub fn new(config: GraphConfig) -> Self {
        Self::with_registry(config, UnitRegistry::with_builtin_units())
    }

    /// Create a closed graph that instantiates units from `registry`
    pub fn with_registry(config: GraphConfig, registry: UnitRegistry) -> Self {
        let shared = GraphShared::new(config.volume, config.pre_gain, config.stop_when_drained);
        Self {
            shared: Arc::new(shared),
            config,
            registry,
            device: None,
            retired: Vec::new(),
            custom_channel_map: None,
            generation: 0,
            next_handle: 0,
        }
    }

    // ===== Lifecycle =====

    /// Current lifecycle state
    pub fn state(&self) -> GraphState {
        self.shared.state.load()
    }

    /// Observe the state after pending stop requests, reclaiming retired snapshots
    pub fn poll_state(&mut self) -> GraphState {
        self.reclaim_retired();
        self.state()
    }

    /// Bind to `device` and negotiate the processing format
    ///
    /// # Errors
    /// - State error unless the graph is closed
    /// - Configuration error if the device rate or channel count is unusable
    pub fn open(&mut self, device: Arc<dyn OutputDevice>) -> Result<()> {
        let state = self.state();
        if state != GraphState::Closed {
            return Err(SoulError::invalid_state("open graph", state));
        }
        self.config.validate()?;

        let rate = device.sample_rate();
        if !rate.is_finite() || rate <= 0.0 || rate > MAX_SAMPLE_RATE {
            return Err(SoulError::InvalidSampleRate(rate));
        }
        let device_channels = usize::from(device.channel_count());
        if device_channels == 0 {
            return Err(SoulError::device(format!(
                "{} has no output channels",
                device.name()
            )));
        }

        let format = StreamFormat::float32(rate, device.channel_count().min(2));
        self.device = Some(Arc::clone(&device));
        let max_frames = self.negotiate_max_frames(&[]);

        self.shared.lock_slot().resize(format, max_frames);
        self.shared.clear_stream_flags();
        self.custom_channel_map = None;

        self.publish(GraphSnapshot {
            generation: 0,
            format,
            device_channels,
            max_frames,
            effects: Vec::new(),
            channel_map: default_channel_map(
                usize::from(format.channels),
                device_channels,
                device.preferred_stereo_pair(),
            ),
            quiesced: false,
        });
        self.shared.state.store(GraphState::Open);

        info!(
            device = %device.name(),
            rate,
            channels = device_channels,
            max_frames,
            "Render graph opened"
        );
        Ok(())
    }

    /// Stop if running, drop the source and every node, and unbind the device
    ///
    /// Closing a closed graph succeeds and does nothing.
    pub fn close(&mut self) -> Result<()> {
        let state = self.state();
        if state == GraphState::Closed {
            return Ok(());
        }
        if matches!(state, GraphState::Running | GraphState::Stopping) {
            self.stop()?;
        }

        let converter = self.shared.lock_slot().converter.take();
        if let Some(mut converter) = converter {
            if let Err(e) = converter.close() {
                warn!("Failed to close source while closing graph: {}", e);
            }
        }

        self.shared.state.store(GraphState::Closed);
        self.publish(GraphSnapshot::closed(0));
        self.wait_for_render_idle();
        self.reclaim_retired();

        self.shared.clear_stream_flags();
        self.custom_channel_map = None;
        self.device = None;

        info!("Render graph closed");
        Ok(())
    }

    /// Begin pulling audio on the next render cycle
    ///
    /// # Errors
    /// State error unless the graph is open; nothing changes in that case
    pub fn start(&mut self) -> Result<()> {
        if self.state() != GraphState::Open {
            return Err(SoulError::invalid_state("start graph", self.state()));
        }
        // Cleared before the transition so no cycle sees a stale request
        self.shared.stop_requested.store(false, Ordering::Release);
        if !self
            .shared
            .state
            .transition(GraphState::Open, GraphState::Running)
        {
            return Err(SoulError::invalid_state("start graph", self.state()));
        }
        info!("Render graph started");
        Ok(())
    }

    /// Stop pulling audio, waiting for the in-flight cycle
    ///
    /// The wait is bounded by `stop_timeout_ms`. Stopping a graph that is not
    /// running succeeds and does nothing.
    pub fn stop(&mut self) -> Result<()> {
        match self.state() {
            GraphState::Closed | GraphState::Open => Ok(()),
            GraphState::Running | GraphState::Stopping => {
                self.shared
                    .state
                    .transition(GraphState::Running, GraphState::Stopping);
                if !self.wait_for_render_idle() {
                    warn!(
                        timeout_ms = self.config.stop_timeout_ms,
                        "Render cycle still in flight after stop timeout"
                    );
                }
                self.shared.state.store(GraphState::Open);
                self.shared.stop_requested.store(false, Ordering::Release);
                self.reclaim_retired();
                info!("Render graph stopped");
                Ok(())
            }
        }
    }

    /// Ask the graph to stop at the next cycle boundary without waiting
    pub fn request_stop(&self) {
        self.shared.stop_requested.store(true, Ordering::Release);
    }

    /// Handle for stopping the graph from other threads
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(Arc::clone(&self.shared))
    }

    /// Handle for the device's render thread
    pub fn render_handle(&self) -> RenderHandle {
        RenderHandle::new(Arc::clone(&self.shared))
    }

    // ===== Source =====

    /// Install `decoder` as the mixer input
    ///
    /// The graph format becomes interleaved `f32` at the device rate with the
    /// decoder's channel count, capped at the device's; extra source channels
    /// are folded down by the converter. The graph renegotiates if the format
    /// changed. Any previous source is closed.
    ///
    /// # Errors
    /// - State error while closed
    /// - Configuration error if the decoder format cannot be converted
    pub fn set_source(&mut self, decoder: Box<dyn DecoderSource>) -> Result<()> {
        let state = self.state();
        if state == GraphState::Closed {
            return Err(SoulError::invalid_state("set source", state));
        }

        let mut decoder = decoder;
        if !decoder.is_open() {
            decoder.open()?;
        }
        let source_format = decoder.format();
        source_format.validate()?;

        let device_channels = self
            .device
            .as_ref()
            .map_or(source_format.channels, |d| d.channel_count());
        let channels = source_format.channels.min(device_channels).max(1);
        let current = self.shared.snapshot.load_full();
        let format = StreamFormat::float32(current.format.sample_rate, channels);
        drop(current);

        let mut converter = Converter::new(decoder, format, ChannelLayout::default_for_channels(channels))
            .with_complexity(self.config.src_complexity);
        converter.open()?;
        let resampling = converter.is_resampling();

        let previous = self.shared.lock_slot().converter.take();
        if let Some(mut previous) = previous {
            if let Err(e) = previous.close() {
                warn!("Failed to close previous source: {}", e);
            }
        }

        if format != self.format() {
            if let Err(e) = self.renegotiate(format) {
                if let Err(close_err) = converter.close() {
                    warn!("Failed to close rejected source: {}", close_err);
                }
                return Err(e);
            }
        }

        {
            let mut slot = self.shared.lock_slot();
            slot.converter = Some(converter);
            self.shared.clear_stream_flags();
        }

        info!(
            source = %source_format,
            graph = %format,
            resampling,
            "Source installed"
        );
        Ok(())
    }

    /// Remove and close the current source; the graph renders silence
    pub fn clear_source(&mut self) -> Result<()> {
        let converter = {
            let mut slot = self.shared.lock_slot();
            let converter = slot.converter.take();
            self.shared.clear_stream_flags();
            converter
        };
        if let Some(mut converter) = converter {
            converter.close()?;
            debug!("Source cleared");
        }
        Ok(())
    }

    /// Check if a source is installed
    pub fn has_source(&self) -> bool {
        self.shared.lock_slot().converter.is_some()
    }

    /// Reposition the source and flush conversion state
    ///
    /// # Errors
    /// State error without a source; whatever the decoder's seek returns
    pub fn seek_source(&mut self, frame: u64) -> Result<u64> {
        let mut slot = self.shared.lock_slot();
        let converter = slot
            .converter
            .as_mut()
            .ok_or_else(|| SoulError::invalid_state("seek source", "no source is installed"))?;
        let reached = converter.decoder_mut().seek_to_frame(frame)?;
        converter.reset()?;
        self.shared.clear_stream_flags();
        Ok(reached)
    }

    /// Flush the converter and every unit so rendering restarts cleanly
    ///
    /// Does not reposition the source; see [`RenderGraph::seek_source`].
    ///
    /// # Errors
    /// State error while closed
    pub fn reset(&mut self) -> Result<()> {
        let state = self.state();
        if state == GraphState::Closed {
            return Err(SoulError::invalid_state("reset graph", state));
        }

        let snapshot = self.shared.snapshot.load_full();
        let mut slot = self.shared.lock_slot();
        if let Some(converter) = slot.converter.as_mut() {
            converter.reset()?;
        }
        for node in &snapshot.effects {
            node.unit
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .reset();
        }
        self.shared.clear_stream_flags();
        debug!("Render graph reset");
        Ok(())
    }

    /// Take the error that stopped the source, if any
    pub fn take_render_error(&self) -> Option<SoulError> {
        self.shared
            .lock_slot()
            .converter
            .as_mut()
            .and_then(Converter::take_last_error)
    }

    // ===== Topology =====

    /// Instantiate a unit and insert it just before the output node
    ///
    /// # Errors
    /// - State error while closed
    /// - `UnknownComponent` if no registered unit matches
    pub fn add_effect(&mut self, descriptor: &ComponentDescriptor) -> Result<NodeHandle> {
        self.add_effect_with(descriptor, &())
    }

    /// Like [`RenderGraph::add_effect`], passing type-erased parameters to the factory
    pub fn add_effect_with(
        &mut self,
        descriptor: &ComponentDescriptor,
        params: &dyn Any,
    ) -> Result<NodeHandle> {
        let state = self.state();
        if state == GraphState::Closed {
            return Err(SoulError::invalid_state("add effect", state));
        }

        let mut unit = self.registry.instantiate_with(descriptor, params)?;
        let (next, format, needs_larger_slice) = {
            let current = self.shared.snapshot.load_full();
            unit.initialize(&current.format, current.max_frames)?;
            let needs_larger_slice = unit
                .preferred_slice_frames()
                .is_some_and(|frames| frames > current.max_frames);

            self.next_handle += 1;
            let node = Arc::new(EffectNode::new(NodeHandle::new(self.next_handle), unit));

            let mut next = (*current).clone();
            next.effects.push(node);
            (next, current.format, needs_larger_slice)
        };
        let handle = NodeHandle::new(self.next_handle);
        self.publish(next);

        if needs_larger_slice {
            self.renegotiate(format)?;
        }

        info!(%handle, %descriptor, "Effect added");
        Ok(handle)
    }

    /// Remove a node; it is destroyed once no render cycle can still reach it
    ///
    /// # Errors
    /// `UnknownNode` if `handle` is not in the graph
    pub fn remove_effect(&mut self, handle: NodeHandle) -> Result<()> {
        let next = {
            let current = self.shared.snapshot.load_full();
            if current.find(handle).is_none() {
                return Err(SoulError::UnknownNode(handle.value()));
            }
            let mut next = (*current).clone();
            next.effects.retain(|node| node.handle != handle);
            next
        };
        self.publish(next);
        info!(%handle, "Effect removed");
        Ok(())
    }

    /// Effect handles in signal-flow order
    pub fn effects(&self) -> Vec<NodeHandle> {
        self.shared
            .snapshot
            .load()
            .effects
            .iter()
            .map(|node| node.handle)
            .collect()
    }

    /// Information about one node
    pub fn effect_info(&self, handle: NodeHandle) -> Result<UnitInfo> {
        self.node(handle).map(|node| node.info())
    }

    /// Run `f` with exclusive access to a unit
    ///
    /// The render thread bypasses the unit while `f` runs. Cached latency and
    /// tail time are refreshed afterwards.
    pub fn with_effect<R>(
        &mut self,
        handle: NodeHandle,
        f: impl FnOnce(&mut dyn AudioUnit) -> R,
    ) -> Result<R> {
        let node = self.node(handle)?;
        let mut unit = node.unit.lock().unwrap_or_else(PoisonError::into_inner);
        let result = f(&mut **unit);
        node.store_timing(unit.as_ref());
        Ok(result)
    }

    /// Pass type-erased parameters to a unit
    ///
    /// Returns false if the unit rejected them.
    pub fn update_effect(&mut self, handle: NodeHandle, params: &dyn Any) -> Result<bool> {
        self.with_effect(handle, |unit| unit.update_parameters(params))
    }

    /// Enable or bypass a unit
    pub fn set_effect_enabled(&mut self, handle: NodeHandle, enabled: bool) -> Result<()> {
        self.with_effect(handle, |unit| unit.set_enabled(enabled))
    }

    fn node(&self, handle: NodeHandle) -> Result<Arc<EffectNode>> {
        self.shared
            .snapshot
            .load()
            .find(handle)
            .cloned()
            .ok_or(SoulError::UnknownNode(handle.value()))
    }

    // ===== Negotiation =====

    /// Processing format between mixer and output
    pub fn format(&self) -> StreamFormat {
        self.shared.snapshot.load().format
    }

    /// Negotiated frames per slice
    pub fn maximum_frames_per_slice(&self) -> usize {
        self.shared.snapshot.load().max_frames
    }

    /// Change the configured slice size and renegotiate if open
    pub fn set_maximum_frames_per_slice(&mut self, frames: usize) -> Result<()> {
        let previous = self.config.max_frames_per_slice;
        self.config.max_frames_per_slice = frames;
        if let Err(e) = self.config.validate() {
            self.config.max_frames_per_slice = previous;
            return Err(e);
        }

        if self.state() != GraphState::Closed {
            self.renegotiate(self.format())?;
        }
        Ok(())
    }

    /// Re-read the device's rate and channel count and renegotiate
    ///
    /// # Errors
    /// State error while closed
    pub fn device_format_changed(&mut self) -> Result<()> {
        let device = self
            .device
            .clone()
            .ok_or_else(|| SoulError::invalid_state("renegotiate", GraphState::Closed))?;
        let current = self.format();
        let format = current
            .with_sample_rate(device.sample_rate())
            .with_channels(current.channels.min(device.channel_count()).max(1));
        info!(device = %device.name(), rate = format.sample_rate, "Device format changed");
        self.renegotiate(format)
    }

    /// Re-initialise every unit and the converter for `format`
    ///
    /// Render cycles emit silence while this runs and then see the complete
    /// new configuration. On failure the previous configuration is restored.
    pub fn renegotiate(&mut self, format: StreamFormat) -> Result<()> {
        let state = self.state();
        if state == GraphState::Closed {
            return Err(SoulError::invalid_state("renegotiate", state));
        }
        format.validate()?;
        if !format.is_canonical_f32() {
            return Err(SoulError::unsupported_format(format!(
                "graph format must be interleaved native f32, got {}",
                format
            )));
        }

        let device = self
            .device
            .clone()
            .ok_or_else(|| SoulError::invalid_state("renegotiate", GraphState::Closed))?;
        let current = self.shared.snapshot.load_full();
        let max_frames = self.negotiate_max_frames(&current.effects);
        let device_channels = usize::from(device.channel_count());

        let mut quiesced = (*current).clone();
        quiesced.quiesced = true;
        self.publish(quiesced);
        self.wait_for_render_idle();

        let shared = Arc::clone(&self.shared);
        let mut slot = shared.lock_slot();
        if let Err(e) = self.apply_format(&mut slot, &current.effects, format, max_frames) {
            warn!(format = %format, "Renegotiation failed, restoring previous format: {}", e);
            if let Err(restore) =
                self.apply_format(&mut slot, &current.effects, current.format, current.max_frames)
            {
                warn!("Failed to restore previous format: {}", restore);
            }
            drop(slot);
            self.publish((*current).clone());
            return Err(e);
        }
        drop(slot);

        let graph_channels = usize::from(format.channels);
        let channel_map = match &self.custom_channel_map {
            Some(map)
                if map.len() == device_channels
                    && map.iter().flatten().all(|&c| c < graph_channels) =>
            {
                map.clone()
            }
            _ => default_channel_map(graph_channels, device_channels, device.preferred_stereo_pair()),
        };

        self.publish(GraphSnapshot {
            generation: 0,
            format,
            device_channels,
            max_frames,
            effects: current.effects.clone(),
            channel_map,
            quiesced: false,
        });

        info!(format = %format, max_frames, "Render graph renegotiated");
        Ok(())
    }

    fn apply_format(
        &self,
        slot: &mut render::SourceSlot,
        effects: &[Arc<EffectNode>],
        format: StreamFormat,
        max_frames: usize,
    ) -> Result<()> {
        for node in effects {
            let mut unit = node.unit.lock().unwrap_or_else(PoisonError::into_inner);
            unit.initialize(&format, max_frames)?;
            node.store_timing(unit.as_ref());
        }

        slot.resize(format, max_frames);
        if let Some(converter) = slot.converter.as_mut() {
            if *converter.format() != format
                || converter.src_complexity() != self.config.src_complexity
            {
                converter.set_src_complexity(self.config.src_complexity);
                converter.reconfigure(format, ChannelLayout::default_for_channels(format.channels))?;
            }
        }
        Ok(())
    }

    /// Rebuild the installed converter with the configured SRC complexity
    ///
    /// Cycles emit silence while the converter is swapped, as in
    /// [`renegotiate`](Self::renegotiate). On failure the previous complexity
    /// is restored.
    pub(crate) fn rebuild_converter(&mut self, previous: SrcComplexity) -> Result<()> {
        let complexity = self.config.src_complexity;
        let needs_rebuild = self
            .shared
            .lock_slot()
            .converter
            .as_ref()
            .is_some_and(|c| c.is_resampling() && c.src_complexity() != complexity);
        if !needs_rebuild {
            if let Some(converter) = self.shared.lock_slot().converter.as_mut() {
                converter.set_src_complexity(complexity);
            }
            return Ok(());
        }

        let current = self.shared.snapshot.load_full();
        let mut quiesced = (*current).clone();
        quiesced.quiesced = true;
        self.publish(quiesced);
        self.wait_for_render_idle();

        let result = {
            let mut slot = self.shared.lock_slot();
            match slot.converter.as_mut() {
                Some(converter) => {
                    let format = *converter.format();
                    let layout = converter.channel_layout().cloned();
                    converter.set_src_complexity(complexity);
                    let result = converter.reconfigure(format, layout.clone());
                    if result.is_err() {
                        converter.set_src_complexity(previous);
                        if let Err(restore) = converter.reconfigure(format, layout) {
                            warn!("Failed to restore converter: {}", restore);
                        }
                    }
                    result
                }
                None => Ok(()),
            }
        };

        let mut snapshot = (*current).clone();
        snapshot.quiesced = false;
        self.publish(snapshot);

        match result {
            Ok(()) => {
                info!(?complexity, "Sample rate converter rebuilt");
                Ok(())
            }
            Err(e) => {
                self.config.src_complexity = previous;
                Err(e)
            }
        }
    }

    /// Largest of the configured slice, the device buffer and any unit's preference
    fn negotiate_max_frames(&self, effects: &[Arc<EffectNode>]) -> usize {
        let mut frames = self.config.max_frames_per_slice;
        if let Some(device_frames) = self.device.as_ref().and_then(|d| d.preferred_buffer_frames()) {
            frames = frames.max(device_frames);
        }
        for node in effects {
            let unit = node.unit.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(preferred) = unit.preferred_slice_frames() {
                frames = frames.max(preferred);
            }
        }
        frames.min(MAX_FRAMES_PER_SLICE)
    }

    // ===== Publication =====

    fn publish(&mut self, mut snapshot: GraphSnapshot) {
        self.generation += 1;
        snapshot.generation = self.generation;
        let previous = self.shared.snapshot.swap(Arc::new(snapshot));
        self.retired.push(previous);
        self.reclaim_retired();
    }

    /// Drop retired snapshots no render cycle still holds; returns how many were dropped
    pub fn reclaim_retired(&mut self) -> usize {
        let before = self.retired.len();
        self.retired.retain(|snapshot| Arc::strong_count(snapshot) > 1);
        before - self.retired.len()
    }

    /// Retired snapshots waiting for the render thread to let go
    pub fn pending_reclamation(&self) -> usize {
        self.retired.len()
    }

    /// Generation of the latest published snapshot
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Generation the render thread saw in its latest cycle
    pub fn observed_generation(&self) -> u64 {
        self.shared.observed_generation.load(Ordering::Acquire)
    }

    /// Spin until no render cycle is in flight, bounded by the stop timeout
    fn wait_for_render_idle(&self) -> bool {
        let deadline = Instant::now() + self.config.stop_timeout();
        while self.shared.in_render.load(Ordering::SeqCst) {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::yield_now();
        }
        true
    }

    // ===== Status =====

    /// Cumulative render statistics
    pub fn render_stats(&self) -> RenderStats {
        self.shared.stats()
    }

    /// Flags reported by the latest render cycle
    pub fn last_render_status(&self) -> RenderStatus {
        RenderStatus::from_bits_truncate(self.shared.last_status.load(Ordering::Acquire))
    }

    /// Check if the source has ended
    pub fn is_end_of_stream(&self) -> bool {
        self.shared.end_of_stream.load(Ordering::Acquire)
    }

    /// Check if the source has ended and every unit tail has played out
    pub fn is_drained(&self) -> bool {
        self.shared.drained.load(Ordering::Acquire)
    }

    /// Stop automatically once drained
    pub fn set_stop_when_drained(&mut self, enabled: bool) {
        self.config.stop_when_drained = enabled;
        self.shared
            .stop_when_drained
            .store(enabled, Ordering::Release);
    }

    /// Bound device, if open
    pub fn device(&self) -> Option<&Arc<dyn OutputDevice>> {
        self.device.as_ref()
    }

    /// Current configuration
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Registry used by [`RenderGraph::add_effect`]
    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    /// Mutable registry, for registering custom units
    pub fn registry_mut(&mut self) -> &mut UnitRegistry {
        &mut self.registry
    }
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

impl Drop for RenderGraph {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close render graph on drop: {}", e);
        }
    }
}

impl std::fmt::Debug for RenderGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderGraph")
            .field("state", &self.state())
            .field("generation", &self.generation)
            .field("effects", &self.effects())
            .field("retired", &self.retired.len())
            .finish()
    }
}
