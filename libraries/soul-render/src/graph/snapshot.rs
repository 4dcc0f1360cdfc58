//! Published graph topology
//!
//! The control context never mutates a snapshot the render thread can see.
//! Every structural change builds a new [`GraphSnapshot`] and swaps it in;
//! the render thread loads exactly one snapshot per cycle.

use crate::units::{AudioUnit, ComponentDescriptor, UnitInfo};
use soul_core::StreamFormat;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Identifies an effect node within one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(u64);

impl NodeHandle {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw handle value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// An audio unit placed in the graph
pub(crate) struct EffectNode {
    pub handle: NodeHandle,
    pub descriptor: ComponentDescriptor,
    /// Locked by the control context for reconfiguration; the render thread only `try_lock`s
    pub unit: Mutex<Box<dyn AudioUnit>>,
    latency_bits: AtomicU64,
    tail_bits: AtomicU64,
}

impl EffectNode {
    pub(crate) fn new(handle: NodeHandle, unit: Box<dyn AudioUnit>) -> Self {
        let node = Self {
            handle,
            descriptor: unit.info().descriptor,
            latency_bits: AtomicU64::new(0),
            tail_bits: AtomicU64::new(0),
            unit: Mutex::new(unit),
        };
        node.refresh_timing();
        node
    }

    /// Re-read latency and tail time from the unit (control context)
    pub(crate) fn refresh_timing(&self) {
        let unit = self.unit.lock().unwrap_or_else(PoisonError::into_inner);
        self.store_timing(unit.as_ref());
    }

    pub(crate) fn store_timing(&self, unit: &dyn AudioUnit) {
        self.latency_bits
            .store(unit.latency().max(0.0).to_bits(), Ordering::Relaxed);
        self.tail_bits
            .store(unit.tail_time().max(0.0).to_bits(), Ordering::Relaxed);
    }

    /// Cached latency in seconds
    pub(crate) fn latency(&self) -> f64 {
        f64::from_bits(self.latency_bits.load(Ordering::Relaxed))
    }

    /// Cached tail time in seconds
    pub(crate) fn tail_time(&self) -> f64 {
        f64::from_bits(self.tail_bits.load(Ordering::Relaxed))
    }

    /// Unit information (locks the unit)
    pub(crate) fn info(&self) -> UnitInfo {
        self.unit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .info()
    }
}

impl fmt::Debug for EffectNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectNode")
            .field("handle", &self.handle)
            .field("descriptor", &self.descriptor)
            .field("latency", &self.latency())
            .field("tail_time", &self.tail_time())
            .finish()
    }
}

/// Immutable description of `[mixer, effects…, output]` and the negotiated format
#[derive(Debug, Clone)]
pub(crate) struct GraphSnapshot {
    pub generation: u64,
    /// Processing format between mixer and output: interleaved native `f32`
    pub format: StreamFormat,
    pub device_channels: usize,
    pub max_frames: usize,
    /// Effect nodes in signal-flow order
    pub effects: Vec<Arc<EffectNode>>,
    /// For each device channel, the graph channel feeding it
    pub channel_map: Vec<Option<usize>>,
    /// Render silence and touch no node
    pub quiesced: bool,
}

impl GraphSnapshot {
    /// Snapshot for a graph with no device
    pub(crate) fn closed(generation: u64) -> Self {
        Self {
            generation,
            format: StreamFormat::float32(48_000.0, 2),
            device_channels: 0,
            max_frames: 0,
            effects: Vec::new(),
            channel_map: Vec::new(),
            quiesced: false,
        }
    }

    pub(crate) fn graph_channels(&self) -> usize {
        usize::from(self.format.channels)
    }

    pub(crate) fn find(&self, handle: NodeHandle) -> Option<&Arc<EffectNode>> {
        self.effects.iter().find(|n| n.handle == handle)
    }

    /// Sum of cached unit tail times, in seconds
    pub(crate) fn tail_time(&self) -> f64 {
        self.effects.iter().map(|n| n.tail_time()).sum()
    }

    /// Sum of cached unit latencies, in seconds
    pub(crate) fn latency(&self) -> f64 {
        self.effects.iter().map(|n| n.latency()).sum()
    }
}
