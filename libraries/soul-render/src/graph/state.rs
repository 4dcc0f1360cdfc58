//! Graph lifecycle state

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a render graph
///
/// ```text
/// Closed ──open──▶ Open ──start──▶ Running ──stop──▶ Stopping ──▶ Open ──close──▶ Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum GraphState {
    /// No device bound
    Closed = 0,
    /// Device bound and format negotiated; renders silence
    Open = 1,
    /// Render cycles pull audio
    Running = 2,
    /// Waiting for the in-flight cycle before returning to Open
    Stopping = 3,
}

impl GraphState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Open,
            2 => Self::Running,
            3 => Self::Stopping,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for GraphState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Lock-free cell holding a [`GraphState`]
#[derive(Debug)]
pub(crate) struct AtomicGraphState(AtomicU8);

impl AtomicGraphState {
    pub(crate) fn new(state: GraphState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub(crate) fn load(&self) -> GraphState {
        GraphState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: GraphState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Move `from` → `to`; false if the state was something else
    pub(crate) fn transition(&self, from: GraphState, to: GraphState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
