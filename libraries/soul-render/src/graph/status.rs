//! Per-cycle status flags and cumulative render statistics
//!
//! The render callback never returns errors. Each cycle reports what happened
//! through [`RenderStatus`] and bumps lock-free counters the control context
//! reads as [`RenderStats`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::sync::atomic::{AtomicU64, Ordering};

/// Bit flags describing one render cycle
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderStatus(u32);

impl RenderStatus {
    /// Cycle rendered source audio for every frame
    pub const OK: Self = Self(0);
    /// Some frames were silence because the source came up short
    pub const SILENCE_FILLED: Self = Self(1 << 0);
    /// The source has ended
    pub const END_OF_STREAM: Self = Self(1 << 1);
    /// The source slot was held by the control context
    pub const SOURCE_BUSY: Self = Self(1 << 2);
    /// At least one unit was skipped because it was being reconfigured
    pub const UNIT_BYPASSED: Self = Self(1 << 3);
    /// The source failed; see `RenderGraph::take_render_error`
    pub const SOURCE_ERROR: Self = Self(1 << 4);
    /// The graph was not running
    pub const NOT_RUNNING: Self = Self(1 << 5);
    /// The graph was renegotiating
    pub const QUIESCED: Self = Self(1 << 6);
    /// Another render call was already in progress
    pub const REENTRANT: Self = Self(1 << 7);
    /// The output slice was smaller than the requested frame count
    pub const SIZE_MISMATCH: Self = Self(1 << 8);

    const NAMES: [(Self, &'static str); 9] = [
        (Self::SILENCE_FILLED, "SILENCE_FILLED"),
        (Self::END_OF_STREAM, "END_OF_STREAM"),
        (Self::SOURCE_BUSY, "SOURCE_BUSY"),
        (Self::UNIT_BYPASSED, "UNIT_BYPASSED"),
        (Self::SOURCE_ERROR, "SOURCE_ERROR"),
        (Self::NOT_RUNNING, "NOT_RUNNING"),
        (Self::QUIESCED, "QUIESCED"),
        (Self::REENTRANT, "REENTRANT"),
        (Self::SIZE_MISMATCH, "SIZE_MISMATCH"),
    ];

    /// Raw bits
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Build from raw bits, dropping unknown ones
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & 0x1ff)
    }

    /// Check if every flag in `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check if no flag is set
    pub const fn is_ok(self) -> bool {
        self.0 == 0
    }

    /// Set the flags in `other`
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for RenderStatus {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for RenderStatus {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for RenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return f.write_str("RenderStatus(OK)");
        }
        f.write_str("RenderStatus(")?;
        let mut first = true;
        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        f.write_str(")")
    }
}

/// Cumulative render statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderStats {
    /// Render calls, including rejected ones
    pub cycles: u64,
    /// Device frames written
    pub frames_rendered: u64,
    /// Frames that came from the source
    pub source_frames: u64,
    /// Frames filled with silence while running
    pub silence_frames: u64,
    /// Unit slices skipped because the unit was locked
    pub bypassed_units: u64,
    /// Cycles that found the source slot busy
    pub source_busy: u64,
    /// Calls rejected by the reentrancy guard
    pub reentrant_calls: u64,
    /// Cycles that saw a source failure
    pub source_errors: u64,
}

/// Lock-free counters behind [`RenderStats`]
#[derive(Debug, Default)]
pub(crate) struct RenderCounters {
    pub cycles: AtomicU64,
    pub frames_rendered: AtomicU64,
    pub source_frames: AtomicU64,
    pub silence_frames: AtomicU64,
    pub bypassed_units: AtomicU64,
    pub source_busy: AtomicU64,
    pub reentrant_calls: AtomicU64,
    pub source_errors: AtomicU64,
}

impl RenderCounters {
    #[inline]
    pub(crate) fn add(counter: &AtomicU64, value: u64) {
        counter.fetch_add(value, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> RenderStats {
        RenderStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            frames_rendered: self.frames_rendered.load(Ordering::Relaxed),
            source_frames: self.source_frames.load(Ordering::Relaxed),
            silence_frames: self.silence_frames.load(Ordering::Relaxed),
            bypassed_units: self.bypassed_units.load(Ordering::Relaxed),
            source_busy: self.source_busy.load(Ordering::Relaxed),
            reentrant_calls: self.reentrant_calls.load(Ordering::Relaxed),
            source_errors: self.source_errors.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_combine() {
        let mut status = RenderStatus::OK;
        assert!(status.is_ok());
        status |= RenderStatus::SILENCE_FILLED;
        status.insert(RenderStatus::END_OF_STREAM);
        assert!(status.contains(RenderStatus::SILENCE_FILLED | RenderStatus::END_OF_STREAM));
        assert!(!status.contains(RenderStatus::REENTRANT));
    }

    #[test]
    fn debug_lists_flag_names() {
        let status = RenderStatus::NOT_RUNNING | RenderStatus::QUIESCED;
        assert_eq!(format!("{:?}", status), "RenderStatus(NOT_RUNNING | QUIESCED)");
        assert_eq!(format!("{:?}", RenderStatus::OK), "RenderStatus(OK)");
    }

    #[test]
    fn truncate_drops_unknown_bits() {
        assert_eq!(RenderStatus::from_bits_truncate(u32::MAX).bits(), 0x1ff);
    }
}
