/// Caller-allocated frame buffers
use super::format::StreamFormat;

/// Fixed-capacity sample storage in a given [`StreamFormat`]
///
/// Interleaved formats use one byte plane, planar formats one plane per
/// channel. Storage is allocated once in [`AudioBufferList::new`]; nothing in
/// the pipeline resizes it. Stages write from frame 0 and report how many
/// frames they produced through [`AudioBufferList::frames`].
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBufferList {
    format: StreamFormat,
    planes: Vec<Vec<u8>>,
    capacity: usize,
    frames: usize,
}

impl AudioBufferList {
    /// Allocate zeroed storage for `capacity` frames
    pub fn new(format: StreamFormat, capacity: usize) -> Self {
        let plane_bytes = capacity * format.bytes_per_frame();
        Self {
            format,
            planes: vec![vec![0u8; plane_bytes]; format.plane_count()],
            capacity,
            frames: 0,
        }
    }

    /// Wrap interleaved `f32` samples; `format` must be canonical `f32`
    pub fn from_f32_interleaved(format: StreamFormat, samples: &[f32]) -> Self {
        debug_assert!(format.is_canonical_f32());
        let channels = usize::from(format.channels.max(1));
        let frames = samples.len() / channels;
        let mut buffer = Self::new(format, frames);
        buffer.write_f32_interleaved(0, &samples[..frames * channels]);
        buffer.frames = frames;
        buffer
    }

    /// Format of the stored samples
    pub fn format(&self) -> &StreamFormat {
        &self.format
    }

    /// Maximum number of frames the buffer can hold
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of valid frames
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Set the number of valid frames, clamped to capacity
    pub fn set_frames(&mut self, frames: usize) {
        self.frames = frames.min(self.capacity);
    }

    /// Check if the buffer holds no valid frames
    pub fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Number of byte planes
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// Bytes of plane `index`, covering the full capacity
    pub fn plane(&self, index: usize) -> &[u8] {
        &self.planes[index]
    }

    /// Mutable bytes of plane `index`, covering the full capacity
    pub fn plane_mut(&mut self, index: usize) -> &mut [u8] {
        &mut self.planes[index]
    }

    /// Zero frames `from..to` in every plane (clamped to capacity)
    pub fn zero_frames(&mut self, from: usize, to: usize) {
        let to = to.min(self.capacity);
        if from >= to {
            return;
        }
        let bpf = self.format.bytes_per_frame();
        for plane in &mut self.planes {
            plane[from * bpf..to * bpf].fill(0);
        }
    }

    /// Copy `count` frames from `src` (same layout) into this buffer
    ///
    /// Counts are clamped so neither buffer is read or written past capacity.
    /// Returns the number of frames copied.
    pub fn copy_frames_from(
        &mut self,
        src: &Self,
        src_offset: usize,
        dst_offset: usize,
        count: usize,
    ) -> usize {
        debug_assert!(self.format.same_layout_as(&src.format));
        let count = count
            .min(src.capacity.saturating_sub(src_offset))
            .min(self.capacity.saturating_sub(dst_offset));
        if count == 0 {
            return 0;
        }
        let bpf = self.format.bytes_per_frame();
        for (dst, src) in self.planes.iter_mut().zip(&src.planes) {
            dst[dst_offset * bpf..(dst_offset + count) * bpf]
                .copy_from_slice(&src[src_offset * bpf..(src_offset + count) * bpf]);
        }
        count
    }

    /// Read interleaved `f32` samples starting at frame 0 into `out`
    ///
    /// Only valid for canonical `f32` buffers. Returns samples written.
    pub fn read_f32_interleaved(&self, out: &mut [f32]) -> usize {
        debug_assert!(self.format.is_canonical_f32());
        let samples = out.len().min(self.planes[0].len() / 4);
        for (dst, bytes) in out[..samples].iter_mut().zip(self.planes[0].chunks_exact(4)) {
            *dst = f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        }
        samples
    }

    /// Write interleaved `f32` samples starting at sample index `offset`
    ///
    /// Only valid for canonical `f32` buffers. Returns samples written.
    pub fn write_f32_interleaved(&mut self, offset: usize, samples: &[f32]) -> usize {
        debug_assert!(self.format.is_canonical_f32());
        let plane = &mut self.planes[0];
        let available = (plane.len() / 4).saturating_sub(offset);
        let count = samples.len().min(available);
        for (bytes, value) in plane[offset * 4..(offset + count) * 4]
            .chunks_exact_mut(4)
            .zip(&samples[..count])
        {
            bytes.copy_from_slice(&value.to_ne_bytes());
        }
        count
    }

    /// Valid frames as interleaved `f32` (allocates; for diagnostics and tests)
    pub fn to_f32_vec(&self) -> Vec<f32> {
        let mut out = vec![0.0; self.frames * usize::from(self.format.channels)];
        self.read_f32_interleaved(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar_buffer_has_plane_per_channel() {
        let buffer = AudioBufferList::new(StreamFormat::pcm_i16(44_100.0, 2).planar(), 128);
        assert_eq!(buffer.plane_count(), 2);
        assert_eq!(buffer.plane(0).len(), 256);
        assert_eq!(buffer.capacity(), 128);
        assert!(buffer.is_empty());
    }

    #[test]
    fn set_frames_clamps_to_capacity() {
        let mut buffer = AudioBufferList::new(StreamFormat::float32(48_000.0, 2), 16);
        buffer.set_frames(64);
        assert_eq!(buffer.frames(), 16);
    }

    #[test]
    fn f32_samples_survive_storage() {
        let samples = [0.25, -0.5, 1.0, -1.0];
        let buffer = AudioBufferList::from_f32_interleaved(StreamFormat::float32(48_000.0, 2), &samples);
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.to_f32_vec(), samples);
    }

    #[test]
    fn copy_is_clamped_to_destination() {
        let format = StreamFormat::pcm_i16(44_100.0, 1);
        let mut src = AudioBufferList::new(format, 8);
        src.plane_mut(0).fill(0xAB);
        let mut dst = AudioBufferList::new(format, 4);

        let copied = dst.copy_frames_from(&src, 0, 2, 8);
        assert_eq!(copied, 2);
        assert_eq!(dst.plane(0), &[0, 0, 0, 0, 0xAB, 0xAB, 0xAB, 0xAB]);
    }

    #[test]
    fn zero_frames_only_touches_range() {
        let format = StreamFormat::pcm_u8(8_000.0, 1);
        let mut buffer = AudioBufferList::new(format, 4);
        buffer.plane_mut(0).fill(7);
        buffer.zero_frames(1, 3);
        assert_eq!(buffer.plane(0), &[7, 0, 0, 7]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn copy_never_exceeds_either_buffer(
                src_capacity in 0usize..64,
                dst_capacity in 0usize..64,
                src_offset in 0usize..80,
                dst_offset in 0usize..80,
                count in 0usize..100,
                channels in 1u16..4,
            ) {
                let format = StreamFormat::pcm_i24(48_000.0, channels);
                let mut src = AudioBufferList::new(format, src_capacity);
                src.plane_mut(0).fill(0x5A);
                let mut dst = AudioBufferList::new(format, dst_capacity);

                let copied = dst.copy_frames_from(&src, src_offset, dst_offset, count);
                prop_assert!(copied <= count);
                prop_assert!(src_offset + copied <= src_capacity.max(src_offset));
                prop_assert!(dst_offset + copied <= dst_capacity.max(dst_offset));

                let bpf = format.bytes_per_frame();
                let written = dst.plane(0).iter().filter(|&&b| b == 0x5A).count();
                prop_assert_eq!(written, copied * bpf);
            }

            #[test]
            fn zero_frames_is_clamped(capacity in 0usize..32, from in 0usize..40, to in 0usize..40) {
                let mut buffer = AudioBufferList::new(StreamFormat::pcm_u8(8_000.0, 1), capacity);
                buffer.plane_mut(0).fill(1);
                buffer.zero_frames(from, to);
                let zeroed = buffer.plane(0).iter().filter(|&&b| b == 0).count();
                prop_assert_eq!(zeroed, to.min(capacity).saturating_sub(from));
            }
        }
    }
}
