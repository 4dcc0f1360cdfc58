//! Sample codec
//!
//! Moves samples between byte planes in any supported [`StreamFormat`] and
//! planar `f32` working buffers. Integers are scaled by 2^(bits-1); unsigned
//! 8-bit is offset by 128. Encoding rounds and saturates.

use soul_core::{AudioBufferList, ByteOrder, SampleKind, StreamFormat};

/// Decode `frames` frames starting at `src_offset` into planar `out[ch][dst_offset..]`
pub fn decode_planar(
    buffer: &AudioBufferList,
    src_offset: usize,
    frames: usize,
    out: &mut [Vec<f32>],
    dst_offset: usize,
) {
    let format = *buffer.format();
    let bps = format.bytes_per_sample();
    let channels = usize::from(format.channels);

    for (ch, plane_out) in out.iter_mut().enumerate().take(channels) {
        let (plane, stride, first) = locate(&format, ch);
        let bytes = buffer.plane(plane);
        for (i, sample) in plane_out[dst_offset..dst_offset + frames].iter_mut().enumerate() {
            let pos = (src_offset + i) * stride + first;
            *sample = read_sample(&bytes[pos * bps..(pos + 1) * bps], &format);
        }
    }
}

/// Encode planar `input[ch][src_offset..]` into `buffer` starting at frame `dst_offset`
pub fn encode_planar(
    input: &[Vec<f32>],
    src_offset: usize,
    frames: usize,
    buffer: &mut AudioBufferList,
    dst_offset: usize,
) {
    let format = *buffer.format();
    let bps = format.bytes_per_sample();
    let channels = usize::from(format.channels);

    for (ch, plane_in) in input.iter().enumerate().take(channels) {
        let (plane, stride, first) = locate(&format, ch);
        let bytes = buffer.plane_mut(plane);
        for (i, &sample) in plane_in[src_offset..src_offset + frames].iter().enumerate() {
            let pos = (dst_offset + i) * stride + first;
            write_sample(&mut bytes[pos * bps..(pos + 1) * bps], sample, &format);
        }
    }
}

/// (plane index, samples per frame in that plane, sample index of `ch` within a frame)
#[inline]
fn locate(format: &StreamFormat, ch: usize) -> (usize, usize, usize) {
    if format.interleaved {
        (0, usize::from(format.channels), ch)
    } else {
        (ch, 1, 0)
    }
}

#[inline]
fn read_sample(bytes: &[u8], format: &StreamFormat) -> f32 {
    let little = format.byte_order == ByteOrder::Little;
    match (format.sample_kind, format.bits_per_sample) {
        (SampleKind::UnsignedInt, 8) => (f32::from(bytes[0]) - 128.0) / 128.0,
        (SampleKind::SignedInt, 8) => f32::from(bytes[0] as i8) / 128.0,
        (SampleKind::SignedInt, 16) => {
            let raw = [bytes[0], bytes[1]];
            let value = if little { i16::from_le_bytes(raw) } else { i16::from_be_bytes(raw) };
            f32::from(value) / 32_768.0
        }
        (SampleKind::SignedInt, 24) => {
            let (lo, mid, hi) = if little {
                (bytes[0], bytes[1], bytes[2])
            } else {
                (bytes[2], bytes[1], bytes[0])
            };
            // Sign-extend by placing the 24 bits at the top of an i32
            let value = i32::from_le_bytes([0, lo, mid, hi]) >> 8;
            value as f32 / 8_388_608.0
        }
        (SampleKind::SignedInt, 32) => {
            let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
            let value = if little { i32::from_le_bytes(raw) } else { i32::from_be_bytes(raw) };
            (f64::from(value) / 2_147_483_648.0) as f32
        }
        (SampleKind::Float, 32) => {
            let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
            if little { f32::from_le_bytes(raw) } else { f32::from_be_bytes(raw) }
        }
        (SampleKind::Float, 64) => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[..8]);
            let value = if little { f64::from_le_bytes(raw) } else { f64::from_be_bytes(raw) };
            value as f32
        }
        _ => 0.0,
    }
}

#[inline]
fn write_sample(bytes: &mut [u8], sample: f32, format: &StreamFormat) {
    let little = format.byte_order == ByteOrder::Little;
    match (format.sample_kind, format.bits_per_sample) {
        (SampleKind::UnsignedInt, 8) => {
            bytes[0] = (sample * 128.0 + 128.0).round().clamp(0.0, 255.0) as u8;
        }
        (SampleKind::SignedInt, 8) => {
            bytes[0] = (sample * 128.0).round().clamp(-128.0, 127.0) as i8 as u8;
        }
        (SampleKind::SignedInt, 16) => {
            let value = (sample * 32_768.0).round().clamp(-32_768.0, 32_767.0) as i16;
            bytes.copy_from_slice(&if little { value.to_le_bytes() } else { value.to_be_bytes() });
        }
        (SampleKind::SignedInt, 24) => {
            let value = (sample * 8_388_608.0).round().clamp(-8_388_608.0, 8_388_607.0) as i32;
            let le = value.to_le_bytes();
            if little {
                bytes.copy_from_slice(&le[..3]);
            } else {
                bytes.copy_from_slice(&[le[2], le[1], le[0]]);
            }
        }
        (SampleKind::SignedInt, 32) => {
            let value = (f64::from(sample) * 2_147_483_648.0)
                .round()
                .clamp(-2_147_483_648.0, 2_147_483_647.0) as i32;
            bytes.copy_from_slice(&if little { value.to_le_bytes() } else { value.to_be_bytes() });
        }
        (SampleKind::Float, 32) => {
            bytes.copy_from_slice(&if little { sample.to_le_bytes() } else { sample.to_be_bytes() });
        }
        (SampleKind::Float, 64) => {
            let value = f64::from(sample);
            bytes.copy_from_slice(&if little { value.to_le_bytes() } else { value.to_be_bytes() });
        }
        _ => bytes.fill(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(format: StreamFormat, bytes: &[u8]) -> f32 {
        let mut buffer = AudioBufferList::new(format, 1);
        buffer.plane_mut(0)[..bytes.len()].copy_from_slice(bytes);
        let mut out = vec![vec![0.0; 1]];
        decode_planar(&buffer, 0, 1, &mut out, 0);
        out[0][0]
    }

    fn encode_one(format: StreamFormat, value: f32) -> Vec<u8> {
        let mut buffer = AudioBufferList::new(format, 1);
        encode_planar(&[vec![value]], 0, 1, &mut buffer, 0);
        buffer.plane(0).to_vec()
    }

    #[test]
    fn sixteen_bit_respects_byte_order() {
        let le = StreamFormat::pcm_i16(44_100.0, 1);
        let be = le.with_byte_order(ByteOrder::Big);
        assert_eq!(decode_one(le, &[0x00, 0x40]), 0.5);
        assert_eq!(decode_one(be, &[0x40, 0x00]), 0.5);
        assert_eq!(encode_one(be, -0.5), vec![0xC0, 0x00]);
    }

    #[test]
    fn twenty_four_bit_sign_extends() {
        let format = StreamFormat::pcm_i24(48_000.0, 1);
        assert_eq!(decode_one(format, &[0x00, 0x00, 0x80]), -1.0);
        assert_eq!(decode_one(format, &[0x00, 0x00, 0x40]), 0.5);
        assert_eq!(encode_one(format, -1.0), vec![0x00, 0x00, 0x80]);
    }

    #[test]
    fn unsigned_eight_bit_is_offset_binary() {
        let format = StreamFormat::pcm_u8(8_000.0, 1);
        assert_eq!(decode_one(format, &[128]), 0.0);
        assert_eq!(encode_one(format, 0.0), vec![128]);
        assert_eq!(encode_one(format, 1.0), vec![255]);
    }

    #[test]
    fn integer_encoding_saturates() {
        let format = StreamFormat::pcm_i16(44_100.0, 1);
        assert_eq!(encode_one(format, 2.0), 32_767i16.to_le_bytes().to_vec());
        assert_eq!(encode_one(format, -2.0), (-32_768i16).to_le_bytes().to_vec());
    }

    #[test]
    fn float64_big_endian_round_trips() {
        let format = StreamFormat::float64(96_000.0, 1).with_byte_order(ByteOrder::Big);
        let bytes = encode_one(format, 0.125);
        assert_eq!(bytes, 0.125f64.to_be_bytes().to_vec());
        assert_eq!(decode_one(format, &bytes), 0.125);
    }

    #[test]
    fn interleaved_and_planar_address_the_same_samples() {
        let interleaved = StreamFormat::pcm_i16(44_100.0, 2);
        let planar = interleaved.planar();
        let input = vec![vec![0.25, 0.5], vec![-0.25, -0.5]];

        let mut a = AudioBufferList::new(interleaved, 2);
        let mut b = AudioBufferList::new(planar, 2);
        encode_planar(&input, 0, 2, &mut a, 0);
        encode_planar(&input, 0, 2, &mut b, 0);

        let mut out_a = vec![vec![0.0; 2]; 2];
        let mut out_b = vec![vec![0.0; 2]; 2];
        decode_planar(&a, 0, 2, &mut out_a, 0);
        decode_planar(&b, 0, 2, &mut out_b, 0);
        assert_eq!(out_a, input);
        assert_eq!(out_b, input);
    }
}
