//! Channel mapping
//!
//! A channel map is a sparse destination × source gain matrix built once when
//! a converter opens. With layouts on both sides channels are routed by role;
//! otherwise they are routed by position.

use soul_core::{ChannelLabel, ChannelLayout};

/// -3 dB, used when folding one channel into two
const FOLD_GAIN: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Destination × source routing
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMap {
    /// For each destination channel, the (source channel, gain) pairs summed into it
    routes: Vec<Vec<(usize, f32)>>,
    source_channels: usize,
    identity: bool,
}

impl ChannelMap {
    /// Build the routing between two channel configurations
    pub fn new(
        source_channels: usize,
        source_layout: Option<&ChannelLayout>,
        dest_channels: usize,
        dest_layout: Option<&ChannelLayout>,
    ) -> Self {
        let routes = match (source_layout, dest_layout) {
            (Some(src), Some(dst)) if src != dst => by_label(src, dst),
            _ => by_position(source_channels, dest_channels),
        };

        let identity = source_channels == dest_channels
            && routes
                .iter()
                .enumerate()
                .all(|(d, r)| r.len() == 1 && r[0].0 == d && r[0].1 == 1.0);

        Self {
            routes,
            source_channels,
            identity,
        }
    }

    /// Whether every destination channel is a unity copy of the same-numbered source
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Number of destination channels
    pub fn dest_channels(&self) -> usize {
        self.routes.len()
    }

    /// Number of source channels
    pub fn source_channels(&self) -> usize {
        self.source_channels
    }

    /// Gain from source channel `src` into destination channel `dst`
    pub fn gain(&self, dst: usize, src: usize) -> f32 {
        self.routes
            .get(dst)
            .and_then(|r| r.iter().find(|(s, _)| *s == src))
            .map(|(_, g)| *g)
            .unwrap_or(0.0)
    }

    /// Route `frames` frames of planar `input[..][in_offset..]` into `output[..][out_offset..]`
    pub fn apply(
        &self,
        input: &[Vec<f32>],
        in_offset: usize,
        output: &mut [Vec<f32>],
        out_offset: usize,
        frames: usize,
    ) {
        for (dst, routes) in output.iter_mut().zip(&self.routes) {
            let dst = &mut dst[out_offset..out_offset + frames];
            match routes.as_slice() {
                [] => dst.fill(0.0),
                [(src, gain)] if *gain == 1.0 => {
                    dst.copy_from_slice(&input[*src][in_offset..in_offset + frames]);
                }
                _ => {
                    dst.fill(0.0);
                    for &(src, gain) in routes {
                        let src = &input[src][in_offset..in_offset + frames];
                        for (d, s) in dst.iter_mut().zip(src) {
                            *d += s * gain;
                        }
                    }
                }
            }
        }
    }
}

fn by_position(source: usize, dest: usize) -> Vec<Vec<(usize, f32)>> {
    (0..dest)
        .map(|d| {
            if source == 1 {
                // Mono feeds every destination channel
                vec![(0, 1.0)]
            } else if dest == 1 && source == 2 {
                vec![(0, 0.5), (1, 0.5)]
            } else if d < source {
                vec![(d, 1.0)]
            } else {
                Vec::new()
            }
        })
        .collect()
}

fn by_label(src: &ChannelLayout, dst: &ChannelLayout) -> Vec<Vec<(usize, f32)>> {
    use ChannelLabel::*;

    let find = |label| src.position_of(label);

    dst.labels()
        .iter()
        .map(|&label| {
            let mut routes = Vec::new();
            if label != Unused {
                if let Some(s) = find(label) {
                    routes.push((s, 1.0));
                }
            }

            match label {
                Mono if routes.is_empty() => {
                    // Downmix the front channels
                    match (find(Left), find(Right)) {
                        (Some(l), Some(r)) => {
                            routes.push((l, 0.5));
                            routes.push((r, 0.5));
                        }
                        (Some(c), None) | (None, Some(c)) => routes.push((c, 1.0)),
                        (None, None) => {}
                    }
                    if let Some(c) = find(Center) {
                        routes.push((c, FOLD_GAIN * 0.5));
                    }
                }
                Left | Right => {
                    if routes.is_empty() {
                        if let Some(m) = find(Mono) {
                            routes.push((m, 1.0));
                        }
                    }
                    if !dst.contains(Center) {
                        if let Some(c) = find(Center) {
                            routes.push((c, FOLD_GAIN));
                        }
                    }
                    let (side, rear) = if label == Left {
                        (LeftSurround, RearLeft)
                    } else {
                        (RightSurround, RearRight)
                    };
                    if !dst.contains(side) {
                        if let Some(s) = find(side) {
                            routes.push((s, FOLD_GAIN));
                        }
                        if !dst.contains(rear) {
                            if let Some(s) = find(rear) {
                                routes.push((s, FOLD_GAIN));
                            }
                        }
                    }
                }
                Center if routes.is_empty() => {
                    if let Some(m) = find(Mono) {
                        routes.push((m, 1.0));
                    } else if !dst.contains(Left) && !dst.contains(Right) {
                        if let (Some(l), Some(r)) = (find(Left), find(Right)) {
                            routes.push((l, 0.5));
                            routes.push((r, 0.5));
                        }
                    }
                }
                LeftSurround | RightSurround => {
                    let rear = if label == LeftSurround { RearLeft } else { RearRight };
                    if !dst.contains(rear) {
                        if let Some(s) = find(rear) {
                            routes.push((s, 1.0));
                        }
                    }
                }
                // LFE, discrete channels, and unused slots only take a direct match
                _ => {}
            }
            routes
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_count_without_layouts_is_identity() {
        let map = ChannelMap::new(2, None, 2, None);
        assert!(map.is_identity());
    }

    #[test]
    fn mono_source_feeds_all_positions() {
        let map = ChannelMap::new(1, None, 2, None);
        assert!(!map.is_identity());
        assert_eq!(map.gain(0, 0), 1.0);
        assert_eq!(map.gain(1, 0), 1.0);
    }

    #[test]
    fn stereo_to_mono_averages() {
        let map = ChannelMap::new(2, Some(&ChannelLayout::stereo()), 1, Some(&ChannelLayout::mono()));
        let input = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let mut output = vec![vec![9.0; 2]];
        map.apply(&input, 0, &mut output, 0, 2);
        assert_eq!(output[0], vec![0.5, 0.5]);
    }

    #[test]
    fn surround_folds_into_stereo() {
        let map = ChannelMap::new(
            6,
            Some(&ChannelLayout::surround_5_1()),
            2,
            Some(&ChannelLayout::stereo()),
        );
        assert_eq!(map.gain(0, 0), 1.0);
        assert_eq!(map.gain(0, 2), FOLD_GAIN);
        assert_eq!(map.gain(0, 4), FOLD_GAIN);
        assert_eq!(map.gain(1, 5), FOLD_GAIN);
        // LFE is dropped
        assert_eq!(map.gain(0, 3), 0.0);
        assert_eq!(map.gain(1, 3), 0.0);
    }

    #[test]
    fn reordered_labels_route_by_role() {
        let src = ChannelLayout::new(vec![ChannelLabel::Right, ChannelLabel::Left]);
        let map = ChannelMap::new(2, Some(&src), 2, Some(&ChannelLayout::stereo()));
        assert!(!map.is_identity());
        assert_eq!(map.gain(0, 1), 1.0);
        assert_eq!(map.gain(1, 0), 1.0);
    }

    #[test]
    fn extra_destination_channels_are_silent() {
        let map = ChannelMap::new(2, None, 4, None);
        let input = vec![vec![0.5; 3], vec![-0.5; 3]];
        let mut output = vec![vec![1.0; 3]; 4];
        map.apply(&input, 0, &mut output, 0, 3);
        assert_eq!(output[2], vec![0.0; 3]);
        assert_eq!(output[3], vec![0.0; 3]);
        assert_eq!(output[1], vec![-0.5; 3]);
    }
}
