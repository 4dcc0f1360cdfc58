/// Channel layouts: the role each channel of a stream plays
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a single channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelLabel {
    /// Front left
    Left,
    /// Front right
    Right,
    /// Front center
    Center,
    /// Low-frequency effects
    Lfe,
    /// Side/surround left
    LeftSurround,
    /// Side/surround right
    RightSurround,
    /// Rear left
    RearLeft,
    /// Rear right
    RearRight,
    /// Single channel meant for every speaker
    Mono,
    /// Numbered channel with no speaker position
    Discrete(u16),
    /// Channel carries nothing
    Unused,
}

impl fmt::Display for ChannelLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("L"),
            Self::Right => f.write_str("R"),
            Self::Center => f.write_str("C"),
            Self::Lfe => f.write_str("LFE"),
            Self::LeftSurround => f.write_str("Ls"),
            Self::RightSurround => f.write_str("Rs"),
            Self::RearLeft => f.write_str("Rls"),
            Self::RearRight => f.write_str("Rrs"),
            Self::Mono => f.write_str("M"),
            Self::Discrete(n) => write!(f, "D{n}"),
            Self::Unused => f.write_str("-"),
        }
    }
}

/// Ordered channel roles
///
/// Layouts are never edited in place; build a new one to change it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelLayout {
    labels: Vec<ChannelLabel>,
}

impl ChannelLayout {
    /// Create a layout from explicit labels
    pub fn new(labels: Vec<ChannelLabel>) -> Self {
        Self { labels }
    }

    /// Single mono channel
    pub fn mono() -> Self {
        Self::new(vec![ChannelLabel::Mono])
    }

    /// Left, right
    pub fn stereo() -> Self {
        Self::new(vec![ChannelLabel::Left, ChannelLabel::Right])
    }

    /// L, R, C, LFE, Ls, Rs
    pub fn surround_5_1() -> Self {
        use ChannelLabel::*;
        Self::new(vec![Left, Right, Center, Lfe, LeftSurround, RightSurround])
    }

    /// L, R, C, LFE, Ls, Rs, Rls, Rrs
    pub fn surround_7_1() -> Self {
        use ChannelLabel::*;
        Self::new(vec![
            Left,
            Right,
            Center,
            Lfe,
            LeftSurround,
            RightSurround,
            RearLeft,
            RearRight,
        ])
    }

    /// `count` discrete channels
    pub fn discrete(count: u16) -> Self {
        Self::new((0..count).map(ChannelLabel::Discrete).collect())
    }

    /// Conventional layout for a channel count, if one exists
    pub fn default_for_channels(channels: u16) -> Option<Self> {
        match channels {
            1 => Some(Self::mono()),
            2 => Some(Self::stereo()),
            6 => Some(Self::surround_5_1()),
            8 => Some(Self::surround_7_1()),
            _ => None,
        }
    }

    /// Labels in channel order
    pub fn labels(&self) -> &[ChannelLabel] {
        &self.labels
    }

    /// Number of channels described
    pub fn channel_count(&self) -> usize {
        self.labels.len()
    }

    /// Index of the first channel carrying `label`
    pub fn position_of(&self, label: ChannelLabel) -> Option<usize> {
        self.labels.iter().position(|&l| l == label)
    }

    /// Whether the layout contains `label`
    pub fn contains(&self, label: ChannelLabel) -> bool {
        self.position_of(label).is_some()
    }

    /// Whether this is exactly left, right
    pub fn is_stereo(&self) -> bool {
        self.labels == [ChannelLabel::Left, ChannelLabel::Right]
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{label}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surround_positions() {
        let layout = ChannelLayout::surround_5_1();
        assert_eq!(layout.channel_count(), 6);
        assert_eq!(layout.position_of(ChannelLabel::Lfe), Some(3));
        assert!(!layout.contains(ChannelLabel::RearLeft));
    }

    #[test]
    fn description_lists_labels() {
        assert_eq!(ChannelLayout::surround_5_1().to_string(), "[L R C LFE Ls Rs]");
        assert_eq!(ChannelLayout::discrete(2).to_string(), "[D0 D1]");
    }

    #[test]
    fn defaults_by_channel_count() {
        assert!(ChannelLayout::default_for_channels(2).unwrap().is_stereo());
        assert_eq!(ChannelLayout::default_for_channels(3), None);
    }
}
