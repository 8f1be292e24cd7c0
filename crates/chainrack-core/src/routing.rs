//! Per-instance bus routing.
//!
//! Bus 0 is the main bus, which carries the host input and becomes the host
//! output. Auxiliary buses start each block silent. An instance reads a
//! channel selection from its input bus and writes the same selection to its
//! output bus: in place when the buses match, summed when they differ.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Which channels of a bus an instance processes.
///
/// Persisted as `null` (stereo), `"A"`, `"L"`, `"R"` or a 1-based channel
/// number such as `"3"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "Option<String>", try_from = "Option<String>")]
pub enum ChannelSelection {
    /// First two channels.
    #[default]
    Stereo,
    All,
    Left,
    Right,
    /// A single channel, 1-based.
    Channel(u8),
}

impl ChannelSelection {
    /// Contiguous channel span of a bus with `available` channels.
    ///
    /// Empty when the selection lies outside the bus.
    #[inline]
    pub fn span(&self, available: usize) -> Range<usize> {
        let (start, end) = match *self {
            Self::Stereo => (0, 2),
            Self::All => (0, available),
            Self::Left => (0, 1),
            Self::Right => (1, 2),
            Self::Channel(n) => {
                let index = (n as usize).saturating_sub(1);
                (index, index + 1)
            }
        };
        let end = end.min(available);
        start.min(end)..end
    }
}

impl From<ChannelSelection> for Option<String> {
    fn from(selection: ChannelSelection) -> Self {
        match selection {
            ChannelSelection::Stereo => None,
            ChannelSelection::All => Some("A".into()),
            ChannelSelection::Left => Some("L".into()),
            ChannelSelection::Right => Some("R".into()),
            ChannelSelection::Channel(n) => Some(n.to_string()),
        }
    }
}

/// Rejected channel selection label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid channel selection: {0}")]
pub struct InvalidChannelSelection(pub String);

impl TryFrom<Option<String>> for ChannelSelection {
    type Error = InvalidChannelSelection;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        let Some(label) = value else {
            return Ok(Self::Stereo);
        };
        match label.as_str() {
            "A" => Ok(Self::All),
            "L" => Ok(Self::Left),
            "R" => Ok(Self::Right),
            other => match other.parse::<u8>() {
                Ok(n) if n >= 1 => Ok(Self::Channel(n)),
                _ => Err(InvalidChannelSelection(label)),
            },
        }
    }
}

impl fmt::Display for ChannelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stereo => write!(f, "stereo"),
            Self::All => write!(f, "all"),
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
            Self::Channel(n) => write!(f, "ch{}", n),
        }
    }
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

/// Input/output bus assignment of one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BusRouting {
    #[serde(default, skip_serializing_if = "is_default")]
    pub input_bus: u8,
    #[serde(default, skip_serializing_if = "is_default")]
    pub output_bus: u8,
    #[serde(default, skip_serializing_if = "is_default")]
    pub channels: ChannelSelection,
}

impl BusRouting {
    pub fn new(input_bus: u8, output_bus: u8, channels: ChannelSelection) -> Self {
        Self {
            input_bus,
            output_bus,
            channels,
        }
    }

    pub fn main() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_in_place(&self) -> bool {
        self.input_bus == self.output_bus
    }
}
