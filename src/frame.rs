//! Wire frame discriminators.
//!
//! Every frame on the wire starts with a single signed tag byte naming its
//! [`FrameType`]. The tag values are a stable wire contract: the framed
//! transport layer reassembles multi-frame messages purely from this
//! discriminator (`Start` opens a message, `Continue` extends it, `Finish`
//! closes it, `Single` is self-contained) while `ConfirmPacket` and
//! `PingPacket` are control frames outside the message-body stream.
//!
//! Unassigned tag values decode to [`FrameType::Unknown`]. That is the
//! forward-compatibility fallback for frames emitted by newer peers, never
//! an error.

/// Frame types of the Flarelink wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Self-contained message in one frame
    Single,
    /// Opens a multi-frame message
    Start,
    /// Extends an open multi-frame message
    Continue,
    /// Closes a multi-frame message
    Finish,
    /// Delivery confirmation control frame
    ConfirmPacket,
    /// Keep-alive control frame
    PingPacket,
    /// Unassigned tag value (forward compatibility)
    Unknown,
}

/// All frame types with an assigned wire tag, in tag order.
pub const DEFINED_FRAME_TYPES: [FrameType; 6] = [
    FrameType::Single,
    FrameType::Start,
    FrameType::Continue,
    FrameType::Finish,
    FrameType::ConfirmPacket,
    FrameType::PingPacket,
];

impl FrameType {
    /// Wire tag of this frame type. Pairwise distinct over defined variants;
    /// `Unknown` carries the reserved tag `-1`.
    pub const fn tag(self) -> i8 {
        match self {
            Self::Single => 1,
            Self::Start => 2,
            Self::Continue => 3,
            Self::Finish => 4,
            Self::ConfirmPacket => 5,
            Self::PingPacket => 6,
            Self::Unknown => -1,
        }
    }

    /// Decode a frame type from its wire tag.
    ///
    /// Total over all byte values: tags 1-6 map to their variant, every
    /// other value (negative and unassigned positive alike) to `Unknown`.
    pub const fn from_tag(tag: i8) -> Self {
        match tag {
            1 => Self::Single,
            2 => Self::Start,
            3 => Self::Continue,
            4 => Self::Finish,
            5 => Self::ConfirmPacket,
            6 => Self::PingPacket,
            _ => Self::Unknown,
        }
    }

    /// Decode from a raw frame buffer, discriminating on the first byte.
    pub fn from_bytes(buf: &[u8]) -> Self {
        match buf.first() {
            Some(&b) => Self::from_tag(b as i8),
            None => Self::Unknown,
        }
    }

    /// Control frames sit outside the message-body stream.
    pub const fn is_control(self) -> bool {
        matches!(self, Self::ConfirmPacket | Self::PingPacket)
    }

    /// Whether this frame begins a message (`Single` or `Start`).
    pub const fn opens_message(self) -> bool {
        matches!(self, Self::Single | Self::Start)
    }

    /// Whether this frame completes a message (`Single` or `Finish`).
    pub const fn closes_message(self) -> bool {
        matches!(self, Self::Single | Self::Finish)
    }
}

impl std::fmt::Display for FrameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Single => "SINGLE",
            Self::Start => "START",
            Self::Continue => "CONTINUE",
            Self::Finish => "FINISH",
            Self::ConfirmPacket => "CONFIRM_PACKET",
            Self::PingPacket => "PING_PACKET",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}
