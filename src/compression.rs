mod decompress;
pub use decompress::{decompress_framed, decompress_to_vec, DecompressError, Decompressor};

mod destination;
pub use destination::{CallbackDestination, Destination, MemoryDestination};

const MATCH_BITS: u32 = 6;
const MATCH_MIN: usize = 3;
const OFFSET_MASK: usize = (1 << (16 - MATCH_BITS)) - 1;

/// Longest run a single back-reference can produce.
pub const MATCH_MAX: usize = (1 << MATCH_BITS) + MATCH_MIN - 1;
/// Furthest back a back-reference can reach.
pub const MAX_OFFSET: usize = OFFSET_MASK;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Item {
    Literal(u8),
    Copy { length: usize, offset: usize },
}

impl Item {
    /// Decode the two descriptor bytes of a back-reference.
    fn copy(d0: u8, d1: u8) -> Self {
        let length = usize::from(d0 >> (8 - MATCH_BITS)) + MATCH_MIN;
        let offset = usize::from(u16::from_be_bytes([d0, d1])) & OFFSET_MASK;

        Self::Copy { length, offset }
    }
}

/// Position of the decoder within the current control group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlState {
    /// The next input byte is a control byte.
    AwaitingControl,
    /// `bit` of `control` classifies the next item.
    Items { control: u8, bit: u8 },
    /// The back-reference at `bit` has its first descriptor byte, the second is still
    /// outstanding.
    PartialCopy { control: u8, bit: u8, first: u8 },
    /// A corrupt back-reference was rejected.
    Failed,
}

impl ControlState {
    fn after(control: u8, bit: u8) -> Self {
        if bit == 7 {
            Self::AwaitingControl
        } else {
            Self::Items {
                control,
                bit: bit + 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_descriptor() {
        assert_eq!(
            Item::copy(0x1c, 0x01),
            Item::Copy {
                length: 10,
                offset: 1
            }
        );
        assert_eq!(
            Item::copy(0xff, 0xff),
            Item::Copy {
                length: MATCH_MAX,
                offset: MAX_OFFSET
            }
        );
        assert_eq!(
            Item::copy(0x02, 0x34),
            Item::Copy {
                length: 3,
                offset: 0x234
            }
        );
    }

    #[test]
    fn control_bits_advance() {
        assert_eq!(
            ControlState::after(0xa5, 0),
            ControlState::Items {
                control: 0xa5,
                bit: 1
            }
        );
        assert_eq!(ControlState::after(0xa5, 7), ControlState::AwaitingControl);
    }
}
