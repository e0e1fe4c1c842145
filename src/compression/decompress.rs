use super::{CallbackDestination, ControlState, Destination, Item, MemoryDestination};
use crate::size::{decode_size, SizeError};
use thiserror::Error;

// a 17 byte group (control + 8 copies) expands to at most 528 bytes
const MAX_EXPANSION: usize = 32;

/// Incremental LZJB decompressor.
///
/// Compressed input can be handed over in chunks of any size, down to a single byte.
/// Every call consumes its whole chunk; a back-reference split across two chunks is
/// finished at the start of the next call.
#[derive(Debug, Clone)]
pub struct Decompressor<D> {
    dst: D,
    dst_pos: usize,
    dst_size: usize,

    state: ControlState,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecompressError {
    #[error("Decompressed size must be non-zero")]
    InvalidSize,
    #[error("Destination holds {capacity} bytes but {size} were requested")]
    DestinationTooSmall { capacity: usize, size: usize },
    #[error("Back-reference to offset {offset} at position {position} is out of range")]
    InvalidBackReference { offset: usize, position: usize },
    #[error("Decompressor already failed on corrupt data")]
    Poisoned,
    #[error("Input ended after {produced} of {expected} bytes")]
    Truncated { expected: usize, produced: usize },
    #[error("Size {size} can't be produced from {input} bytes of input")]
    ImplausibleSize { size: usize, input: usize },
    #[error("Invalid size header")]
    Size(#[from] SizeError),
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Decompressor<MemoryDestination<B>> {
    /// Decompress `dst_size` bytes into `buf`.
    pub fn memory(buf: B, dst_size: usize) -> Result<Self, DecompressError> {
        Self::new(MemoryDestination::new(buf), dst_size)
    }
}

impl<U, R, W> Decompressor<CallbackDestination<U, R, W>>
where
    R: FnMut(usize, &mut U) -> u8,
    W: FnMut(usize, u8, &mut U),
{
    /// Decompress `dst_size` bytes through `read` and `write`, both of which are handed
    /// `user`.
    pub fn callbacks(dst_size: usize, read: R, write: W, user: U) -> Result<Self, DecompressError> {
        Self::new(CallbackDestination::new(read, write, user), dst_size)
    }
}

impl<D: Destination> Decompressor<D> {
    pub fn new(dst: D, dst_size: usize) -> Result<Self, DecompressError> {
        if dst_size == 0 {
            return Err(DecompressError::InvalidSize);
        }

        if let Some(capacity) = dst.capacity() {
            if capacity < dst_size {
                return Err(DecompressError::DestinationTooSmall {
                    capacity,
                    size: dst_size,
                });
            }
        }

        Ok(Self {
            dst,
            dst_pos: 0,
            dst_size,
            state: ControlState::AwaitingControl,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.dst_pos >= self.dst_size
    }

    /// Number of bytes produced so far.
    pub fn position(&self) -> usize {
        self.dst_pos
    }

    pub fn size(&self) -> usize {
        self.dst_size
    }

    pub fn remaining(&self) -> usize {
        self.dst_size - self.dst_pos
    }

    pub fn destination(&self) -> &D {
        &self.dst
    }

    pub fn into_destination(self) -> D {
        self.dst
    }

    /// Feed the next chunk of compressed input.
    ///
    /// Returns `Ok(true)` while more input is needed and `Ok(false)` once all `size`
    /// bytes have been produced. Input left over after that point is ignored. An empty
    /// chunk, or any chunk after completion, changes nothing.
    pub fn decompress(&mut self, src: &[u8]) -> Result<bool, DecompressError> {
        if self.state == ControlState::Failed {
            return Err(DecompressError::Poisoned);
        }

        if src.is_empty() || self.is_finished() {
            return Ok(!self.is_finished());
        }

        log::debug!(
            "decompressing {} bytes at {}/{}",
            src.len(),
            self.dst_pos,
            self.dst_size
        );

        let mut src = src;

        if let ControlState::PartialCopy {
            control,
            bit,
            first,
        } = self.state
        {
            let [second, rest @ ..] = src else {
                unreachable!("input checked for emptiness");
            };
            src = rest;

            log::trace!("resuming back-reference {:#04x} {:#04x}", first, second);
            self.execute(Item::copy(first, *second))?;
            self.state = ControlState::after(control, bit);
        }

        while !self.is_finished() {
            let (control, bit) = match self.state {
                ControlState::AwaitingControl => {
                    let [control, rest @ ..] = src else {
                        break;
                    };
                    src = rest;

                    log::trace!("control byte: {:#010b}", control);
                    (*control, 0)
                }
                ControlState::Items { control, bit } => (control, bit),
                ControlState::PartialCopy { .. } | ControlState::Failed => break,
            };
            self.state = ControlState::Items { control, bit };

            if control & (1 << bit) == 0 {
                let [literal, rest @ ..] = src else {
                    break;
                };
                src = rest;

                self.execute(Item::Literal(*literal))?;
            } else {
                match src {
                    [] => break,
                    [first] => {
                        log::trace!("deferring back-reference {:#04x}", first);
                        self.state = ControlState::PartialCopy {
                            control,
                            bit,
                            first: *first,
                        };
                        break;
                    }
                    [first, second, rest @ ..] => {
                        src = rest;
                        self.execute(Item::copy(*first, *second))?;
                    }
                }
            }

            self.state = ControlState::after(control, bit);
        }

        if self.is_finished() {
            log::debug!("finished decompressing {} bytes", self.dst_size);
        }

        Ok(!self.is_finished())
    }

    fn execute(&mut self, item: Item) -> Result<(), DecompressError> {
        match item {
            Item::Literal(value) => {
                log::trace!("literal: {:#04x}", value);
                self.put(value);
            }
            Item::Copy { length, offset } => {
                if offset == 0 || offset > self.dst_pos {
                    log::warn!(
                        "back-reference to offset {} at position {}",
                        offset,
                        self.dst_pos
                    );
                    self.state = ControlState::Failed;

                    return Err(DecompressError::InvalidBackReference {
                        offset,
                        position: self.dst_pos,
                    });
                }

                log::trace!("copy: length {} offset {}", length, offset);
                self.copy_backread(length.min(self.remaining()), offset);
            }
        }

        Ok(())
    }

    // byte by byte, so that a copy overlapping its own output repeats the pattern
    fn copy_backread(&mut self, length: usize, offset: usize) {
        let mut from = self.dst_pos - offset;

        for _ in 0..length {
            let value = self.dst.read(from);
            self.put(value);
            from += 1;
        }
    }

    fn put(&mut self, value: u8) {
        self.dst.write(self.dst_pos, value);
        self.dst_pos += 1;
    }
}

/// Decompress a whole LZJB body of known decompressed `size` into a new vector.
pub fn decompress_to_vec(src: &[u8], size: usize) -> Result<Vec<u8>, DecompressError> {
    if size == 0 {
        return Ok(Vec::new());
    }

    if size > src.len().saturating_mul(MAX_EXPANSION) {
        return Err(DecompressError::ImplausibleSize {
            size,
            input: src.len(),
        });
    }

    let mut decompressor = Decompressor::memory(vec![0u8; size], size)?;
    if decompressor.decompress(src)? {
        return Err(DecompressError::Truncated {
            expected: size,
            produced: decompressor.position(),
        });
    }

    Ok(decompressor.into_destination().into_inner())
}

/// Decompress a body prefixed with its encoded decompressed size.
pub fn decompress_framed(src: &[u8]) -> Result<Vec<u8>, DecompressError> {
    let (size, header_len) = decode_size(src)?;
    decompress_to_vec(&src[header_len..], size)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(size: usize) -> Decompressor<MemoryDestination<Vec<u8>>> {
        Decompressor::memory(vec![0u8; size], size).unwrap()
    }

    #[test]
    fn rejects_zero_size() {
        assert!(matches!(
            Decompressor::memory(vec![0u8; 4], 0),
            Err(DecompressError::InvalidSize)
        ));
    }

    #[test]
    fn rejects_short_buffer() {
        assert!(matches!(
            Decompressor::memory(vec![0u8; 4], 5),
            Err(DecompressError::DestinationTooSmall {
                capacity: 4,
                size: 5
            })
        ));
    }

    #[test]
    fn control_byte_alone_is_kept() {
        let mut d = memory(2);

        assert_eq!(d.decompress(&[0x00]), Ok(true));
        assert_eq!(
            d.state,
            ControlState::Items {
                control: 0x00,
                bit: 0
            }
        );
        assert_eq!(d.position(), 0);
    }

    #[test]
    fn split_descriptor_is_deferred() {
        let mut d = memory(11);

        assert_eq!(d.decompress(&[0x02, b'x', 0x1c]), Ok(true));
        assert_eq!(
            d.state,
            ControlState::PartialCopy {
                control: 0x02,
                bit: 1,
                first: 0x1c
            }
        );
        assert_eq!(d.position(), 1);

        assert_eq!(d.decompress(&[0x01]), Ok(false));
        assert_eq!(d.into_destination().into_inner(), b"xxxxxxxxxxx");
    }

    #[test]
    fn group_of_eight_reloads_control() {
        let mut d = memory(9);

        assert_eq!(d.decompress(b"\x00abcdefgh"), Ok(true));
        assert_eq!(d.state, ControlState::AwaitingControl);

        assert_eq!(d.decompress(b"\x00i"), Ok(false));
        assert_eq!(d.into_destination().into_inner(), b"abcdefghi");
    }

    #[test]
    fn failure_poisons() {
        let mut d = memory(4);

        assert_eq!(
            d.decompress(&[0x01, 0x00, 0x01]),
            Err(DecompressError::InvalidBackReference {
                offset: 1,
                position: 0
            })
        );
        assert_eq!(d.decompress(&[0x00]), Err(DecompressError::Poisoned));
    }

    #[test]
    fn framed() {
        assert_eq!(
            decompress_framed(&[0x83, 0x00, b'a', b'b', b'c']),
            Ok(b"abc".to_vec())
        );
        assert_eq!(
            decompress_framed(&[0x84, 0x00, b'a', b'b', b'c']),
            Err(DecompressError::Truncated {
                expected: 4,
                produced: 3
            })
        );
        assert_eq!(
            decompress_framed(&[0x01]),
            Err(DecompressError::Size(SizeError::Incomplete))
        );
    }

    #[test]
    fn implausible_size() {
        assert_eq!(
            decompress_to_vec(&[0x00, b'a'], 65),
            Err(DecompressError::ImplausibleSize { size: 65, input: 2 })
        );
        assert_eq!(decompress_to_vec(&[], 0), Ok(Vec::new()));
    }
}
