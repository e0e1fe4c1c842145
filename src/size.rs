use thiserror::Error;

const SIZE_BITS: u32 = 7;
const SIZE_MASK: u8 = (1 << SIZE_BITS) - 1;
// set on the last byte of an encoded size
const SIZE_LAST: u8 = SIZE_MASK + 1;

/// Longest possible encoding of a `usize`.
pub const MAX_SIZE_BYTES: usize = usize::BITS.div_ceil(SIZE_BITS) as usize;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeError {
    #[error("Buffer too small for encoded size: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },
    #[error("Encoded size is incomplete, more input is needed")]
    Incomplete,
    #[error("Encoded size does not fit in usize")]
    Overflow,
}

/// Number of bytes `size` occupies once encoded.
pub const fn encoded_size_len(size: usize) -> usize {
    let bits = usize::BITS - size.leading_zeros();
    if bits == 0 {
        1
    } else {
        bits.div_ceil(SIZE_BITS) as usize
    }
}

/// Encode `size` into `out`, least significant 7 bits first. The last byte carries the
/// terminal bit, so `0` encodes as `[0x80]`.
///
/// Returns the number of bytes written. If `out` can't hold the whole encoding nothing
/// is written.
pub fn encode_size(out: &mut [u8], mut size: usize) -> Result<usize, SizeError> {
    let needed = encoded_size_len(size);
    if out.len() < needed {
        return Err(SizeError::BufferTooSmall {
            needed,
            available: out.len(),
        });
    }

    for (i, byte) in out.iter_mut().enumerate() {
        let here = size as u8 & SIZE_MASK;
        size >>= SIZE_BITS;

        if size == 0 {
            *byte = SIZE_LAST | here;
            return Ok(i + 1);
        }

        *byte = here;
    }

    unreachable!("encoded_size_len undercounted");
}

/// Decode a size from the start of `input`.
///
/// Returns the decoded size and the number of bytes it spanned. Running out of input
/// before the terminal byte yields [`SizeError::Incomplete`].
pub fn decode_size(input: &[u8]) -> Result<(usize, usize), SizeError> {
    let mut size: usize = 0;
    let mut shift = 0u32;

    for (i, &byte) in input.iter().enumerate() {
        let here = (byte & SIZE_MASK) as usize;

        if here != 0 {
            if shift >= usize::BITS || (here << shift) >> shift != here {
                return Err(SizeError::Overflow);
            }
            size |= here << shift;
        }

        if byte & SIZE_LAST != 0 {
            return Ok((size, i + 1));
        }

        shift = shift.saturating_add(SIZE_BITS);
    }

    Err(SizeError::Incomplete)
}

/// Length of the encoded size at the start of `input`, without decoding its value.
pub fn size_len(input: &[u8]) -> Result<usize, SizeError> {
    input
        .iter()
        .position(|byte| byte & SIZE_LAST != 0)
        .map(|last| last + 1)
        .ok_or(SizeError::Incomplete)
}
