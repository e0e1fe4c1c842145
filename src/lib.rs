mod compression;
pub use compression::{
    decompress_framed, decompress_to_vec, CallbackDestination, DecompressError, Decompressor,
    Destination, MemoryDestination, MATCH_MAX, MAX_OFFSET,
};

mod size;
pub use size::{
    decode_size, encode_size, encoded_size_len, size_len, SizeError, MAX_SIZE_BYTES,
};
