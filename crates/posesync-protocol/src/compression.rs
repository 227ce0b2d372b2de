//! Pose payload compression (raw DEFLATE, no zlib/gzip header).
//!
//! Inflation is done with the low-level [`flate2::Decompress`] state machine
//! rather than a `Read` adapter so that a stream which simply stops early is
//! reported as [`CodecError::Truncated`] instead of silently yielding a
//! partial buffer. Every call uses `FlushDecompress::None`: a `Finish` flush
//! on the first call switches the inflater into single-shot mode, which
//! cannot resume once the output buffer has to grow.

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};

use crate::CodecError;

/// Upper bound on a single inflated payload.
pub const MAX_DECOMPRESSED_LEN: usize = 4 * 1024 * 1024;

/// Compresses `data` at the best compression level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = DeflateEncoder::new(
        Vec::with_capacity(data.len() / 2 + 16),
        Compression::best(),
    );
    encoder.write_all(data).map_err(CodecError::Compress)?;
    encoder.finish().map_err(CodecError::Compress)
}

/// Inflates `data`, capped at [`MAX_DECOMPRESSED_LEN`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    decompress_with_limit(data, MAX_DECOMPRESSED_LEN)
}

/// Inflates `data`, failing once the output would exceed `limit` bytes.
pub fn decompress_with_limit(
    data: &[u8],
    limit: usize,
) -> Result<Vec<u8>, CodecError> {
    let mut inflater = Decompress::new(false);
    let mut out = Vec::with_capacity(data.len().saturating_mul(4).clamp(64, limit.max(64)));

    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity().max(64));
        }

        let consumed = inflater.total_in() as usize;
        let produced = out.len();
        let status = inflater.decompress_vec(
            &data[consumed..],
            &mut out,
            FlushDecompress::None,
        )?;

        if out.len() > limit {
            return Err(CodecError::TooLarge { limit });
        }

        match status {
            Status::StreamEnd => return Ok(out),
            Status::Ok | Status::BufError => {
                let progressed = out.len() > produced
                    || inflater.total_in() as usize > consumed;
                if !progressed && out.len() < out.capacity() {
                    // Room to write, nothing left to read: the stream ended
                    // before its final block.
                    return Err(CodecError::Truncated {
                        consumed: inflater.total_in() as usize,
                    });
                }
            }
        }
    }
}
