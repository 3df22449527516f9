use std::io::{Read, Write};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use super::error::DecodeError;

/// Inflate a zlib stream, refusing output larger than `max_len` bytes.
pub fn decompress(input: &[u8], max_len: usize) -> Result<Vec<u8>, DecodeError> {
    if input.is_empty() {
        return Err(DecodeError::InvalidCompression("empty stream".into()));
    }
    let mut out = Vec::new();
    ZlibDecoder::new(input)
        .take(max_len as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::InvalidCompression(e.to_string()))?;
    if out.len() > max_len {
        return Err(DecodeError::InvalidCompression(format!(
            "decompressed payload exceeds {max_len} bytes"
        )));
    }
    Ok(out)
}

pub fn compress(input: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(input)?;
    encoder.finish()
}
