//! Base45 text encoding (RFC 9285).
//!
//! Two bytes `[a, b]` are read as `n = a * 256 + b` and written as three
//! characters `c d e` with `n = c + d * 45 + e * 45²`. A trailing odd byte is
//! written as two characters.

use super::error::DecodeError;

const ALPHABET: &[u8; 45] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

fn value_of(c: u8) -> Option<u32> {
    ALPHABET.iter().position(|&a| a == c).map(|p| p as u32)
}

/// Decode a base45 string into raw bytes.
///
/// Fails closed: no bytes are returned unless the whole input is valid.
pub fn decode(input: &str) -> Result<Vec<u8>, DecodeError> {
    let input = input.as_bytes();
    if input.len() % 3 == 1 {
        return Err(DecodeError::InvalidEncoding(format!(
            "base45 length {} is not a valid grouping",
            input.len()
        )));
    }

    let mut out = Vec::with_capacity(input.len() / 3 * 2 + 1);
    for chunk in input.chunks(3) {
        let mut n = 0u32;
        for (i, &c) in chunk.iter().enumerate() {
            let v = value_of(c).ok_or_else(|| {
                DecodeError::InvalidEncoding(format!(
                    "character {:?} is outside the base45 alphabet",
                    c as char
                ))
            })?;
            n += v * 45u32.pow(i as u32);
        }
        match chunk.len() {
            3 if n <= 0xFFFF => out.extend_from_slice(&[(n >> 8) as u8, n as u8]),
            2 if n <= 0xFF => out.push(n as u8),
            _ => {
                return Err(DecodeError::InvalidEncoding(format!(
                    "base45 group value {n} out of range"
                )))
            }
        }
    }
    Ok(out)
}

/// Encode raw bytes as base45.
pub fn encode(input: &[u8]) -> String {
    let mut out = String::with_capacity(input.len().div_ceil(2) * 3);
    for chunk in input.chunks(2) {
        let (mut n, digits) = match chunk {
            [a, b] => ((*a as u32) << 8 | *b as u32, 3),
            [a] => (*a as u32, 2),
            _ => unreachable!("chunks(2) yields one or two bytes"),
        };
        for _ in 0..digits {
            out.push(ALPHABET[(n % 45) as usize] as char);
            n /= 45;
        }
    }
    out
}
