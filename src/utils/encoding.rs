use std::io::{self, Write};

/// Encode a u32 as a variable-length integer
pub fn encode_varint(mut value: u32, buf: &mut Vec<u8>) {
    loop {
        if value < 0x80 {
            buf.push(value as u8);
            break;
        }
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
}

/// Decode a variable-length integer from a slice
/// Returns (value, bytes_consumed)
pub fn decode_varint(buf: &[u8]) -> Option<(u32, usize)> {
    let mut result: u32 = 0;
    let mut shift = 0;

    for (i, &byte) in buf.iter().enumerate() {
        if shift >= 32 {
            return None; // Overflow
        }

        result |= ((byte & 0x7F) as u32) << shift;

        if byte & 0x80 == 0 {
            return Some((result, i + 1));
        }

        shift += 7;
    }

    None // Incomplete
}

/// Gap-encode a strictly ascending list of u32s.
///
/// The first value is stored as is, every later one as `v[i] - v[i-1] - 1`,
/// so runs of consecutive ids cost one zero byte each.
pub fn delta_encode(values: &[u32], buf: &mut Vec<u8>) {
    let mut prev: Option<u32> = None;
    for &value in values {
        let gap = match prev {
            None => value,
            Some(p) => value - p - 1,
        };
        encode_varint(gap, buf);
        prev = Some(value);
    }
}

/// Decode exactly `count` gap-encoded values.
///
/// Returns `None` if the buffer is malformed: a truncated varint, an id that
/// overflows u32, or trailing bytes after the last value.
pub fn delta_decode(buf: &[u8], count: usize) -> Option<Vec<u32>> {
    let mut result = Vec::with_capacity(count);
    let mut prev: Option<u32> = None;
    let mut pos = 0;

    for _ in 0..count {
        let (gap, consumed) = decode_varint(&buf[pos..])?;
        let value = match prev {
            None => gap,
            Some(p) => p.checked_add(gap)?.checked_add(1)?,
        };
        result.push(value);
        prev = Some(value);
        pos += consumed;
    }

    if pos != buf.len() {
        return None;
    }
    Some(result)
}

/// Write a u64 in little-endian format
pub fn write_u64_le<W: Write>(writer: &mut W, value: u64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

/// Read a little-endian u32 at `offset`, if the slice is long enough
#[inline]
pub fn read_u32_at(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

/// Read a little-endian u64 at `offset`, if the slice is long enough
#[inline]
pub fn read_u64_at(buf: &[u8], offset: usize) -> Option<u64> {
    let bytes = buf.get(offset..offset.checked_add(8)?)?;
    Some(u64::from_le_bytes(bytes.try_into().ok()?))
}
