//! Unsigned LEB128 encoding of asset quantities.
//!
//! Seven bits per byte, least significant group first, the high bit of every
//! byte but the last one set.

use crate::error::Error;
use crate::Result;

const CONTINUATION: u8 = 0x80;
const PAYLOAD: u8 = 0x7f;

/// Maximum encoded length of a `u32`.
pub const MAX_LEN: usize = 5;

/// Number of bytes `value` takes once encoded.
pub fn encoded_len(mut value: u32) -> usize {
    let mut len = 1;
    while value > PAYLOAD as u32 {
        value >>= 7;
        len += 1;
    }
    len
}

pub fn encode(value: u32) -> Vec<u8> {
    let mut buf = vec![0u8; encoded_len(value)];
    // the buffer is sized from `encoded_len`, writing into it can't go out of bounds
    let _ = encode_into(value, &mut buf, 0);
    buf
}

/// Writes `value` into `dest` starting at `offset`, returns the offset following the last
/// written byte.
pub fn encode_into(mut value: u32, dest: &mut [u8], offset: usize) -> Result<usize> {
    let needed = offset + encoded_len(value);
    if needed > dest.len() {
        return Err(Error::Bounds {
            len: dest.len(),
            needed,
        });
    }

    let mut pos = offset;
    loop {
        let byte = (value as u8) & PAYLOAD;
        value >>= 7;
        if value == 0 {
            dest[pos] = byte;
            return Ok(pos + 1);
        }
        dest[pos] = byte | CONTINUATION;
        pos += 1;
    }
}

/// Decodes a buffer holding exactly one LEB128 value.
pub fn decode(bytes: &[u8]) -> Result<u32> {
    match bytes.last() {
        None => Err(Error::varint(0, bytes)),
        Some(last) if last & CONTINUATION != 0 => Err(Error::varint(bytes.len() - 1, bytes)),
        Some(_) => {
            let (value, next) = decode_at(bytes, 0)?;
            if next != bytes.len() {
                return Err(Error::varint(next, bytes));
            }
            Ok(value)
        }
    }
}

/// Decodes the value starting at `offset`, stopping at the first byte without the
/// continuation bit. Returns the value and the offset of the following byte.
///
/// Non-minimal encodings such as `80 00` are rejected.
pub fn decode_at(bytes: &[u8], offset: usize) -> Result<(u32, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut pos = offset;

    loop {
        let byte = *bytes.get(pos).ok_or_else(|| Error::varint(pos, bytes))?;
        if shift as usize >= 7 * MAX_LEN {
            return Err(Error::varint(pos, bytes));
        }
        value |= ((byte & PAYLOAD) as u64) << shift;
        if byte & CONTINUATION == 0 {
            // only the minimal encoding is accepted: no empty trailing group
            if byte == 0 && pos > offset {
                return Err(Error::varint(pos, bytes));
            }
            pos += 1;
            break;
        }
        pos += 1;
        shift += 7;
    }

    let value = u32::try_from(value).map_err(|_| Error::varint(offset, bytes))?;
    Ok((value, pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_encodings() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(127), vec![0x7f]);
        assert_eq!(encode(128), vec![0x80, 0x01]);
        assert_eq!(encode(300), vec![0xac, 0x02]);
        assert_eq!(encode(624485), vec![0xe5, 0x8e, 0x26]);
        assert_eq!(encode(1_000_000), vec![0xc0, 0x84, 0x3d]);
        assert_eq!(encode(u32::MAX), vec![0xff, 0xff, 0xff, 0xff, 0x0f]);
    }

    #[test]
    fn roundtrip_boundaries() {
        for v in [0, 1, 127, 128, 16383, 16384, 2097151, 2097152, 268435455, 268435456, u32::MAX]
        {
            let encoded = encode(v);
            assert_eq!(encoded.len(), encoded_len(v));
            assert_eq!(decode(&encoded).unwrap(), v, "value {}", v);
        }
        for v in (0..u32::MAX).step_by(7_919_999) {
            assert_eq!(decode(&encode(v)).unwrap(), v);
        }
    }

    #[test]
    fn continuation_on_last_byte() {
        let err = decode(&[0xff, 0xff, 0xff, 0xff, 0x8f]).unwrap_err();
        assert!(err.is_format_error());
        assert!(matches!(err, Error::VarInt { offset: 4, .. }));

        assert!(decode(&[0x80]).is_err());
        assert!(decode(&[]).is_err());
        assert!(decode_at(&[0x80, 0x80], 0).is_err());
    }

    #[test]
    fn rejects_overflow_and_trailing() {
        assert!(decode(&[0xff, 0xff, 0xff, 0xff, 0x1f]).is_err());
        assert!(decode(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]).is_err());
        assert!(decode(&[0x01, 0x02]).is_err());
    }

    #[test]
    fn rejects_non_minimal() {
        assert!(matches!(decode(&[0x80, 0x00]), Err(Error::VarInt { offset: 1, .. })));
        assert!(decode(&[0xac, 0x82, 0x00]).is_err());
        assert!(decode_at(&[0x05, 0xff, 0x80, 0x00], 2).is_err());
        assert_eq!(decode(&[0x00]).unwrap(), 0);
        assert_eq!(decode_at(&[0x05, 0x00], 1).unwrap(), (0, 2));
    }

    #[test]
    fn positional() {
        let mut buf = [0u8; 6];
        let next = encode_into(300, &mut buf, 1).unwrap();
        assert_eq!(next, 3);
        let next = encode_into(5, &mut buf, next).unwrap();
        assert_eq!(&buf[..4], &[0x00, 0xac, 0x02, 0x05]);

        assert_eq!(decode_at(&buf, 1).unwrap(), (300, 3));
        assert_eq!(decode_at(&buf, next - 1).unwrap(), (5, 4));

        let mut small = [0u8; 2];
        assert_eq!(
            encode_into(u32::MAX, &mut small, 0),
            Err(Error::Bounds {
                len: 2,
                needed: 5
            })
        );
        assert!(encode_into(1, &mut small, 2).is_err());
    }
}
