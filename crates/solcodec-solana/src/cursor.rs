//! Forward-only little-endian byte cursor.

use solcodec_core::error::DecodeError;

/// Reads Borsh (and bincode) primitives from a byte slice.
///
/// Every read is bounds-checked; running past the end yields
/// [`DecodeError::UnexpectedEof`] with the needed/remaining counts.
#[derive(Debug, Clone)]
pub struct BorshCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

macro_rules! read_le {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self) -> Result<$ty, DecodeError> {
                Ok(<$ty>::from_le_bytes(self.read_array()?))
            }
        )*
    };
}

impl<'a> BorshCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    read_le! {
        read_u8 => u8,
        read_u16 => u16,
        read_u32 => u32,
        read_u64 => u64,
        read_u128 => u128,
        read_i8 => i8,
        read_i16 => i16,
        read_i32 => i32,
        read_i64 => i64,
        read_i128 => i128,
        read_f32 => f32,
        read_f64 => f64,
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(DecodeError::InvalidTag {
                kind: "bool",
                tag: tag as u32,
            }),
        }
    }

    pub fn read_pubkey(&mut self) -> Result<[u8; 32], DecodeError> {
        self.read_array()
    }

    /// u32 length prefix followed by raw bytes.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    /// u32 length-prefixed UTF-8, with NUL bytes stripped.
    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.read_bytes()?;
        utf8_without_nul(bytes)
    }
}

fn utf8_without_nul(bytes: &[u8]) -> Result<String, DecodeError> {
    let s = String::from_utf8(bytes.to_vec())?;
    if s.contains('\0') {
        Ok(s.replace('\0', ""))
    } else {
        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0xff];
        let mut c = BorshCursor::new(&data);
        assert_eq!(c.read_u32().unwrap(), 0x0403_0201);
        assert_eq!(c.read_i8().unwrap(), -1);
        assert!(c.is_empty());
    }

    #[test]
    fn eof_reports_counts() {
        let mut c = BorshCursor::new(&[1, 2, 3]);
        match c.read_u64() {
            Err(DecodeError::UnexpectedEof { needed, remaining }) => {
                assert_eq!(needed, 8);
                assert_eq!(remaining, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
        // failed read does not advance
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn strings_drop_nul_padding() {
        let mut data = 6u32.to_le_bytes().to_vec();
        data.extend_from_slice(b"abc\0\0\0");
        let mut c = BorshCursor::new(&data);
        assert_eq!(c.read_string().unwrap(), "abc");
    }

    #[test]
    fn bool_rejects_other_bytes() {
        let mut c = BorshCursor::new(&[2]);
        assert!(matches!(
            c.read_bool(),
            Err(DecodeError::InvalidTag { kind: "bool", tag: 2 })
        ));
    }
}
