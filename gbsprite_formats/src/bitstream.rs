//! Bit-addressable cursor over a fixed byte buffer.
//!
//! Bits are numbered MSB-first: bit position `p` lives in byte `p / 8` at
//! bit `7 - p % 8`. Reads and writes past the end of the buffer fail with
//! [`SpriteError::BitstreamExhausted`] instead of wrapping or touching
//! neighbouring memory.

use crate::error::{Result, SpriteError};

#[derive(Debug, Clone)]
pub struct BitCursor<B> {
    buffer: B,
    position: usize,
}

impl<B: AsRef<[u8]>> BitCursor<B> {
    pub fn new(buffer: B) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Buffer size in bits.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.as_ref().len() * 8
    }

    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    #[inline]
    pub fn tell(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity().saturating_sub(self.position)
    }

    /// Move the cursor back by `bits`, stopping at the start of the buffer.
    pub fn rewind(&mut self, bits: usize) {
        self.position = self.position.saturating_sub(bits);
    }

    pub fn get_ref(&self) -> &B {
        &self.buffer
    }

    pub fn into_inner(self) -> B {
        self.buffer
    }

    /// Read the bit under the cursor without advancing.
    pub fn peek(&self) -> Result<bool> {
        let (byte_index, shift) = self.locate()?;
        Ok((self.buffer.as_ref()[byte_index] >> shift) & 1 == 1)
    }

    pub fn get(&mut self) -> Result<bool> {
        let bit = self.peek()?;
        self.position += 1;
        Ok(bit)
    }

    /// Compose `count` successive bits MSB-first. `count` must not exceed 32.
    pub fn get_bits(&mut self, count: u32) -> Result<u32> {
        debug_assert!(count <= 32, "get_bits supports at most 32 bits");
        let mut value = 0u32;
        for _ in 0..count {
            value = (value << 1) | self.get()? as u32;
        }
        Ok(value)
    }

    pub fn get_pair(&mut self) -> Result<u8> {
        Ok(self.get_bits(2)? as u8)
    }

    pub fn get_nibble(&mut self) -> Result<u8> {
        Ok(self.get_bits(4)? as u8)
    }

    pub fn get_byte(&mut self) -> Result<u8> {
        Ok(self.get_bits(8)? as u8)
    }

    fn locate(&self) -> Result<(usize, u32)> {
        if self.position >= self.capacity() {
            return Err(SpriteError::BitstreamExhausted {
                position: self.position,
                capacity: self.capacity(),
            });
        }
        Ok((self.position / 8, 7 - (self.position % 8) as u32))
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> BitCursor<B> {
    /// Overwrite the bit under the cursor and advance.
    pub fn put(&mut self, bit: bool) -> Result<()> {
        let (byte_index, shift) = self.locate()?;
        let mask = 1u8 << shift;
        let byte = &mut self.buffer.as_mut()[byte_index];
        if bit {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
        self.position += 1;
        Ok(())
    }

    /// Write the low `count` bits of `value` MSB-first.
    pub fn put_bits(&mut self, value: u32, count: u32) -> Result<()> {
        debug_assert!(count <= 32, "put_bits supports at most 32 bits");
        for shift in (0..count).rev() {
            self.put((value >> shift) & 1 == 1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seek_peek_and_get_follow_msb_first_order() {
        let data = [0x55u8, 0xaa, 0xff];
        let mut cursor = BitCursor::new(&data[..]);
        assert_eq!(cursor.capacity(), 24);

        cursor.seek(3);
        assert_eq!(cursor.tell(), 3);
        assert!(cursor.peek().unwrap());
        assert!(cursor.peek().unwrap(), "peek must not advance");
        assert!(cursor.get().unwrap());
        assert!(!cursor.get().unwrap());
        assert_eq!(cursor.tell(), 5);

        cursor.seek(4);
        assert_eq!(cursor.get_byte().unwrap(), 0x5a);
    }

    #[test]
    fn get_after_put_returns_the_written_bit() {
        let mut cursor = BitCursor::new(vec![0u8; 2]);
        for position in 0..16 {
            for bit in [true, false, true] {
                cursor.seek(position);
                cursor.put(bit).unwrap();
                cursor.seek(position);
                assert_eq!(cursor.get().unwrap(), bit, "bit {position}");
            }
        }
    }

    #[test]
    fn get_bits_matches_sequential_gets() {
        let data = [0b1011_0010u8, 0b0111_1100, 0b1000_0001];
        for count in [2u32, 4, 8] {
            for start in 0..(24 - count as usize) {
                let mut wide = BitCursor::new(&data[..]);
                wide.seek(start);
                let value = wide.get_bits(count).unwrap();

                let mut narrow = BitCursor::new(&data[..]);
                narrow.seek(start);
                let mut expected = 0u32;
                for _ in 0..count {
                    expected = (expected << 1) | narrow.get().unwrap() as u32;
                }

                assert_eq!(value, expected, "count {count} from bit {start}");
                assert_eq!(wide.tell(), narrow.tell());
            }
        }
    }

    #[test]
    fn named_widths_read_pairs_nibbles_and_bytes() {
        let data = [0b1001_1110u8, 0xc3];
        let mut cursor = BitCursor::new(&data[..]);
        assert_eq!(cursor.get_pair().unwrap(), 0b10);
        assert_eq!(cursor.get_nibble().unwrap(), 0b0111);
        assert_eq!(cursor.get_byte().unwrap(), 0b1011_0000);
    }

    #[test]
    fn reading_past_the_end_is_an_error() {
        let data = [0xffu8];
        let mut cursor = BitCursor::new(&data[..]);
        assert_eq!(cursor.get_byte().unwrap(), 0xff);
        assert_eq!(cursor.remaining(), 0);
        assert_eq!(
            cursor.get(),
            Err(SpriteError::BitstreamExhausted {
                position: 8,
                capacity: 8
            })
        );
        assert!(cursor.peek().is_err());
    }

    #[test]
    fn writing_past_the_end_is_an_error() {
        let mut cursor = BitCursor::new([0u8; 1]);
        cursor.put_bits(0b1010_0101, 8).unwrap();
        assert!(matches!(
            cursor.put(true),
            Err(SpriteError::BitstreamExhausted { position: 8, .. })
        ));
        assert_eq!(cursor.into_inner(), [0b1010_0101]);
    }

    #[test]
    fn rewind_stops_at_the_start() {
        let mut cursor = BitCursor::new([0u8; 2]);
        cursor.seek(5);
        cursor.rewind(2);
        assert_eq!(cursor.tell(), 3);
        cursor.rewind(10);
        assert_eq!(cursor.tell(), 0);
    }
}
