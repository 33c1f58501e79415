//! Per-row running-XOR coding and the XOR combination of two planes.

use crate::bitstream::BitCursor;
use crate::error::Result;
use crate::header::{SpriteHeader, TILE_SIZE};
use crate::plane::Plane;

/// Bit position of pixel `(x, y)` inside a column-major plane whose tile
/// columns are `num_rows` bytes apart.
#[inline]
fn pixel_bit(x: usize, y: usize, num_rows: usize) -> usize {
    ((x / TILE_SIZE) * num_rows + y) * 8 + x % TILE_SIZE
}

/// Undo the first-difference coding of every pixel row.
///
/// Each output bit is the input bit XORed with the previously *written*
/// bit of the same row; the running bit restarts at 0 on every row.
pub fn delta_decode(plane: &mut Plane, header: &SpriteHeader) -> Result<()> {
    let num_rows = header.plane_rows();
    let mut encoded = BitCursor::new(plane.as_bytes());
    let mut decoded = BitCursor::new(vec![0u8; plane.len()]);

    for y in 0..num_rows {
        let mut previous = false;
        for x in 0..header.width_px() {
            let position = pixel_bit(x, y, num_rows);
            encoded.seek(position);
            let bit = encoded.get()? ^ previous;
            decoded.seek(position);
            decoded.put(bit)?;
            previous = bit;
        }
    }

    *plane = Plane::from_bytes(decoded.into_inner());
    Ok(())
}

/// Forward coding matching [`delta_decode`]: each output bit is the XOR of
/// two horizontally adjacent input bits, with an implicit 0 left of column 0.
pub fn delta_encode(plane: &mut Plane, header: &SpriteHeader) -> Result<()> {
    let num_rows = header.plane_rows();
    let mut source = BitCursor::new(plane.as_bytes());
    let mut encoded = BitCursor::new(vec![0u8; plane.len()]);

    for y in 0..num_rows {
        let mut previous = false;
        for x in 0..header.width_px() {
            let position = pixel_bit(x, y, num_rows);
            source.seek(position);
            let bit = source.get()?;
            encoded.seek(position);
            encoded.put(bit ^ previous)?;
            previous = bit;
        }
    }

    *plane = Plane::from_bytes(encoded.into_inner());
    Ok(())
}

/// XOR `primary` into `secondary` over the tile-data extent
/// (`width * height * 8` bytes). Applying it twice restores `secondary`.
pub fn combine_planes(primary: &Plane, secondary: &mut Plane, header: &SpriteHeader) {
    let extent = header.plane_len();
    let source = &primary.as_bytes()[..extent.min(primary.len())];
    for (dst, src) in secondary.as_bytes_mut().iter_mut().zip(source) {
        *dst ^= src;
    }
}
