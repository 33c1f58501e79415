use serde::Serialize;

use crate::bitstream::BitCursor;
use crate::error::{Result, SpriteError};
use crate::plane::PlaneSlot;

/// Largest tile count along either side of a sprite.
pub const MAX_TILES: u8 = 7;

/// Pixels along one side of a tile.
pub const TILE_SIZE: usize = 8;

/// Leading fields of a compressed sprite: tile dimensions and the flag that
/// routes the first decoded plane into the high-bit slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpriteHeader {
    width: u8,
    height: u8,
    swapped: bool,
}

impl SpriteHeader {
    pub fn new(width: u8, height: u8, swapped: bool) -> Result<Self> {
        if !(1..=MAX_TILES).contains(&width) || !(1..=MAX_TILES).contains(&height) {
            return Err(SpriteError::MalformedHeader { width, height });
        }
        Ok(Self {
            width,
            height,
            swapped,
        })
    }

    /// Read `[4-bit width][4-bit height][1-bit swap]`.
    pub fn read<B: AsRef<[u8]>>(cursor: &mut BitCursor<B>) -> Result<Self> {
        let width = cursor.get_nibble()?;
        let height = cursor.get_nibble()?;
        let swapped = cursor.get()?;
        Self::new(width, height, swapped)
    }

    /// Width in tiles.
    #[inline]
    pub fn width(&self) -> usize {
        self.width as usize
    }

    /// Height in tiles.
    #[inline]
    pub fn height(&self) -> usize {
        self.height as usize
    }

    #[inline]
    pub fn swapped(&self) -> bool {
        self.swapped
    }

    pub fn tile_count(&self) -> usize {
        self.width() * self.height()
    }

    pub fn width_px(&self) -> usize {
        self.width() * TILE_SIZE
    }

    pub fn height_px(&self) -> usize {
        self.height() * TILE_SIZE
    }

    /// Pixel rows in a plane; also the byte stride between tile columns.
    pub fn plane_rows(&self) -> usize {
        self.height() * TILE_SIZE
    }

    /// Bytes in one assembled 1bpp plane.
    pub fn plane_len(&self) -> usize {
        self.tile_count() * 8
    }

    /// Symbols each plane's packet stream must deliver: four per plane
    /// byte, so every byte of the plane is filled.
    pub fn symbol_target(&self) -> usize {
        self.plane_len() * 4
    }

    /// Slot that receives the first decoded plane.
    pub fn primary_slot(&self) -> PlaneSlot {
        if self.swapped {
            PlaneSlot::High
        } else {
            PlaneSlot::Low
        }
    }

    pub fn secondary_slot(&self) -> PlaneSlot {
        self.primary_slot().other()
    }
}

/// How the secondary plane was encoded relative to the primary one.
///
/// The announcement is read as raw value 0 (a lone `0` bit), 2 (`10`) or
/// 3 (`11`). Raw 0 is Mode 1; no bit sequence yields raw 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EncodingMode {
    /// Announced by a single `0` bit. Both planes are delta coded and
    /// independent of each other.
    Mode1,
    /// Announced by `10`. The secondary plane is stored XORed with the
    /// decoded primary plane and is not delta coded.
    Mode2,
    /// Announced by `11`. Both planes are delta coded and the secondary is
    /// additionally XORed with the primary.
    Mode3,
}

impl EncodingMode {
    pub fn read<B: AsRef<[u8]>>(cursor: &mut BitCursor<B>) -> Result<Self> {
        if !cursor.get()? {
            return Ok(EncodingMode::Mode1);
        }
        Ok(if cursor.get()? {
            EncodingMode::Mode3
        } else {
            EncodingMode::Mode2
        })
    }

    /// Map a raw announcement value back to its mode.
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(EncodingMode::Mode1),
            2 => Some(EncodingMode::Mode2),
            3 => Some(EncodingMode::Mode3),
            _ => None,
        }
    }

    /// Raw announcement value this mode is read from.
    pub fn raw(self) -> u8 {
        match self {
            EncodingMode::Mode1 => 0,
            EncodingMode::Mode2 => 2,
            EncodingMode::Mode3 => 3,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            EncodingMode::Mode1 => 1,
            EncodingMode::Mode2 => 2,
            EncodingMode::Mode3 => 3,
        }
    }

    pub fn delta_decodes_secondary(self) -> bool {
        self != EncodingMode::Mode2
    }

    pub fn combines_planes(self) -> bool {
        self != EncodingMode::Mode1
    }
}
