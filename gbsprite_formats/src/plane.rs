//! Bitplane storage and the column-cycling symbol placement.
//!
//! A plane is `width * height * 8` bytes. Each byte holds one pixel row of
//! one tile column (8 pixels at 1bpp), and bytes are ordered column-major:
//! all rows of tile column 0, then tile column 1, and so on. Packet symbols
//! arrive two pixels at a time, filling a 2-pixel-wide column from top to
//! bottom before moving right.

use std::ops::{Index, IndexMut};

use serde::Serialize;

use crate::error::{Result, SpriteError};
use crate::header::SpriteHeader;
use crate::packet::Symbol;

/// One of the two plane slots of a decode. `Low` supplies bit 0 of every
/// palette index, `High` supplies bit 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PlaneSlot {
    Low,
    High,
}

impl PlaneSlot {
    pub fn other(self) -> Self {
        match self {
            PlaneSlot::Low => PlaneSlot::High,
            PlaneSlot::High => PlaneSlot::Low,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PlaneSlot::Low => "low",
            PlaneSlot::High => "high",
        }
    }

    fn index(self) -> usize {
        match self {
            PlaneSlot::Low => 0,
            PlaneSlot::High => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    bytes: Vec<u8>,
}

impl Plane {
    /// A zeroed plane sized for `header`.
    pub fn zeroed(header: &SpriteHeader) -> Self {
        Self {
            bytes: vec![0; header.plane_len()],
        }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Both plane slots of a single decode. Always created zeroed; nothing is
/// shared between decodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneArena {
    slots: [Plane; 2],
}

impl PlaneArena {
    pub fn new(header: &SpriteHeader) -> Self {
        Self {
            slots: [Plane::zeroed(header), Plane::zeroed(header)],
        }
    }

    /// Borrow one slot for reading and the other for writing.
    pub fn split(&mut self, read: PlaneSlot) -> (&Plane, &mut Plane) {
        let [low, high] = &mut self.slots;
        match read {
            PlaneSlot::Low => (&*low, high),
            PlaneSlot::High => (&*high, low),
        }
    }

    pub fn into_planes(self) -> [Plane; 2] {
        self.slots
    }
}

impl Index<PlaneSlot> for PlaneArena {
    type Output = Plane;

    fn index(&self, slot: PlaneSlot) -> &Plane {
        &self.slots[slot.index()]
    }
}

impl IndexMut<PlaneSlot> for PlaneArena {
    fn index_mut(&mut self, slot: PlaneSlot) -> &mut Plane {
        &mut self.slots[slot.index()]
    }
}

/// Places symbols into a plane in 2-pixel-column, row-cycling order.
#[derive(Debug, Clone)]
pub struct PlaneAssembler {
    num_rows: usize,
    column: usize,
    row: usize,
    placed: usize,
}

impl PlaneAssembler {
    pub fn new(header: &SpriteHeader) -> Self {
        Self {
            num_rows: header.plane_rows(),
            column: 0,
            row: 0,
            placed: 0,
        }
    }

    /// Byte offset the next symbol lands in.
    #[inline]
    pub fn byte_index(&self) -> usize {
        (self.column / 4) * self.num_rows + self.row
    }

    /// Left shift applied to the next symbol inside its byte.
    #[inline]
    pub fn shift(&self) -> u32 {
        ((3 - self.column % 4) * 2) as u32
    }

    pub fn place(&mut self, plane: &mut Plane, symbol: Symbol) -> Result<()> {
        let index = self.byte_index();
        let capacity = plane.len();
        let byte = plane
            .as_bytes_mut()
            .get_mut(index)
            .ok_or(SpriteError::SymbolCountMismatch {
                expected: capacity * 4,
                decoded: self.placed + 1,
            })?;
        *byte |= symbol.value() << self.shift();

        self.placed += 1;
        self.row += 1;
        if self.row >= self.num_rows {
            self.row = 0;
            self.column += 1;
        }
        Ok(())
    }

    pub fn place_all(&mut self, plane: &mut Plane, symbols: &[Symbol]) -> Result<()> {
        for &symbol in symbols {
            self.place(plane, symbol)?;
        }
        Ok(())
    }
}
