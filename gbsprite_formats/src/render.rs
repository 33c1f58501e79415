//! Turns the two finished bitplanes into a raster image of palette indices.
//!
//! The stages run in order: [`merge_planes`] builds native 2bpp tile data,
//! [`interlace`] packs each row pair into four-pixel bytes, [`expand`]
//! unpacks those into one index per pixel, [`pad_to_canvas`] optionally
//! centres the tile grid on the 7x7 canvas and [`transpose`] converts the
//! column-major tile stream into raster order.

use serde::{Deserialize, Serialize};

use crate::header::{MAX_TILES, SpriteHeader, TILE_SIZE};
use crate::palette::Palette;
use crate::plane::Plane;

const TILE_PIXELS: usize = TILE_SIZE * TILE_SIZE;
const CANVAS_TILES: usize = MAX_TILES as usize;

/// Output framing of a rendered sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Canvas {
    /// Keep the sprite's own `width x height` tile grid.
    #[default]
    Native,
    /// Centre the grid horizontally and align it to the bottom of a 7x7
    /// tile canvas, the way sprites are placed on screen.
    Centered,
}

/// Raster image of 2-bit palette indices, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteImage {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl SpriteImage {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    /// Count of pixels per palette index.
    pub fn histogram(&self) -> [usize; 4] {
        let mut counts = [0usize; 4];
        for &index in &self.pixels {
            counts[(index & 0b11) as usize] += 1;
        }
        counts
    }

    /// One grey byte per pixel, index 0 white through index 3 black.
    pub fn to_luma8(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .map(|&index| 0xff - (index & 0b11) * 0x55)
            .collect()
    }

    /// Three bytes per pixel through `palette`.
    pub fn to_rgb8(&self, palette: &Palette) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.pixels.len() * 3);
        for &index in &self.pixels {
            rgb.extend_from_slice(&palette.color(index));
        }
        rgb
    }
}

/// Show a single 1bpp plane as an image: set bits become index 3 (black),
/// clear bits index 0 (white).
pub fn plane_image(header: &SpriteHeader, plane: &Plane) -> SpriteImage {
    let num_rows = header.plane_rows();
    let (width, height) = (header.width_px(), header.height_px());
    let bytes = plane.as_bytes();

    let mut pixels = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let byte = bytes.get((x / TILE_SIZE) * num_rows + y).copied().unwrap_or(0);
            if byte & (0x80 >> (x % TILE_SIZE)) != 0 {
                pixels[y * width + x] = 3;
            }
        }
    }
    SpriteImage {
        width,
        height,
        pixels,
    }
}

/// Run every stage over the finished low and high planes.
pub fn render_planes(header: &SpriteHeader, low: &[u8], high: &[u8], canvas: Canvas) -> SpriteImage {
    let tile_data = merge_planes(low, high);
    let packed = interlace(&tile_data);
    let tiles = expand(&packed);

    let (tiles, width_tiles, height_tiles) = match canvas {
        Canvas::Native => (tiles, header.width(), header.height()),
        Canvas::Centered => (
            pad_to_canvas(&tiles, header.width(), header.height()),
            CANVAS_TILES,
            CANVAS_TILES,
        ),
    };

    SpriteImage {
        width: width_tiles * TILE_SIZE,
        height: height_tiles * TILE_SIZE,
        pixels: transpose(&tiles, width_tiles, height_tiles),
    }
}

/// Merge two 1bpp planes into native 2bpp tile data: every plane byte
/// becomes a `(low, high)` byte pair.
pub fn merge_planes(low: &[u8], high: &[u8]) -> Vec<u8> {
    low.iter()
        .zip(high)
        .flat_map(|(&low, &high)| [low, high])
        .collect()
}

/// Bit-interleave each `(low, high)` byte pair so every two bits hold one
/// pixel (`high << 1 | low`), four pixels per output byte.
pub fn interlace(tile_data: &[u8]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(tile_data.len());
    for pair in tile_data.chunks_exact(2) {
        let (low, high) = (pair[0], pair[1]);
        let mut word = 0u16;
        for bit in (0..8).rev() {
            word = (word << 1) | ((high >> bit) & 1) as u16;
            word = (word << 1) | ((low >> bit) & 1) as u16;
        }
        packed.extend_from_slice(&word.to_be_bytes());
    }
    packed
}

/// Unpack each byte into four 2-bit pixel values, MSB-first.
pub fn expand(packed: &[u8]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(packed.len() * 4);
    for &byte in packed {
        for slot in (0..4).rev() {
            pixels.push((byte >> (slot * 2)) & 0b11);
        }
    }
    pixels
}

/// Place a column-major stream of 64-pixel tiles onto the 7x7 canvas,
/// centred horizontally and flush with the bottom edge. Missing tiles are
/// blank (index 0).
pub fn pad_to_canvas(tiles: &[u8], width: usize, height: usize) -> Vec<u8> {
    let width = width.min(CANVAS_TILES);
    let height = height.min(CANVAS_TILES);
    let left = (CANVAS_TILES + 1 - width) / 2;
    let top = CANVAS_TILES - height;

    let mut canvas = vec![0u8; CANVAS_TILES * CANVAS_TILES * TILE_PIXELS];
    for column in 0..width {
        for row in 0..height {
            let src = (column * height + row) * TILE_PIXELS;
            let dst = ((column + left) * CANVAS_TILES + row + top) * TILE_PIXELS;
            if let Some(tile) = tiles.get(src..src + TILE_PIXELS) {
                canvas[dst..dst + TILE_PIXELS].copy_from_slice(tile);
            }
        }
    }
    canvas
}

/// Convert column-major tiles (each stored row-major) into a raster buffer
/// `width * 8` pixels wide.
pub fn transpose(tiles: &[u8], width: usize, height: usize) -> Vec<u8> {
    let width_px = width * TILE_SIZE;
    let height_px = height * TILE_SIZE;
    let mut raster = vec![0u8; width_px * height_px];

    for y in 0..height_px {
        for x in 0..width_px {
            let tile = (x / TILE_SIZE) * height + y / TILE_SIZE;
            let src = tile * TILE_PIXELS + (y % TILE_SIZE) * TILE_SIZE + x % TILE_SIZE;
            raster[y * width_px + x] = tiles.get(src).copied().unwrap_or(0);
        }
    }
    raster
}
