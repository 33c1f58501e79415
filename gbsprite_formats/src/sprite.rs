use log::{debug, log_enabled, trace};
use serde::Serialize;

use crate::bitstream::BitCursor;
use crate::delta::{combine_planes, delta_decode};
use crate::error::Result;
use crate::header::{EncodingMode, SpriteHeader};
use crate::packet::{DEFAULT_MAX_RUN_PREFIX, PacketDecoder};
use crate::plane::{Plane, PlaneArena, PlaneAssembler, PlaneSlot};
use crate::render::{Canvas, SpriteImage, render_planes};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Longest unary prefix a run packet may carry.
    pub max_run_prefix: usize,
    pub canvas: Canvas,
    /// Keep a copy of each plane after packing and after delta decoding.
    pub keep_stages: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_run_prefix: DEFAULT_MAX_RUN_PREFIX,
            canvas: Canvas::Native,
            keep_stages: false,
        }
    }
}

/// Point in the pipeline a [`StageSnapshot`] was taken at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PlaneStage {
    /// Symbols placed, before delta decoding.
    Packed,
    /// After delta decoding, before the planes are combined.
    Delta,
}

impl PlaneStage {
    pub fn name(self) -> &'static str {
        match self {
            PlaneStage::Packed => "packed",
            PlaneStage::Delta => "delta",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSnapshot {
    pub stage: PlaneStage,
    pub slot: PlaneSlot,
    pub plane: Plane,
}

/// Result of a successful decode. Nothing here is shared with the decoder;
/// a failed decode never produces one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSprite {
    header: SpriteHeader,
    mode: EncodingMode,
    low: Plane,
    high: Plane,
    image: SpriteImage,
    bits_consumed: usize,
    stages: Vec<StageSnapshot>,
}

impl DecodedSprite {
    pub fn header(&self) -> &SpriteHeader {
        &self.header
    }

    pub fn mode(&self) -> EncodingMode {
        self.mode
    }

    /// Finished plane for `slot` (bit 0 for `Low`, bit 1 for `High`).
    pub fn plane(&self, slot: PlaneSlot) -> &Plane {
        match slot {
            PlaneSlot::Low => &self.low,
            PlaneSlot::High => &self.high,
        }
    }

    pub fn image(&self) -> &SpriteImage {
        &self.image
    }

    pub fn width_px(&self) -> usize {
        self.image.width()
    }

    pub fn height_px(&self) -> usize {
        self.image.height()
    }

    pub fn pixels(&self) -> &[u8] {
        self.image.pixels()
    }

    /// Bits of the input the compressed sprite occupied.
    pub fn bits_consumed(&self) -> usize {
        self.bits_consumed
    }

    /// Intermediate planes, in pipeline order. Empty unless
    /// [`DecodeOptions::keep_stages`] was set.
    pub fn stages(&self) -> &[StageSnapshot] {
        &self.stages
    }

    pub fn into_image(self) -> SpriteImage {
        self.image
    }
}

/// Read only the header of a compressed sprite.
pub fn peek_sprite_header(bytes: &[u8]) -> Result<SpriteHeader> {
    SpriteHeader::read(&mut BitCursor::new(bytes))
}

pub fn decode_sprite(bytes: &[u8]) -> Result<DecodedSprite> {
    decode_sprite_with(bytes, &DecodeOptions::default())
}

/// Decode a compressed sprite starting at the first byte of `bytes`.
///
/// Plane storage is allocated zeroed for every call, so consecutive decodes
/// never observe each other's data.
pub fn decode_sprite_with(bytes: &[u8], options: &DecodeOptions) -> Result<DecodedSprite> {
    let mut cursor = BitCursor::new(bytes);

    let header = SpriteHeader::read(&mut cursor)?;
    debug!(
        "sprite header: {}x{} tiles, swapped={}",
        header.width(),
        header.height(),
        header.swapped()
    );

    let mut arena = PlaneArena::new(&header);
    let primary = header.primary_slot();
    let secondary = header.secondary_slot();
    let target = header.symbol_target();

    let symbols = PacketDecoder::with_max_run_prefix(&mut cursor, options.max_run_prefix)
        .decode_plane(target)?;
    PlaneAssembler::new(&header).place_all(&mut arena[primary], &symbols)?;
    debug!("primary plane -> {primary:?}: {} symbols, cursor at bit {}", symbols.len(), cursor.tell());

    let mode = EncodingMode::read(&mut cursor)?;
    debug!("encoding mode {}", mode.number());

    let symbols = PacketDecoder::with_max_run_prefix(&mut cursor, options.max_run_prefix)
        .decode_plane(target)?;
    PlaneAssembler::new(&header).place_all(&mut arena[secondary], &symbols)?;
    debug!("secondary plane -> {secondary:?}: {} symbols, cursor at bit {}", symbols.len(), cursor.tell());

    let mut stages = Vec::new();
    let mut snapshot = |stage: PlaneStage, slot: PlaneSlot, plane: &Plane| {
        if log_enabled!(log::Level::Trace) {
            trace!("{} {} plane: {:02x?}", slot.name(), stage.name(), plane.as_bytes());
        }
        if options.keep_stages {
            stages.push(StageSnapshot {
                stage,
                slot,
                plane: plane.clone(),
            });
        }
    };

    snapshot(PlaneStage::Packed, primary, &arena[primary]);
    snapshot(PlaneStage::Packed, secondary, &arena[secondary]);

    delta_decode(&mut arena[primary], &header)?;
    snapshot(PlaneStage::Delta, primary, &arena[primary]);
    if mode.delta_decodes_secondary() {
        delta_decode(&mut arena[secondary], &header)?;
        snapshot(PlaneStage::Delta, secondary, &arena[secondary]);
    }
    if mode.combines_planes() {
        let (primary_plane, secondary_plane) = arena.split(primary);
        combine_planes(primary_plane, secondary_plane, &header);
    }

    let [low, high] = arena.into_planes();
    let image = render_planes(&header, low.as_bytes(), high.as_bytes(), options.canvas);

    Ok(DecodedSprite {
        header,
        mode,
        low,
        high,
        image,
        bits_consumed: cursor.tell(),
        stages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SpriteError;

    fn stream(pattern: &str) -> Vec<u8> {
        let bits: Vec<bool> = pattern
            .chars()
            .filter(|c| *c == '0' || *c == '1')
            .map(|c| c == '1')
            .collect();
        let mut cursor = BitCursor::new(vec![0u8; bits.len().div_ceil(8)]);
        for bit in bits {
            cursor.put(bit).unwrap();
        }
        cursor.into_inner()
    }

    // 1x1 header, then a 32-symbol plane: 1,2,3,0 x3 + 1,2,3,2 written as
    // alternating data packets and single-zero run packets, closed by a run
    // of 16 zeros (L = 4, value = 11) for the right half of the tile.
    const HEADER_1X1: &str = "0001 0001";
    const PLANE_A: &str =
        "1 01 10 11 00 0 01 10 11 00 0 01 10 11 00 0 01 10 11 10 00 11110 1011";
    // run packet: L = 5, value = 26 -> 32 zero symbols
    const PLANE_ZERO: &str = "0 111110 11010";

    #[test]
    fn decodes_single_tile_sprite() {
        let bytes = stream(&format!("{HEADER_1X1} 0 {PLANE_A} 0 {PLANE_ZERO}"));
        let sprite = decode_sprite(&bytes).unwrap();

        assert_eq!(sprite.mode(), EncodingMode::Mode1);
        assert_eq!(sprite.width_px(), 8);
        assert_eq!(sprite.height_px(), 8);
        assert_eq!(sprite.bits_consumed(), 9 + 48 + 1 + 12);
        assert!(sprite.stages().is_empty());
        assert_eq!(
            sprite.plane(PlaneSlot::Low).as_bytes(),
            &[0x60, 0xc0, 0xa0, 0x00, 0x60, 0xc0, 0xa0, 0x3f]
        );
        assert!(sprite.plane(PlaneSlot::High).as_bytes().iter().all(|&b| b == 0));
        assert_eq!(&sprite.pixels()[..8], &[0, 1, 1, 0, 0, 0, 0, 0]);
        assert_eq!(&sprite.pixels()[56..], &[0, 0, 1, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn swap_flag_routes_primary_into_high_slot() {
        let bytes = stream(&format!("{HEADER_1X1} 1 {PLANE_A} 0 {PLANE_ZERO}"));
        let sprite = decode_sprite(&bytes).unwrap();
        assert!(sprite.header().swapped());
        assert_eq!(sprite.plane(PlaneSlot::High).as_bytes()[7], 0x3f);
        assert_eq!(&sprite.pixels()[56..], &[0, 0, 2, 2, 2, 2, 2, 2]);
    }

    #[test]
    fn header_failure_stops_before_packets() {
        let bytes = stream("0000 0011 0 1 01 00");
        assert_eq!(
            decode_sprite(&bytes).unwrap_err(),
            SpriteError::MalformedHeader {
                width: 0,
                height: 3
            }
        );
        assert_eq!(peek_sprite_header(&stream("0010 0011 1")).unwrap().height(), 3);
    }

    #[test]
    fn truncated_stream_yields_no_sprite() {
        let full = stream(&format!("{HEADER_1X1} 0 {PLANE_A} 0 {PLANE_ZERO}"));
        let err = decode_sprite(&full[..3]).unwrap_err();
        assert!(matches!(err, SpriteError::SymbolCountMismatch { expected: 32, .. }));
    }

    #[test]
    fn full_tile_plane_fills_every_byte() {
        // one data packet of 32 `3` symbols, then mode 1 and a blank plane
        let plane = format!("1 {} 00", "11 ".repeat(32));
        let bytes = stream(&format!("{HEADER_1X1} 0 {plane} 0 {PLANE_ZERO}"));
        let sprite = decode_sprite(&bytes).unwrap();

        assert_eq!(sprite.mode(), EncodingMode::Mode1);
        assert_eq!(sprite.plane(PlaneSlot::Low).as_bytes(), &[0xaa; 8]);
        assert_eq!(sprite.plane(PlaneSlot::High).as_bytes(), &[0x00; 8]);
        assert_eq!(sprite.bits_consumed(), 9 + 67 + 1 + 12);
        assert_eq!(&sprite.pixels()[..8], &[1, 0, 1, 0, 1, 0, 1, 0]);
    }

    #[test]
    fn kept_stages_follow_the_pipeline() {
        let plane = format!("1 {} 00", "11 ".repeat(32));
        let bytes = stream(&format!("{HEADER_1X1} 1 {plane} 10 {plane}"));
        let options = DecodeOptions {
            keep_stages: true,
            ..DecodeOptions::default()
        };
        let sprite = decode_sprite_with(&bytes, &options).unwrap();
        assert_eq!(sprite.mode(), EncodingMode::Mode2);

        let order: Vec<_> = sprite.stages().iter().map(|s| (s.stage, s.slot)).collect();
        assert_eq!(
            order,
            vec![
                (PlaneStage::Packed, PlaneSlot::High),
                (PlaneStage::Packed, PlaneSlot::Low),
                (PlaneStage::Delta, PlaneSlot::High),
            ]
        );
        assert_eq!(sprite.stages()[0].plane.as_bytes(), &[0xff; 8]);
        assert_eq!(sprite.stages()[2].plane.as_bytes(), &[0xaa; 8]);
        // secondary is stored raw in mode 2 and then XORed with the primary
        assert_eq!(sprite.plane(PlaneSlot::Low).as_bytes(), &[0x55; 8]);
    }

    #[test]
    fn centred_canvas_is_seven_tiles_square() {
        let bytes = stream(&format!("{HEADER_1X1} 0 {PLANE_A} 0 {PLANE_ZERO}"));
        let options = DecodeOptions {
            canvas: Canvas::Centered,
            ..DecodeOptions::default()
        };
        let sprite = decode_sprite_with(&bytes, &options).unwrap();
        assert_eq!((sprite.width_px(), sprite.height_px()), (56, 56));
        // the single tile sits in column 3 of the bottom tile row
        let image = sprite.image();
        assert_eq!(image.pixel(24 + 1, 48), Some(1));
        assert_eq!(image.pixel(1, 48), Some(0));
    }
}
