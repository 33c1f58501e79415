pub mod bitstream;
pub mod delta;
pub mod error;
pub mod export;
pub mod header;
pub mod packet;
pub mod palette;
pub mod plane;
pub mod render;
pub mod rom;
pub mod sprite;

pub use bitstream::BitCursor;
pub use error::SpriteError;
pub use export::{ImageFormat, encode_image, write_image};
pub use header::{EncodingMode, SpriteHeader};
pub use palette::Palette;
pub use plane::{Plane, PlaneSlot};
pub use render::{Canvas, SpriteImage, plane_image};
pub use rom::{RomImage, absolute_address};
pub use sprite::{
    DecodeOptions, DecodedSprite, PlaneStage, StageSnapshot, decode_sprite, decode_sprite_with,
    peek_sprite_header,
};
