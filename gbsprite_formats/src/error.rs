use thiserror::Error;

/// Failures raised while decoding a compressed sprite.
///
/// Every variant is fatal to the sprite being decoded; the format is
/// deterministic, so retrying the same bytes cannot succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteError {
    #[error("sprite header reports {width}x{height} tiles (each side must be 1..=7)")]
    MalformedHeader { width: u8, height: u8 },
    #[error("bitstream exhausted at bit {position} (buffer holds {capacity} bits)")]
    BitstreamExhausted { position: usize, capacity: usize },
    #[error("run packet at bit {position} has a unary prefix longer than {max} bits")]
    MalformedPacket { position: usize, max: usize },
    #[error("plane stream ended after {decoded} of {expected} symbols")]
    SymbolCountMismatch { expected: usize, decoded: usize },
}

pub type Result<T, E = SpriteError> = std::result::Result<T, E>;
