//! Alternating data/run packet stream that carries one bitplane.
//!
//! A plane stream starts with a single packet-kind bit (`1` = data, `0` =
//! run); packets then strictly alternate kind until the plane has received
//! its symbol target.
//!
//! ```text
//! data-packet := symbol* '00'            (each symbol 2 bits, 00 ends the packet)
//! run-packet  := '1'^L '0' value(L bits) (expands to L + value + 1 zero symbols)
//! ```

use log::trace;
use serde::Serialize;

use crate::bitstream::BitCursor;
use crate::error::{Result, SpriteError};

/// Longest unary run prefix accepted unless configured otherwise.
pub const DEFAULT_MAX_RUN_PREFIX: usize = 16;

/// A decoded 2-bit unit of plane data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Symbol(u8);

impl Symbol {
    pub const ZERO: Symbol = Symbol(0);

    /// Wrap a 2-bit value; anything above 3 is rejected.
    pub fn new(value: u8) -> Option<Self> {
        (value <= 3).then_some(Symbol(value))
    }

    #[inline]
    pub fn value(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PacketKind {
    Data,
    Run,
}

impl PacketKind {
    pub fn from_bit(bit: bool) -> Self {
        if bit { PacketKind::Data } else { PacketKind::Run }
    }

    pub fn toggled(self) -> Self {
        match self {
            PacketKind::Data => PacketKind::Run,
            PacketKind::Run => PacketKind::Data,
        }
    }
}

/// Reads packets from a [`BitCursor`] positioned inside a sprite stream.
#[derive(Debug)]
pub struct PacketDecoder<'c, B> {
    cursor: &'c mut BitCursor<B>,
    max_run_prefix: usize,
}

impl<'c, B: AsRef<[u8]>> PacketDecoder<'c, B> {
    pub fn new(cursor: &'c mut BitCursor<B>) -> Self {
        Self::with_max_run_prefix(cursor, DEFAULT_MAX_RUN_PREFIX)
    }

    pub fn with_max_run_prefix(cursor: &'c mut BitCursor<B>, max_run_prefix: usize) -> Self {
        Self {
            cursor,
            max_run_prefix,
        }
    }

    /// Read symbols up to and including the `00` terminator, appending the
    /// non-zero ones to `out`. Returns how many symbols were appended.
    pub fn read_data_packet(&mut self, out: &mut Vec<Symbol>) -> Result<usize> {
        let before = out.len();
        loop {
            let symbol = Symbol(self.cursor.get_pair()?);
            if symbol == Symbol::ZERO {
                break;
            }
            out.push(symbol);
        }
        Ok(out.len() - before)
    }

    /// Read one run packet and return the number of zero symbols it encodes.
    pub fn read_run_packet(&mut self) -> Result<usize> {
        let start = self.cursor.tell();
        let mut prefix_len = 0usize;
        while self.cursor.get()? {
            prefix_len += 1;
            if prefix_len > self.max_run_prefix {
                return Err(SpriteError::MalformedPacket {
                    position: start,
                    max: self.max_run_prefix,
                });
            }
        }

        let mut value = 0usize;
        for _ in 0..prefix_len {
            value = (value << 1) | self.cursor.get()? as usize;
        }

        Ok(prefix_len + value + 1)
    }

    /// Decode one plane's packet stream, returning exactly `target` symbols.
    ///
    /// When the final packet carries more symbols than the plane still needs,
    /// the surplus is dropped and the cursor is moved back two bits per
    /// dropped symbol so the next field is read from the right place.
    pub fn decode_plane(&mut self, target: usize) -> Result<Vec<Symbol>> {
        let mut symbols = Vec::with_capacity(target);
        let shortfall = |decoded: usize| SpriteError::SymbolCountMismatch {
            expected: target,
            decoded,
        };

        let mut kind = PacketKind::from_bit(self.cursor.get().map_err(|_| shortfall(0))?);
        let mut packet = Vec::new();

        while symbols.len() < target {
            let room = target - symbols.len();
            let produced = match kind {
                PacketKind::Data => {
                    packet.clear();
                    self.read_data_packet(&mut packet)
                        .map_err(|err| exhausted_as(err, shortfall(symbols.len())))?;
                    symbols.extend(packet.iter().take(room));
                    packet.len()
                }
                PacketKind::Run => {
                    let count = self
                        .read_run_packet()
                        .map_err(|err| exhausted_as(err, shortfall(symbols.len())))?;
                    symbols.extend(std::iter::repeat(Symbol::ZERO).take(count.min(room)));
                    count
                }
            };

            if produced > room {
                let excess = produced - room;
                trace!(
                    "{kind:?} packet overshot plane target by {excess} symbols; rewinding {} bits",
                    excess * 2
                );
                self.cursor.rewind(excess * 2);
            }

            kind = kind.toggled();
        }

        Ok(symbols)
    }
}

fn exhausted_as(err: SpriteError, replacement: SpriteError) -> SpriteError {
    match err {
        SpriteError::BitstreamExhausted { .. } => replacement,
        other => other,
    }
}
