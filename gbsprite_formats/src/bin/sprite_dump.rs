use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result, ensure};
use clap::Parser;
use gbsprite_formats::{DecodedSprite, EncodingMode, SpriteHeader, decode_sprite};
use serde::Serialize;

/// Decode one compressed sprite and summarise what it contains.
#[derive(Parser)]
struct Args {
    /// File holding the compressed sprite
    path: PathBuf,

    /// Byte offset of the sprite inside the file
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Print the summary as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct SpriteSummary {
    header: SpriteHeader,
    mode: EncodingMode,
    width_px: usize,
    height_px: usize,
    compressed_bytes: usize,
    histogram: [usize; 4],
}

impl From<&DecodedSprite> for SpriteSummary {
    fn from(sprite: &DecodedSprite) -> Self {
        SpriteSummary {
            header: *sprite.header(),
            mode: sprite.mode(),
            width_px: sprite.width_px(),
            height_px: sprite.height_px(),
            compressed_bytes: sprite.bits_consumed().div_ceil(8),
            histogram: sprite.image().histogram(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let bytes = fs::read(&args.path).with_context(|| format!("reading {}", args.path.display()))?;
    ensure!(
        args.offset < bytes.len(),
        "offset {} is beyond the {} byte file",
        args.offset,
        bytes.len()
    );

    let sprite = decode_sprite(&bytes[args.offset..])
        .with_context(|| format!("decoding {}", args.path.display()))?;
    let summary = SpriteSummary::from(&sprite);

    if args.json {
        serde_json::to_writer_pretty(io::stdout().lock(), &summary)?;
        println!();
        return Ok(());
    }

    let header = &summary.header;
    println!(
        "sprite {}x{} tiles{}",
        header.width(),
        header.height(),
        if header.swapped() { " (swapped)" } else { "" }
    );
    println!("mode: {}", summary.mode.number());
    println!("image: {}x{} px", summary.width_px, summary.height_px);
    println!("compressed: {} bytes", summary.compressed_bytes);
    for (index, count) in summary.histogram.iter().enumerate() {
        println!("{index:>4}  {count:>6}");
    }

    Ok(())
}
