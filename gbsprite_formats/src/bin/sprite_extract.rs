use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use gbsprite_formats::packet::DEFAULT_MAX_RUN_PREFIX;
use gbsprite_formats::{
    Canvas, DecodeOptions, DecodedSprite, ImageFormat, Palette, PlaneSlot, RomImage,
    decode_sprite_with, plane_image, write_image,
};
use log::{info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(about = "Decode compressed Game Boy sprites into images", version)]
struct Args {
    /// Compressed sprite file to decode (may be passed multiple times)
    #[arg(long = "pic", value_name = "PATH", conflicts_with_all = ["root", "rom"])]
    pics: Vec<PathBuf>,

    /// Directory scanned recursively for .pic files
    #[arg(long = "root", value_name = "DIR", conflicts_with = "rom")]
    root: Option<PathBuf>,

    /// Cartridge dump to read a sprite from
    #[arg(long, value_name = "PATH", requires = "bank")]
    rom: Option<PathBuf>,

    /// ROM bank holding the sprite (or the pointer to it)
    #[arg(long, value_name = "BANK", value_parser = parse_number::<u8>)]
    bank: Option<u8>,

    /// Banked address of the sprite data
    #[arg(long, value_name = "ADDR", value_parser = parse_number::<u16>, conflicts_with = "pointer")]
    address: Option<u16>,

    /// Banked address of a little-endian pointer to the sprite data
    #[arg(long, value_name = "ADDR", value_parser = parse_number::<u16>)]
    pointer: Option<u16>,

    /// Destination directory for decoded images
    #[arg(long, value_name = "DIR", default_value = "sprites")]
    dest: PathBuf,

    #[arg(long, value_enum, default_value_t = ImageFormat::Png)]
    format: ImageFormat,

    /// Built-in palette name
    #[arg(long, value_name = "NAME", default_value = "greyscale", conflicts_with = "palette_file")]
    palette: String,

    /// JSON palette file ({"colors": [[r,g,b], x4]})
    #[arg(long, value_name = "FILE")]
    palette_file: Option<PathBuf>,

    /// Centre the sprite on a 7x7 tile canvas
    #[arg(long)]
    centered: bool,

    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_RUN_PREFIX)]
    max_run_prefix: usize,

    /// Also write every intermediate plane as PGM under <stem>_planes/
    #[arg(long)]
    dump_planes: bool,

    /// Overwrite existing files instead of skipping them
    #[arg(long)]
    overwrite: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let palette = resolve_palette(&args)?;
    let options = DecodeOptions {
        max_run_prefix: args.max_run_prefix,
        canvas: if args.centered {
            Canvas::Centered
        } else {
            Canvas::Native
        },
        keep_stages: args.dump_planes,
    };

    fs::create_dir_all(&args.dest)
        .with_context(|| format!("creating destination {}", args.dest.display()))?;

    let written = if let Some(rom_path) = args.rom.as_ref() {
        extract_from_rom(&args, rom_path, &options, &palette)?
    } else {
        let pics = resolve_pic_paths(&args);
        if pics.is_empty() {
            bail!("no sprites to decode; pass --pic, --root or --rom");
        }
        let mut written = 0usize;
        for pic in &pics {
            written += extract_pic(&args, pic, &options, &palette)? as usize;
        }
        written
    };

    println!("Wrote {} sprites into {}", written, args.dest.display());
    Ok(())
}

fn parse_number<T>(raw: &str) -> Result<T, String>
where
    T: TryFrom<u32>,
{
    let value = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => raw.parse::<u32>(),
    }
    .map_err(|err| format!("invalid number {raw:?}: {err}"))?;
    T::try_from(value).map_err(|_| format!("{raw} is out of range"))
}

fn resolve_palette(args: &Args) -> Result<Palette> {
    if let Some(path) = args.palette_file.as_ref() {
        return Palette::load(path);
    }
    match Palette::named(&args.palette) {
        Some(palette) => Ok(palette),
        None => bail!(
            "unknown palette {:?}; available: {}",
            args.palette,
            Palette::preset_names().collect::<Vec<_>>().join(", ")
        ),
    }
}

fn resolve_pic_paths(args: &Args) -> Vec<PathBuf> {
    let mut pics = Vec::new();

    if !args.pics.is_empty() {
        pics.extend(args.pics.iter().cloned());
    } else if let Some(root) = args.root.as_ref() {
        for entry in WalkDir::new(root).into_iter().filter_map(|res| res.ok()) {
            if entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| ext.eq_ignore_ascii_case("pic"))
                    .unwrap_or(false)
            {
                pics.push(entry.into_path());
            }
        }
    }

    pics.sort();
    pics.dedup();
    pics
}

/// Returns whether an image was written.
fn extract_pic(args: &Args, pic: &Path, options: &DecodeOptions, palette: &Palette) -> Result<bool> {
    let stem = pic
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("sprite");
    let dest_path = args.dest.join(format!("{stem}.{}", args.format.extension()));
    if dest_path.exists() && !args.overwrite {
        info!("skipping {}; {} exists", pic.display(), dest_path.display());
        return Ok(false);
    }

    let bytes = fs::read(pic).with_context(|| format!("reading {}", pic.display()))?;
    let sprite = match decode_sprite_with(&bytes, options) {
        Ok(sprite) => sprite,
        Err(err) => {
            warn!("failed to decode {}: {err}", pic.display());
            return Ok(false);
        }
    };

    write_sprite(args, stem, &sprite, &dest_path, palette)?;
    info!(
        "{} -> {} ({}x{}, mode {})",
        pic.display(),
        dest_path.display(),
        sprite.width_px(),
        sprite.height_px(),
        sprite.mode().number()
    );
    Ok(true)
}

fn extract_from_rom(
    args: &Args,
    rom_path: &Path,
    options: &DecodeOptions,
    palette: &Palette,
) -> Result<usize> {
    let rom = RomImage::open(rom_path)?;
    let bank = args.bank.context("--rom requires --bank")?;
    let address = match (args.address, args.pointer) {
        (Some(address), _) => address,
        (None, Some(pointer)) => rom.read_pointer(bank, pointer)?,
        (None, None) => bail!("--rom requires --address or --pointer"),
    };
    info!(
        "decoding {} ({}) at {bank:02x}:{address:04x}",
        rom.path().display(),
        rom.title().unwrap_or_else(|| String::from("untitled"))
    );

    let dest_path = args
        .dest
        .join(format!("{bank:02x}_{address:04x}.{}", args.format.extension()));
    if dest_path.exists() && !args.overwrite {
        info!("skipping {}; already exists", dest_path.display());
        return Ok(0);
    }

    let sprite = decode_sprite_with(rom.slice_at(bank, address)?, options)
        .with_context(|| format!("decoding sprite at {bank:02x}:{address:04x}"))?;
    write_sprite(args, &format!("{bank:02x}_{address:04x}"), &sprite, &dest_path, palette)?;
    Ok(1)
}

fn write_sprite(
    args: &Args,
    stem: &str,
    sprite: &DecodedSprite,
    dest_path: &Path,
    palette: &Palette,
) -> Result<()> {
    write_image(sprite.image(), args.format, palette, dest_path)?;

    if args.dump_planes {
        let stage_dir = args.dest.join(format!("{stem}_planes"));
        for snapshot in sprite.stages() {
            let path = stage_dir.join(format!(
                "{}_{}.pgm",
                snapshot.slot.name(),
                snapshot.stage.name()
            ));
            let image = plane_image(sprite.header(), &snapshot.plane);
            write_image(&image, ImageFormat::Pgm, palette, &path)?;
        }
        for slot in [PlaneSlot::Low, PlaneSlot::High] {
            let path = stage_dir.join(format!("{}_final.pgm", slot.name()));
            let image = plane_image(sprite.header(), sprite.plane(slot));
            write_image(&image, ImageFormat::Pgm, palette, &path)?;
        }
    }
    Ok(())
}
