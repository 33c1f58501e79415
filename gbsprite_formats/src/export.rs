use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use image::codecs::png::PngEncoder;
use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ColorType, ImageEncoder};

use crate::palette::Palette;
use crate::render::SpriteImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ImageFormat {
    /// Binary greyscale PNM; ignores the palette.
    Pgm,
    /// Binary RGB PNM through the palette.
    Ppm,
    #[default]
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Pgm => "pgm",
            ImageFormat::Ppm => "ppm",
            ImageFormat::Png => "png",
        }
    }
}

/// Encode `image` into `writer`. PGM maps index 0 to white and index 3 to
/// black; PPM and PNG colour through `palette`.
pub fn encode_image<W: Write>(
    image: &SpriteImage,
    format: ImageFormat,
    palette: &Palette,
    writer: W,
) -> Result<()> {
    let width = u32::try_from(image.width()).context("sprite width exceeds u32")?;
    let height = u32::try_from(image.height()).context("sprite height exceeds u32")?;

    match format {
        ImageFormat::Pgm => PnmEncoder::new(writer)
            .with_subtype(PnmSubtype::Graymap(SampleEncoding::Binary))
            .write_image(&image.to_luma8(), width, height, ColorType::L8)
            .context("encoding PGM")?,
        ImageFormat::Ppm => PnmEncoder::new(writer)
            .with_subtype(PnmSubtype::Pixmap(SampleEncoding::Binary))
            .write_image(&image.to_rgb8(palette), width, height, ColorType::Rgb8)
            .context("encoding PPM")?,
        ImageFormat::Png => PngEncoder::new(writer)
            .write_image(&image.to_rgb8(palette), width, height, ColorType::Rgb8)
            .context("encoding PNG")?,
    }
    Ok(())
}

/// Write `image` to `path`, creating missing parent directories.
pub fn write_image<P: AsRef<Path>>(
    image: &SpriteImage,
    format: ImageFormat,
    palette: &Palette,
    path: P,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    encode_image(image, format, palette, &mut writer)
        .with_context(|| format!("writing {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::SpriteHeader;
    use crate::render::{Canvas, render_planes};

    fn sample() -> SpriteImage {
        let header = SpriteHeader::new(1, 1, false).unwrap();
        let low = [0x0f, 0, 0, 0, 0, 0, 0, 0xff];
        let high = [0x33, 0, 0, 0, 0, 0, 0, 0xff];
        render_planes(&header, &low, &high, Canvas::Native)
    }

    #[test]
    fn pgm_is_white_to_black() {
        let mut bytes = Vec::new();
        encode_image(&sample(), ImageFormat::Pgm, &Palette::GREYSCALE, &mut bytes).unwrap();
        assert!(bytes.starts_with(b"P5"));
        let pixels = &bytes[bytes.len() - 64..];
        assert_eq!(&pixels[..8], &[0xff, 0xff, 0x55, 0x55, 0xaa, 0xaa, 0x00, 0x00]);
        assert_eq!(&pixels[56..], &[0x00; 8]);
    }

    #[test]
    fn ppm_uses_palette() {
        let palette = Palette::named("dmg").unwrap();
        let mut bytes = Vec::new();
        encode_image(&sample(), ImageFormat::Ppm, &palette, &mut bytes).unwrap();
        assert!(bytes.starts_with(b"P6"));
        let pixels = &bytes[bytes.len() - 64 * 3..];
        assert_eq!(&pixels[..3], &palette.colors[0]);
        assert_eq!(&pixels[6..9], &palette.colors[2]);
        assert_eq!(&pixels[pixels.len() - 3..], &palette.colors[3]);
    }

    #[test]
    fn writes_png_into_new_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sprite.png");
        write_image(&sample(), ImageFormat::Png, &Palette::default(), &path).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(ImageFormat::Png.extension(), "png");
    }
}
