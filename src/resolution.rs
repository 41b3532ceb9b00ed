use std::{fs::File, io::BufReader, path::Path};

use image::ImageFormat;
use img_parts::{
    jpeg::{markers, Jpeg},
    Bytes,
};
use tiff::{
    decoder::{ifd::Value, Decoder},
    tags::Tag,
};

const INCHES_PER_METRE: f32 = 0.0254;
const CENTIMETRES_PER_INCH: f32 = 2.54;

const JFIF_IDENTIFIER: &[u8] = b"JFIF\0";
const JFIF_DOTS_PER_INCH: u8 = 1;
const JFIF_DOTS_PER_CM: u8 = 2;

const TIFF_UNIT_INCH: u16 = 2;
const TIFF_UNIT_CENTIMETRE: u16 = 3;

/// Horizontal resolution in dots per inch stored in an image file.
///
/// Reads the PNG `pHYs` chunk, the JPEG JFIF header and the TIFF resolution
/// tags. `None` when the format has no such field or only records an aspect
/// ratio.
pub(crate) fn read_dpi(path: &Path) -> Option<f32> {
    let dpi = match ImageFormat::from_path(path).ok()? {
        ImageFormat::Png => png_dpi(path),
        ImageFormat::Jpeg => jfif_dpi(path),
        ImageFormat::Tiff => tiff_dpi(path),
        _ => None,
    }?;
    (dpi.is_finite() && dpi > 0.0).then_some(dpi)
}

fn png_dpi(path: &Path) -> Option<f32> {
    let file = File::open(path).ok()?;
    let reader = png::Decoder::new(BufReader::new(file)).read_info().ok()?;
    let dims = reader.info().pixel_dims?;
    match dims.unit {
        png::Unit::Meter => Some(dims.xppu as f32 * INCHES_PER_METRE),
        png::Unit::Unspecified => None,
    }
}

fn jfif_dpi(path: &Path) -> Option<f32> {
    let jpeg = Jpeg::from_bytes(Bytes::from(std::fs::read(path).ok()?)).ok()?;
    let app0 = jpeg.segment_by_marker(markers::APP0)?;
    let fields = app0.contents().strip_prefix(JFIF_IDENTIFIER)?;
    // version (2 bytes), units, x density (big endian), y density
    let [_, _, units, x_high, x_low, ..] = fields else {
        return None;
    };
    let density = u16::from_be_bytes([*x_high, *x_low]) as f32;
    match *units {
        JFIF_DOTS_PER_INCH => Some(density),
        JFIF_DOTS_PER_CM => Some(density * CENTIMETRES_PER_INCH),
        _ => None,
    }
}

fn tiff_dpi(path: &Path) -> Option<f32> {
    let file = File::open(path).ok()?;
    let mut decoder = Decoder::new(BufReader::new(file)).ok()?;
    let Value::Rational(num, denom) = decoder.find_tag(Tag::XResolution).ok()?? else {
        return None;
    };
    if denom == 0 {
        return None;
    }
    let resolution = num as f32 / denom as f32;
    let unit = decoder
        .find_tag_unsigned::<u16>(Tag::ResolutionUnit)
        .ok()?
        .unwrap_or(TIFF_UNIT_INCH);
    match unit {
        TIFF_UNIT_INCH => Some(resolution),
        TIFF_UNIT_CENTIMETRE => Some(resolution * CENTIMETRES_PER_INCH),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use image::{
        codecs::jpeg::{JpegEncoder, PixelDensity, PixelDensityUnit},
        ExtendedColorType,
    };
    use tiff::{
        encoder::{colortype, Rational, TiffEncoder},
        tags::ResolutionUnit,
    };

    use super::*;

    const WIDTH: u32 = 64;
    const HEIGHT: u32 = 32;

    fn white() -> Vec<u8> {
        vec![255; (WIDTH * HEIGHT * 3) as usize]
    }

    fn jpeg(dir: &Path, density: PixelDensity) -> PathBuf {
        let path = dir.join("page.jpg");
        let mut file = File::create(&path).unwrap();
        let mut encoder = JpegEncoder::new(&mut file);
        encoder.set_pixel_density(density);
        encoder
            .encode(&white(), WIDTH, HEIGHT, ExtendedColorType::Rgb8)
            .unwrap();
        path
    }

    fn tiff(dir: &Path, resolution: Option<(ResolutionUnit, u32)>) -> PathBuf {
        let path = dir.join("page.tif");
        let mut encoder = TiffEncoder::new(File::create(&path).unwrap()).unwrap();
        let mut image = encoder
            .new_image::<colortype::RGB8>(WIDTH, HEIGHT)
            .unwrap();
        if let Some((unit, n)) = resolution {
            image.resolution(unit, Rational { n, d: 1 });
        }
        image.write_data(&white()).unwrap();
        path
    }

    #[test]
    fn jfif_density_in_inches() {
        let dir = tempfile::tempdir().unwrap();
        let path = jpeg(dir.path(), PixelDensity::dpi(150));
        assert_eq!(read_dpi(&path), Some(150.0));
    }

    #[test]
    fn jfif_density_in_centimetres() {
        let dir = tempfile::tempdir().unwrap();
        let density = PixelDensity {
            density: (118, 118),
            unit: PixelDensityUnit::Centimeters,
        };
        let dpi = read_dpi(&jpeg(dir.path(), density)).unwrap();
        assert!((dpi - 299.72).abs() < 0.01);
    }

    #[test]
    fn jfif_aspect_ratio_has_no_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = jpeg(dir.path(), PixelDensity::default());
        assert_eq!(read_dpi(&path), None);
    }

    #[test]
    fn tiff_resolution_tags() {
        let dir = tempfile::tempdir().unwrap();
        let path = tiff(dir.path(), Some((ResolutionUnit::Inch, 150)));
        assert_eq!(read_dpi(&path), Some(150.0));

        let path = tiff(dir.path(), Some((ResolutionUnit::Centimeter, 100)));
        assert!((read_dpi(&path).unwrap() - 254.0).abs() < 0.01);
    }

    #[test]
    fn tiff_without_unit_has_no_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = tiff(dir.path(), None);
        assert_eq!(read_dpi(&path), None);
    }

    #[test]
    fn other_formats_have_no_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.bmp");
        image::RgbImage::from_pixel(WIDTH, HEIGHT, image::Rgb([255, 255, 255]))
            .save(&path)
            .unwrap();
        assert_eq!(read_dpi(&path), None);
    }
}
