//! Stamp image loading and embedding as PDF image XObjects

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegDecoder;
use image::{ImageDecoder, ImageFormat};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};

/// A decoded stamp image, ready to be added to any number of documents
#[derive(Debug, Clone)]
pub struct StampImage {
    format: ImageFormat,
    width: u32,
    height: u32,
    stream: Stream,
    smask: Option<Stream>,
}

impl StampImage {
    /// Load a JPEG or PNG stamp image from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Stamp image not found: {}", path.display()),
            )));
        }
        Self::from_bytes(&std::fs::read(path)?)
    }

    /// Build an image XObject from JPEG or PNG bytes.
    ///
    /// JPEG data is embedded untouched behind `DCTDecode`; PNG is decoded to
    /// 8-bit RGB with its alpha channel (if any) carried as a soft mask.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let format = image::guess_format(bytes)
            .map_err(|_| Error::UnsupportedImage("unrecognised image data".to_string()))?;

        match format {
            ImageFormat::Jpeg => Self::from_jpeg(bytes),
            ImageFormat::Png => Self::from_png(bytes),
            other => Err(Error::UnsupportedImage(format!("{:?}", other))),
        }
    }

    fn from_jpeg(bytes: &[u8]) -> Result<Self> {
        // The decoder converts CMYK to RGB, so the colour space has to come
        // from the frame header of the bytes that are embedded as-is.
        let color_space = match jpeg_components(bytes) {
            Some(1) => "DeviceGray",
            Some(3) => "DeviceRGB",
            Some(n) => {
                return Err(Error::UnsupportedImage(format!("JPEG with {n} colour components")))
            }
            None => return Err(Error::UnsupportedImage("JPEG without a frame header".to_string())),
        };

        let decoder = JpegDecoder::new(Cursor::new(bytes))?;
        let (width, height) = decoder.dimensions();

        let mut stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => color_space,
                "BitsPerComponent" => 8i64,
                "Filter" => "DCTDecode",
            },
            bytes.to_vec(),
        );
        // Already DCT-encoded
        stream.allows_compression = false;

        Ok(Self { format: ImageFormat::Jpeg, width, height, stream, smask: None })
    }

    fn from_png(bytes: &[u8]) -> Result<Self> {
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)?;
        let (width, height) = (decoded.width(), decoded.height());

        let smask = decoded.color().has_alpha().then(|| {
            let alpha: Vec<u8> = decoded.to_rgba8().pixels().map(|pixel| pixel[3]).collect();
            Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width as i64,
                    "Height" => height as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8i64,
                },
                alpha,
            )
        });

        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
            },
            decoded.to_rgb8().into_raw(),
        );

        Ok(Self { format: ImageFormat::Png, width, height, stream, smask })
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Pixel dimensions of the source image
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn has_alpha(&self) -> bool {
        self.smask.is_some()
    }

    /// Add the image (and its soft mask) to `doc`, returning the image object id
    pub fn embed(&self, doc: &mut Document) -> ObjectId {
        let mut stream = self.stream.clone();
        if let Some(smask) = &self.smask {
            let smask_id = doc.add_object(smask.clone());
            stream.dict.set("SMask", Object::Reference(smask_id));
        }
        doc.add_object(stream)
    }
}

/// Number of colour components declared in the JPEG frame header (SOFn)
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }

    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        if marker == 0xFF {
            // fill byte
            pos += 1;
            continue;
        }

        let length = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        match marker {
            0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF => {
                // length(2) precision(1) height(2) width(2) components(1)
                return bytes.get(pos + 9).copied();
            }
            0xDA | 0xD9 => return None,
            _ => pos += 2 + length,
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_jpeg_is_embedded_as_dct() {
        let jpeg = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([10, 20, 30]))),
            ImageFormat::Jpeg,
        );
        assert_eq!(jpeg_components(&jpeg), Some(3));
        let image = StampImage::from_bytes(&jpeg).unwrap();
        assert_eq!(image.format(), ImageFormat::Jpeg);
        assert_eq!(image.dimensions(), (8, 6));

        let mut doc = Document::with_version("1.5");
        let id = image.embed(&mut doc);
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert_eq!(stream.dict.get(b"Filter").unwrap().as_name().unwrap(), b"DCTDecode");
        assert_eq!(stream.content, jpeg);
    }

    #[test]
    fn test_grayscale_jpeg_uses_device_gray() {
        let jpeg = encode(
            DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([128]))),
            ImageFormat::Jpeg,
        );
        assert_eq!(jpeg_components(&jpeg), Some(1));

        let image = StampImage::from_bytes(&jpeg).unwrap();
        let mut doc = Document::with_version("1.5");
        let id = image.embed(&mut doc);
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert_eq!(stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceGray");
    }

    #[test]
    fn test_cmyk_jpeg_rejected() {
        // SOI, then a baseline frame header declaring 4 components
        let mut cmyk = vec![0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x14, 0x08, 0x00, 0x10, 0x00, 0x10, 0x04];
        for id in 1..=4u8 {
            cmyk.extend_from_slice(&[id, 0x11, 0x00]);
        }
        cmyk.extend_from_slice(&[0xFF, 0xD9]);

        assert_eq!(jpeg_components(&cmyk), Some(4));
        let result = StampImage::from_bytes(&cmyk);
        assert!(matches!(result.unwrap_err(), Error::UnsupportedImage(_)));
    }

    #[test]
    fn test_png_with_alpha_gets_soft_mask() {
        let png = encode(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 2, Rgba([1, 2, 3, 128]))),
            ImageFormat::Png,
        );
        let image = StampImage::from_bytes(&png).unwrap();
        assert_eq!(image.format(), ImageFormat::Png);
        assert!(image.has_alpha());

        let mut doc = Document::with_version("1.5");
        let id = image.embed(&mut doc);
        let stream = doc.get_object(id).unwrap().as_stream().unwrap();
        assert_eq!(stream.content.len(), 3 * 2 * 3);
        assert!(stream.dict.get(b"SMask").is_ok());
    }

    #[test]
    fn test_unknown_format_rejected() {
        let result = StampImage::from_bytes(b"GIF89a not really");
        assert!(matches!(result.unwrap_err(), Error::UnsupportedImage(_)));

        let result = StampImage::from_bytes(b"plain text");
        assert!(matches!(result.unwrap_err(), Error::UnsupportedImage(_)));
    }

    #[test]
    fn test_missing_file() {
        assert!(StampImage::load(Path::new("no-such-qr.jpg")).is_err());
    }
}
