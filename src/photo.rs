//! Loaded-image handle held by the cache and handed to the viewer.

use std::io::Cursor;
use std::sync::Arc;

use anyhow::Result;
use image::RgbaImage;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::image_ref::ImageRef;
use crate::webdav::DavClient;

/// A remote photo bound to its URI. Creating one is free; the bytes are
/// fetched and decoded the first time the viewer asks for pixels, then kept
/// for as long as the handle lives.
#[derive(Debug)]
pub struct Photo {
    uri: ImageRef,
    pixels: OnceCell<Arc<RgbaImage>>,
}

impl Photo {
    pub fn new(uri: ImageRef) -> Self {
        Self {
            uri,
            pixels: OnceCell::new(),
        }
    }

    pub fn uri(&self) -> &ImageRef {
        &self.uri
    }

    pub fn is_decoded(&self) -> bool {
        self.pixels.initialized()
    }

    pub async fn decoded(&self, client: &DavClient) -> Result<Arc<RgbaImage>> {
        self.pixels
            .get_or_try_init(|| async {
                let bytes = client.fetch(&self.uri).await?;
                let img = tokio::task::spawn_blocking(move || decode_rgba8_apply_exif(&bytes))
                    .await??;
                Ok::<_, anyhow::Error>(Arc::new(img))
            })
            .await
            .cloned()
    }
}

// Decodes to RGBA8 and applies EXIF orientation when present; missing
// metadata leaves the image as stored.
pub(crate) fn decode_rgba8_apply_exif(bytes: &[u8]) -> Result<RgbaImage> {
    let img = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;
    let img = img.to_rgba8();

    let orientation = read_orientation(bytes).unwrap_or(1);
    let img = match orientation {
        2 => image::imageops::flip_horizontal(&img),
        3 => image::imageops::rotate180(&img),
        4 => image::imageops::flip_vertical(&img),
        5 => image::imageops::flip_horizontal(&image::imageops::rotate90(&img)),
        6 => image::imageops::rotate90(&img),
        7 => image::imageops::flip_horizontal(&image::imageops::rotate270(&img)),
        8 => image::imageops::rotate270(&img),
        _ => img,
    };
    Ok(img)
}

fn read_orientation(bytes: &[u8]) -> Option<u16> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let orientation = field.value.get_uint(0)? as u16;
    debug!(orientation, "exif orientation");
    Some(orientation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    // JPEG 2x1 with EXIF orientation 6 (rotate 90 CW), base64 encoded
    const ORIENT6_JPEG: &str = include_str!("../tests/fixtures/orient6.jpg.b64");

    #[test]
    fn applies_orientation_six() {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(ORIENT6_JPEG.trim())
            .unwrap();
        let img = decode_rgba8_apply_exif(&bytes).unwrap();
        assert_eq!(img.dimensions(), (1, 2));
    }

    #[test]
    fn garbage_does_not_decode() {
        assert!(decode_rgba8_apply_exif(b"not a jpeg").is_err());
    }

    #[test]
    fn new_photo_is_not_decoded() {
        let photo = Photo::new(ImageRef::from("http://h/p/a.jpg"));
        assert!(!photo.is_decoded());
        assert_eq!(photo.uri().as_str(), "http://h/p/a.jpg");
    }
}
