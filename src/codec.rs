//! Writing maps to disk.
//!
//! The pipeline only produces [`DynImage`]s; encoding goes through the
//! [`ImageWriter`] trait. With the `codec` feature, [`ImageCrateWriter`]
//! implements it on top of the `image` crate:
//!
//! | pixel format | PNG / BMP / TGA            | HDR / EXR          |
//! |--------------|----------------------------|--------------------|
//! | U8           | 8-bit gray                 | error              |
//! | U32          | raw bytes as 8-bit RGBA    | error              |
//! | F32          | quantized to 8-bit gray    | gray as float RGB  |

use std::fmt;
use std::path::Path;

use crate::pixmap::DynImage;
use crate::util::{Error, Result};

/// Output container, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageExtension {
    Png,
    Bmp,
    Tga,
    Hdr,
    Exr,
}

impl ImageExtension {
    pub const ALL: [ImageExtension; 5] = [Self::Png, Self::Bmp, Self::Tga, Self::Hdr, Self::Exr];

    /// Parse from an extension without the dot, case-insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "bmp" => Some(Self::Bmp),
            "tga" => Some(Self::Tga),
            "hdr" => Some(Self::Hdr),
            "exr" => Some(Self::Exr),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| Error::Codec(format!("unsupported output extension: {}", path.display())))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Bmp => "bmp",
            Self::Tga => "tga",
            Self::Hdr => "hdr",
            Self::Exr => "exr",
        }
    }

    /// Whether the container stores floating-point samples.
    pub fn is_float(self) -> bool {
        matches!(self, Self::Hdr | Self::Exr)
    }
}

impl fmt::Display for ImageExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encodes images to files.
pub trait ImageWriter {
    fn write(&self, path: &Path, image: &DynImage, ext: ImageExtension) -> Result<()>;

    /// Write with the container picked from the path's extension.
    fn write_auto(&self, path: &Path, image: &DynImage) -> Result<()> {
        self.write(path, image, ImageExtension::from_path(path)?)
    }
}

#[cfg(feature = "codec")]
pub use imp::ImageCrateWriter;

#[cfg(feature = "codec")]
mod imp {
    use std::path::Path;

    use image::{ExtendedColorType, ImageFormat};

    use super::{ImageExtension, ImageWriter};
    use crate::pixmap::DynImage;
    use crate::util::{Error, Result};

    /// [`ImageWriter`] backed by the `image` crate.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct ImageCrateWriter;

    fn format_of(ext: ImageExtension) -> ImageFormat {
        match ext {
            ImageExtension::Png => ImageFormat::Png,
            ImageExtension::Bmp => ImageFormat::Bmp,
            ImageExtension::Tga => ImageFormat::Tga,
            ImageExtension::Hdr => ImageFormat::Hdr,
            ImageExtension::Exr => ImageFormat::OpenExr,
        }
    }

    fn save(path: &Path, bytes: &[u8], (w, h): (u32, u32), color: ExtendedColorType, ext: ImageExtension) -> Result<()> {
        image::save_buffer_with_format(path, bytes, w, h, color, format_of(ext))
            .map_err(|e| Error::Codec(format!("{}: {e}", path.display())))
    }

    impl ImageWriter for ImageCrateWriter {
        #[tracing::instrument(skip(self, image), fields(format = %image.format()))]
        fn write(&self, path: &Path, image: &DynImage, ext: ImageExtension) -> Result<()> {
            let dims = image.dimensions();
            match (image, ext.is_float()) {
                (DynImage::U8(img), false) => save(path, img.as_bytes(), dims, ExtendedColorType::L8, ext),
                (DynImage::U32(img), false) => save(path, img.as_bytes(), dims, ExtendedColorType::Rgba8, ext),
                (DynImage::F32(img), false) => {
                    let quantized = img.to_u8();
                    save(path, quantized.as_bytes(), dims, ExtendedColorType::L8, ext)
                }
                (DynImage::F32(img), true) => {
                    let rgb: Vec<f32> = img.as_slice().iter().flat_map(|&v| [v, v, v]).collect();
                    save(path, bytemuck::cast_slice(rgb.as_slice()), dims, ExtendedColorType::Rgb32F, ext)
                }
                (other, true) => Err(Error::Codec(format!(
                    "{} only stores float maps, got {}",
                    ext,
                    other.format()
                ))),
            }?;
            tracing::info!(path = %path.display(), bytes = image.memory(), "image written");
            Ok(())
        }
    }
}
