//! Owned single-channel pixel buffers.
//!
//! [`Image<P>`] stores `width * height` pixels of one of the fixed formats
//! {U8, F32, U32} in a contiguous row-major `Vec`. [`DynImage`] is the
//! runtime-tagged form handed to consumers that dispatch on the format,
//! such as the image writer.

use std::fmt;
use std::ops::{Index, IndexMut};

use bytemuck::{Pod, Zeroable};

use crate::util::{Error, Result};

/// Pixel storage formats supported by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit unsigned, e.g. quantized occlusion for PNG output
    U8,
    /// 32-bit float, occlusion values
    F32,
    /// 32-bit unsigned, triangle indices
    U32,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub const fn size(self) -> usize {
        match self {
            PixelFormat::U8 => 1,
            PixelFormat::F32 | PixelFormat::U32 => 4,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PixelFormat::U8 => "U8",
            PixelFormat::F32 => "F32",
            PixelFormat::U32 => "U32",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scalar types usable as pixels.
pub trait Pixel: Pod + PartialEq + fmt::Debug + Send + Sync + 'static {
    const FORMAT: PixelFormat;
}

impl Pixel for u8 {
    const FORMAT: PixelFormat = PixelFormat::U8;
}

impl Pixel for f32 {
    const FORMAT: PixelFormat = PixelFormat::F32;
}

impl Pixel for u32 {
    const FORMAT: PixelFormat = PixelFormat::U32;
}

/// Row-major image owning its pixels. Indexed by `(row, col)`.
#[derive(Clone, PartialEq)]
pub struct Image<P: Pixel> {
    width: u32,
    height: u32,
    data: Vec<P>,
}

impl<P: Pixel> Image<P> {
    /// Zero-initialized image.
    ///
    /// # Panics
    /// If either dimension is zero.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, <P as Zeroable>::zeroed())
    }

    /// Image with every pixel set to `value`.
    ///
    /// # Panics
    /// If either dimension is zero.
    pub fn filled(width: u32, height: u32, value: P) -> Self {
        assert!(width > 0 && height > 0, "image dimensions must be non-zero, got {width}x{height}");
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    /// Wrap an existing row-major buffer.
    pub fn from_vec(width: u32, height: u32, data: Vec<P>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidImage(format!("zero dimension {width}x{height}")));
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(Error::InvalidImage(format!(
                "{width}x{height} needs {expected} pixels, got {}",
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        P::FORMAT
    }

    /// Number of pixels.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size of the pixel storage in bytes.
    pub fn memory(&self) -> usize {
        self.data.len() * P::FORMAT.size()
    }

    #[inline]
    fn offset(&self, row: u32, col: u32) -> usize {
        debug_assert!(row < self.height && col < self.width, "({row}, {col}) out of {}x{}", self.width, self.height);
        row as usize * self.width as usize + col as usize
    }

    #[inline]
    pub fn get(&self, row: u32, col: u32) -> Option<P> {
        (row < self.height && col < self.width).then(|| self.data[self.offset(row, col)])
    }

    #[inline]
    pub fn set(&mut self, row: u32, col: u32, value: P) {
        let idx = self.offset(row, col);
        self.data[idx] = value;
    }

    /// Overwrite every pixel.
    pub fn reset(&mut self, value: P) {
        self.data.fill(value);
    }

    #[inline]
    pub fn row(&self, row: u32) -> &[P] {
        let start = self.offset(row, 0);
        &self.data[start..start + self.width as usize]
    }

    #[inline]
    pub fn row_mut(&mut self, row: u32) -> &mut [P] {
        let start = self.offset(row, 0);
        let w = self.width as usize;
        &mut self.data[start..start + w]
    }

    #[inline]
    pub fn as_slice(&self) -> &[P] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [P] {
        &mut self.data
    }

    /// Raw native-endian bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.data.as_slice())
    }
}

impl Image<f32> {
    /// Quantize `[0, 1]` values to 8 bits (values are saturated first).
    pub fn to_u8(&self) -> Image<u8> {
        Image {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .map(|&v| (crate::util::saturate(v) * 255.0).round() as u8)
                .collect(),
        }
    }

    /// Mean over the pixels for which `include` returns true.
    pub fn mean_where(&self, mut include: impl FnMut(u32, u32) -> bool) -> Option<f32> {
        let mut sum = 0.0f64;
        let mut n = 0usize;
        for row in 0..self.height {
            for col in 0..self.width {
                if include(row, col) {
                    sum += self.data[self.offset(row, col)] as f64;
                    n += 1;
                }
            }
        }
        (n > 0).then(|| (sum / n as f64) as f32)
    }
}

impl<P: Pixel> Index<(u32, u32)> for Image<P> {
    type Output = P;

    #[inline]
    fn index(&self, (row, col): (u32, u32)) -> &P {
        &self.data[self.offset(row, col)]
    }
}

impl<P: Pixel> IndexMut<(u32, u32)> for Image<P> {
    #[inline]
    fn index_mut(&mut self, (row, col): (u32, u32)) -> &mut P {
        let idx = self.offset(row, col);
        &mut self.data[idx]
    }
}

impl<P: Pixel> fmt::Debug for Image<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Image<{}>({}x{})", P::FORMAT, self.width, self.height)
    }
}

/// Image with its format known only at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum DynImage {
    U8(Image<u8>),
    F32(Image<f32>),
    U32(Image<u32>),
}

impl DynImage {
    pub fn format(&self) -> PixelFormat {
        match self {
            DynImage::U8(_) => PixelFormat::U8,
            DynImage::F32(_) => PixelFormat::F32,
            DynImage::U32(_) => PixelFormat::U32,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            DynImage::U8(img) => img.dimensions(),
            DynImage::F32(img) => img.dimensions(),
            DynImage::U32(img) => img.dimensions(),
        }
    }

    /// Size of the pixel storage in bytes.
    pub fn memory(&self) -> usize {
        match self {
            DynImage::U8(img) => img.memory(),
            DynImage::F32(img) => img.memory(),
            DynImage::U32(img) => img.memory(),
        }
    }
}

impl From<Image<u8>> for DynImage {
    fn from(img: Image<u8>) -> Self {
        DynImage::U8(img)
    }
}

impl From<Image<f32>> for DynImage {
    fn from(img: Image<f32>) -> Self {
        DynImage::F32(img)
    }
}

impl From<Image<u32>> for DynImage {
    fn from(img: Image<u32>) -> Self {
        DynImage::U32(img)
    }
}
