use image::{DynamicImage, ImageReader};
use std::path::{Path, PathBuf};

/// Interleaved 8-bit samples, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    /// Bit depth per channel of the decoded source; samples are always 8-bit.
    pub bit_depth: u8,
    pub samples: Vec<u8>,
}

impl Raster {
    pub fn gray(width: u32, height: u32, samples: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels: 1,
            bit_depth: 8,
            samples,
        }
    }

    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self::gray(width, height, vec![value; width as usize * height as usize])
    }

    pub fn same_dimensions(&self, other: &Raster) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Single-channel view of any raster; only used for display.
    pub fn to_display_gray(&self) -> Raster {
        match self.channels {
            1 => self.clone(),
            3 => self.to_luminance(),
            channels => {
                let samples = self
                    .samples
                    .chunks_exact(channels as usize)
                    .map(|pixel| pixel[0])
                    .collect();
                Raster::gray(self.width, self.height, samples)
            }
        }
    }

    /// Luminance with 0.299/0.587/0.114 weights, rounded to nearest.
    /// Only meaningful for 3-channel RGB rasters.
    pub fn to_luminance(&self) -> Raster {
        let samples = self
            .samples
            .chunks_exact(3)
            .map(|pixel| luminance(pixel[0], pixel[1], pixel[2]))
            .collect();
        Raster {
            width: self.width,
            height: self.height,
            channels: 1,
            bit_depth: self.bit_depth,
            samples,
        }
    }

    /// Per-pixel absolute difference of two single-channel rasters of equal shape.
    pub fn abs_diff(&self, other: &Raster) -> Raster {
        let samples = self
            .samples
            .iter()
            .zip(other.samples.iter())
            .map(|(left, right)| left.abs_diff(*right))
            .collect();
        Raster::gray(self.width, self.height, samples)
    }
}

pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let weighted = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    ((weighted + 500) / 1000) as u8
}

#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("failed to open image '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode image '{}': {source}", path.display())]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
}

pub trait ImageCodec {
    fn decode(&self, path: &Path) -> Result<Raster, ImageLoadError>;
}

/// Decodes PNG and TIFF through the `image` crate, sniffing the format from
/// file content. Wider samples are reduced to 8 bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateCodec;

impl ImageCodec for ImageCrateCodec {
    fn decode(&self, path: &Path) -> Result<Raster, ImageLoadError> {
        let reader = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|source| ImageLoadError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        let decoded = reader.decode().map_err(|source| ImageLoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(raster_from_dynamic(&decoded))
    }
}

pub fn raster_from_dynamic(decoded: &DynamicImage) -> Raster {
    let color = decoded.color();
    let channels = color.channel_count();
    let bit_depth = (color.bits_per_pixel() / u16::from(channels.max(1))) as u8;
    let samples = match channels {
        1 => decoded.to_luma8().into_raw(),
        2 => decoded.to_luma_alpha8().into_raw(),
        3 => decoded.to_rgb8().into_raw(),
        _ => decoded.to_rgba8().into_raw(),
    };

    Raster {
        width: decoded.width(),
        height: decoded.height(),
        channels,
        bit_depth,
        samples,
    }
}
