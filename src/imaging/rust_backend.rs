//! Pure Rust backend on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode | `image::ImageReader` |
//! | Crop | `DynamicImage::crop_imm` on the source window |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Watermark | built-in bitmap font ([`super::watermark`]) |
//! | Encode | `image::codecs::jpeg::JpegEncoder` |

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use super::backend::{ImageBackend, ImagingError, RenderSpec};
use super::calculations::{calculate_crop, calculate_fit};
use super::watermark;
use crate::model::Dimensions;

pub struct RustBackend {
    quality: u8,
}

impl RustBackend {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new(80)
    }
}

/// Encode as JPEG into a sibling temp file, then rename it into place.
fn save_jpeg(image: &DynamicImage, path: &Path, quality: u8) -> Result<(), ImagingError> {
    let tmp = path.with_extension("jpg.tmp");
    let io_err = |source| ImagingError::Io {
        path: tmp.clone(),
        source,
    };

    let result = (|| -> Result<(), ImagingError> {
        let file = File::create(&tmp).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
        image
            .write_with_encoder(encoder)
            .map_err(|e| ImagingError::Encode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        writer.flush().map_err(io_err)?;
        Ok(())
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    fs::rename(&tmp, path).map_err(|source| ImagingError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl ImageBackend for RustBackend {
    fn decode(&self, path: &Path) -> Result<DynamicImage, ImagingError> {
        let io_err = |source| ImagingError::Io {
            path: path.to_path_buf(),
            source,
        };
        let image = ImageReader::open(path)
            .map_err(io_err)?
            .with_guessed_format()
            .map_err(io_err)?
            .decode()
            .map_err(|e| ImagingError::Decode {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        if image.width() == 0 || image.height() == 0 {
            return Err(ImagingError::Decode {
                path: path.to_path_buf(),
                message: "image has no pixels".to_string(),
            });
        }
        Ok(image)
    }

    fn render(
        &self,
        source: &DynamicImage,
        spec: &RenderSpec,
        output: &Path,
    ) -> Result<Dimensions, ImagingError> {
        let source_dims = Dimensions::new(source.width(), source.height());

        let rendered = match spec {
            RenderSpec::Crop { width, height } => {
                let plan = calculate_crop(source_dims, Dimensions::new(*width, *height));
                let window = plan.source_window(source_dims);
                let cropped = source
                    .crop_imm(window.x, window.y, window.width, window.height)
                    .resize_exact(plan.target.width, plan.target.height, FilterType::Lanczos3);
                DynamicImage::ImageRgb8(cropped.to_rgb8())
            }
            RenderSpec::Fit { size, watermark } => {
                let target = calculate_fit(source_dims, *size);
                let mut resized = source
                    .resize_exact(target.width, target.height, FilterType::Lanczos3)
                    .to_rgb8();
                if let Some(mark) = watermark {
                    if !watermark::apply(&mut resized, &mark.text, mark.font_size, mark.margin) {
                        tracing::debug!(
                            "Watermark does not fit {}x{}, skipped for {}",
                            target.width,
                            target.height,
                            output.display()
                        );
                    }
                }
                DynamicImage::ImageRgb8(resized)
            }
        };

        save_jpeg(&rendered, output, self.quality)?;
        Ok(Dimensions::new(rendered.width(), rendered.height()))
    }
}
