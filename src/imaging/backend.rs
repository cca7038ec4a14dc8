//! Image backend trait and shared types.
//!
//! The derivative pass only needs two operations: decode a source once, then
//! render it into each stale tier. [`RustBackend`](super::RustBackend) is the
//! production implementation; tests swap in a recording mock.

use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::calculations::{calculate_crop, calculate_fit};
use crate::model::Dimensions;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkSpec {
    pub text: String,
    pub font_size: u32,
    pub margin: u32,
}

/// What one tier looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderSpec {
    /// Scale to cover the box, then centre-crop to it exactly.
    Crop { width: u32, height: u32 },
    /// Aspect-preserving resize to a long edge of `size`.
    Fit {
        size: u32,
        watermark: Option<WatermarkSpec>,
    },
}

impl RenderSpec {
    /// Output dimensions for a source of the given size.
    pub fn output_dimensions(&self, source: Dimensions) -> Dimensions {
        match self {
            RenderSpec::Crop { width, height } => {
                calculate_crop(source, Dimensions::new(*width, *height)).target
            }
            RenderSpec::Fit { size, .. } => calculate_fit(source, *size),
        }
    }
}

/// Trait for image processing backends.
///
/// Implementations must be `Sync`: one backend is shared by every worker.
pub trait ImageBackend: Sync {
    /// Decode a source photo.
    fn decode(&self, path: &Path) -> Result<DynamicImage, ImagingError>;

    /// Render `source` according to `spec` and write it to `output`.
    /// Returns the dimensions of the written file.
    fn render(
        &self,
        source: &DynamicImage,
        spec: &RenderSpec,
        output: &Path,
    ) -> Result<Dimensions, ImagingError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock backend that records operations instead of processing pixels.
    ///
    /// `decode` hands back a blank image of a fixed size; `render` creates an
    /// empty file at the output path so presence checks see it.
    pub struct MockBackend {
        pub source: Dimensions,
        pub operations: Mutex<Vec<RecordedOp>>,
        pub fail_decode: Vec<String>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Decode(String),
        Render {
            output: String,
            spec: RenderSpec,
        },
    }

    impl MockBackend {
        pub fn new(source: Dimensions) -> Self {
            Self {
                source,
                operations: Mutex::new(Vec::new()),
                fail_decode: Vec::new(),
            }
        }

        pub fn failing_on(mut self, file_name: &str) -> Self {
            self.fail_decode.push(file_name.to_string());
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn decode_count(&self) -> usize {
            self.get_operations()
                .iter()
                .filter(|op| matches!(op, RecordedOp::Decode(_)))
                .count()
        }

        pub fn render_count(&self) -> usize {
            self.get_operations()
                .iter()
                .filter(|op| matches!(op, RecordedOp::Render { .. }))
                .count()
        }
    }

    impl ImageBackend for MockBackend {
        fn decode(&self, path: &Path) -> Result<DynamicImage, ImagingError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Decode(path.to_string_lossy().to_string()));

            let name = path.file_name().unwrap().to_string_lossy().to_string();
            if self.fail_decode.contains(&name) {
                return Err(ImagingError::Decode {
                    path: path.to_path_buf(),
                    message: "mock failure".to_string(),
                });
            }
            Ok(DynamicImage::new_rgb8(self.source.width, self.source.height))
        }

        fn render(
            &self,
            source: &DynamicImage,
            spec: &RenderSpec,
            output: &Path,
        ) -> Result<Dimensions, ImagingError> {
            self.operations.lock().unwrap().push(RecordedOp::Render {
                output: output.to_string_lossy().to_string(),
                spec: spec.clone(),
            });
            std::fs::write(output, b"").map_err(|source| ImagingError::Io {
                path: output.to_path_buf(),
                source,
            })?;
            Ok(spec.output_dimensions(Dimensions::new(source.width(), source.height())))
        }
    }

    #[test]
    fn mock_records_decode_and_render() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::new(Dimensions::new(400, 300));

        let image = backend.decode(Path::new("/photos/a.jpg")).unwrap();
        let output = dir.path().join("out.jpg");
        let dims = backend
            .render(
                &image,
                &RenderSpec::Fit {
                    size: 800,
                    watermark: None,
                },
                &output,
            )
            .unwrap();

        assert_eq!(dims, Dimensions::new(800, 600));
        assert!(output.exists());
        assert_eq!(backend.decode_count(), 1);
        assert_eq!(backend.render_count(), 1);
    }

    #[test]
    fn output_dimensions_per_spec() {
        let source = Dimensions::new(4000, 3000);
        assert_eq!(
            RenderSpec::Crop {
                width: 292,
                height: 292
            }
            .output_dimensions(source),
            Dimensions::new(292, 292)
        );
        assert_eq!(
            RenderSpec::Fit {
                size: 1440,
                watermark: None
            }
            .output_dimensions(source),
            Dimensions::new(1440, 1080)
        );
    }
}
