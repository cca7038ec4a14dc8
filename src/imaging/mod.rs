//! Derivative rendering.
//!
//! - **Calculations**: pure dimension math for crop and fit
//! - **Watermark**: bitmap-font text stamping
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
pub mod calculations;
pub mod rust_backend;
pub mod watermark;

pub use backend::{ImageBackend, ImagingError, RenderSpec, WatermarkSpec};
pub use rust_backend::RustBackend;
