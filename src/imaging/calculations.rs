//! Pure dimension math for the derivative tiers.
//!
//! Everything here is integer arithmetic so results never depend on float
//! rounding.

use crate::model::Dimensions;

/// How to cut a source down to an exact box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropPlan {
    /// Size the source is scaled to before cropping; covers the target.
    pub scaled: Dimensions,
    pub x: u32,
    pub y: u32,
    pub target: Dimensions,
}

fn div_ceil(numerator: u64, denominator: u64) -> u32 {
    u32::try_from(numerator.div_ceil(denominator.max(1))).unwrap_or(u32::MAX)
}

/// A rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropPlan {
    /// The crop box mapped back onto the unscaled source.
    ///
    /// Cropping this window and resizing it straight to the target keeps the
    /// working buffer no larger than the source, however far the scaled
    /// size overhangs the box.
    pub fn source_window(&self, source: Dimensions) -> Window {
        let to_source = |v: u32, full: u32, scaled: u32| -> u32 {
            let mapped = v as u64 * full as u64 / (scaled as u64).max(1);
            u32::try_from(mapped).unwrap_or(u32::MAX).min(full.saturating_sub(1))
        };
        let x = to_source(self.x, source.width, self.scaled.width);
        let y = to_source(self.y, source.height, self.scaled.height);

        let width = div_ceil(
            self.target.width as u64 * source.width as u64,
            self.scaled.width as u64,
        );
        let height = div_ceil(
            self.target.height as u64 * source.height as u64,
            self.scaled.height as u64,
        );

        Window {
            x,
            y,
            width: width.max(1).min(source.width - x),
            height: height.max(1).min(source.height - y),
        }
    }
}

/// Scale so the limiting side matches the target box, then centre-crop.
///
/// The scale ratio is `min(w / cw, h / ch)`, so one scaled side equals the
/// box and the other overhangs it by an amount split evenly on both ends.
///
/// ```
/// # use gallerist::imaging::calculations::calculate_crop;
/// # use gallerist::model::Dimensions;
/// let plan = calculate_crop(Dimensions::new(400, 300), Dimensions::new(100, 100));
/// assert_eq!(plan.scaled, Dimensions::new(134, 100));
/// assert_eq!((plan.x, plan.y), (17, 0));
/// ```
pub fn calculate_crop(source: Dimensions, target: Dimensions) -> CropPlan {
    let (w, h) = (source.width as u64, source.height as u64);
    let (cw, ch) = (target.width as u64, target.height as u64);

    // w / cw <= h / ch  <=>  w * ch <= h * cw
    let scaled = if w * ch <= h * cw {
        Dimensions::new(target.width, div_ceil(h * cw, w))
    } else {
        Dimensions::new(div_ceil(w * ch, h), target.height)
    };

    CropPlan {
        scaled,
        x: scaled.width.saturating_sub(target.width) / 2,
        y: scaled.height.saturating_sub(target.height) / 2,
        target,
    }
}

/// Aspect-preserving size whose long edge is `size`.
///
/// Landscape sources get `width = size`; square and portrait sources get
/// `height = size`. The other side is rounded up. Upscaling is allowed.
pub fn calculate_fit(source: Dimensions, size: u32) -> Dimensions {
    let (w, h) = (source.width as u64, source.height as u64);
    if w > h {
        Dimensions::new(size, div_ceil(size as u64 * h, w))
    } else {
        Dimensions::new(div_ceil(size as u64 * w, h), size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions::new(width, height)
    }

    #[test]
    fn crop_landscape_into_square() {
        let plan = calculate_crop(dims(4000, 3000), dims(292, 292));
        // ratio = 3000 / 292; width = ceil(4000 * 292 / 3000) = 390
        assert_eq!(plan.scaled, dims(390, 292));
        assert_eq!((plan.x, plan.y), (49, 0));
    }

    #[test]
    fn crop_portrait_into_square() {
        let plan = calculate_crop(dims(3000, 4000), dims(292, 292));
        assert_eq!(plan.scaled, dims(292, 390));
        assert_eq!((plan.x, plan.y), (0, 49));
    }

    #[test]
    fn crop_same_aspect() {
        let plan = calculate_crop(dims(600, 600), dims(292, 292));
        assert_eq!(plan.scaled, dims(292, 292));
        assert_eq!((plan.x, plan.y), (0, 0));
    }

    #[test]
    fn crop_upscales_small_sources() {
        let plan = calculate_crop(dims(100, 50), dims(292, 292));
        assert_eq!(plan.scaled, dims(584, 292));
        assert_eq!((plan.x, plan.y), (146, 0));
    }

    #[test]
    fn crop_non_square_box() {
        let plan = calculate_crop(dims(1000, 1000), dims(400, 200));
        assert_eq!(plan.scaled, dims(400, 400));
        assert_eq!((plan.x, plan.y), (0, 100));
    }

    #[test]
    fn window_of_landscape_crop() {
        let source = dims(4000, 3000);
        let plan = calculate_crop(source, dims(292, 292));
        let window = plan.source_window(source);
        assert_eq!(
            window,
            Window {
                x: 502,
                y: 0,
                width: 2995,
                height: 3000
            }
        );
    }

    #[test]
    fn window_stays_small_at_extreme_aspect() {
        let source = dims(10_000, 1);
        let plan = calculate_crop(source, dims(292, 292));
        assert_eq!(plan.scaled, dims(2_920_000, 292));

        let window = plan.source_window(source);
        assert_eq!(
            window,
            Window {
                x: 4999,
                y: 0,
                width: 1,
                height: 1
            }
        );
    }

    #[test]
    fn window_of_same_aspect_is_whole_source() {
        let source = dims(600, 600);
        let window = calculate_crop(source, dims(292, 292)).source_window(source);
        assert_eq!(
            window,
            Window {
                x: 0,
                y: 0,
                width: 600,
                height: 600
            }
        );
    }

    #[test]
    fn fit_landscape() {
        assert_eq!(calculate_fit(dims(4000, 3000), 800), dims(800, 600));
        assert_eq!(calculate_fit(dims(1000, 333), 800), dims(800, 267));
    }

    #[test]
    fn fit_portrait_and_square() {
        assert_eq!(calculate_fit(dims(3000, 4000), 1440), dims(1080, 1440));
        assert_eq!(calculate_fit(dims(500, 500), 800), dims(800, 800));
    }

    #[test]
    fn fit_upscales() {
        assert_eq!(calculate_fit(dims(200, 100), 1440), dims(1440, 720));
    }
}
