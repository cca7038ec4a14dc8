//! Domain records persisted in the `nodes` and `images` tables.

use std::fmt;

/// Structured metadata decoded from a gallery directory name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GalleryMeta {
    pub captured_at: String,
    pub title: String,
    pub event: String,
    pub location: String,
    pub city: String,
    pub country: String,
}

/// A directory participating in the gallery hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryNode {
    pub path: String,
    pub depth: i64,
    pub name: String,
    pub url: String,
    pub hash: String,
    pub meta: GalleryMeta,
}

/// A source photo as seen by the synchronisation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub path: String,
    pub depth: i64,
    pub name: String,
    pub parent: String,
    pub small: String,
    pub medium: String,
    pub large: String,
}

impl ImageRecord {
    pub fn id(&self, tier: Tier) -> &str {
        match tier {
            Tier::Small => &self.small,
            Tier::Medium => &self.medium,
            Tier::Large => &self.large,
        }
    }
}

/// Derivative size tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    Small,
    Medium,
    Large,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Small, Tier::Medium, Tier::Large];

    pub fn name(&self) -> &'static str {
        match self {
            Tier::Small => "small",
            Tier::Medium => "medium",
            Tier::Large => "large",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Width/height pair; `0` means "not yet known".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_known(&self) -> bool {
        self.width != 0 && self.height != 0
    }
}

/// Normalised EXIF attributes for one photo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifData {
    pub captured_at: String,
    pub fstop: String,
    pub exposure_time: String,
    pub iso_speed: String,
    pub exposure_bias: String,
    pub flash: String,
    pub metering_mode: String,
    pub focal_length: String,
    pub focal_length_35mm: String,
    pub camera_make: String,
    pub camera_model: String,
    pub lens_make: String,
    pub lens_model: String,
    pub software: String,
    pub description: String,
    pub copyright: String,
    pub gps: String,
    pub gps_latitude: f64,
    pub gps_longitude: f64,
    pub gps_altitude: f64,
}

/// Source and per-tier dimensions recorded by the derivative pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageDimensions {
    pub source: Dimensions,
    pub small: Dimensions,
    pub medium: Dimensions,
    pub large: Dimensions,
}

impl ImageDimensions {
    pub fn tier(&self, tier: Tier) -> Dimensions {
        match tier {
            Tier::Small => self.small,
            Tier::Medium => self.medium,
            Tier::Large => self.large,
        }
    }

    pub fn set_tier(&mut self, tier: Tier, dims: Dimensions) {
        match tier {
            Tier::Small => self.small = dims,
            Tier::Medium => self.medium = dims,
            Tier::Large => self.large = dims,
        }
    }
}
