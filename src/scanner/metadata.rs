use exif::{Exif, In, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::ExtractionError;
use crate::model::ExifData;

/// Read and normalise the EXIF block of one photo.
///
/// A photo without any EXIF block yields empty fields; only unreadable files
/// and malformed containers are errors.
pub fn extract_exif(path: &Path) -> Result<ExifData, ExtractionError> {
    let file = File::open(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut bufreader = BufReader::new(file);

    let exif = match exif::Reader::new().read_from_container(&mut bufreader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(ExifData::default()),
        Err(exif::Error::Io(source)) => {
            return Err(ExtractionError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
        Err(source) => {
            return Err(ExtractionError::Exif {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    Ok(normalize(&exif))
}

fn normalize(exif: &Exif) -> ExifData {
    let mut data = ExifData {
        captured_at: fix_datetime(&first_ascii(
            exif,
            &[Tag::DateTimeDigitized, Tag::DateTimeOriginal, Tag::DateTime],
        )),
        fstop: remove_precision(&zero_to_empty(format!(
            "{:.1}",
            rational(exif, Tag::FNumber).unwrap_or(0.0)
        ))),
        exposure_time: exposure_time(rational(exif, Tag::ExposureTime).unwrap_or(0.0)),
        iso_speed: zero_to_empty(uint(exif, Tag::PhotographicSensitivity).unwrap_or(0).to_string()),
        exposure_bias: zero_to_empty(format!(
            "{:.1}",
            rational(exif, Tag::ExposureBiasValue).unwrap_or(0.0)
        )),
        flash: flash(uint(exif, Tag::Flash).unwrap_or(0)).to_string(),
        metering_mode: metering_mode(uint(exif, Tag::MeteringMode).unwrap_or(0)).to_string(),
        focal_length: zero_to_empty(format!(
            "{:.0}",
            rational(exif, Tag::FocalLength).unwrap_or(0.0)
        )),
        focal_length_35mm: zero_to_empty(
            uint(exif, Tag::FocalLengthIn35mmFilm).unwrap_or(0).to_string(),
        ),
        camera_make: fix_camera_make(&ascii(exif, Tag::Make)),
        camera_model: fix_camera_model(&ascii(exif, Tag::Model)),
        lens_make: ascii(exif, Tag::LensMake),
        lens_model: fix_lens_model(&ascii(exif, Tag::LensModel)),
        software: ascii(exif, Tag::Software),
        description: ascii(exif, Tag::ImageDescription),
        copyright: ascii(exif, Tag::Copyright),
        ..ExifData::default()
    };

    if let (Some(lat), Some(lon)) = (
        gps_coordinate(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef),
        gps_coordinate(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef),
    ) {
        data.gps = format!("{} {}", lat.display(), lon.display());
        data.gps_latitude = lat.decimal();
        data.gps_longitude = lon.decimal();
    }

    if let Some(altitude) = rational(exif, Tag::GPSAltitude) {
        let below_sea_level = uint(exif, Tag::GPSAltitudeRef) == Some(1);
        data.gps_altitude = if below_sea_level { -altitude } else { altitude };
    }

    data
}

fn ascii(exif: &Exif, tag: Tag) -> String {
    match exif.get_field(tag, In::PRIMARY).map(|f| &f.value) {
        Some(Value::Ascii(parts)) => parts
            .first()
            .map(|p| {
                String::from_utf8_lossy(p)
                    .trim_matches(|c: char| c == '\0' || c.is_whitespace())
                    .to_string()
            })
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn first_ascii(exif: &Exif, tags: &[Tag]) -> String {
    tags.iter()
        .map(|&tag| ascii(exif, tag))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

fn rational(exif: &Exif, tag: Tag) -> Option<f64> {
    match &exif.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(v) => v.first().map(|r| r.to_f64()),
        Value::SRational(v) => v.first().map(|r| r.to_f64()),
        _ => None,
    }
}

fn uint(exif: &Exif, tag: Tag) -> Option<u32> {
    exif.get_field(tag, In::PRIMARY)?.value.get_uint(0)
}

struct Coordinate {
    degrees: f64,
    minutes: f64,
    seconds: f64,
    direction: String,
}

impl Coordinate {
    fn decimal(&self) -> f64 {
        let value = self.degrees + self.minutes / 60.0 + self.seconds / 3600.0;
        if self.direction == "S" || self.direction == "W" {
            -value
        } else {
            value
        }
    }

    fn display(&self) -> String {
        format!(
            "{:.0}°{:.0}'{:.0}\" {}",
            self.degrees, self.minutes, self.seconds, self.direction
        )
    }
}

fn gps_coordinate(exif: &Exif, value_tag: Tag, ref_tag: Tag) -> Option<Coordinate> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let Value::Rational(parts) = &field.value else {
        return None;
    };
    if parts.len() < 3 {
        return None;
    }
    Some(Coordinate {
        degrees: parts[0].to_f64(),
        minutes: parts[1].to_f64(),
        seconds: parts[2].to_f64(),
        direction: ascii(exif, ref_tag),
    })
}

fn fix_datetime(input: &str) -> String {
    // "2023:12:31 18:04:05" -> "2023-12-31 18:04:05"
    if input.len() >= 10 && input.is_ascii() {
        let mut bytes = input.as_bytes().to_vec();
        bytes[4] = b'-';
        bytes[7] = b'-';
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        input.to_string()
    }
}

fn exposure_time(seconds: f64) -> String {
    if seconds >= 1.0 {
        return format!("{:.0}", seconds);
    }
    let formatted = format!("1/{:.0}", 1.0 / seconds);
    if formatted == "1/inf" {
        String::new()
    } else {
        formatted
    }
}

fn flash(value: u32) -> &'static str {
    if value & 1 == 1 {
        "on"
    } else {
        "off"
    }
}

fn metering_mode(value: u32) -> &'static str {
    match value {
        0 => "Unknown",
        1 => "Average",
        2 => "Center-weighted average",
        3 => "Spot",
        4 => "Multi-spot",
        5 => "Multi-segment",
        6 => "Partial",
        _ => "Other",
    }
}

fn zero_to_empty(input: String) -> String {
    match input.as_str() {
        "0" | "0.0" | "-0" | "-0.0" => String::new(),
        _ => input,
    }
}

fn remove_precision(input: &str) -> String {
    input.replace(".0", "")
}

fn fix_camera_make(input: &str) -> String {
    match input {
        "NIKON" | "NIKON CORPORATION" | "Nikon Corporation" => "Nikon".to_string(),
        "FUJIFILM" => "Fujifilm".to_string(),
        _ => input.to_string(),
    }
}

fn fix_camera_model(input: &str) -> String {
    match input {
        "COOLPIX S5200" => "Nikon Coolpix S5200".to_string(),
        "X20" => "Fujifilm X20".to_string(),
        _ => match input.strip_prefix("NIKON") {
            Some(rest) if !rest.is_empty() => format!("Nikon{}", rest),
            _ => input.to_string(),
        },
    }
}

fn fix_lens_model(input: &str) -> String {
    let mut lens = input.replace(".0", "");

    // Canon mounts: exactly one space after "EF" / "EF-S".
    if let Some(idx) = lens.find("EF") {
        let mut prefix_end = idx + 2;
        if lens[prefix_end..].starts_with("-S") {
            prefix_end += 2;
        }
        let rest = lens[prefix_end..].strip_prefix(' ').unwrap_or(&lens[prefix_end..]);
        lens = format!("{} {}", &lens[..prefix_end], rest);
    }

    // "18-55mm" -> "18-55 mm"
    if let Some(idx) = lens.find("mm") {
        let head = lens[..idx].strip_suffix(' ').unwrap_or(&lens[..idx]);
        lens = format!("{} mm{}", head, &lens[idx + 2..]);
    }

    lens.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_fix_datetime() {
        assert_eq!(fix_datetime("2023:12:31 18:04:05"), "2023-12-31 18:04:05");
        assert_eq!(fix_datetime("short"), "short");
        assert_eq!(fix_datetime(""), "");
    }

    #[test]
    fn test_exposure_time() {
        assert_eq!(exposure_time(0.004), "1/250");
        assert_eq!(exposure_time(0.0), "");
        assert_eq!(exposure_time(2.0), "2");
    }

    #[test]
    fn test_zero_values_are_blank() {
        assert_eq!(zero_to_empty("0.0".to_string()), "");
        assert_eq!(zero_to_empty("-0.0".to_string()), "");
        assert_eq!(zero_to_empty("0".to_string()), "");
        assert_eq!(zero_to_empty("0.3".to_string()), "0.3");
        assert_eq!(remove_precision("8.0"), "8");
        assert_eq!(remove_precision("5.6"), "5.6");
    }

    #[test]
    fn test_flash_and_metering() {
        assert_eq!(flash(0x19), "on");
        assert_eq!(flash(0x10), "off");
        assert_eq!(metering_mode(5), "Multi-segment");
        assert_eq!(metering_mode(255), "Other");
    }

    #[test]
    fn test_camera_names() {
        assert_eq!(fix_camera_make("NIKON CORPORATION"), "Nikon");
        assert_eq!(fix_camera_make("FUJIFILM"), "Fujifilm");
        assert_eq!(fix_camera_make("Canon"), "Canon");
        assert_eq!(fix_camera_model("NIKON D750"), "Nikon D750");
        assert_eq!(fix_camera_model("COOLPIX S5200"), "Nikon Coolpix S5200");
        assert_eq!(fix_camera_model("X20"), "Fujifilm X20");
        assert_eq!(fix_camera_model("NIKON"), "NIKON");
    }

    #[test]
    fn test_lens_names() {
        assert_eq!(fix_lens_model("EF-S18-55mm f/3.5-5.6 IS"), "EF-S 18-55 mm f/3.5-5.6 IS");
        assert_eq!(fix_lens_model("EF50mm f/1.8 STM"), "EF 50 mm f/1.8 STM");
        assert_eq!(fix_lens_model("EF 24-70mm f/2.8L II USM"), "EF 24-70 mm f/2.8L II USM");
        assert_eq!(fix_lens_model("24.0-70.0 mm f/2.8"), "24-70 mm f/2.8");
        assert_eq!(fix_lens_model(""), "");
    }

    #[test]
    fn test_coordinate() {
        let coordinate = Coordinate {
            degrees: 48.0,
            minutes: 51.0,
            seconds: 36.0,
            direction: "S".to_string(),
        };
        assert!((coordinate.decimal() + 48.86).abs() < 1e-9);
        assert_eq!(coordinate.display(), "48°51'36\" S");
    }

    #[test]
    fn test_photo_without_exif() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.jpg");
        image::RgbImage::new(4, 4).save(&path).unwrap();

        assert_eq!(extract_exif(&path).unwrap(), ExifData::default());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = extract_exif(&dir.path().join("missing.jpg")).unwrap_err();
        assert!(matches!(err, ExtractionError::Io { .. }));
    }
}
