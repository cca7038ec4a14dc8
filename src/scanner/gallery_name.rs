//! Structured metadata encoded in gallery directory names.
//!
//! Layout: `[yymmdd]title § event § location § city, country`. Any field may
//! be blank or spelled `nil`/`null`.

use crate::model::GalleryMeta;

pub const DELIMITER: char = '§';

pub fn is_gallery_name(name: &str) -> bool {
    name.contains(DELIMITER)
}

pub fn parse(name: &str) -> GalleryMeta {
    if !is_gallery_name(name) {
        return GalleryMeta::default();
    }

    let captured_at = date_prefix(name);
    let mut tokens = name.split(DELIMITER);

    let mut title = tokens.next().unwrap_or("");
    if captured_at.is_some() {
        // The six digits are ASCII, so byte 6 is a char boundary.
        title = &title[6..];
    }
    let event = tokens.next().unwrap_or("");
    let location = tokens.next().unwrap_or("");
    let place = tokens.next().unwrap_or("");

    let (city, country) = match place.split_once(',') {
        Some((city, country)) => (city, country),
        None => (place, ""),
    };

    GalleryMeta {
        captured_at: captured_at.unwrap_or_default(),
        title: normalize(title),
        event: normalize(event),
        location: normalize(location),
        city: normalize(city),
        country: normalize(country),
    }
}

/// `yymmdd` prefix as `20yy-mm-dd 00:00:00`.
fn date_prefix(name: &str) -> Option<String> {
    let digits = name.get(..6)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!(
        "20{}-{}-{} 00:00:00",
        &digits[0..2],
        &digits[2..4],
        &digits[4..6]
    ))
}

fn normalize(token: &str) -> String {
    match token.trim() {
        "nil" | "null" => String::new(),
        other => other.to_string(),
    }
}
