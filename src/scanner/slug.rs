//! URL-safe slugs for gallery node paths.

use super::gallery_name::DELIMITER;

const DELETED: &[char] = &[
    '.', ',', '#', '"', '%', '=', '?', '\'', '(', ')', '[', ']', '{', '}', '|', '~', '*',
];

const REPLACEMENTS: &[(char, &str)] = &[
    ('ß', "ss"),
    ('æ', "ae"),
    ('é', "e"),
    ('è', "e"),
    ('ê', "e"),
    ('²', "2"),
    ('³', "3"),
    ('ä', "ae"),
    ('ö', "oe"),
    ('ü', "ue"),
];

/// Slug for a relative gallery path.
///
/// Each path segment is lowercased, loses everything from the first metadata
/// delimiter on, and has separators and runs of spaces collapsed into single
/// dashes. Segments are joined with `-`.
pub fn slugify(path: &str) -> String {
    let joined = path
        .split(|c: char| c == '/' || c == '\\')
        .filter(|segment| !segment.is_empty())
        .map(slugify_segment)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    collapse_dashes(&joined)
}

fn slugify_segment(segment: &str) -> String {
    let head = match segment.find(DELIMITER) {
        Some(idx) => &segment[..idx],
        None => segment,
    };

    let mut slug = String::with_capacity(head.len());
    for ch in head.trim_end().chars().flat_map(char::to_lowercase) {
        if DELETED.contains(&ch) {
            continue;
        }
        if let Some((_, replacement)) = REPLACEMENTS.iter().find(|(from, _)| *from == ch) {
            slug.push_str(replacement);
            continue;
        }
        match ch {
            '$' | '&' | ' ' => slug.push('-'),
            _ => slug.push(ch),
        }
    }
    collapse_dashes(&slug)
}

fn collapse_dashes(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch == '-' && out.ends_with('-') {
            continue;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path() {
        assert_eq!(slugify("2023/Summer Trip"), "2023-summer-trip");
    }

    #[test]
    fn test_metadata_tail_is_dropped() {
        assert_eq!(
            slugify("2023/231231 Trip § Reunion § Hall § Paris, France"),
            "2023-231231-trip"
        );
    }

    #[test]
    fn test_each_segment_keeps_its_title() {
        assert_eq!(
            slugify("190704 Tour § Open Air/190705 Encore § nil"),
            "190704-tour-190705-encore"
        );
    }

    #[test]
    fn test_special_characters() {
        assert_eq!(slugify("Café (Day 1) & Night"), "cafe-day-1-night");
        assert_eq!(slugify("Größe $5"), "groesse-5");
        assert_eq!(slugify("a.b,c#d?e"), "abcde");
    }

    #[test]
    fn test_repeated_spaces_collapse() {
        assert_eq!(slugify("A   B -  C"), "a-b-c");
    }

    #[test]
    fn test_backslash_separators() {
        assert_eq!(slugify("2023\\Trip"), "2023-trip");
    }
}
