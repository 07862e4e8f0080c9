//! Slug normalization
//!
//! Slugs are lowercase ASCII: Cyrillic letters are transliterated with the
//! Bulgarian streamlined system, every other run of non-alphanumeric
//! characters becomes a single hyphen.

/// Slug used when a title has no usable characters
pub const FALLBACK_SLUG: &str = "article";

/// Latin spelling of a lowercase Cyrillic letter
fn transliterate(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' => "a",
        'ь' => "y",
        'ю' => "yu",
        'я' => "ya",
        // Russian letters that show up in quoted names
        'э' => "e",
        'ы' => "y",
        'ё' => "yo",
        _ => return None,
    };
    Some(latin)
}

/// Generate a URL-friendly slug from a title
///
/// Pure and deterministic. Returns [`FALLBACK_SLUG`] when nothing usable is
/// left, e.g. for `"!!!"` or an empty title.
pub fn generate_slug(title: &str) -> String {
    let mut result = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.to_lowercase().chars() {
        let piece = if c.is_ascii_alphanumeric() {
            Some(c.to_string())
        } else {
            transliterate(c).map(str::to_string)
        };

        match piece {
            Some(piece) => {
                // Collapse separator runs and never lead with a hyphen
                if pending_hyphen && !result.is_empty() {
                    result.push('-');
                }
                pending_hyphen = false;
                result.push_str(&piece);
            }
            None => pending_hyphen = true,
        }
    }

    if result.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        result
    }
}
