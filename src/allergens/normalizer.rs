//! Tag and keyword cleanup shared by display code and dictionary lookups.

/// Turns a raw taxonomy tag (`en:sesame-seeds`) or matched keyword into a display label
/// (`Sesame seeds`). Never fails; input without a locale prefix is only cleaned up.
pub fn normalize(raw: &str) -> String {
    let cleaned = strip_locale_prefix(raw.trim()).replace(['-', '_'], " ");
    capitalize_first(cleaned.trim())
}

/// Lower-cased form of [`normalize`] with whitespace runs collapsed, used as the key for
/// exact tag matching.
pub fn lookup_key(raw: &str) -> String {
    normalize(raw)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Removes a two-letter language prefix such as `en:` or `fr:`.
pub fn strip_locale_prefix(raw: &str) -> &str {
    let bytes = raw.as_bytes();
    if bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1].is_ascii_alphabetic()
        && bytes[2] == b':'
    {
        &raw[3..]
    } else {
        raw
    }
}

fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        Some(_) => value.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_prefix_and_separators() {
        assert_eq!(normalize("en:sesame-seeds"), "Sesame seeds");
        assert_eq!(normalize("fr:fruits_a_coque"), "Fruits a coque");
        assert_eq!(normalize("de:milch"), "Milch");
    }

    #[test]
    fn leaves_unprefixed_text_alone_apart_from_casing() {
        assert_eq!(normalize("milk"), "Milk");
        assert_eq!(normalize("Already Cased"), "Already Cased");
        assert_eq!(normalize("  spaced  "), "Spaced");
    }

    #[test]
    fn only_two_letter_prefixes_are_stripped() {
        assert_eq!(normalize("eng:milk"), "Eng:milk");
        assert_eq!(normalize("e:milk"), "E:milk");
        assert_eq!(normalize("12:milk"), "12:milk");
    }

    #[test]
    fn handles_empty_and_non_ascii_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("en:"), "");
        assert_eq!(normalize("fr:œufs"), "Œufs");
        assert_eq!(normalize("ésame"), "Ésame");
    }

    #[test]
    fn lookup_key_is_case_insensitive_and_collapses_whitespace() {
        assert_eq!(lookup_key("EN:Sesame--Seeds"), "sesame seeds");
        assert_eq!(lookup_key("Soybeans"), "soybeans");
        assert_eq!(lookup_key("en:soybeans"), lookup_key("SOYBEANS"));
    }
}
