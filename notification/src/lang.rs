/// Normalizes a language tag by replacing `-` with `_` (e.g. `en-US` →
/// `en_us`). Idempotent and case-folding to lowercase.
pub fn normalize_lang(lang: &str) -> String {
    lang.to_lowercase().replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_hyphenated_tag() {
        assert_eq!(normalize_lang("en-US"), "en_us");
    }

    #[test]
    fn is_idempotent() {
        let once = normalize_lang("en-US");
        assert_eq!(normalize_lang(&once), once);
    }
}
