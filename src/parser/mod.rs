//! Pure extraction from portal pages.
//!
//! Nothing in here talks to a browser: every function takes either a
//! [`DomSnapshot`](crate::browser::DomSnapshot) or a block of text and
//! returns typed records, so it can all be exercised against fixtures.

pub mod catalog;
pub mod class_text;
pub mod detail;

pub use catalog::extract_catalog_rows;
pub use class_text::parse_class;
pub use detail::{extract_class_blocks, extract_requirements};

/// Collapses runs of whitespace (including newlines and nbsp) into single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lenient integer parse for portal cells: leading digits count, anything else is 0.
pub fn parse_leading_int(text: &str) -> u32 {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  TURMA:\n\t01 \u{a0} Preferencial:  SIM "), "TURMA: 01 Preferencial: SIM");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_parse_leading_int() {
        assert_eq!(parse_leading_int(" 60 "), 60);
        assert_eq!(parse_leading_int("4h"), 4);
        assert_eq!(parse_leading_int("-"), 0);
        assert_eq!(parse_leading_int(""), 0);
    }
}
