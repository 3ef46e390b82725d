use unicode_normalization::UnicodeNormalization;
use unicode_properties::{GeneralCategory, UnicodeGeneralCategory};

/// Canonical form shared by every search mode: lowercase, canonical
/// decomposition with nonspacing marks (Mn) dropped, whitespace runs collapsed
/// to a single space and trimmed. Spacing marks (Mc) are part of the letter and
/// stay.
///
/// Pure and idempotent; `"Árbol"`, `"arbol"` and `"  ARBOL  "` all map to `"arbol"`.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| c.general_category() != GeneralCategory::NonspacingMark)
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_case_and_diacritics() {
        assert_eq!(normalize_text("Árbol"), "arbol");
        assert_eq!(normalize_text("arbol"), "arbol");
        assert_eq!(normalize_text("  ARBOL  "), "arbol");
        assert_eq!(
            normalize_text("¡Hola! ¿Cómo estás? Árbol, Niño, Perú."),
            "¡hola! ¿como estas? arbol, nino, peru."
        );
    }

    #[test]
    fn collapses_line_breaks_and_tabs() {
        assert_eq!(normalize_text("gato\n\n negro\tblanco"), "gato negro blanco");
        assert_eq!(normalize_text(" \n\t "), "");
    }

    #[test]
    fn handles_decomposed_input() {
        // "é" as "e" + U+0301
        assert_eq!(normalize_text("Cafe\u{301}"), "cafe");
        assert_eq!(normalize_text("\u{130}stanbul"), "istanbul");
    }

    #[test]
    fn keeps_spacing_marks() {
        // U+093F DEVANAGARI VOWEL SIGN I is Mc, U+094D VIRAMA is Mn
        assert_eq!(normalize_text("\u{915}\u{93F}"), "\u{915}\u{93F}");
        assert_eq!(normalize_text("\u{915}\u{94D}"), "\u{915}");
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(
            text in "[ \\t\\na-zA-Z0-9\\u{00C0}-\\u{024F}\\u{0300}-\\u{036F}]{0,64}"
        ) {
            let once = normalize_text(&text);
            prop_assert_eq!(normalize_text(&once), once.clone());
        }

        #[test]
        fn normalization_ignores_case_and_padding(word in "[a-z\\u{00E0}-\\u{00FC}]{1,16}") {
            let padded = format!("  {}  ", word.to_uppercase());
            prop_assert_eq!(normalize_text(&padded), normalize_text(&word));
        }
    }
}
