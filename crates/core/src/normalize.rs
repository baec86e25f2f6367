//! Legacy orthography normalization.
//!
//! Historical corpora carry decomposed letter forms (combining e above,
//! long s, r rotunda, ...) that would throw off character offsets and
//! string matching. Context fields are rewritten with this fixed table
//! before any offset-dependent validation runs.

/// Substitution table: decomposed historical form -> precomposed modern
/// equivalent. Applied in order.
pub const LEGACY_FORMS: &[(&str, &str)] = &[
    ("a\u{0364}", "ä"),
    ("o\u{0364}", "ö"),
    ("u\u{0364}", "ü"),
    ("A\u{0364}", "Ä"),
    ("O\u{0364}", "Ö"),
    ("U\u{0364}", "Ü"),
    ("\u{017F}", "s"),
    ("\u{A75B}", "r"),
    ("m\u{0303}", "mm"),
    ("æ", "ae"),
    ("Æ", "Ae"),
];

/// Replace every legacy letter form in `text` with its modern equivalent.
pub fn normalize(text: &str) -> String {
    let mut out = text.to_string();
    for (from, to) in LEGACY_FORMS {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_umlaut_forms() {
        assert_eq!(normalize("Scho\u{0364}nheit"), "Schönheit");
        assert_eq!(normalize("U\u{0364}bung"), "Übung");
    }

    #[test]
    fn replaces_long_s_and_ligatures() {
        assert_eq!(normalize("Wa\u{017F}\u{017F}er"), "Wasser");
        assert_eq!(normalize("Cæsar"), "Caesar");
    }

    #[test]
    fn leaves_modern_text_alone() {
        let text = "ein ganz normaler Satz";
        assert_eq!(normalize(text), text);
    }
}
