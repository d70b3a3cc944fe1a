//! Telugu script reference tables used while proofreading.
//!
//! Consonants, the vowel-sign forms of a consonant, and a short list of
//! conjuncts that OCR commonly gets wrong.

use serde::Serialize;

use crate::preferences::TranslitScheme;

pub const VIRAMA: char = '\u{0C4D}';
pub const ANUSVARA: char = '\u{0C02}';
pub const VISARGA: char = '\u{0C03}';

/// Assigned consonant letters of the Telugu block. Independent vowels
/// (U+0C05..=U+0C14), avagraha (U+0C3D) and the vocalic letters
/// (U+0C60..=U+0C61) are not consonants.
const CONSONANT_RANGES: [(u32, u32); 4] = [
    (0x0C15, 0x0C28),
    (0x0C2A, 0x0C39),
    (0x0C58, 0x0C5A),
    (0x0C5D, 0x0C5D),
];

/// Dependent vowel signs, with the inherent `a` first.
const VOWEL_SIGNS: [(&str, &str); 14] = [
    ("a", ""),
    ("ā", "\u{0C3E}"),
    ("i", "\u{0C3F}"),
    ("ī", "\u{0C40}"),
    ("u", "\u{0C41}"),
    ("ū", "\u{0C42}"),
    ("ṛ", "\u{0C43}"),
    ("ṝ", "\u{0C44}"),
    ("e", "\u{0C46}"),
    ("ē", "\u{0C47}"),
    ("ai", "\u{0C48}"),
    ("o", "\u{0C4A}"),
    ("ō", "\u{0C4B}"),
    ("au", "\u{0C4C}"),
];

const CONJUNCT_PAIRS: [(char, char); 22] = [
    ('క', 'క'),
    ('ప', 'ప'),
    ('త', 'త'),
    ('న', 'న'),
    ('మ', 'మ'),
    ('ల', 'ల'),
    ('స', 'స'),
    ('క', 'ర'),
    ('గ', 'ర'),
    ('ప', 'ర'),
    ('బ', 'ర'),
    ('ద', 'ర'),
    ('త', 'ర'),
    ('శ', 'ర'),
    ('స', 'ర'),
    ('స', 'త'),
    ('స', 'థ'),
    ('స', 'ప'),
    ('స', 'క'),
    ('స', 'ట'),
    ('క', 'ష'),
    ('జ', 'ఞ'),
];

const CONJUNCT_CLUSTERS: [&[char]; 2] = [&['స', 'త', 'ర'], &['శ', 'ర', 'మ']];

/// A glyph and what to call it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlyphForm {
    pub glyph: String,
    pub label: String,
}

/// A hard-to-type word with how to enter it in each input scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypingExample {
    pub glyph: &'static str,
    pub itrans: &'static str,
    pub hk: &'static str,
    pub iast: &'static str,
}

impl TypingExample {
    pub fn input_for(&self, scheme: TranslitScheme) -> &'static str {
        match scheme {
            TranslitScheme::Itrans => self.itrans,
            TranslitScheme::Hk => self.hk,
            TranslitScheme::Iast => self.iast,
        }
    }
}

pub static TYPING_EXAMPLES: [TypingExample; 2] = [
    TypingExample {
        glyph: "ఙ్మ",
        itrans: "~Nma",
        hk: "Gma",
        iast: "ṅma",
    },
    TypingExample {
        glyph: "వాఙ్మయ",
        itrans: "vA~Nmaya",
        hk: "vAGmaya",
        iast: "vāṅmaya",
    },
];

pub fn consonants() -> Vec<char> {
    CONSONANT_RANGES
        .iter()
        .flat_map(|&(start, end)| (start..=end).filter_map(char::from_u32))
        .collect()
}

pub fn is_consonant(c: char) -> bool {
    let cp = c as u32;
    CONSONANT_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&cp))
}

/// Join consonants with virama into a stacked cluster.
pub fn cluster(parts: &[char]) -> String {
    let mut out = String::new();
    for (i, c) in parts.iter().enumerate() {
        if i > 0 {
            out.push(VIRAMA);
        }
        out.push(*c);
    }
    out
}

/// Every vowel-sign form of `consonant`, followed by its virama, anusvara
/// and visarga forms. Duplicates are dropped in order.
pub fn vowel_forms(consonant: &str) -> Vec<GlyphForm> {
    if consonant.is_empty() {
        return Vec::new();
    }

    let signs = VOWEL_SIGNS
        .iter()
        .map(|&(label, sign)| (label, sign.to_string()))
        .chain([
            ("virāma", VIRAMA.to_string()),
            ("anusvāra", ANUSVARA.to_string()),
            ("visarga", VISARGA.to_string()),
        ]);

    let mut forms: Vec<GlyphForm> = Vec::new();
    for (label, sign) in signs {
        let glyph = format!("{}{}", consonant, sign);
        if forms.iter().any(|f| f.glyph == glyph) {
            continue;
        }
        forms.push(GlyphForm {
            glyph,
            label: label.to_string(),
        });
    }
    forms
}

/// Common conjuncts: two-consonant pairs, then the longer clusters.
pub fn common_conjuncts() -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let glyphs = CONJUNCT_PAIRS
        .iter()
        .map(|&(a, b)| cluster(&[a, b]))
        .chain(CONJUNCT_CLUSTERS.iter().map(|parts| cluster(parts)));
    for glyph in glyphs {
        if !out.contains(&glyph) {
            out.push(glyph);
        }
    }
    out
}
