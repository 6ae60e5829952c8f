//! Label text handling: wrapping and font-name parsing.

use crate::fonts::FontRequest;

/// Everything the wrapping decision looks at besides the text itself.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct WrapHints {
    /// Declared `text-max-width`, in em.
    pub max_width_em: Option<f64>,
    /// Declared `text-line-height`. Only an explicit value above 1 counts as wrapping intent.
    pub line_height: Option<f64>,
    /// Whether the label is anchored with a vertical component (top/bottom), which is how the
    /// renderer positions labels it intends to stack.
    pub vertical_anchor: bool,
}

/// Em-per-character approximation used to turn an em width into a character budget.
const EM_PER_CHARACTER: f64 = 0.6;

/// Default `text-max-width` of the style language, used when wrapping intent exists but no
/// width was declared.
const DEFAULT_MAX_WIDTH_EM: f64 = 10.;

/// Break a label into lines.
///
/// Wrapping happens only on positive evidence of multi-line intent; a long single-line label
/// stays single-line rather than over-wrapping short proper nouns. Hyphenated two-part names
/// split at the hyphen; two-word names stay together when they roughly fit the budget, longer
/// names pack greedily.
pub(crate) fn wrap_label(text: &str, hints: &WrapHints) -> Vec<String> {
    let has_break_characters = text.contains(' ') || text.contains('-');
    let wants_wrapping = hints.line_height.is_some_and(|height| height > 1.)
        || (hints.max_width_em.is_some() && hints.vertical_anchor && has_break_characters);

    if !wants_wrapping || !has_break_characters {
        return vec![text.to_owned()];
    }

    let budget = character_budget(hints);

    // Hyphenated two-part names split exactly at the hyphen, keeping it on the first line.
    if !text.contains(' ') {
        if let Some((head, tail)) = text.split_once('-') {
            if !tail.contains('-') {
                return vec![format!("{head}-"), tail.to_owned()];
            }
        }
        return vec![text.to_owned()];
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    match words.as_slice() {
        [] => vec![String::new()],
        [only] => vec![(*only).to_owned()],
        [first, second] => {
            if text.chars().count() as f64 <= budget as f64 * 1.2 {
                vec![text.to_owned()]
            } else {
                vec![(*first).to_owned(), (*second).to_owned()]
            }
        }
        words => pack_greedily(words, budget),
    }
}

fn character_budget(hints: &WrapHints) -> usize {
    let width = hints.max_width_em.unwrap_or(DEFAULT_MAX_WIDTH_EM);
    ((width * EM_PER_CHARACTER).round() as usize).max(1)
}

fn pack_greedily(words: &[&str], budget: usize) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in words {
        if current.is_empty() {
            current.push_str(word);
        } else if current.chars().count() + 1 + word.chars().count() <= budget {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Weight keywords recognized in requested font names.
const WEIGHT_KEYWORDS: [(&str, u16); 7] = [
    ("bold", 700),
    ("light", 300),
    ("medium", 500),
    ("black", 900),
    ("semibold", 600),
    ("regular", 400),
    ("normal", 400),
];

/// Style keywords stripped from the family without affecting the weight.
const STYLE_KEYWORDS: [&str; 2] = ["italic", "oblique"];

/// Derive the canonical family and weight from a requested font-name list, e.g.
/// `["DIN Pro Medium", "Arial Unicode MS Regular"]` -> ("DIN Pro", 500). Only the first entry
/// decides; the rest are renderer-side fallbacks.
pub(crate) fn font_request(names: &[String]) -> FontRequest {
    let Some(first) = names.first() else {
        return FontRequest {
            family: "sans-serif".to_owned(),
            weight: 400,
        };
    };

    let mut weight = 400;
    let mut family_tokens: Vec<&str> = Vec::new();

    for token in first.split_whitespace() {
        let lowered = token.to_ascii_lowercase();
        if let Some((_, keyword_weight)) = WEIGHT_KEYWORDS
            .iter()
            .find(|(keyword, _)| *keyword == lowered)
        {
            weight = *keyword_weight;
        } else if !STYLE_KEYWORDS.contains(&lowered.as_str()) {
            family_tokens.push(token);
        }
    }

    let family = if family_tokens.is_empty() {
        first.clone()
    } else {
        family_tokens.join(" ")
    };

    FontRequest { family, weight }
}
