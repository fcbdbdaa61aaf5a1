/// Right isolate / pop-isolate marks wrapped around parenthesized percent
/// groups so bidi resolution cannot leak across the group boundary.
pub(crate) const RLI: char = '\u{2067}';
pub(crate) const PDI: char = '\u{2069}';

/// U+066A ARABIC PERCENT SIGN, the canonical percent glyph in output text.
pub(crate) const ARABIC_PERCENT: char = '\u{066A}';

const ARABIC_INDIC_DIGITS: [char; 10] = ['٠', '١', '٢', '٣', '٤', '٥', '٦', '٧', '٨', '٩'];

/// Directional formatting marks carry no width and no glyph. Measurement
/// and the PDF text encoders skip them instead of drawing a missing glyph.
pub(crate) fn is_zero_width_mark(ch: char) -> bool {
    matches!(ch, '\u{2066}'..='\u{2069}' | '\u{200E}' | '\u{200F}')
}

/// Strings the upstream web layer is known to leak into report fields.
/// Matched as whole tokens only, never inside a longer word.
const LEAKAGE_TOKENS: [&str; 5] = ["undefined", "null", "NaN", "[object Object]", "&nbsp;"];

/// Normalizes one logical string for rendering: strips leakage tokens,
/// collapses whitespace, canonicalizes percent markers to a single trailing
/// glyph, maps Western digits to Arabic-Indic, and isolates parenthesized
/// percent groups. Pure and stable under re-application.
pub fn normalize(input: &str) -> String {
    let stripped = strip_leakage_tokens(input);
    let collapsed: String = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let percent = canonicalize_percent(&collapsed);
    let digits = map_digits(&percent);
    isolate_percent_groups(&digits)
}

fn strip_leakage_tokens(input: &str) -> String {
    let mut out = input.to_string();
    for token in LEAKAGE_TOKENS {
        out = strip_token(&out, token);
    }
    out
}

fn strip_token(input: &str, token: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find(token) {
        let before_ok = rest[..pos]
            .chars()
            .next_back()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(true);
        let after = &rest[pos + token.len()..];
        let after_ok = after
            .chars()
            .next()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(true);
        out.push_str(&rest[..pos]);
        if !(before_ok && after_ok) {
            out.push_str(token);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

fn is_any_digit(ch: char) -> bool {
    ch.is_ascii_digit() || ARABIC_INDIC_DIGITS.contains(&ch)
}

fn is_percent(ch: char) -> bool {
    ch == '%' || ch == ARABIC_PERCENT
}

/// Moves a percent marker that immediately precedes a digit run to trailing
/// position and rewrites every percent marker as U+066A, so percent always
/// follows its number in logical order.
fn canonicalize_percent(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if is_percent(ch) && i + 1 < chars.len() && is_any_digit(chars[i + 1]) {
            let mut j = i + 1;
            while j < chars.len() && is_any_digit(chars[j]) {
                out.push(chars[j]);
                j += 1;
            }
            out.push(ARABIC_PERCENT);
            i = j;
        } else if is_percent(ch) {
            out.push(ARABIC_PERCENT);
            i += 1;
        } else {
            out.push(ch);
            i += 1;
        }
    }
    out
}

fn map_digits(input: &str) -> String {
    input
        .chars()
        .map(|ch| {
            if ch.is_ascii_digit() {
                ARABIC_INDIC_DIGITS[(ch as u8 - b'0') as usize]
            } else {
                ch
            }
        })
        .collect()
}

/// Wraps `(...)` groups that contain the percent glyph in RLI/PDI isolates.
/// Groups already preceded by an isolate initiator are left alone.
fn isolate_percent_groups(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 4);
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '(' {
            let already_isolated = i > 0 && chars[i - 1] == RLI;
            if let Some(close) = chars[i..].iter().position(|&c| c == ')') {
                let close = i + close;
                let has_percent = chars[i..=close].iter().any(|&c| c == ARABIC_PERCENT);
                if has_percent && !already_isolated {
                    out.push(RLI);
                    for &c in &chars[i..=close] {
                        out.push(c);
                    }
                    out.push(PDI);
                    i = close + 1;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn western_digits_become_arabic_indic() {
        assert_eq!(normalize("2024"), "٢٠٢٤");
        assert_eq!(normalize("من 10 إلى 25"), "من ١٠ إلى ٢٥");
    }

    #[test]
    fn trailing_percent_uses_the_canonical_glyph() {
        assert_eq!(normalize("82%"), "٨٢٪");
    }

    #[test]
    fn leading_percent_moves_behind_its_number() {
        assert_eq!(normalize("%82"), "٨٢٪");
        assert_eq!(normalize("النتيجة %75 تقريبا"), "النتيجة ٧٥٪ تقريبا");
    }

    #[test]
    fn lone_percent_still_canonicalized() {
        assert_eq!(normalize("نسبة %"), "نسبة ٪");
    }

    #[test]
    fn leakage_tokens_are_stripped_whole_word_only() {
        assert_eq!(normalize("النتيجة undefined هنا"), "النتيجة هنا");
        assert_eq!(normalize("score: NaN"), "score:");
        assert_eq!(normalize("[object Object]"), "");
        // Substrings inside longer words survive.
        assert_eq!(normalize("nullable"), "nullable");
    }

    #[test]
    fn whitespace_collapses_and_trims() {
        assert_eq!(normalize("  ab\t\tcd \n ef  "), "ab cd ef");
    }

    #[test]
    fn percent_groups_in_parens_get_isolated() {
        let out = normalize("المحور (82%)");
        assert_eq!(out, format!("المحور {RLI}(٨٢٪){PDI}"));
    }

    #[test]
    fn parens_without_percent_stay_plain() {
        let out = normalize("المحور (الأول)");
        assert!(!out.contains(RLI));
        assert!(!out.contains(PDI));
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "82%",
            "%49.6",
            "المحور (82%) undefined",
            "من 10 إلى 25",
            "",
            "نص عربي بلا أرقام",
            "mixed عربي and English 42%",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not stable for {sample:?}");
        }
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert_eq!(normalize(""), "");
    }
}
