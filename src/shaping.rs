//! Contextual shaping for the Arabic block: picks the isolated/initial/
//! medial/final presentation form (U+FE70..U+FEFF) per letter from the
//! joining state of its neighbors, and collapses the mandatory Lam-Alef
//! pairs into their ligature codepoints. Everything outside the Arabic
//! block passes through untouched. Full OpenType shaping (GSUB/GPOS) is
//! deliberately out of scope.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joining {
    /// Joins to both neighbors (most letters).
    Dual,
    /// Joins only to the preceding letter (alef, dal, reh, waw group).
    Right,
    /// Never joins (hamza).
    Isolated,
    /// Combining marks: invisible to joining decisions.
    Transparent,
    /// Tatweel: joins both ways and forces joining across it.
    Causing,
}

/// `[isolated, final, initial, medial]` presentation forms for one letter.
/// Right-joining letters repeat isolated/final in the initial/medial slots.
fn letter_entry(ch: char) -> Option<(Joining, [char; 4])> {
    let entry = match ch {
        // hamza
        '\u{0621}' => (Joining::Isolated, ['\u{FE80}', '\u{FE80}', '\u{FE80}', '\u{FE80}']),
        // alef madda
        '\u{0622}' => (Joining::Right, ['\u{FE81}', '\u{FE82}', '\u{FE81}', '\u{FE82}']),
        // alef hamza above
        '\u{0623}' => (Joining::Right, ['\u{FE83}', '\u{FE84}', '\u{FE83}', '\u{FE84}']),
        // waw hamza
        '\u{0624}' => (Joining::Right, ['\u{FE85}', '\u{FE86}', '\u{FE85}', '\u{FE86}']),
        // alef hamza below
        '\u{0625}' => (Joining::Right, ['\u{FE87}', '\u{FE88}', '\u{FE87}', '\u{FE88}']),
        // yeh hamza
        '\u{0626}' => (Joining::Dual, ['\u{FE89}', '\u{FE8A}', '\u{FE8B}', '\u{FE8C}']),
        // alef
        '\u{0627}' => (Joining::Right, ['\u{FE8D}', '\u{FE8E}', '\u{FE8D}', '\u{FE8E}']),
        // beh
        '\u{0628}' => (Joining::Dual, ['\u{FE8F}', '\u{FE90}', '\u{FE91}', '\u{FE92}']),
        // teh marbuta
        '\u{0629}' => (Joining::Right, ['\u{FE93}', '\u{FE94}', '\u{FE93}', '\u{FE94}']),
        // teh
        '\u{062A}' => (Joining::Dual, ['\u{FE95}', '\u{FE96}', '\u{FE97}', '\u{FE98}']),
        // theh
        '\u{062B}' => (Joining::Dual, ['\u{FE99}', '\u{FE9A}', '\u{FE9B}', '\u{FE9C}']),
        // jeem
        '\u{062C}' => (Joining::Dual, ['\u{FE9D}', '\u{FE9E}', '\u{FE9F}', '\u{FEA0}']),
        // hah
        '\u{062D}' => (Joining::Dual, ['\u{FEA1}', '\u{FEA2}', '\u{FEA3}', '\u{FEA4}']),
        // khah
        '\u{062E}' => (Joining::Dual, ['\u{FEA5}', '\u{FEA6}', '\u{FEA7}', '\u{FEA8}']),
        // dal
        '\u{062F}' => (Joining::Right, ['\u{FEA9}', '\u{FEAA}', '\u{FEA9}', '\u{FEAA}']),
        // thal
        '\u{0630}' => (Joining::Right, ['\u{FEAB}', '\u{FEAC}', '\u{FEAB}', '\u{FEAC}']),
        // reh
        '\u{0631}' => (Joining::Right, ['\u{FEAD}', '\u{FEAE}', '\u{FEAD}', '\u{FEAE}']),
        // zain
        '\u{0632}' => (Joining::Right, ['\u{FEAF}', '\u{FEB0}', '\u{FEAF}', '\u{FEB0}']),
        // seen
        '\u{0633}' => (Joining::Dual, ['\u{FEB1}', '\u{FEB2}', '\u{FEB3}', '\u{FEB4}']),
        // sheen
        '\u{0634}' => (Joining::Dual, ['\u{FEB5}', '\u{FEB6}', '\u{FEB7}', '\u{FEB8}']),
        // sad
        '\u{0635}' => (Joining::Dual, ['\u{FEB9}', '\u{FEBA}', '\u{FEBB}', '\u{FEBC}']),
        // dad
        '\u{0636}' => (Joining::Dual, ['\u{FEBD}', '\u{FEBE}', '\u{FEBF}', '\u{FEC0}']),
        // tah
        '\u{0637}' => (Joining::Dual, ['\u{FEC1}', '\u{FEC2}', '\u{FEC3}', '\u{FEC4}']),
        // zah
        '\u{0638}' => (Joining::Dual, ['\u{FEC5}', '\u{FEC6}', '\u{FEC7}', '\u{FEC8}']),
        // ain
        '\u{0639}' => (Joining::Dual, ['\u{FEC9}', '\u{FECA}', '\u{FECB}', '\u{FECC}']),
        // ghain
        '\u{063A}' => (Joining::Dual, ['\u{FECD}', '\u{FECE}', '\u{FECF}', '\u{FED0}']),
        // tatweel keeps its own codepoint in every position
        '\u{0640}' => (Joining::Causing, ['\u{0640}', '\u{0640}', '\u{0640}', '\u{0640}']),
        // feh
        '\u{0641}' => (Joining::Dual, ['\u{FED1}', '\u{FED2}', '\u{FED3}', '\u{FED4}']),
        // qaf
        '\u{0642}' => (Joining::Dual, ['\u{FED5}', '\u{FED6}', '\u{FED7}', '\u{FED8}']),
        // kaf
        '\u{0643}' => (Joining::Dual, ['\u{FED9}', '\u{FEDA}', '\u{FEDB}', '\u{FEDC}']),
        // lam
        '\u{0644}' => (Joining::Dual, ['\u{FEDD}', '\u{FEDE}', '\u{FEDF}', '\u{FEE0}']),
        // meem
        '\u{0645}' => (Joining::Dual, ['\u{FEE1}', '\u{FEE2}', '\u{FEE3}', '\u{FEE4}']),
        // noon
        '\u{0646}' => (Joining::Dual, ['\u{FEE5}', '\u{FEE6}', '\u{FEE7}', '\u{FEE8}']),
        // heh
        '\u{0647}' => (Joining::Dual, ['\u{FEE9}', '\u{FEEA}', '\u{FEEB}', '\u{FEEC}']),
        // waw
        '\u{0648}' => (Joining::Right, ['\u{FEED}', '\u{FEEE}', '\u{FEED}', '\u{FEEE}']),
        // alef maksura
        '\u{0649}' => (Joining::Right, ['\u{FEEF}', '\u{FEF0}', '\u{FEEF}', '\u{FEF0}']),
        // yeh
        '\u{064A}' => (Joining::Dual, ['\u{FEF1}', '\u{FEF2}', '\u{FEF3}', '\u{FEF4}']),
        _ => return None,
    };
    Some(entry)
}

const LAM: char = '\u{0644}';

/// `(isolated, final)` ligature forms keyed by the alef variant after Lam.
fn lam_alef_ligature(alef: char) -> Option<(char, char)> {
    match alef {
        '\u{0622}' => Some(('\u{FEF5}', '\u{FEF6}')),
        '\u{0623}' => Some(('\u{FEF7}', '\u{FEF8}')),
        '\u{0625}' => Some(('\u{FEF9}', '\u{FEFA}')),
        '\u{0627}' => Some(('\u{FEFB}', '\u{FEFC}')),
        _ => None,
    }
}

fn joining_class(ch: char) -> Joining {
    if let Some((class, _)) = letter_entry(ch) {
        return class;
    }
    // Harakat and other Arabic combining marks are invisible to joining.
    if matches!(ch, '\u{064B}'..='\u{065F}' | '\u{0670}') {
        return Joining::Transparent;
    }
    Joining::Isolated
}

fn prev_joins_forward(chars: &[char], i: usize) -> bool {
    for j in (0..i).rev() {
        match joining_class(chars[j]) {
            Joining::Transparent => continue,
            Joining::Dual | Joining::Causing => return true,
            _ => return false,
        }
    }
    false
}

fn next_joins_backward(chars: &[char], i: usize) -> bool {
    for &ch in &chars[i + 1..] {
        match joining_class(ch) {
            Joining::Transparent => continue,
            Joining::Dual | Joining::Right | Joining::Causing => return true,
            _ => return false,
        }
    }
    false
}

/// Index of the alef completing a Lam-Alef pair starting at `i`, skipping
/// transparent marks, or None when the pair does not form.
fn lam_alef_at(chars: &[char], i: usize) -> Option<usize> {
    for (offset, &ch) in chars[i + 1..].iter().enumerate() {
        if joining_class(ch) == Joining::Transparent {
            continue;
        }
        return lam_alef_ligature(ch).map(|_| i + 1 + offset);
    }
    None
}

/// Shapes one logical string into presentation forms. Apply exactly once:
/// the text composer guarantees shaped output is never fed back in.
pub fn shape(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        let Some((class, forms)) = letter_entry(ch) else {
            out.push(ch);
            i += 1;
            continue;
        };
        if ch == LAM {
            if let Some(alef_idx) = lam_alef_at(&chars, i) {
                // Unreachable None: lam_alef_at only returns ligature positions.
                if let Some((iso, fin)) = lam_alef_ligature(chars[alef_idx]) {
                    let linked = prev_joins_forward(&chars, i);
                    out.push(if linked { fin } else { iso });
                    // Marks between the pair attach to the ligature.
                    for &mark in &chars[i + 1..alef_idx] {
                        out.push(mark);
                    }
                    i = alef_idx + 1;
                    continue;
                }
            }
        }
        let prev_links = prev_joins_forward(&chars, i);
        let next_links = next_joins_backward(&chars, i);
        let slot = match class {
            Joining::Dual | Joining::Causing => match (prev_links, next_links) {
                (false, false) => 0,
                (true, false) => 1,
                (false, true) => 2,
                (true, true) => 3,
            },
            Joining::Right => {
                if prev_links {
                    1
                } else {
                    0
                }
            }
            _ => 0,
        };
        out.push(forms[slot]);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dual_joining_word_takes_contextual_forms() {
        // meem.init hah.medial meem.medial dal.final
        assert_eq!(shape("محمد"), "\u{FEE3}\u{FEA4}\u{FEE4}\u{FEAA}");
    }

    #[test]
    fn right_joining_letter_breaks_the_chain() {
        // dal joins backward only, so the following reh starts isolated.
        assert_eq!(shape("در"), "\u{FEA9}\u{FEAD}");
    }

    #[test]
    fn lam_alef_isolated_and_final() {
        assert_eq!(shape("لا"), "\u{FEFB}");
        // beh links into the ligature, so it takes the final form.
        assert_eq!(shape("بلا"), "\u{FE91}\u{FEFC}");
    }

    #[test]
    fn lam_alef_with_hamza_variants() {
        assert_eq!(shape("لأ"), "\u{FEF7}");
        assert_eq!(shape("لإ"), "\u{FEF9}");
        assert_eq!(shape("لآ"), "\u{FEF5}");
    }

    #[test]
    fn harakat_are_transparent_to_joining() {
        // beh + fatha + dal: the mark must not break beh->dal joining.
        assert_eq!(shape("بَد"), "\u{FE91}\u{064E}\u{FEAA}");
    }

    #[test]
    fn hamza_never_joins() {
        assert_eq!(shape("بءب"), "\u{FE8F}\u{FE80}\u{FE8F}");
    }

    #[test]
    fn tatweel_carries_joining_across() {
        assert_eq!(shape("بـد"), "\u{FE91}\u{0640}\u{FEAA}");
    }

    #[test]
    fn teh_marbuta_takes_final_after_dual() {
        assert_eq!(shape("مة"), "\u{FEE3}\u{FE94}");
    }

    #[test]
    fn non_arabic_passes_through() {
        assert_eq!(shape("hello 123"), "hello 123");
        assert_eq!(shape("a\u{0628}c"), "a\u{FE8F}c");
    }

    #[test]
    fn empty_string() {
        assert_eq!(shape(""), "");
    }
}
