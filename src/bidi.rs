//! Implicit bidi reordering with a fixed right-to-left base direction,
//! following the UAX#9 shape: classify, resolve weak types, resolve
//! neutrals, assign implicit levels, then reverse runs from the highest
//! level down to the lowest odd level. Combining marks travel with their
//! base character, paired brackets mirror at odd levels, and directional
//! isolate marks steer level resolution without reaching the output.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    /// Strong left-to-right.
    L,
    /// Strong right-to-left (Hebrew range, directional RLM).
    R,
    /// Arabic letters, including presentation forms.
    Al,
    /// European digits.
    En,
    /// Arabic-Indic digits and their separators.
    An,
    /// European terminators: percent and currency signs.
    Et,
    /// Common separators between digits.
    Cs,
    /// Non-spacing combining marks.
    Nsm,
    /// Whitespace.
    Ws,
    /// Other neutrals.
    On,
    Lri,
    Rli,
    Fsi,
    Pdi,
}

fn classify(ch: char) -> Class {
    match ch {
        '0'..='9' => Class::En,
        '\u{0660}'..='\u{0669}' | '\u{066B}' | '\u{066C}' => Class::An,
        '%' | '\u{066A}' | '$' | '\u{00A3}' | '\u{20AC}' | '\u{00B0}' => Class::Et,
        '.' | ',' | ':' | '/' => Class::Cs,
        '\u{064B}'..='\u{065F}' | '\u{0670}' | '\u{0610}'..='\u{061A}' => Class::Nsm,
        '\u{2066}' => Class::Lri,
        '\u{2067}' => Class::Rli,
        '\u{2068}' => Class::Fsi,
        '\u{2069}' => Class::Pdi,
        '\u{200E}' => Class::L,
        '\u{200F}' => Class::R,
        '\u{0590}'..='\u{05FF}' => Class::R,
        '\u{0600}'..='\u{06FF}'
        | '\u{0750}'..='\u{077F}'
        | '\u{08A0}'..='\u{08FF}'
        | '\u{FB50}'..='\u{FDFF}'
        | '\u{FE70}'..='\u{FEFF}' => Class::Al,
        _ => {
            if ch.is_whitespace() {
                Class::Ws
            } else if ch.is_alphabetic() {
                Class::L
            } else {
                Class::On
            }
        }
    }
}

fn is_isolate_mark(class: Class) -> bool {
    matches!(class, Class::Lri | Class::Rli | Class::Fsi | Class::Pdi)
}

/// Directional formatting characters that never occupy a visual slot.
fn is_formatting(ch: char, class: Class) -> bool {
    is_isolate_mark(class) || ch == '\u{200E}' || ch == '\u{200F}'
}

const BASE_LEVEL: u8 = 1;
const MAX_DEPTH: usize = 125;

/// Embedding level per character from the isolate structure. Initiators and
/// PDIs take the level of the enclosing context.
fn embedding_levels(chars: &[char], classes: &[Class]) -> Vec<u8> {
    let mut levels = vec![BASE_LEVEL; chars.len()];
    let mut stack: Vec<u8> = vec![BASE_LEVEL];
    for i in 0..chars.len() {
        let top = *stack.last().unwrap_or(&BASE_LEVEL);
        match classes[i] {
            Class::Rli => {
                levels[i] = top;
                if stack.len() < MAX_DEPTH {
                    stack.push((top + 1) | 1);
                }
            }
            Class::Lri => {
                levels[i] = top;
                if stack.len() < MAX_DEPTH {
                    stack.push((top + 2) & !1);
                }
            }
            Class::Fsi => {
                levels[i] = top;
                let rtl = first_strong_is_rtl(&classes[i + 1..]);
                if stack.len() < MAX_DEPTH {
                    stack.push(if rtl { (top + 1) | 1 } else { (top + 2) & !1 });
                }
            }
            Class::Pdi => {
                if stack.len() > 1 {
                    stack.pop();
                }
                levels[i] = *stack.last().unwrap_or(&BASE_LEVEL);
            }
            _ => levels[i] = top,
        }
    }
    levels
}

/// First-strong scan for FSI, stopping at the matching PDI.
fn first_strong_is_rtl(rest: &[Class]) -> bool {
    let mut depth = 0usize;
    for &class in rest {
        match class {
            Class::Lri | Class::Rli | Class::Fsi => depth += 1,
            Class::Pdi => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            Class::L if depth == 0 => return false,
            Class::R | Class::Al if depth == 0 => return true,
            _ => {}
        }
    }
    // No strong character: RTL, matching the paragraph base.
    true
}

fn embed_dir_is_rtl(level: u8) -> bool {
    level % 2 == 1
}

/// Weak (W1-W7) and neutral (N1-N2) resolution, simplified to a single
/// paragraph-wide pass. Isolate marks count as neutral here.
fn resolve_classes(classes: &[Class], embed: &[u8]) -> Vec<Class> {
    let n = classes.len();
    let mut work: Vec<Class> = classes
        .iter()
        .map(|&c| if is_isolate_mark(c) { Class::On } else { c })
        .collect();

    // W1: combining marks take the class of what precedes them.
    for i in 0..n {
        if work[i] == Class::Nsm {
            work[i] = if i == 0 || is_isolate_mark(classes[i - 1]) {
                Class::On
            } else {
                work[i - 1]
            };
        }
    }

    // W2: European digits in an Arabic context become Arabic numbers.
    let mut last_strong = Class::R;
    for i in 0..n {
        match work[i] {
            Class::L | Class::R | Class::Al => last_strong = work[i],
            Class::En if last_strong == Class::Al => work[i] = Class::An,
            _ => {}
        }
    }

    // W3: Arabic letters resolve to strong R.
    for item in work.iter_mut() {
        if *item == Class::Al {
            *item = Class::R;
        }
    }

    // W4: a single separator between two numbers of the same kind joins them.
    for i in 1..n.saturating_sub(1) {
        if work[i] == Class::Cs
            && work[i - 1] == work[i + 1]
            && matches!(work[i - 1], Class::En | Class::An)
        {
            work[i] = work[i - 1];
        }
    }

    // W5: terminator runs adjacent to European digits become digits.
    for i in 1..n {
        if work[i] == Class::Et && work[i - 1] == Class::En {
            work[i] = Class::En;
        }
    }
    for i in (0..n.saturating_sub(1)).rev() {
        if work[i] == Class::Et && work[i + 1] == Class::En {
            work[i] = Class::En;
        }
    }

    // W6: leftover terminators and separators are plain neutrals.
    for item in work.iter_mut() {
        if matches!(*item, Class::Et | Class::Cs) {
            *item = Class::On;
        }
    }

    // W7: European digits after a strong L run left-to-right.
    let mut last_strong = Class::R;
    for i in 0..n {
        match work[i] {
            Class::L | Class::R => last_strong = work[i],
            Class::En if last_strong == Class::L => work[i] = Class::L,
            _ => {}
        }
    }

    // N1/N2: neutral runs take the surrounding direction when both sides
    // agree (numbers count as R), otherwise the embedding direction.
    let dir_of = |class: Class| match class {
        Class::L => Some(Class::L),
        Class::R | Class::En | Class::An => Some(Class::R),
        _ => None,
    };
    let mut i = 0;
    while i < n {
        if matches!(work[i], Class::On | Class::Ws) {
            let start = i;
            while i < n && matches!(work[i], Class::On | Class::Ws) {
                i += 1;
            }
            let before = work[..start].iter().rev().find_map(|&c| dir_of(c));
            let after = work[i..].iter().find_map(|&c| dir_of(c));
            let sos = |level: u8| {
                if embed_dir_is_rtl(level) {
                    Class::R
                } else {
                    Class::L
                }
            };
            let left = before.unwrap_or_else(|| sos(embed[start]));
            let right = after.unwrap_or_else(|| sos(embed[i - 1]));
            for j in start..i {
                work[j] = if left == right {
                    left
                } else if embed_dir_is_rtl(embed[j]) {
                    Class::R
                } else {
                    Class::L
                };
            }
        } else {
            i += 1;
        }
    }

    work
}

/// I1/I2: bump each character above its embedding level as its resolved
/// class requires.
fn implicit_levels(resolved: &[Class], embed: &[u8]) -> Vec<u8> {
    resolved
        .iter()
        .zip(embed.iter())
        .map(|(&class, &e)| match class {
            Class::R => {
                if e % 2 == 1 {
                    e
                } else {
                    e + 1
                }
            }
            Class::En | Class::An => {
                if e % 2 == 1 {
                    e + 1
                } else {
                    e + 2
                }
            }
            // L and anything left over sits at the nearest even level.
            _ => {
                if e % 2 == 0 {
                    e
                } else {
                    e + 1
                }
            }
        })
        .collect()
}

struct Cluster {
    /// Base character plus its trailing combining marks.
    text: Vec<char>,
    level: u8,
    formatting: bool,
}

/// Groups combining marks with their base so run reversal cannot separate
/// them from the character they attach to.
fn build_clusters(chars: &[char], classes: &[Class], levels: &[u8]) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::with_capacity(chars.len());
    for i in 0..chars.len() {
        let formatting = is_formatting(chars[i], classes[i]);
        let joins_previous = classes[i] == Class::Nsm
            && clusters
                .last()
                .map(|c| !c.formatting)
                .unwrap_or(false);
        if joins_previous {
            if let Some(last) = clusters.last_mut() {
                last.text.push(chars[i]);
                continue;
            }
        }
        clusters.push(Cluster {
            text: vec![chars[i]],
            level: levels[i],
            formatting,
        });
    }
    clusters
}

fn mirror(ch: char) -> char {
    match ch {
        '(' => ')',
        ')' => '(',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        '<' => '>',
        '>' => '<',
        '\u{00AB}' => '\u{00BB}',
        '\u{00BB}' => '\u{00AB}',
        '\u{2039}' => '\u{203A}',
        '\u{203A}' => '\u{2039}',
        _ => ch,
    }
}

/// Reorders one logical string into visual order for left-to-right drawing
/// under a right-to-left base direction. Isolate marks are consumed.
pub fn reorder(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = input.chars().collect();
    let classes: Vec<Class> = chars.iter().map(|&c| classify(c)).collect();
    let embed = embedding_levels(&chars, &classes);
    let resolved = resolve_classes(&classes, &embed);
    let levels = implicit_levels(&resolved, &embed);
    let mut clusters = build_clusters(&chars, &classes, &levels);

    let mut highest = 0u8;
    let mut lowest_odd = u8::MAX;
    for cluster in &clusters {
        highest = highest.max(cluster.level);
        if cluster.level % 2 == 1 {
            lowest_odd = lowest_odd.min(cluster.level);
        }
    }
    if lowest_odd != u8::MAX {
        let mut level = highest;
        while level >= lowest_odd {
            let mut i = 0;
            while i < clusters.len() {
                if clusters[i].level >= level {
                    let start = i;
                    while i < clusters.len() && clusters[i].level >= level {
                        i += 1;
                    }
                    clusters[start..i].reverse();
                } else {
                    i += 1;
                }
            }
            if level == 0 {
                break;
            }
            level -= 1;
        }
    }

    let mut out = String::with_capacity(input.len());
    for cluster in &clusters {
        if cluster.formatting {
            continue;
        }
        for (idx, &ch) in cluster.text.iter().enumerate() {
            // Only the base character of a cluster can mirror.
            if idx == 0 && cluster.level % 2 == 1 {
                out.push(mirror(ch));
            } else {
                out.push(ch);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_rtl_reverses() {
        assert_eq!(reorder("ابج"), "جبا");
        assert_eq!(reorder("اب جد"), "دج با");
    }

    #[test]
    fn pure_ltr_keeps_logical_order() {
        assert_eq!(reorder("ab 12"), "ab 12");
    }

    #[test]
    fn arabic_digits_embed_as_ltr_runs() {
        assert_eq!(reorder("اب ١٢ جد"), "دج ١٢ با");
    }

    #[test]
    fn percent_lands_left_of_its_number() {
        assert_eq!(reorder("٨٢٪"), "٪٨٢");
    }

    #[test]
    fn decimal_numbers_stay_intact() {
        assert_eq!(reorder("٤٩.٦٪"), "٪٤٩.٦");
    }

    #[test]
    fn latin_run_inside_arabic_keeps_its_order() {
        assert_eq!(reorder("اب cd اب"), "با cd با");
    }

    #[test]
    fn odd_level_brackets_mirror() {
        assert_eq!(reorder("(اب)"), "(با)");
    }

    #[test]
    fn isolated_percent_group_stays_whole_and_marks_vanish() {
        let input = format!("نتيجة \u{2067}(٨٢٪)\u{2069} جيدة");
        let out = reorder(&input);
        assert!(out.contains("(٪٨٢)"), "group mangled: {out}");
        assert!(!out.contains('\u{2067}'));
        assert!(!out.contains('\u{2069}'));
        assert_eq!(out, "ةديج (٪٨٢) ةجيتن");
    }

    #[test]
    fn combining_marks_travel_with_their_base() {
        // beh+fatha dal, already shaped: the mark must stay on beh.
        let out = reorder("\u{FE91}\u{064E}\u{FEAA}");
        assert_eq!(out, "\u{FEAA}\u{FE91}\u{064E}");
    }

    #[test]
    fn digits_after_latin_stay_european() {
        assert_eq!(reorder("اب version 2 اب"), "با version 2 با");
    }

    #[test]
    fn empty_and_single() {
        assert_eq!(reorder(""), "");
        assert_eq!(reorder("ا"), "ا");
        assert_eq!(reorder("x"), "x");
    }
}
