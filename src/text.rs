//! Text Run Composer: the one place logical strings become visual strings.
//!
//! `visual = reorder(shape(normalize(logical)))`, or the normalized string
//! alone in fallback mode when no shaping-capable font could be acquired.
//! Callers compose each logical string exactly once per render.

use crate::bidi::reorder;
use crate::normalize::normalize;
use crate::shaping::shape;
use crate::surface::Surface;
use crate::types::Pt;

pub fn render_text(logical: &str, fallback_mode: bool) -> String {
    let normalized = normalize(logical);
    if fallback_mode {
        return normalized;
    }
    reorder(&shape(&normalized))
}

/// A logical string paired with its resolved visual form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub logical: String,
    pub visual: String,
}

impl TextRun {
    pub fn compose(logical: impl Into<String>, fallback_mode: bool) -> Self {
        let logical = logical.into();
        let visual = render_text(&logical, fallback_mode);
        Self { logical, visual }
    }
}

/// Carries the fallback decision for one render so every section composes
/// text the same way.
#[derive(Debug, Clone, Copy)]
pub struct TextComposer {
    fallback: bool,
}

impl TextComposer {
    pub fn new(fallback: bool) -> Self {
        Self { fallback }
    }

    pub fn fallback(&self) -> bool {
        self.fallback
    }

    pub fn visual(&self, logical: &str) -> String {
        render_text(logical, self.fallback)
    }

    pub fn run(&self, logical: &str) -> TextRun {
        TextRun::compose(logical, self.fallback)
    }

    pub fn measure(&self, surface: &Surface, logical: &str, size: Pt) -> Pt {
        let normalized = normalize(logical);
        if self.fallback {
            surface.measure_text_width(&normalized, size)
        } else {
            surface.measure_text_width(&shape(&normalized), size)
        }
    }

    /// Greedy word wrap over the normalized text. Each finished line is
    /// composed as its own paragraph so reordering never crosses a line
    /// break. Words are never split; a word wider than the column overflows
    /// alone on its line.
    pub fn wrap(&self, surface: &Surface, logical: &str, size: Pt, max_width: Pt) -> Vec<String> {
        let normalized = normalize(logical);
        if normalized.is_empty() {
            return Vec::new();
        }
        let space_width = surface.measure_text_width(" ", size);
        let mut lines: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_width = Pt::ZERO;
        for word in normalized.split(' ') {
            let word_width = self.word_width(surface, word, size);
            if current.is_empty() {
                current.push_str(word);
                current_width = word_width;
                continue;
            }
            let next_width = current_width + space_width + word_width;
            if next_width <= max_width {
                current.push(' ');
                current.push_str(word);
                current_width = next_width;
            } else {
                lines.push(self.line_visual(&current));
                current.clear();
                current.push_str(word);
                current_width = word_width;
            }
        }
        if !current.is_empty() {
            lines.push(self.line_visual(&current));
        }
        lines
    }

    /// Single-line fit with a trailing ellipsis, for table cells. Binary
    /// searches the longest logical prefix whose composed form still fits.
    pub fn truncate(&self, surface: &Surface, logical: &str, size: Pt, max_width: Pt) -> String {
        let normalized = normalize(logical);
        if normalized.is_empty() {
            return String::new();
        }
        let full = self.line_visual(&normalized);
        if surface.measure_text_width(&full, size) <= max_width {
            return full;
        }
        if max_width <= Pt::ZERO {
            return String::new();
        }
        let ellipsis = "\u{2026}";
        if surface.measure_text_width(ellipsis, size) >= max_width {
            return ellipsis.to_string();
        }

        let mut boundaries: Vec<usize> = normalized.char_indices().map(|(idx, _)| idx).collect();
        boundaries.push(normalized.len());
        let mut lo = 0usize;
        let mut hi = boundaries.len() - 1;
        let mut best = 0usize;
        while lo <= hi {
            let mid = (lo + hi) / 2;
            let mut candidate = String::with_capacity(boundaries[mid] + ellipsis.len());
            candidate.push_str(&normalized[..boundaries[mid]]);
            candidate.push_str(ellipsis);
            let width = surface.measure_text_width(&self.line_visual(&candidate), size);
            if width <= max_width {
                best = mid;
                lo = mid + 1;
            } else {
                if mid == 0 {
                    break;
                }
                hi = mid - 1;
            }
        }

        let mut truncated = String::with_capacity(boundaries[best] + ellipsis.len());
        truncated.push_str(&normalized[..boundaries[best]]);
        truncated.push_str(ellipsis);
        self.line_visual(&truncated)
    }

    fn line_visual(&self, normalized_line: &str) -> String {
        if self.fallback {
            normalized_line.to_string()
        } else {
            reorder(&shape(normalized_line))
        }
    }

    fn word_width(&self, surface: &Surface, word: &str, size: Pt) -> Pt {
        if self.fallback {
            surface.measure_text_width(word, size)
        } else {
            surface.measure_text_width(&shape(word), size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Size;

    #[test]
    fn fallback_normalizes_without_reordering() {
        let visual = render_text("النتيجة 82%", true);
        assert_eq!(visual, "النتيجة ٨٢٪");
    }

    #[test]
    fn full_pipeline_places_percent_left_of_digits() {
        assert_eq!(render_text("82%", false), "٪٨٢");
    }

    #[test]
    fn composing_twice_is_deterministic() {
        let a = render_text("حوكمة البيانات (50%)", false);
        let b = render_text("حوكمة البيانات (50%)", false);
        assert_eq!(a, b);
    }

    #[test]
    fn run_keeps_both_forms() {
        let run = TextRun::compose("82%", false);
        assert_eq!(run.logical, "82%");
        assert_eq!(run.visual, "٪٨٢");
    }

    #[test]
    fn wrap_splits_on_word_boundaries() {
        // No face: the width heuristic charges 0.6 * size per character,
        // 6pt at size 10. "اب جد" fills exactly 30pt.
        let surface = Surface::new(Size::a4(), None);
        let composer = TextComposer::new(true);
        let lines = composer.wrap(
            &surface,
            "اب جد هو",
            Pt::from_i32(10),
            Pt::from_i32(30),
        );
        assert_eq!(lines, ["اب جد", "هو"]);
    }

    #[test]
    fn wrap_keeps_an_overlong_word_whole() {
        let surface = Surface::new(Size::a4(), None);
        let composer = TextComposer::new(true);
        let lines = composer.wrap(
            &surface,
            "اب ابجدهوزحطي اب",
            Pt::from_i32(10),
            Pt::from_i32(30),
        );
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "ابجدهوزحطي");
    }

    #[test]
    fn wrap_of_empty_text_is_empty() {
        let surface = Surface::new(Size::a4(), None);
        let composer = TextComposer::new(true);
        assert!(composer.wrap(&surface, "  ", Pt::from_i32(10), Pt::from_i32(30)).is_empty());
    }

    #[test]
    fn truncate_appends_ellipsis_when_too_wide() {
        let surface = Surface::new(Size::a4(), None);
        let composer = TextComposer::new(true);
        let out = composer.truncate(
            &surface,
            "ابجدهوزح",
            Pt::from_i32(10),
            Pt::from_i32(30),
        );
        assert_eq!(out, "ابجد\u{2026}");
    }

    #[test]
    fn truncate_returns_fitting_text_unchanged() {
        let surface = Surface::new(Size::a4(), None);
        let composer = TextComposer::new(true);
        let out = composer.truncate(&surface, "اب", Pt::from_i32(10), Pt::from_i32(300));
        assert_eq!(out, "اب");
    }
}
