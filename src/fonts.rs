use std::collections::HashMap;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use ttf_parser::GlyphId;

use crate::error::TaqrirError;
use crate::normalize::is_zero_width_mark;
use crate::trace::{TraceLogger, json_escape};
use crate::types::Pt;

/// One place a shaping-capable font may come from. Sources are tried in
/// order; the first one that yields a parseable face wins.
#[derive(Debug, Clone)]
pub enum FontSource {
    File(PathBuf),
    Url(String),
}

impl FontSource {
    fn label(&self) -> String {
        match self {
            FontSource::File(path) => path.display().to_string(),
            FontSource::Url(url) => url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WidthKey {
    size_milli: i64,
    text: String,
}

#[derive(Debug)]
struct WidthCache {
    map: HashMap<WidthKey, Pt>,
    order: VecDeque<WidthKey>,
    max_entries: usize,
}

impl WidthCache {
    fn new(max_entries: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            max_entries,
        }
    }

    fn get(&mut self, key: &WidthKey) -> Option<Pt> {
        self.map.get(key).copied()
    }

    fn insert(&mut self, key: WidthKey, value: Pt) {
        if self.map.contains_key(&key) {
            return;
        }
        self.map.insert(key.clone(), value);
        self.order.push_back(key);
        while self.map.len() > self.max_entries {
            if let Some(old) = self.order.pop_front() {
                self.map.remove(&old);
            } else {
                break;
            }
        }
    }
}

/// Font-wide metrics scaled to a 1000-unit em, the scale the PDF font
/// descriptor wants.
#[derive(Debug, Clone)]
pub(crate) struct FontMetrics {
    pub(crate) ascent: i16,
    pub(crate) descent: i16,
    pub(crate) line_gap: i16,
    pub(crate) cap_height: i16,
    pub(crate) italic_angle: i16,
    pub(crate) bbox: (i16, i16, i16, i16),
    pub(crate) missing_width: u16,
}

/// The single embedded report font: owned bytes plus extracted metrics.
/// Glyph lookups re-parse the face per call; repeated width queries go
/// through a bounded cache instead.
#[derive(Debug)]
pub struct ReportFont {
    postscript_name: String,
    data: Vec<u8>,
    metrics: FontMetrics,
    width_cache: Mutex<WidthCache>,
}

impl ReportFont {
    pub fn from_bytes(data: Vec<u8>, source_name: &str) -> Result<Self, TaqrirError> {
        let Ok(face) = ttf_parser::Face::parse(&data, 0) else {
            return Err(TaqrirError::FontParse(format!(
                "invalid font data from {source_name}"
            )));
        };
        // Embedding goes through FontFile2, so only TrueType outlines work.
        if face.tables().glyf.is_none() {
            return Err(TaqrirError::FontParse(format!(
                "no TrueType outlines in font from {source_name}"
            )));
        }
        let metrics = FontMetrics::from_face(&face);
        let postscript_name = postscript_name(&face)
            .unwrap_or_else(|| sanitize_name(source_name));
        drop(face);
        Ok(Self {
            postscript_name,
            data,
            metrics,
            width_cache: Mutex::new(WidthCache::new(4096)),
        })
    }

    pub(crate) fn postscript_name(&self) -> &str {
        &self.postscript_name
    }

    pub(crate) fn data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn metrics(&self) -> &FontMetrics {
        &self.metrics
    }

    pub(crate) fn glyph_index(&self, ch: char) -> Option<u16> {
        let face = ttf_parser::Face::parse(&self.data, 0).ok()?;
        face.glyph_index(ch).map(|id| id.0)
    }

    pub(crate) fn has_glyph(&self, ch: char) -> bool {
        self.glyph_index(ch).is_some()
    }

    /// Advance of one glyph in 1000-unit em space.
    pub(crate) fn glyph_advance(&self, gid: u16) -> u16 {
        let Ok(face) = ttf_parser::Face::parse(&self.data, 0) else {
            return 0;
        };
        let advance = face.glyph_hor_advance(GlyphId(gid)).unwrap_or(0);
        let units = face.units_per_em().max(1) as i64;
        let scaled = ((advance as i64) * 1000 + (units / 2)) / units;
        scaled.clamp(0, u16::MAX as i64) as u16
    }

    /// Per-character glyph run for the PDF writer: one face parse per call,
    /// zero-width formatting marks skipped, missing characters mapped to
    /// glyph 0.
    pub(crate) fn glyph_run(&self, text: &str) -> Vec<(u16, char)> {
        let Ok(face) = ttf_parser::Face::parse(&self.data, 0) else {
            return Vec::new();
        };
        let mut run = Vec::with_capacity(text.chars().count());
        for ch in text.chars() {
            if is_zero_width_mark(ch) {
                continue;
            }
            let gid = face.glyph_index(ch).map(|id| id.0).unwrap_or(0);
            run.push((gid, ch));
        }
        run
    }

    pub(crate) fn measure(&self, text: &str, size: Pt) -> Pt {
        if text.is_empty() {
            return Pt::ZERO;
        }
        let key = WidthKey {
            size_milli: size.to_milli_i64(),
            text: text.to_string(),
        };
        if let Ok(mut cache) = self.width_cache.lock() {
            if let Some(value) = cache.get(&key) {
                return value;
            }
        }
        let Ok(face) = ttf_parser::Face::parse(&self.data, 0) else {
            return Pt::ZERO;
        };
        let units = face.units_per_em().max(1) as i64;
        let mut total: i64 = 0;
        for ch in text.chars() {
            if is_zero_width_mark(ch) {
                continue;
            }
            let advance = face
                .glyph_index(ch)
                .and_then(|id| face.glyph_hor_advance(id))
                .unwrap_or(self.missing_advance_units(units));
            total = total.saturating_add(
                ((advance as i64) * 1000 + (units / 2)) / units,
            );
        }
        let total = total.clamp(0, i32::MAX as i64) as i32;
        let value = size.mul_ratio(total, 1000);
        if let Ok(mut cache) = self.width_cache.lock() {
            cache.insert(key, value);
        }
        value
    }

    fn missing_advance_units(&self, units: i64) -> u16 {
        // missing_width is already in 1000-space; project back to em units.
        let raw = (self.metrics.missing_width as i64) * units / 1000;
        raw.clamp(0, u16::MAX as i64) as u16
    }

    pub(crate) fn ascent(&self, size: Pt) -> Pt {
        size.mul_ratio(self.metrics.ascent as i32, 1000)
    }

    pub(crate) fn line_height(&self, size: Pt) -> Pt {
        let span =
            self.metrics.ascent as i32 - self.metrics.descent as i32 + self.metrics.line_gap as i32;
        size.mul_ratio(span.max(1000), 1000)
    }
}

impl FontMetrics {
    fn from_face(face: &ttf_parser::Face<'_>) -> Self {
        let units_per_em = face.units_per_em().max(1);
        let scale = 1000.0 / units_per_em as f32;
        let ascent = scale_i16(face.ascender(), scale);
        let descent = scale_i16(face.descender(), scale);
        let line_gap = scale_i16(face.line_gap(), scale);
        let cap_height = face
            .capital_height()
            .map(|value| scale_i16(value, scale))
            .unwrap_or(ascent);
        let italic_angle = face
            .italic_angle()
            .map(|value| value.round() as i16)
            .unwrap_or(0);
        let bbox = face.global_bounding_box();
        let bbox = (
            scale_i16(bbox.x_min, scale),
            scale_i16(bbox.y_min, scale),
            scale_i16(bbox.x_max, scale),
            scale_i16(bbox.y_max, scale),
        );
        let missing_width = face
            .glyph_index(' ')
            .and_then(|id| face.glyph_hor_advance(id))
            .map(|adv| {
                let scaled = (adv as f32 * scale).round() as i32;
                scaled.clamp(0, u16::MAX as i32) as u16
            })
            .unwrap_or(500);
        Self {
            ascent,
            descent,
            line_gap,
            cap_height,
            italic_angle,
            bbox,
            missing_width,
        }
    }
}

fn scale_i16(value: i16, scale: f32) -> i16 {
    let scaled = (value as f32 * scale).round() as i32;
    scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

fn postscript_name(face: &ttf_parser::Face<'_>) -> Option<String> {
    for entry in face.names() {
        if entry.name_id == ttf_parser::name_id::POST_SCRIPT_NAME {
            if let Some(name) = entry.to_string() {
                let cleaned = sanitize_name(&name);
                if !cleaned.is_empty() {
                    return Some(cleaned);
                }
            }
        }
    }
    None
}

/// PDF name tokens allow a narrow character set; everything else collapses.
fn sanitize_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '+')
        .collect();
    if cleaned.is_empty() {
        "EmbeddedReportFont".to_string()
    } else {
        cleaned
    }
}

/// Walks the fallback chain. IO errors, bad HTTP statuses and unparseable
/// payloads all skip to the next source; exhaustion is the caller's cue to
/// render in fallback mode.
pub(crate) async fn acquire(sources: &[FontSource], trace: &TraceLogger) -> Option<ReportFont> {
    for source in sources {
        let label = source.label();
        let started = Instant::now();
        let bytes = match source {
            FontSource::File(path) => tokio::fs::read(path).await.ok(),
            FontSource::Url(url) => fetch_url(url).await,
        };
        let elapsed = started.elapsed().as_secs_f64() * 1000.0;
        let Some(bytes) = bytes else {
            trace.event(
                "font.attempt",
                &format!(
                    "\"source\":\"{}\",\"ok\":false,\"stage\":\"fetch\",\"fetch_ms\":{:.3}",
                    json_escape(&label),
                    elapsed
                ),
            );
            continue;
        };
        match ReportFont::from_bytes(bytes, &label) {
            Ok(font) => {
                trace.event(
                    "font.attempt",
                    &format!(
                        "\"source\":\"{}\",\"ok\":true,\"fetch_ms\":{:.3}",
                        json_escape(&label),
                        elapsed
                    ),
                );
                return Some(font);
            }
            Err(err) => {
                trace.event(
                    "font.attempt",
                    &format!(
                        "\"source\":\"{}\",\"ok\":false,\"stage\":\"parse\",\"error\":\"{}\"",
                        json_escape(&label),
                        json_escape(&err.to_string())
                    ),
                );
            }
        }
    }
    trace.event("font.exhausted", "");
    None
}

async fn fetch_url(url: &str) -> Option<Vec<u8>> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("taqrir/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(10))
        .build()
        .ok()?;
    let response = client.get(url).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    response.bytes().await.ok().map(|b| b.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_do_not_parse() {
        let err = ReportFont::from_bytes(vec![0u8; 64], "garbage").unwrap_err();
        assert!(matches!(err, TaqrirError::FontParse(_)));
    }

    #[test]
    fn width_cache_evicts_oldest() {
        let mut cache = WidthCache::new(2);
        let key = |text: &str| WidthKey {
            size_milli: 12_000,
            text: text.to_string(),
        };
        cache.insert(key("a"), Pt::from_i32(1));
        cache.insert(key("b"), Pt::from_i32(2));
        cache.insert(key("c"), Pt::from_i32(3));
        assert!(cache.get(&key("a")).is_none());
        assert_eq!(cache.get(&key("c")), Some(Pt::from_i32(3)));
    }

    #[test]
    fn sanitize_name_strips_forbidden_chars() {
        assert_eq!(sanitize_name("Amiri Regular (v1)"), "AmiriRegularv1");
        assert_eq!(sanitize_name("خط"), "EmbeddedReportFont");
    }

    #[tokio::test]
    async fn acquisition_exhaustion_yields_none() {
        let sources = vec![
            FontSource::File(PathBuf::from("/nonexistent/taqrir-font.ttf")),
            FontSource::File(PathBuf::from("/also/missing.ttf")),
        ];
        let found = acquire(&sources, &TraceLogger::disabled()).await;
        assert!(found.is_none());
    }
}
