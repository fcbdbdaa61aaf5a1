mod bidi;
mod compose;
mod error;
mod fonts;
mod inspect;
mod normalize;
mod paginate;
mod pdf;
mod report;
mod shaping;
mod surface;
mod table;
mod text;
mod tiers;
mod trace;
mod types;

use std::path::PathBuf;
use std::sync::Arc;

use compose::Composer;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use trace::TraceLogger;

pub use bidi::reorder;
pub use error::TaqrirError;
pub use fonts::{FontSource, ReportFont};
pub use inspect::{
    InspectError, InspectErrorCode, PdfSummary, delivery_issues, extract_page_text, inspect_bytes,
    inspect_path, require_deliverable,
};
pub use normalize::normalize;
pub use paginate::Paginator;
pub use report::{
    AssessmentSummary, DimensionScore, Insight, InsightOrder, Organization, ReportInput,
    ReportStyle, order_insights,
};
pub use shaping::shape;
pub use surface::{Command, Document, Page, PaintStyle, Surface, TextAlign};
pub use table::{
    CellHook, ColumnSpec, TableCell, TableSpec, TableStyle, inline_bar_hook, render_table,
    status_dot_hook,
};
pub use text::{TextComposer, TextRun, render_text};
pub use tiers::MaturityTier;
pub use types::{Color, Margins, Pt, Rect, Size};

/// A finished report: the PDF bytes, a suggested download name and the
/// fingerprint of the bytes. The name carries the render date; the bytes
/// never do, so identical input keeps an identical fingerprint across days.
#[derive(Debug, Clone)]
pub struct RenderArtifact {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub sha256: String,
}

/// Configured report renderer. Immutable once built; one instance serves
/// any number of renders, concurrent renders included.
#[derive(Debug)]
pub struct Taqrir {
    style: ReportStyle,
    page_size: Size,
    margins: Margins,
    footer_reserve: Pt,
    sources: Vec<FontSource>,
    trace: TraceLogger,
    // Resolved face. Written at most once per instance, on the first
    // successful acquisition; later renders only clone the Arc.
    font_slot: RwLock<Option<Arc<ReportFont>>>,
}

impl Taqrir {
    pub fn builder() -> TaqrirBuilder {
        TaqrirBuilder::new()
    }

    /// Renders one assessment to a PDF artifact. Awaits font acquisition
    /// exactly once, before any layout; everything after is synchronous.
    /// Exhausted font sources degrade to fallback rendering, never fail.
    pub async fn render(&self, input: &ReportInput) -> Result<RenderArtifact, TaqrirError> {
        validate_input(input)?;
        let face = self.resolve_font().await;
        let fallback = face.is_none();
        if fallback {
            self.trace.increment("render.fallback_documents", 1);
        }
        let document = self.render_to_document(input, face)?;
        let bytes = pdf::document_to_pdf(&document, Some(self.style.title.as_str()), &self.trace)?;
        let sha256 = sha256_hex(&bytes);
        let file_name =
            suggested_file_name(input.organization.as_ref().map(|org| org.name.as_str()));
        self.trace.event(
            "render.finished",
            &format!(
                "\"bytes\":{},\"sha256\":\"{}\",\"fallback\":{}",
                bytes.len(),
                sha256,
                fallback
            ),
        );
        self.trace.emit_summary("render");
        self.trace.flush();
        Ok(RenderArtifact {
            bytes,
            file_name,
            sha256,
        })
    }

    /// Compose-only entry: validates input and records the page commands
    /// without writing PDF bytes. `face: None` composes in fallback mode.
    pub fn render_to_document(
        &self,
        input: &ReportInput,
        face: Option<Arc<ReportFont>>,
    ) -> Result<Document, TaqrirError> {
        validate_input(input)?;
        let composer = Composer::new(
            &self.style,
            face.is_none(),
            self.page_size,
            self.margins,
            self.footer_reserve,
            self.trace.clone(),
        );
        composer.compose(input, face)
    }

    /// True once a face has been stored in the slot.
    pub async fn font_ready(&self) -> bool {
        self.font_slot.read().await.is_some()
    }

    async fn resolve_font(&self) -> Option<Arc<ReportFont>> {
        {
            let slot = self.font_slot.read().await;
            if let Some(face) = slot.as_ref() {
                return Some(Arc::clone(face));
            }
        }
        if self.sources.is_empty() {
            return None;
        }
        let acquired = fonts::acquire(&self.sources, &self.trace).await?;
        let mut slot = self.font_slot.write().await;
        // A concurrent render may have filled the slot while we fetched;
        // the first stored face wins either way.
        let face = slot.get_or_insert(Arc::new(acquired));
        Some(Arc::clone(face))
    }
}

/// Builder in the usual consuming-setter shape. `build` validates geometry
/// and any directly provided font bytes; font sources are only probed later,
/// on the first render.
pub struct TaqrirBuilder {
    style: ReportStyle,
    page_size: Size,
    margins: Margins,
    footer_reserve: Pt,
    sources: Vec<FontSource>,
    font_bytes: Option<Vec<u8>>,
    trace_path: Option<PathBuf>,
}

impl TaqrirBuilder {
    pub fn new() -> Self {
        Self {
            style: ReportStyle::standard(),
            page_size: Size::a4(),
            margins: Margins::all(40.0),
            footer_reserve: Pt::from_i32(60),
            sources: Vec::new(),
            font_bytes: None,
            trace_path: None,
        }
    }

    pub fn style(mut self, style: ReportStyle) -> Self {
        self.style = style;
        self
    }

    pub fn page_size(mut self, size: Size) -> Self {
        self.page_size = size;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    /// Height at the bottom of every page reserved for the footer pass.
    /// Body content never enters it.
    pub fn footer_reserve(mut self, reserve: Pt) -> Self {
        self.footer_reserve = reserve;
        self
    }

    /// Appends a source to the fallback chain. Sources are tried in the
    /// order they were added.
    pub fn font_source(mut self, source: FontSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn font_file(self, path: impl Into<PathBuf>) -> Self {
        self.font_source(FontSource::File(path.into()))
    }

    pub fn font_url(self, url: impl Into<String>) -> Self {
        self.font_source(FontSource::Url(url.into()))
    }

    /// Directly provided font program. Takes precedence over every source
    /// and is parsed eagerly, so a bad buffer fails `build` instead of
    /// degrading the first render.
    pub fn font_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.font_bytes = Some(bytes);
        self
    }

    /// Enables the JSONL trace log at the given path.
    pub fn trace_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.trace_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<Taqrir, TaqrirError> {
        if self.page_size.width <= Pt::ZERO || self.page_size.height <= Pt::ZERO {
            return Err(TaqrirError::InvalidConfiguration(
                "page size must be positive in both dimensions".to_string(),
            ));
        }
        if self.margins.top < Pt::ZERO
            || self.margins.right < Pt::ZERO
            || self.margins.bottom < Pt::ZERO
            || self.margins.left < Pt::ZERO
        {
            return Err(TaqrirError::InvalidConfiguration(
                "margins must be non-negative".to_string(),
            ));
        }
        if self.footer_reserve < Pt::ZERO {
            return Err(TaqrirError::InvalidConfiguration(
                "footer reserve must be non-negative".to_string(),
            ));
        }
        if self.margins.top + self.footer_reserve >= self.page_size.height {
            return Err(TaqrirError::InvalidConfiguration(
                "top margin and footer reserve leave no writable height".to_string(),
            ));
        }
        if self.margins.left + self.margins.right >= self.page_size.width {
            return Err(TaqrirError::InvalidConfiguration(
                "horizontal margins leave no writable width".to_string(),
            ));
        }
        if self.style.body_size <= Pt::ZERO || self.style.heading_size <= Pt::ZERO {
            return Err(TaqrirError::InvalidConfiguration(
                "text sizes must be positive".to_string(),
            ));
        }

        let trace = match &self.trace_path {
            Some(path) => TraceLogger::new(path)?,
            None => TraceLogger::disabled(),
        };

        let preloaded = match self.font_bytes {
            Some(bytes) => Some(Arc::new(ReportFont::from_bytes(bytes, "embedded bytes")?)),
            None => None,
        };

        Ok(Taqrir {
            style: self.style,
            page_size: self.page_size,
            margins: self.margins,
            footer_reserve: self.footer_reserve,
            sources: self.sources,
            trace,
            font_slot: RwLock::new(preloaded),
        })
    }
}

impl Default for TaqrirBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_input(input: &ReportInput) -> Result<(), TaqrirError> {
    if input.dimensions.is_empty() {
        return Err(TaqrirError::InvalidConfiguration(
            "assessment has no dimension scores".to_string(),
        ));
    }
    if !input.summary.overall_percentage.is_finite() {
        return Err(TaqrirError::InvalidConfiguration(
            "overall percentage is not a finite number".to_string(),
        ));
    }
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Download name: organization slug plus the render date. Arabic letters
/// are kept; separators collapse to single hyphens.
fn suggested_file_name(organization: Option<&str>) -> String {
    let slug = organization
        .map(slugify)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "assessment-report".to_string());
    let date = chrono::Utc::now().date_naive().format("%Y-%m-%d");
    format!("{}-{}.pdf", slug, date)
}

fn slugify(name: &str) -> String {
    let mut slug = String::new();
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
