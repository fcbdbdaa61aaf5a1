//! Report input model and the closed style surface consumed by the composer.
//!
//! Inputs arrive fully validated from the scoring layer; this module only
//! derives values (percentages) and never mutates what it was given.

use crate::tiers::MaturityTier;
use crate::types::{Color, Pt};
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct Organization {
    pub name: String,
    pub organization_type: Option<String>,
    pub sector: Option<String>,
    pub city: Option<String>,
}

impl Organization {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            organization_type: None,
            sector: None,
            city: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssessmentSummary {
    /// Overall score on the 0–100 scale, unrounded.
    pub overall_percentage: f64,
    /// Tier as computed by the scoring layer. Sections re-derive tiers from
    /// percentages so this and the derived value agree on valid input.
    pub maturity: MaturityTier,
    pub completed_dimensions: usize,
    pub answered_questions: usize,
    pub completed_at: NaiveDate,
}

/// One scored dimension. The percentage is derived at construction and is
/// not independently settable.
#[derive(Debug, Clone)]
pub struct DimensionScore {
    pub name: String,
    pub order_index: usize,
    pub raw_score: f64,
    pub max_score: f64,
    percentage: f64,
}

impl DimensionScore {
    pub fn new(name: impl Into<String>, order_index: usize, raw_score: f64, max_score: f64) -> Self {
        let percentage = if max_score > 0.0 {
            raw_score / max_score * 100.0
        } else {
            0.0
        };
        Self {
            name: name.into(),
            order_index,
            raw_score,
            max_score,
            percentage,
        }
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    pub fn tier(&self) -> MaturityTier {
        MaturityTier::for_percentage(self.percentage)
    }
}

/// Free-text finding, optionally keyed to the dimension it came from so
/// lists can be ordered by that dimension's percentage.
#[derive(Debug, Clone)]
pub struct Insight {
    pub text: String,
    pub dimension: Option<usize>,
}

impl Insight {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            dimension: None,
        }
    }

    pub fn for_dimension(text: impl Into<String>, dimension: usize) -> Self {
        Self {
            text: text.into(),
            dimension: Some(dimension),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportInput {
    pub organization: Option<Organization>,
    pub summary: AssessmentSummary,
    pub dimensions: Vec<DimensionScore>,
    pub strengths: Vec<Insight>,
    pub opportunities: Vec<Insight>,
    pub recommendations: Vec<Insight>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightOrder {
    /// Lowest-scoring dimensions first. Used for opportunities and
    /// recommendations.
    Ascending,
    /// Highest-scoring dimensions first. Used for strengths.
    Descending,
}

/// Stable priority order: keyed insights sorted by their dimension's
/// percentage, then un-keyed ones in input order. An index pointing past the
/// dimension list counts as un-keyed.
pub fn order_insights<'a>(
    insights: &'a [Insight],
    dimensions: &[DimensionScore],
    order: InsightOrder,
) -> Vec<&'a Insight> {
    let mut keyed: Vec<(f64, &Insight)> = Vec::new();
    let mut unkeyed: Vec<&Insight> = Vec::new();
    for insight in insights {
        match insight.dimension.and_then(|i| dimensions.get(i)) {
            Some(dimension) => keyed.push((dimension.percentage(), insight)),
            None => unkeyed.push(insight),
        }
    }
    keyed.sort_by(|a, b| {
        let cmp = a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal);
        match order {
            InsightOrder::Ascending => cmp,
            InsightOrder::Descending => cmp.reverse(),
        }
    });
    keyed.into_iter().map(|(_, i)| i).chain(unkeyed).collect()
}

/// Style configuration for the one Document Composer. Section toggles can
/// omit sections but never reorder them.
#[derive(Debug, Clone)]
pub struct ReportStyle {
    pub title: String,
    pub include_dimension_table: bool,
    pub include_insights: bool,
    /// Top/bottom dimension highlights shown in the executive summary.
    pub highlight_count: usize,
    pub max_insights_per_list: usize,
    pub prioritize_insights: bool,
    pub repeat_table_header: bool,
    pub footer_on_cover: bool,
    pub primary: Color,
    pub accent: Color,
    pub text_color: Color,
    pub muted: Color,
    pub stripe: Color,
    pub rule: Color,
    pub body_size: Pt,
    pub heading_size: Pt,
}

impl ReportStyle {
    pub fn standard() -> Self {
        Self {
            title: "تقرير التقييم الذاتي".to_string(),
            include_dimension_table: true,
            include_insights: true,
            highlight_count: 3,
            max_insights_per_list: 5,
            prioritize_insights: true,
            repeat_table_header: true,
            footer_on_cover: false,
            primary: Color::from_rgb8(31, 78, 95),
            accent: Color::from_rgb8(42, 157, 143),
            text_color: Color::from_rgb8(33, 33, 33),
            muted: Color::from_rgb8(97, 97, 97),
            stripe: Color::from_rgb8(242, 246, 247),
            rule: Color::from_rgb8(215, 222, 225),
            body_size: Pt::from_i32(10),
            heading_size: Pt::from_i32(16),
        }
    }

    /// Short form: summary and prioritized findings only, tighter caps.
    pub fn executive_brief() -> Self {
        Self {
            include_dimension_table: false,
            max_insights_per_list: 3,
            ..Self::standard()
        }
    }
}
