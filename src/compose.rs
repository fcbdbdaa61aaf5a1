//! Document Composer: drives the section order against the paginator and
//! drawing surface, then applies the footer pass over the finished pages.
//!
//! Section order is fixed (cover, executive summary, score table and legend,
//! insight lists, footers); style toggles can omit sections, never reorder
//! them. Tier labels and colors always come from
//! `MaturityTier::for_percentage`, so a percentage renders identically in
//! every section.

use std::sync::Arc;

use crate::error::TaqrirError;
use crate::fonts::ReportFont;
use crate::paginate::Paginator;
use crate::report::{DimensionScore, InsightOrder, ReportInput, ReportStyle, order_insights};
use crate::surface::{Document, PaintStyle, Surface, TextAlign};
use crate::table::{ColumnSpec, TableCell, TableSpec, TableStyle, inline_bar_hook, render_table, status_dot_hook};
use crate::text::TextComposer;
use crate::tiers::MaturityTier;
use crate::trace::TraceLogger;
use crate::types::{Color, Margins, Pt, Rect, Size};

pub(crate) struct Composer<'a> {
    style: &'a ReportStyle,
    text: TextComposer,
    page_size: Size,
    margins: Margins,
    footer_reserve: Pt,
    trace: TraceLogger,
}

impl<'a> Composer<'a> {
    pub(crate) fn new(
        style: &'a ReportStyle,
        fallback_mode: bool,
        page_size: Size,
        margins: Margins,
        footer_reserve: Pt,
        trace: TraceLogger,
    ) -> Self {
        Self {
            style,
            text: TextComposer::new(fallback_mode),
            page_size,
            margins,
            footer_reserve,
            trace,
        }
    }

    pub(crate) fn compose(
        &self,
        input: &ReportInput,
        face: Option<Arc<ReportFont>>,
    ) -> Result<Document, TaqrirError> {
        let mut surface = Surface::new(self.page_size, face);
        let mut pager = Paginator::new(
            self.page_size.height,
            self.margins.top,
            self.footer_reserve,
        )?;

        self.cover(&mut surface, &mut pager, input);
        self.executive_summary(&mut surface, &mut pager, input)?;
        if self.style.include_dimension_table {
            self.score_table(&mut surface, &mut pager, input)?;
            self.legend(&mut surface, &mut pager)?;
        }
        if self.style.include_insights {
            self.insight_lists(&mut surface, &mut pager, input)?;
        }

        let doc = self.apply_footers(surface.finish());
        self.trace
            .increment("compose.pages_total", doc.pages.len() as u64);
        Ok(doc)
    }

    fn content_left(&self) -> Pt {
        self.margins.left
    }

    fn content_right(&self) -> Pt {
        self.page_size.width - self.margins.right
    }

    fn content_width(&self) -> Pt {
        self.page_size.width - self.margins.left - self.margins.right
    }

    // Cover layout uses absolute coordinates; the page is handed back to the
    // paginator with an unconditional break at the end.
    fn cover(&self, surface: &mut Surface, pager: &mut Paginator, input: &ReportInput) {
        self.trace.event("compose.section", r#""name":"cover""#);
        surface.record_meta("section", "cover");

        let width = self.page_size.width;
        let band = Rect::new(Pt::ZERO, Pt::ZERO, width, Pt::from_i32(180));
        surface.set_fill_color(self.style.primary);
        surface.fill_rect(band);
        surface.record_block_bounds(band);

        surface.set_fill_color(Color::WHITE);
        let title = self.text.visual(&self.style.title);
        surface.draw_text(
            &title,
            width / 2,
            Pt::from_i32(66),
            Pt::from_i32(24),
            TextAlign::Center,
        );
        if let Some(org) = &input.organization {
            let name = self.text.visual(&org.name);
            surface.draw_text(
                &name,
                width / 2,
                Pt::from_i32(112),
                Pt::from_i32(14),
                TextAlign::Center,
            );
        }

        self.score_ring(surface, input);

        let mut detail_y = Pt::from_i32(560);
        let detail_top = detail_y;
        let line_step = Pt::from_i32(18);
        let mut detail_lines: Vec<String> = Vec::new();
        detail_lines.push(format!(
            "تاريخ الإكمال: {}",
            input.summary.completed_at.format("%Y/%m/%d")
        ));
        if let Some(org) = &input.organization {
            if let Some(kind) = &org.organization_type {
                detail_lines.push(format!("نوع الجهة: {kind}"));
            }
            if let Some(sector) = &org.sector {
                detail_lines.push(format!("القطاع: {sector}"));
            }
            if let Some(city) = &org.city {
                detail_lines.push(format!("المدينة: {city}"));
            }
        }
        surface.set_fill_color(self.style.muted);
        for line in &detail_lines {
            let visual = self.text.visual(line);
            surface.draw_text(&visual, width / 2, detail_y, Pt::from_i32(11), TextAlign::Center);
            detail_y += line_step;
        }
        surface.record_block_bounds(Rect::new(
            self.content_left(),
            detail_top,
            self.content_width(),
            detail_y - detail_top,
        ));

        pager.break_page(surface);
    }

    fn score_ring(&self, surface: &mut Surface, input: &ReportInput) {
        let overall = input.summary.overall_percentage;
        let tier = MaturityTier::for_percentage(overall);
        let cx = self.page_size.width / 2;
        let cy = Pt::from_i32(400);
        let radius = Pt::from_i32(80);

        surface.set_line_width(Pt::from_i32(10));
        surface.set_stroke_color(self.style.stripe);
        surface.circle(cx, cy, radius, PaintStyle::Stroke);

        let sweep = (overall.clamp(0.0, 100.0) * 3.6) as f32;
        if sweep > 0.0 {
            surface.set_stroke_color(tier.color());
            surface.stroke_arc(cx, cy, radius, -90.0, sweep);
        }

        surface.set_fill_color(tier.color());
        let percent = self.text.visual(&format_percent(overall));
        surface.draw_text(&percent, cx, cy - Pt::from_i32(30), Pt::from_i32(30), TextAlign::Center);
        let label = self.text.visual(tier.label_ar());
        surface.draw_text(&label, cx, cy + Pt::from_i32(8), Pt::from_i32(13), TextAlign::Center);

        let pad = Pt::from_i32(12);
        surface.record_block_bounds(Rect::new(
            cx - radius - pad,
            cy - radius - pad,
            (radius + pad) * 2,
            (radius + pad) * 2,
        ));
    }

    fn section_heading(
        &self,
        surface: &mut Surface,
        pager: &mut Paginator,
        title: &str,
    ) -> Result<(), TaqrirError> {
        let line_height = surface.line_height(self.style.heading_size);
        let block = line_height + Pt::from_i32(14);
        // Keep headings attached to some following content.
        pager.require(surface, block + Pt::from_i32(40))?;

        let offset = pager.offset();
        surface.set_fill_color(self.style.primary);
        let visual = self.text.visual(title);
        surface.draw_text(
            &visual,
            self.content_right(),
            offset,
            self.style.heading_size,
            TextAlign::Start,
        );
        surface.set_fill_color(self.style.accent);
        surface.fill_rect(Rect::new(
            self.content_right() - Pt::from_i32(56),
            offset + line_height + Pt::from_i32(4),
            Pt::from_i32(56),
            Pt::from_f32(2.5),
        ));
        surface.record_block_bounds(Rect::new(self.content_left(), offset, self.content_width(), block));
        pager.advance(block);
        Ok(())
    }

    fn executive_summary(
        &self,
        surface: &mut Surface,
        pager: &mut Paginator,
        input: &ReportInput,
    ) -> Result<(), TaqrirError> {
        self.trace.event("compose.section", r#""name":"summary""#);
        surface.record_meta("section", "summary");
        self.section_heading(surface, pager, "الملخص التنفيذي")?;
        self.summary_cards(surface, pager, input)?;
        if !input.dimensions.is_empty() {
            self.dimension_highlights(surface, pager, input)?;
        }
        Ok(())
    }

    fn summary_cards(
        &self,
        surface: &mut Surface,
        pager: &mut Paginator,
        input: &ReportInput,
    ) -> Result<(), TaqrirError> {
        let overall = input.summary.overall_percentage;
        let tier = MaturityTier::for_percentage(overall);
        let cards: [(String, String, Color); 4] = [
            (
                "النتيجة العامة".to_string(),
                format_percent(overall),
                tier.color(),
            ),
            (
                "مستوى النضج".to_string(),
                tier.label_ar().to_string(),
                tier.color(),
            ),
            (
                "الأبعاد المكتملة".to_string(),
                input.summary.completed_dimensions.to_string(),
                self.style.primary,
            ),
            (
                "الأسئلة المجابة".to_string(),
                input.summary.answered_questions.to_string(),
                self.style.primary,
            ),
        ];

        let card_height = Pt::from_i32(72);
        let gap = Pt::from_i32(10);
        let card_width = (self.content_width() - gap * 3) / 4;
        pager.require(surface, card_height + Pt::from_i32(16))?;
        let offset = pager.offset();

        for (index, (caption, value, value_color)) in cards.iter().enumerate() {
            let right = self.content_right() - (card_width + gap) * index as i32;
            let rect = Rect::new(right - card_width, offset, card_width, card_height);
            surface.set_fill_color(self.style.stripe);
            surface.fill_rounded_rect(rect, Pt::from_i32(6));

            surface.set_fill_color(*value_color);
            let value_visual = self.text.visual(value);
            surface.draw_text(
                &value_visual,
                rect.center_x(),
                offset + Pt::from_i32(16),
                Pt::from_i32(16),
                TextAlign::Center,
            );
            surface.set_fill_color(self.style.muted);
            let caption_visual = self.text.visual(caption);
            surface.draw_text(
                &caption_visual,
                rect.center_x(),
                offset + Pt::from_i32(46),
                Pt::from_i32(9),
                TextAlign::Center,
            );
        }
        surface.record_block_bounds(Rect::new(
            self.content_left(),
            offset,
            self.content_width(),
            card_height,
        ));
        pager.advance(card_height + Pt::from_i32(16));
        Ok(())
    }

    fn dimension_highlights(
        &self,
        surface: &mut Surface,
        pager: &mut Paginator,
        input: &ReportInput,
    ) -> Result<(), TaqrirError> {
        let count = self.style.highlight_count;
        let top = sorted_by_percentage(&input.dimensions, true);
        self.highlight_group(surface, pager, "أعلى الأبعاد أداءً", top.iter().take(count))?;
        // With few dimensions the two groups would repeat each other.
        if input.dimensions.len() > count {
            let bottom = sorted_by_percentage(&input.dimensions, false);
            self.highlight_group(
                surface,
                pager,
                "الأبعاد الأدنى أداءً",
                bottom.iter().take(count),
            )?;
        }
        Ok(())
    }

    fn highlight_group<'d>(
        &self,
        surface: &mut Surface,
        pager: &mut Paginator,
        title: &str,
        dimensions: impl Iterator<Item = &'d &'d DimensionScore>,
    ) -> Result<(), TaqrirError> {
        let sub_size = Pt::from_i32(12);
        let sub_block = surface.line_height(sub_size) + Pt::from_i32(6);
        pager.require(surface, sub_block + Pt::from_i32(24))?;
        surface.set_fill_color(self.style.primary);
        let visual = self.text.visual(title);
        surface.draw_text(&visual, self.content_right(), pager.offset(), sub_size, TextAlign::Start);
        pager.advance(sub_block);

        let row_height = Pt::from_i32(22);
        let bar_left = self.content_left() + Pt::from_i32(56);
        let bar_right = self.content_right() - Pt::from_i32(170);
        let bar_width = bar_right - bar_left;
        for dimension in dimensions {
            pager.require(surface, row_height)?;
            let offset = pager.offset();
            let tier = MaturityTier::for_percentage(dimension.percentage());

            surface.set_fill_color(self.style.text_color);
            let name = self.text.truncate(
                surface,
                &dimension.name,
                Pt::from_i32(10),
                Pt::from_i32(160),
            );
            surface.draw_text(&name, self.content_right(), offset + Pt::from_i32(4), Pt::from_i32(10), TextAlign::Start);

            let track = Rect::new(bar_left, offset + Pt::from_i32(8), bar_width, Pt::from_i32(6));
            surface.set_fill_color(self.style.stripe);
            surface.fill_rect(track);
            let fraction = (dimension.percentage() / 100.0).clamp(0.0, 1.0) as f32;
            let filled = bar_width * fraction;
            if filled > Pt::ZERO {
                surface.set_fill_color(tier.color());
                surface.fill_rect(Rect::new(
                    bar_right - filled,
                    offset + Pt::from_i32(8),
                    filled,
                    Pt::from_i32(6),
                ));
            }

            surface.set_fill_color(tier.color());
            let percent = self.text.visual(&format_percent(dimension.percentage()));
            surface.draw_text(&percent, self.content_left(), offset + Pt::from_i32(4), Pt::from_i32(10), TextAlign::End);

            surface.record_block_bounds(Rect::new(
                self.content_left(),
                offset,
                self.content_width(),
                row_height,
            ));
            pager.advance(row_height);
        }
        pager.advance(Pt::from_i32(10));
        Ok(())
    }

    fn score_table(
        &self,
        surface: &mut Surface,
        pager: &mut Paginator,
        input: &ReportInput,
    ) -> Result<(), TaqrirError> {
        self.trace.event("compose.section", r#""name":"table""#);
        surface.record_meta("section", "table");
        self.section_heading(surface, pager, "نتائج الأبعاد التفصيلية")?;

        let cell_padding = Pt::from_i32(8);
        let font_size = Pt::from_f32(9.5);
        let name_fraction = 0.40f32;
        let name_width = self.content_width() * name_fraction - cell_padding * 2;

        let mut ordered: Vec<&DimensionScore> = input.dimensions.iter().collect();
        ordered.sort_by_key(|d| d.order_index);

        let mut rows: Vec<Vec<TableCell>> = Vec::with_capacity(ordered.len());
        for dimension in &ordered {
            let tier = MaturityTier::for_percentage(dimension.percentage());
            let name = self.text.truncate(surface, &dimension.name, font_size, name_width);
            let raw = self.text.visual(&format!(
                "{} من {}",
                format_number(dimension.raw_score),
                format_number(dimension.max_score)
            ));
            let percent = self.text.visual(&format_percent(dimension.percentage()));
            let label = self.text.visual(tier.label_ar());
            let fraction = (dimension.percentage() / 100.0) as f32;
            rows.push(vec![
                TableCell::new(name),
                TableCell::new(raw),
                TableCell::with_hook(
                    percent,
                    inline_bar_hook(fraction, tier.color(), self.style.stripe),
                ),
                TableCell::with_hook(label, status_dot_hook(tier.color())),
            ]);
        }

        let spec = TableSpec {
            x: self.content_left(),
            width: self.content_width(),
            columns: vec![
                ColumnSpec::new(name_fraction, TextAlign::Start),
                ColumnSpec::new(0.15, TextAlign::Center),
                ColumnSpec::new(0.25, TextAlign::Center),
                ColumnSpec::new(0.20, TextAlign::Center),
            ],
            header: vec![
                self.text.visual("البعد"),
                self.text.visual("الدرجة"),
                self.text.visual("النسبة المئوية"),
                self.text.visual("المستوى"),
            ],
            rows,
            style: TableStyle {
                font_size,
                header_font_size: Pt::from_f32(9.5),
                row_height: Pt::from_i32(26),
                header_height: Pt::from_i32(28),
                cell_padding,
                header_fill: self.style.primary,
                header_text_color: Color::WHITE,
                text_color: self.style.text_color,
                stripe_fill: self.style.stripe,
                rule_color: self.style.rule,
                repeat_header: self.style.repeat_table_header,
            },
        };
        render_table(surface, pager, &spec)?;
        pager.advance(Pt::from_i32(14));
        Ok(())
    }

    fn legend(&self, surface: &mut Surface, pager: &mut Paginator) -> Result<(), TaqrirError> {
        surface.record_meta("section", "legend");
        let row_height = Pt::from_i32(26);
        pager.require(surface, row_height)?;
        let offset = pager.offset();

        let entry_width = self.content_width() / 3;
        let chip = Pt::from_i32(10);
        for (index, tier) in MaturityTier::all().into_iter().enumerate() {
            let right = self.content_right() - entry_width * index as i32;
            surface.set_fill_color(tier.color());
            surface.fill_rect(Rect::new(
                right - chip,
                offset + Pt::from_i32(6),
                chip,
                chip,
            ));
            surface.set_fill_color(self.style.muted);
            let label = self.text.visual(&format!(
                "{} ({})",
                tier.label_ar(),
                band_range_text(tier)
            ));
            surface.draw_text(
                &label,
                right - chip - Pt::from_i32(6),
                offset + Pt::from_i32(4),
                Pt::from_f32(9.5),
                TextAlign::Start,
            );
        }
        surface.record_block_bounds(Rect::new(
            self.content_left(),
            offset,
            self.content_width(),
            row_height,
        ));
        pager.advance(row_height + Pt::from_i32(10));
        Ok(())
    }

    fn insight_lists(
        &self,
        surface: &mut Surface,
        pager: &mut Paginator,
        input: &ReportInput,
    ) -> Result<(), TaqrirError> {
        self.trace.event("compose.section", r#""name":"insights""#);
        surface.record_meta("section", "insights");
        let groups: [(&str, &[crate::report::Insight], InsightOrder); 3] = [
            ("نقاط القوة", &input.strengths, InsightOrder::Descending),
            ("فرص التحسين", &input.opportunities, InsightOrder::Ascending),
            ("التوصيات", &input.recommendations, InsightOrder::Ascending),
        ];
        for (title, insights, order) in groups {
            if insights.is_empty() {
                continue;
            }
            self.section_heading(surface, pager, title)?;
            let ordered: Vec<&crate::report::Insight> = if self.style.prioritize_insights {
                order_insights(insights, &input.dimensions, order)
            } else {
                insights.iter().collect()
            };
            for insight in ordered.into_iter().take(self.style.max_insights_per_list) {
                self.insight_item(surface, pager, &insight.text)?;
            }
            pager.advance(Pt::from_i32(8));
        }
        Ok(())
    }

    fn insight_item(
        &self,
        surface: &mut Surface,
        pager: &mut Paginator,
        text: &str,
    ) -> Result<(), TaqrirError> {
        let size = self.style.body_size;
        let line_height = surface.line_height(size);
        let indent = Pt::from_i32(18);
        let lines = self.text.wrap(surface, text, size, self.content_width() - indent);
        if lines.is_empty() {
            return Ok(());
        }
        let block = line_height * lines.len() as i32 + Pt::from_i32(8);
        pager.require(surface, block)?;
        let offset = pager.offset();
        surface.record_meta("insight.item", &lines.len().to_string());

        surface.set_fill_color(self.style.accent);
        surface.circle(
            self.content_right() - Pt::from_i32(5),
            offset + line_height / 2,
            Pt::from_f32(2.5),
            PaintStyle::Fill,
        );
        surface.set_fill_color(self.style.text_color);
        let mut line_y = offset;
        for line in &lines {
            surface.draw_text(line, self.content_right() - indent, line_y, size, TextAlign::Start);
            line_y += line_height;
        }
        surface.record_block_bounds(Rect::new(
            self.content_left(),
            offset,
            self.content_width(),
            line_height * lines.len() as i32,
        ));
        pager.advance(block);
        Ok(())
    }

    fn apply_footers(&self, mut doc: Document) -> Document {
        let total = doc.pages.len();
        if total == 0 {
            return doc;
        }
        let mut overlay = Surface::new(self.page_size, doc.face.clone());
        for index in 0..total {
            if index > 0 {
                overlay.show_page();
            }
            if index == 0 && !self.style.footer_on_cover {
                continue;
            }
            self.footer(&mut overlay, index, total);
        }
        let footer_doc = overlay.finish();
        for (page, extra) in doc.pages.iter_mut().zip(footer_doc.pages) {
            page.commands.extend(extra.commands);
        }
        doc
    }

    fn footer(&self, surface: &mut Surface, page_index: usize, total: usize) {
        let top = self.page_size.height - self.footer_reserve;
        surface.set_stroke_color(self.style.rule);
        surface.set_line_width(Pt::from_f32(0.75));
        surface.line(
            self.content_left(),
            top + Pt::from_i32(10),
            self.content_right(),
            top + Pt::from_i32(10),
        );

        surface.set_fill_color(self.style.muted);
        let size = Pt::from_f32(8.5);
        let title = self.text.visual(&self.style.title);
        surface.draw_text(&title, self.content_right(), top + Pt::from_i32(16), size, TextAlign::Start);
        let label = self
            .text
            .visual(&format!("صفحة {} من {}", page_index + 1, total));
        surface.draw_text(&label, self.content_left(), top + Pt::from_i32(16), size, TextAlign::End);
    }
}

fn sorted_by_percentage(dimensions: &[DimensionScore], descending: bool) -> Vec<&DimensionScore> {
    let mut sorted: Vec<&DimensionScore> = dimensions.iter().collect();
    sorted.sort_by(|a, b| {
        let cmp = a
            .percentage()
            .partial_cmp(&b.percentage())
            .unwrap_or(std::cmp::Ordering::Equal);
        if descending { cmp.reverse() } else { cmp }
    });
    sorted
}

/// Rounded display form. Classification always happens on the unrounded
/// value before this is called.
fn format_percent(percentage: f64) -> String {
    format!("{}%", percentage.round() as i64)
}

fn format_number(value: f64) -> String {
    if (value - value.round()).abs() < 1e-9 {
        format!("{}", value.round() as i64)
    } else {
        format!("{value:.1}")
    }
}

fn band_range_text(tier: MaturityTier) -> String {
    let band = match tier {
        MaturityTier::Basic => &taqrir_tier_contract::TIER_BANDS_V1[0],
        MaturityTier::Emerging => &taqrir_tier_contract::TIER_BANDS_V1[1],
        MaturityTier::Ideal => &taqrir_tier_contract::TIER_BANDS_V1[2],
    };
    let upper = if band.upper_inclusive {
        band.upper
    } else {
        band.upper - 1.0
    };
    format!("{}% - {}%", band.lower as i64, upper as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{AssessmentSummary, Insight, Organization};
    use crate::surface::Command;
    use crate::text::render_text;
    use chrono::NaiveDate;

    fn sample_input(dimension_count: usize) -> ReportInput {
        let dimensions: Vec<DimensionScore> = (0..dimension_count)
            .map(|i| {
                DimensionScore::new(
                    format!("البعد {i}"),
                    i,
                    3.0 + i as f64 * 0.75,
                    12.0,
                )
            })
            .collect();
        ReportInput {
            organization: Some(Organization {
                name: "جمعية التنمية".to_string(),
                organization_type: Some("جمعية أهلية".to_string()),
                sector: Some("التنمية الاجتماعية".to_string()),
                city: Some("الرياض".to_string()),
            }),
            summary: AssessmentSummary {
                overall_percentage: 82.0,
                maturity: MaturityTier::Ideal,
                completed_dimensions: dimension_count,
                answered_questions: dimension_count * 12,
                completed_at: NaiveDate::from_ymd_opt(2025, 11, 20).unwrap(),
            },
            dimensions,
            strengths: vec![Insight::for_dimension("التزام واضح بالحوكمة", 0)],
            opportunities: vec![Insight::for_dimension("توثيق الإجراءات", 1)],
            recommendations: vec![Insight::new("اعتماد خطة تحسين سنوية")],
        }
    }

    fn composer(style: &ReportStyle) -> Composer<'_> {
        Composer::new(
            style,
            false,
            Size::a4(),
            Margins::all(40.0),
            Pt::from_i32(60),
            TraceLogger::disabled(),
        )
    }

    fn draw_texts(doc: &Document) -> Vec<&str> {
        doc.pages
            .iter()
            .flat_map(|p| p.commands.iter())
            .filter_map(|c| match c {
                Command::DrawText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn meta_count(doc: &Document, wanted: &str) -> usize {
        doc.pages
            .iter()
            .flat_map(|p| p.commands.iter())
            .filter(|c| matches!(c, Command::Meta { key, .. } if key == wanted))
            .count()
    }

    #[test]
    fn cover_badge_shows_tier_label_and_score() {
        let style = ReportStyle::standard();
        let doc = composer(&style)
            .compose(&sample_input(6), None)
            .expect("compose");
        let cover: Vec<&str> = doc.pages[0]
            .commands
            .iter()
            .filter_map(|c| match c {
                Command::DrawText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(cover.contains(&render_text("82%", false).as_str()));
        assert!(cover.contains(&render_text("مثالي", false).as_str()));
    }

    #[test]
    fn table_has_one_row_per_dimension() {
        let style = ReportStyle::standard();
        let doc = composer(&style)
            .compose(&sample_input(7), None)
            .expect("compose");
        assert_eq!(meta_count(&doc, "table.row"), 7);
    }

    #[test]
    fn table_percent_cells_use_rounded_display() {
        let style = ReportStyle::standard();
        let input = sample_input(3);
        let doc = composer(&style).compose(&input, None).expect("compose");
        let texts = draw_texts(&doc);
        for dimension in &input.dimensions {
            let expected = render_text(&format_percent(dimension.percentage()), false);
            assert!(
                texts.contains(&expected.as_str()),
                "missing percent cell {expected}"
            );
        }
    }

    #[test]
    fn footer_runs_on_every_page_but_the_cover() {
        let style = ReportStyle::standard();
        let doc = composer(&style)
            .compose(&sample_input(6), None)
            .expect("compose");
        let total = doc.pages.len();
        assert!(total >= 2);
        for (index, page) in doc.pages.iter().enumerate() {
            let label = render_text(&format!("صفحة {} من {}", index + 1, total), false);
            let found = page
                .commands
                .iter()
                .any(|c| matches!(c, Command::DrawText { text, .. } if *text == label));
            assert_eq!(found, index > 0, "footer mismatch on page {index}");
        }
    }

    #[test]
    fn blocks_stay_out_of_the_footer_reserve() {
        let style = ReportStyle::standard();
        let mut input = sample_input(9);
        for i in 0..12 {
            input
                .strengths
                .push(Insight::for_dimension(format!("قوة إضافية {i}"), i % 9));
        }
        let doc = composer(&style).compose(&input, None).expect("compose");
        let limit_milli = (Size::a4().height - Pt::from_i32(60)).to_milli_i64();
        for (page_index, page) in doc.pages.iter().enumerate() {
            for command in &page.commands {
                if let Command::Meta { key, value } = command {
                    if key != "block.bounds" {
                        continue;
                    }
                    let parts: Vec<i64> = value
                        .split(',')
                        .map(|p| p.parse().expect("bounds component"))
                        .collect();
                    assert!(
                        parts[1] + parts[3] <= limit_milli,
                        "block leaks into footer reserve on page {page_index}: {value}"
                    );
                }
            }
        }
    }

    #[test]
    fn compose_is_deterministic() {
        let style = ReportStyle::standard();
        let input = sample_input(8);
        let a = composer(&style).compose(&input, None).expect("compose");
        let b = composer(&style).compose(&input, None).expect("compose");
        assert_eq!(a.pages, b.pages);
    }

    #[test]
    fn strengths_cap_and_order_follow_the_style() {
        let style = ReportStyle::standard();
        let mut input = sample_input(12);
        input.strengths = (0..12)
            .map(|i| Insight::for_dimension(format!("قوة {i}"), i))
            .collect();
        input.opportunities.clear();
        input.recommendations.clear();
        let doc = composer(&style).compose(&input, None).expect("compose");
        assert_eq!(meta_count(&doc, "insight.item"), 5);
        let texts = draw_texts(&doc);
        // Dimension 11 has the highest percentage, so its strength leads.
        assert!(texts.contains(&render_text("قوة 11", false).as_str()));
        assert!(!texts.contains(&render_text("قوة 0", false).as_str()));
    }

    #[test]
    fn brief_style_skips_the_dimension_table() {
        let brief = ReportStyle::executive_brief();
        let doc = composer(&brief)
            .compose(&sample_input(6), None)
            .expect("compose");
        assert_eq!(meta_count(&doc, "table.row"), 0);
        let sections: Vec<&str> = doc
            .pages
            .iter()
            .flat_map(|p| p.commands.iter())
            .filter_map(|c| match c {
                Command::Meta { key, value } if key == "section" => Some(value.as_str()),
                _ => None,
            })
            .collect();
        assert!(!sections.contains(&"table"));
        assert!(sections.contains(&"insights"));
    }

    #[test]
    fn display_rounding_never_changes_classification() {
        // 49.6 of 100 displays as 50% yet stays in the basic band.
        let dimension = DimensionScore::new("حوكمة", 0, 49.6, 100.0);
        assert_eq!(format_percent(dimension.percentage()), "50%");
        assert_eq!(dimension.tier(), MaturityTier::Basic);
        assert_eq!(
            MaturityTier::for_percentage(50.0),
            MaturityTier::Emerging
        );
    }
}
