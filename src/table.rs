use crate::error::TaqrirError;
use crate::paginate::Paginator;
use crate::surface::{Surface, TextAlign};
use crate::types::{Color, Pt, Rect};

/// Per-cell overlay drawn after the cell's base content. The rect is the
/// full cell; hooks inset as they see fit.
pub type CellHook = Box<dyn Fn(&mut Surface, Rect) + Send + Sync>;

/// Column width as a fraction of the table width. Columns are listed in
/// logical order; layout places the first column at the right edge.
pub struct ColumnSpec {
    pub width: f32,
    pub align: TextAlign,
}

impl ColumnSpec {
    pub fn new(width: f32, align: TextAlign) -> Self {
        Self { width, align }
    }
}

/// One body cell: visual text (already composed) plus an optional overlay.
pub struct TableCell {
    pub text: String,
    pub hook: Option<CellHook>,
}

impl TableCell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            hook: None,
        }
    }

    pub fn with_hook(text: impl Into<String>, hook: CellHook) -> Self {
        Self {
            text: text.into(),
            hook: Some(hook),
        }
    }
}

pub struct TableStyle {
    pub font_size: Pt,
    pub header_font_size: Pt,
    pub row_height: Pt,
    pub header_height: Pt,
    pub cell_padding: Pt,
    pub header_fill: Color,
    pub header_text_color: Color,
    pub text_color: Color,
    /// Fill behind odd body rows; even rows stay on the page background.
    pub stripe_fill: Color,
    pub rule_color: Color,
    pub repeat_header: bool,
}

/// Geometry, styling and content for one table. Read-only once built;
/// the renderer borrows it.
pub struct TableSpec {
    pub x: Pt,
    pub width: Pt,
    pub columns: Vec<ColumnSpec>,
    pub header: Vec<String>,
    pub rows: Vec<Vec<TableCell>>,
    pub style: TableStyle,
}

impl TableSpec {
    fn validate(&self) -> Result<(), TaqrirError> {
        if self.columns.is_empty() {
            return Err(TaqrirError::InvalidConfiguration(
                "table needs at least one column".to_string(),
            ));
        }
        let mut sum = 0.0f32;
        for column in &self.columns {
            if !(column.width > 0.0) {
                return Err(TaqrirError::InvalidConfiguration(
                    "column fractions must be positive".to_string(),
                ));
            }
            sum += column.width;
        }
        if (sum - 1.0).abs() > 0.01 {
            return Err(TaqrirError::InvalidConfiguration(format!(
                "column fractions sum to {sum:.3}, expected 1"
            )));
        }
        Ok(())
    }

    /// Cell rects in logical column order, right to left, for a row at
    /// `offset`.
    fn cell_rects(&self, offset: Pt, height: Pt) -> Vec<Rect> {
        let mut rects = Vec::with_capacity(self.columns.len());
        let mut right = self.x + self.width;
        for column in &self.columns {
            let w = self.width * column.width;
            rects.push(Rect::new(right - w, offset, w, height));
            right -= w;
        }
        rects
    }
}

/// Draws the table through the paginator: header first, then rows with a
/// break check each, stripes keyed by global row parity so continuation
/// pages keep alternating, and an optional repeated header after a break.
pub fn render_table(
    surface: &mut Surface,
    pager: &mut Paginator,
    spec: &TableSpec,
) -> Result<(), TaqrirError> {
    spec.validate()?;

    pager.require(surface, spec.style.header_height + spec.style.row_height)?;
    draw_header(surface, pager, spec);

    for (index, row) in spec.rows.iter().enumerate() {
        let broke = pager.require(surface, spec.style.row_height)?;
        if broke && spec.style.repeat_header {
            draw_header(surface, pager, spec);
        }
        draw_row(surface, pager, spec, index, row);
    }
    Ok(())
}

fn draw_header(surface: &mut Surface, pager: &mut Paginator, spec: &TableSpec) {
    let style = &spec.style;
    let offset = pager.offset();
    let band = Rect::new(spec.x, offset, spec.width, style.header_height);
    surface.set_fill_color(style.header_fill);
    surface.fill_rect(band);
    surface.record_block_bounds(band);

    surface.set_fill_color(style.header_text_color);
    let text_y = offset + (style.header_height - surface.line_height(style.header_font_size)) / 2;
    for (rect, text) in spec
        .cell_rects(offset, style.header_height)
        .into_iter()
        .zip(spec.header.iter())
    {
        draw_cell_text(
            surface,
            &rect,
            text,
            style.header_font_size,
            text_y,
            TextAlign::Center,
            style.cell_padding,
        );
    }
    pager.advance(style.header_height);
}

fn draw_row(
    surface: &mut Surface,
    pager: &mut Paginator,
    spec: &TableSpec,
    index: usize,
    row: &[TableCell],
) {
    let style = &spec.style;
    let offset = pager.offset();
    let band = Rect::new(spec.x, offset, spec.width, style.row_height);
    if index % 2 == 1 {
        surface.set_fill_color(style.stripe_fill);
        surface.fill_rect(band);
    }
    surface.record_meta("table.row", &index.to_string());
    surface.record_block_bounds(band);

    surface.set_fill_color(style.text_color);
    let text_y = offset + (style.row_height - surface.line_height(style.font_size)) / 2;
    let rects = spec.cell_rects(offset, style.row_height);
    for (column_index, (rect, cell)) in rects.iter().zip(row.iter()).enumerate() {
        let align = spec.columns[column_index].align;
        draw_cell_text(
            surface,
            rect,
            &cell.text,
            style.font_size,
            text_y,
            align,
            style.cell_padding,
        );
        if let Some(hook) = &cell.hook {
            hook(surface, *rect);
            // Hooks may change fill state behind our back.
            surface.set_fill_color(style.text_color);
        }
    }

    surface.set_stroke_color(style.rule_color);
    surface.set_line_width(Pt::from_f32(0.5));
    surface.line(spec.x, band.bottom(), spec.x + spec.width, band.bottom());
    pager.advance(style.row_height);
}

fn draw_cell_text(
    surface: &mut Surface,
    rect: &Rect,
    text: &str,
    size: Pt,
    text_y: Pt,
    align: TextAlign,
    padding: Pt,
) {
    if text.is_empty() {
        return;
    }
    let pad = rect.width.min(padding);
    let anchor = match align {
        TextAlign::Start => rect.right() - pad,
        TextAlign::Center => rect.center_x(),
        TextAlign::End => rect.x + pad,
    };
    surface.draw_text(text, anchor, text_y, size, align);
}

/// Overlay: small status dot at the cell's left side.
pub fn status_dot_hook(color: Color) -> CellHook {
    Box::new(move |surface, rect| {
        let radius = (rect.height / 5).min(Pt::from_f32(3.5));
        surface.set_fill_color(color);
        surface.circle(
            rect.x + radius * 3,
            rect.center_y(),
            radius,
            crate::surface::PaintStyle::Fill,
        );
    })
}

/// Overlay: thin proportional bar along the cell bottom, filled from the
/// right edge to match the reading direction.
pub fn inline_bar_hook(fraction: f32, color: Color, track: Color) -> CellHook {
    let fraction = if fraction.is_finite() {
        fraction.clamp(0.0, 1.0)
    } else {
        0.0
    };
    Box::new(move |surface, rect| {
        let inset = rect.width.min(Pt::from_f32(6.0));
        let bar_width = (rect.width - inset * 2).max(Pt::ZERO);
        let bar_height = Pt::from_f32(2.5);
        let y = rect.bottom() - bar_height - Pt::from_f32(3.0);
        surface.set_fill_color(track);
        surface.fill_rect(Rect::new(rect.x + inset, y, bar_width, bar_height));
        let filled = bar_width * fraction;
        if filled > Pt::ZERO {
            surface.set_fill_color(color);
            surface.fill_rect(Rect::new(
                rect.x + inset + (bar_width - filled),
                y,
                filled,
                bar_height,
            ));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Command;
    use crate::types::Size;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn style(repeat_header: bool) -> TableStyle {
        TableStyle {
            font_size: Pt::from_i32(9),
            header_font_size: Pt::from_i32(9),
            row_height: Pt::from_i32(30),
            header_height: Pt::from_i32(30),
            cell_padding: Pt::from_f32(6.0),
            header_fill: Color::from_rgb8(40, 80, 90),
            header_text_color: Color::WHITE,
            text_color: Color::BLACK,
            stripe_fill: Color::from_rgb8(240, 244, 245),
            rule_color: Color::from_rgb8(220, 220, 220),
            repeat_header,
        }
    }

    fn spec(rows: usize, repeat_header: bool) -> TableSpec {
        TableSpec {
            x: Pt::from_i32(40),
            width: Pt::from_i32(400),
            columns: vec![
                ColumnSpec::new(0.6, TextAlign::Start),
                ColumnSpec::new(0.4, TextAlign::Center),
            ],
            header: vec!["العنوان".to_string(), "القيمة".to_string()],
            rows: (0..rows)
                .map(|i| {
                    vec![
                        TableCell::new(format!("صف {i}")),
                        TableCell::new(format!("{i}")),
                    ]
                })
                .collect(),
            style: style(repeat_header),
        }
    }

    fn pager() -> Paginator {
        // limit 110, writable 100: 3 bands of 30 per page.
        Paginator::new(Pt::from_i32(150), Pt::from_i32(10), Pt::from_i32(40))
            .expect("valid geometry")
    }

    fn bounds_count(commands: &[Command]) -> usize {
        commands
            .iter()
            .filter(|c| matches!(c, Command::Meta { key, .. } if key == "block.bounds"))
            .count()
    }

    #[test]
    fn row_count_matches_input() {
        let mut surface = Surface::new(Size::a4(), None);
        let mut pager = pager();
        let spec = spec(2, false);
        render_table(&mut surface, &mut pager, &spec).expect("render");
        let doc = surface.finish();
        // header + 2 rows on one page
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(bounds_count(&doc.pages[0].commands), 3);
        let row_markers = doc.pages[0]
            .commands
            .iter()
            .filter(|c| matches!(c, Command::Meta { key, .. } if key == "table.row"))
            .count();
        assert_eq!(row_markers, 2);
    }

    #[test]
    fn stripes_alternate_by_global_row_index() {
        let mut surface = Surface::new(Size::a4(), None);
        let mut pager = pager();
        // 5 rows across pages: stripes behind rows 1 and 3.
        let spec = spec(5, false);
        render_table(&mut surface, &mut pager, &spec).expect("render");
        let doc = surface.finish();
        let stripe_fills: usize = doc
            .pages
            .iter()
            .flat_map(|p| p.commands.iter())
            .filter(|c| matches!(c, Command::FillRect { .. }))
            .count();
        // 1 header band + 2 stripes
        assert_eq!(stripe_fills, 3);
    }

    #[test]
    fn header_repeats_on_continuation_pages() {
        let mut surface = Surface::new(Size::a4(), None);
        let mut pager = pager();
        let spec = spec(4, true);
        render_table(&mut surface, &mut pager, &spec).expect("render");
        let doc = surface.finish();
        assert_eq!(doc.pages.len(), 2);
        let header_texts: usize = doc
            .pages
            .iter()
            .flat_map(|p| p.commands.iter())
            .filter(|c| matches!(c, Command::DrawText { text, .. } if text == "العنوان"))
            .count();
        assert_eq!(header_texts, 2);
    }

    #[test]
    fn header_not_repeated_when_disabled() {
        let mut surface = Surface::new(Size::a4(), None);
        let mut pager = pager();
        let spec = spec(4, false);
        render_table(&mut surface, &mut pager, &spec).expect("render");
        let doc = surface.finish();
        let header_texts: usize = doc
            .pages
            .iter()
            .flat_map(|p| p.commands.iter())
            .filter(|c| matches!(c, Command::DrawText { text, .. } if text == "العنوان"))
            .count();
        assert_eq!(header_texts, 1);
    }

    #[test]
    fn hooks_run_once_per_cell() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut rows: Vec<Vec<TableCell>> = Vec::new();
        for i in 0..3 {
            let hits = Arc::clone(&hits);
            rows.push(vec![
                TableCell::new(format!("صف {i}")),
                TableCell::with_hook(
                    format!("{i}"),
                    Box::new(move |_, _| {
                        hits.fetch_add(1, Ordering::SeqCst);
                    }),
                ),
            ]);
        }
        let mut spec = spec(0, false);
        spec.rows = rows;
        let mut surface = Surface::new(Size::a4(), None);
        let mut pager = pager();
        render_table(&mut surface, &mut pager, &spec).expect("render");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn bad_column_fractions_rejected() {
        let mut spec = spec(1, false);
        spec.columns = vec![
            ColumnSpec::new(0.5, TextAlign::Start),
            ColumnSpec::new(0.2, TextAlign::Center),
        ];
        let mut surface = Surface::new(Size::a4(), None);
        let mut pager = pager();
        let err = render_table(&mut surface, &mut pager, &spec).unwrap_err();
        assert!(matches!(err, TaqrirError::InvalidConfiguration(_)));
    }

    #[test]
    fn first_column_sits_at_the_right_edge() {
        let spec = spec(1, false);
        let rects = spec.cell_rects(Pt::ZERO, Pt::from_i32(30));
        assert_eq!(rects[0].right(), Pt::from_i32(440));
        assert_eq!(rects[1].x, Pt::from_i32(40));
    }
}
