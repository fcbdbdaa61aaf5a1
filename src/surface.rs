use std::sync::Arc;

use crate::fonts::ReportFont;
use crate::normalize::is_zero_width_mark;
use crate::types::{Color, Pt, Rect, Size};

/// Horizontal anchor resolved against the page's right-to-left base
/// direction: `Start` puts the text's right edge at x, `End` its left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintStyle {
    Fill,
    Stroke,
}

/// Recorded drawing commands. Geometry is in points with the origin at the
/// page's top-left corner and y growing downward; the PDF writer flips.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetFillColor(Color),
    SetStrokeColor(Color),
    SetLineWidth(Pt),
    FillRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    StrokeRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
    },
    MoveTo {
        x: Pt,
        y: Pt,
    },
    LineTo {
        x: Pt,
        y: Pt,
    },
    CurveTo {
        x1: Pt,
        y1: Pt,
        x2: Pt,
        y2: Pt,
        x3: Pt,
        y3: Pt,
    },
    ClosePath,
    Fill,
    Stroke,
    /// `x`/`y` address the top-left corner of the text line; `text` is
    /// already in visual order.
    DrawText {
        x: Pt,
        y: Pt,
        size: Pt,
        text: String,
    },
    /// Markers for tests and tooling; never drawn.
    Meta {
        key: String,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub commands: Vec<Command>,
}

#[derive(Clone)]
pub struct Document {
    pub page_size: Size,
    pub pages: Vec<Page>,
    pub face: Option<Arc<ReportFont>>,
}

#[derive(Default)]
struct GraphicsState {
    fill: Option<Color>,
    stroke: Option<Color>,
    line_width: Option<Pt>,
}

/// Cubic-arc circle constant.
const KAPPA: f32 = 0.552_284_75;

pub struct Surface {
    page_size: Size,
    face: Option<Arc<ReportFont>>,
    pages: Vec<Page>,
    current: Vec<Command>,
    state: GraphicsState,
}

impl Surface {
    pub fn new(page_size: Size, face: Option<Arc<ReportFont>>) -> Self {
        Self {
            page_size,
            face,
            pages: Vec::new(),
            current: Vec::new(),
            state: GraphicsState::default(),
        }
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    pub fn face(&self) -> Option<&Arc<ReportFont>> {
        self.face.as_ref()
    }

    pub fn pages_recorded(&self) -> usize {
        self.pages.len()
    }

    pub fn set_fill_color(&mut self, color: Color) {
        if self.state.fill == Some(color) {
            return;
        }
        self.state.fill = Some(color);
        self.current.push(Command::SetFillColor(color));
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        if self.state.stroke == Some(color) {
            return;
        }
        self.state.stroke = Some(color);
        self.current.push(Command::SetStrokeColor(color));
    }

    pub fn set_line_width(&mut self, width: Pt) {
        if self.state.line_width == Some(width) {
            return;
        }
        self.state.line_width = Some(width);
        self.current.push(Command::SetLineWidth(width));
    }

    /// Width of a visual string at the given size. Zero-width formatting
    /// marks never contribute. Without an embedded face a flat per-glyph
    /// estimate stands in, which is all fallback mode needs.
    pub fn measure_text_width(&self, text: &str, size: Pt) -> Pt {
        match &self.face {
            Some(face) => face.measure(text, size),
            None => {
                let count = text.chars().filter(|c| !is_zero_width_mark(*c)).count();
                let char_width = (size * 0.6).max(Pt::from_f32(1.0));
                char_width * (count as i32)
            }
        }
    }

    pub fn line_height(&self, size: Pt) -> Pt {
        match &self.face {
            Some(face) => face.line_height(size),
            None => size.mul_ratio(6, 5),
        }
    }

    pub fn draw_text(&mut self, text: &str, x: Pt, y: Pt, size: Pt, align: TextAlign) {
        if text.is_empty() {
            return;
        }
        let width = self.measure_text_width(text, size);
        let left = match align {
            TextAlign::Start => x - width,
            TextAlign::Center => x - width / 2,
            TextAlign::End => x,
        };
        self.current.push(Command::DrawText {
            x: left,
            y,
            size,
            text: text.to_string(),
        });
    }

    pub fn fill_rect(&mut self, rect: Rect) {
        self.current.push(Command::FillRect {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        });
    }

    pub fn stroke_rect(&mut self, rect: Rect) {
        self.current.push(Command::StrokeRect {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        });
    }

    pub fn fill_rounded_rect(&mut self, rect: Rect, radius: Pt) {
        self.rounded_rect_path(rect, radius);
        self.current.push(Command::Fill);
    }

    pub fn stroke_rounded_rect(&mut self, rect: Rect, radius: Pt) {
        self.rounded_rect_path(rect, radius);
        self.current.push(Command::Stroke);
    }

    fn rounded_rect_path(&mut self, rect: Rect, radius: Pt) {
        let r = radius.min(rect.width / 2).min(rect.height / 2).max(Pt::ZERO);
        let k = r * KAPPA;
        let (x, y) = (rect.x, rect.y);
        let (right, bottom) = (rect.right(), rect.bottom());
        self.current.push(Command::MoveTo { x: x + r, y });
        self.current.push(Command::LineTo { x: right - r, y });
        self.current.push(Command::CurveTo {
            x1: right - r + k,
            y1: y,
            x2: right,
            y2: y + r - k,
            x3: right,
            y3: y + r,
        });
        self.current.push(Command::LineTo {
            x: right,
            y: bottom - r,
        });
        self.current.push(Command::CurveTo {
            x1: right,
            y1: bottom - r + k,
            x2: right - r + k,
            y2: bottom,
            x3: right - r,
            y3: bottom,
        });
        self.current.push(Command::LineTo {
            x: x + r,
            y: bottom,
        });
        self.current.push(Command::CurveTo {
            x1: x + r - k,
            y1: bottom,
            x2: x,
            y2: bottom - r + k,
            x3: x,
            y3: bottom - r,
        });
        self.current.push(Command::LineTo { x, y: y + r });
        self.current.push(Command::CurveTo {
            x1: x,
            y1: y + r - k,
            x2: x + r - k,
            y2: y,
            x3: x + r,
            y3: y,
        });
        self.current.push(Command::ClosePath);
    }

    pub fn circle(&mut self, cx: Pt, cy: Pt, radius: Pt, style: PaintStyle) {
        let r = radius.max(Pt::ZERO);
        let k = r * KAPPA;
        self.current.push(Command::MoveTo { x: cx + r, y: cy });
        self.current.push(Command::CurveTo {
            x1: cx + r,
            y1: cy + k,
            x2: cx + k,
            y2: cy + r,
            x3: cx,
            y3: cy + r,
        });
        self.current.push(Command::CurveTo {
            x1: cx - k,
            y1: cy + r,
            x2: cx - r,
            y2: cy + k,
            x3: cx - r,
            y3: cy,
        });
        self.current.push(Command::CurveTo {
            x1: cx - r,
            y1: cy - k,
            x2: cx - k,
            y2: cy - r,
            x3: cx,
            y3: cy - r,
        });
        self.current.push(Command::CurveTo {
            x1: cx + k,
            y1: cy - r,
            x2: cx + r,
            y2: cy - k,
            x3: cx + r,
            y3: cy,
        });
        self.current.push(Command::ClosePath);
        self.current.push(match style {
            PaintStyle::Fill => Command::Fill,
            PaintStyle::Stroke => Command::Stroke,
        });
    }

    pub fn line(&mut self, x1: Pt, y1: Pt, x2: Pt, y2: Pt) {
        self.current.push(Command::MoveTo { x: x1, y: y1 });
        self.current.push(Command::LineTo { x: x2, y: y2 });
        self.current.push(Command::Stroke);
    }

    pub fn filled_polygon(&mut self, points: &[(Pt, Pt)]) {
        if points.len() < 3 {
            return;
        }
        let (x, y) = points[0];
        self.current.push(Command::MoveTo { x, y });
        for &(x, y) in &points[1..] {
            self.current.push(Command::LineTo { x, y });
        }
        self.current.push(Command::ClosePath);
        self.current.push(Command::Fill);
    }

    /// Open arc around (cx, cy). Angles are degrees from the positive
    /// x-axis; with y growing downward a positive sweep runs clockwise on
    /// the page. The sweep splits into quarter-turn Bézier segments.
    pub fn stroke_arc(&mut self, cx: Pt, cy: Pt, radius: Pt, start_deg: f32, sweep_deg: f32) {
        if sweep_deg == 0.0 || !sweep_deg.is_finite() || !start_deg.is_finite() {
            return;
        }
        let sweep = sweep_deg.clamp(-360.0, 360.0);
        let segments = (sweep.abs() / 90.0).ceil().max(1.0) as usize;
        let step = (sweep / segments as f32).to_radians();
        let start = start_deg.to_radians();
        let r = radius.to_f32();
        let point = |angle: f32| -> (Pt, Pt) {
            (
                cx + Pt::from_f32(r * libm::cosf(angle)),
                cy + Pt::from_f32(r * libm::sinf(angle)),
            )
        };
        let (x0, y0) = point(start);
        self.current.push(Command::MoveTo { x: x0, y: y0 });
        for i in 0..segments {
            let a = start + step * i as f32;
            let b = a + step;
            let h = 4.0 / 3.0 * libm::tanf((b - a) / 4.0);
            let (cos_a, sin_a) = (libm::cosf(a), libm::sinf(a));
            let (cos_b, sin_b) = (libm::cosf(b), libm::sinf(b));
            let p1 = (
                cx + Pt::from_f32(r * (cos_a - h * sin_a)),
                cy + Pt::from_f32(r * (sin_a + h * cos_a)),
            );
            let p2 = (
                cx + Pt::from_f32(r * (cos_b + h * sin_b)),
                cy + Pt::from_f32(r * (sin_b - h * cos_b)),
            );
            let p3 = point(b);
            self.current.push(Command::CurveTo {
                x1: p1.0,
                y1: p1.1,
                x2: p2.0,
                y2: p2.1,
                x3: p3.0,
                y3: p3.1,
            });
        }
        self.current.push(Command::Stroke);
    }

    pub fn record_meta(&mut self, key: &str, value: &str) {
        self.current.push(Command::Meta {
            key: key.to_string(),
            value: value.to_string(),
        });
    }

    /// Bounds marker consumed by layout tests; carries milli-point values.
    pub fn record_block_bounds(&mut self, rect: Rect) {
        let value = format!(
            "{},{},{},{}",
            rect.x.to_milli_i64(),
            rect.y.to_milli_i64(),
            rect.width.to_milli_i64(),
            rect.height.to_milli_i64()
        );
        self.record_meta("block.bounds", &value);
    }

    /// Closes the current page. The graphics state resets, so color and
    /// width setters re-emit on the next page.
    pub fn show_page(&mut self) {
        let commands = std::mem::take(&mut self.current);
        self.pages.push(Page { commands });
        self.state = GraphicsState::default();
    }

    pub fn finish(mut self) -> Document {
        if !self.current.is_empty() {
            self.show_page();
        }
        Document {
            page_size: self.page_size,
            pages: self.pages,
            face: self.face,
        }
    }
}
