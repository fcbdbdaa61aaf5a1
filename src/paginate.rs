use crate::error::TaqrirError;
use crate::surface::Surface;
use crate::types::Pt;

/// Where the next block lands. `offset` is measured from the page top and
/// only ever moves down; the zone below `page_height - footer_reserve`
/// belongs to the footer pass and never receives flowed content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCursor {
    pub page_index: usize,
    pub offset: Pt,
    pub page_height: Pt,
    pub top_margin: Pt,
    pub footer_reserve: Pt,
}

/// Exclusive owner of the page cursor. `check_break` is the only operation
/// that starts a new page; everything else routes through it.
pub struct Paginator {
    cursor: PageCursor,
}

impl Paginator {
    pub fn new(page_height: Pt, top_margin: Pt, footer_reserve: Pt) -> Result<Self, TaqrirError> {
        if page_height <= Pt::ZERO {
            return Err(TaqrirError::InvalidConfiguration(
                "page height must be positive".to_string(),
            ));
        }
        if top_margin < Pt::ZERO || footer_reserve < Pt::ZERO {
            return Err(TaqrirError::InvalidConfiguration(
                "margins cannot be negative".to_string(),
            ));
        }
        if top_margin + footer_reserve >= page_height {
            return Err(TaqrirError::InvalidConfiguration(format!(
                "no writable area: top margin {} + footer reserve {} >= page height {}",
                top_margin.to_f32(),
                footer_reserve.to_f32(),
                page_height.to_f32()
            )));
        }
        Ok(Self {
            cursor: PageCursor {
                page_index: 0,
                offset: top_margin,
                page_height,
                top_margin,
                footer_reserve,
            },
        })
    }

    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    pub fn page_index(&self) -> usize {
        self.cursor.page_index
    }

    pub fn offset(&self) -> Pt {
        self.cursor.offset
    }

    /// Lowest offset flowed content may reach.
    pub fn limit(&self) -> Pt {
        self.cursor.page_height - self.cursor.footer_reserve
    }

    pub fn remaining(&self) -> Pt {
        (self.limit() - self.cursor.offset).max(Pt::ZERO)
    }

    /// Height of a fresh page's writable area.
    pub fn writable_height(&self) -> Pt {
        self.limit() - self.cursor.top_margin
    }

    /// Starts a new page when `needed` does not fit above the footer
    /// reserve. Returns whether a transition happened.
    pub fn check_break(&mut self, surface: &mut Surface, needed: Pt) -> bool {
        if self.cursor.offset + needed > self.limit() {
            surface.show_page();
            self.cursor.page_index += 1;
            self.cursor.offset = self.cursor.top_margin;
            true
        } else {
            false
        }
    }

    /// `check_break` with a guard for blocks no page can hold.
    pub fn require(
        &mut self,
        surface: &mut Surface,
        needed: Pt,
    ) -> Result<bool, TaqrirError> {
        if needed > self.writable_height() {
            return Err(TaqrirError::UnplaceableBlock(format!(
                "needs {} but a full page offers {}",
                needed.to_f32(),
                self.writable_height().to_f32()
            )));
        }
        Ok(self.check_break(surface, needed))
    }

    /// Unconditional transition, e.g. after a free-form cover page.
    pub fn break_page(&mut self, surface: &mut Surface) {
        let over = self.remaining() + Pt::from_f32(1.0);
        let _ = self.check_break(surface, over);
    }

    pub fn advance(&mut self, height: Pt) {
        self.cursor.offset += height.max(Pt::ZERO);
    }
}
