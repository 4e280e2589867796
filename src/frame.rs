use crate::canvas::Canvas;
use crate::flowable::{BreakInside, Flowable};
use crate::types::{Pt, Rect};

pub enum AddResult {
    Placed,
    Split(Box<dyn Flowable>),
    Overflow(Box<dyn Flowable>),
}

/// A rectangular region of a page filled top to bottom.
pub struct Frame {
    rect: Rect,
    cursor_y: Pt,
}

impl Frame {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            cursor_y: Pt::ZERO,
        }
    }

    pub fn remaining_height(&self) -> Pt {
        (self.rect.height - self.cursor_y).max(Pt::ZERO)
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn is_empty(&self) -> bool {
        self.cursor_y <= Pt::ZERO
    }

    fn place(&mut self, flowable: &dyn Flowable, canvas: &mut Canvas, width: Pt, height: Pt) {
        let avail_height = self.remaining_height();
        let y = self.rect.y + self.cursor_y;
        flowable.draw(canvas, self.rect.x, y, self.rect.width, avail_height);
        canvas.record_flowable_bounds(Rect::new(self.rect.x, y, width, height));
        self.cursor_y += height;
    }

    pub fn add(&mut self, flowable: Box<dyn Flowable>, canvas: &mut Canvas) -> AddResult {
        let avail_width = self.rect.width;
        let avail_height = self.remaining_height();
        if avail_height <= Pt::ZERO {
            return AddResult::Overflow(flowable);
        }

        let size = flowable.wrap(avail_width, avail_height);
        if flowable.pagination().break_inside == BreakInside::Avoid
            && size.height > avail_height
            && size.height <= self.rect.height
            && !self.is_empty()
        {
            return AddResult::Overflow(flowable);
        }

        if size.height <= avail_height {
            self.place(flowable.as_ref(), canvas, size.width, size.height);
            return AddResult::Placed;
        }

        if let Some((first, second)) = flowable.split(avail_width, avail_height) {
            let first_size = first.wrap(avail_width, avail_height);
            if first_size.height > Pt::ZERO && first_size.height <= avail_height {
                self.place(first.as_ref(), canvas, first_size.width, first_size.height);
                return AddResult::Split(second);
            }
        }

        // Never clipped: an empty frame that cannot take it reports overflow too and
        // the caller decides whether another frame can.
        AddResult::Overflow(flowable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowable::{
        CellPadding, ColumnWidth, ImageFlowable, KeepTogether, Pagination, Paragraph, Spacer,
        Table, TableCell, TableRow, TextStyle,
    };
    use crate::font::BaseFont;
    use crate::types::{Color, Size};

    fn frame(height: f32) -> Frame {
        Frame::new(Rect::new(
            Pt::from_f32(10.0),
            Pt::from_f32(20.0),
            Pt::from_f32(200.0),
            Pt::from_f32(height),
        ))
    }

    fn lines(n: usize) -> Box<dyn Flowable> {
        let text = (0..n).map(|i| format!("l{}", i)).collect::<Vec<_>>().join("\n");
        Box::new(Paragraph::new(
            text,
            TextStyle::new(BaseFont::Helvetica, 10.0, 10.0, Color::BLACK),
        ))
    }

    #[test]
    fn places_until_full_then_splits() {
        let mut canvas = Canvas::new(Size::letter());
        let mut f = frame(50.0);
        assert!(matches!(f.add(lines(2), &mut canvas), AddResult::Placed));
        assert_eq!(f.remaining_height().to_milli_i64(), 30_000);
        match f.add(lines(6), &mut canvas) {
            AddResult::Split(rest) => {
                assert_eq!(
                    rest.wrap(Pt::from_f32(200.0), Pt::from_f32(1000.0)).height.to_milli_i64(),
                    30_000
                );
            }
            _ => panic!("expected split"),
        }
        assert_eq!(f.remaining_height(), Pt::ZERO);
    }

    #[test]
    fn avoid_blocks_move_to_an_empty_frame() {
        let mut canvas = Canvas::new(Size::letter());
        let mut f = frame(50.0);
        f.add(Box::new(Spacer::new(30.0)), &mut canvas);
        let block = KeepTogether::new(vec![lines(3)]);
        assert!(matches!(
            f.add(Box::new(block.clone()), &mut canvas),
            AddResult::Overflow(_)
        ));
        let mut empty = frame(50.0);
        assert!(matches!(empty.add(Box::new(block), &mut canvas), AddResult::Placed));
    }

    #[test]
    fn oversized_spacer_is_truncated_at_the_frame_bottom() {
        let mut canvas = Canvas::new(Size::letter());
        let mut f = frame(50.0);
        assert!(matches!(
            f.add(Box::new(Spacer::new(80.0)), &mut canvas),
            AddResult::Placed
        ));
        assert_eq!(f.remaining_height(), Pt::ZERO);
        assert!(matches!(
            f.add(Box::new(Spacer::new(1.0)), &mut canvas),
            AddResult::Overflow(_)
        ));
    }

    #[test]
    fn oversized_unsplittable_content_is_not_clipped() {
        let mut canvas = Canvas::new(Size::letter());
        let mut f = frame(50.0);
        let image = ImageFlowable::new_pt(Pt::from_f32(40.0), Pt::from_f32(80.0), "chart");
        assert!(matches!(
            f.add(Box::new(image), &mut canvas),
            AddResult::Overflow(_)
        ));
        assert!(f.is_empty());
    }

    #[test]
    fn table_row_taller_than_the_frame_splits_inside_the_row() {
        let mut canvas = Canvas::new(Size::letter());
        let mut f = frame(50.0);
        let row = TableRow::new(vec![TableCell::new(vec![lines(8)])]);
        let table = Table::new(vec![ColumnWidth::Fraction(1.0)], vec![row])
            .with_padding(CellPadding::new(0.0, 0.0))
            .with_pagination(Pagination::avoid());
        match f.add(Box::new(table), &mut canvas) {
            AddResult::Split(rest) => {
                assert_eq!(
                    rest.wrap(Pt::from_f32(200.0), Pt::from_f32(1000.0)).height.to_milli_i64(),
                    30_000
                );
            }
            _ => panic!("expected split"),
        }
        assert_eq!(f.remaining_height(), Pt::ZERO);
    }
}
