use ratatui::layout::{Constraint, Direction, Layout as RatLayout, Rect};

pub struct Layout {
    pub inner_area: Rect, // inside the outer border
    pub tabs_area: Rect,
    pub summary_area: Rect,
    pub list_area: Rect,
    pub detail_area: Rect,
    pub status_area: Rect,
}

impl Layout {
    /// Minimum inner size: a 24-column list plus a 16-column detail pane,
    /// and tabs + summary + 3 content lines with borders + status.
    pub const MIN_WIDTH: u16 = 40;
    pub const MIN_HEIGHT: u16 = 10;

    /// Percentage of the content row given to the list pane.
    const LIST_PERCENT: u16 = 40;

    pub fn calculate(size: Rect) -> Self {
        let width = size.width.max(Self::MIN_WIDTH + 2);
        let height = size.height.max(Self::MIN_HEIGHT + 2);
        let size = Rect::new(size.x, size.y, width, height);

        let inner_area = Rect::new(
            size.x + 1,
            size.y + 1,
            size.width.saturating_sub(2),
            size.height.saturating_sub(2),
        );

        let vertical = RatLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // tabs
                Constraint::Length(1), // progress summary
                Constraint::Min(3),
                Constraint::Length(1), // status
            ])
            .split(inner_area);

        let list_width = ((inner_area.width * Self::LIST_PERCENT) / 100)
            .max(24)
            .min(inner_area.width.saturating_sub(16));
        let horizontal = RatLayout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(list_width), Constraint::Min(1)])
            .split(vertical[2]);

        Self {
            inner_area,
            tabs_area: vertical[0],
            summary_area: vertical[1],
            list_area: horizontal[0],
            detail_area: horizontal[1],
            status_area: vertical[3],
        }
    }

    /// The whole content row, used by tabs without a list.
    pub fn content_area(&self) -> Rect {
        self.list_area.union(self.detail_area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panes_fit_inside_the_border() {
        let layout = Layout::calculate(Rect::new(0, 0, 100, 30));
        assert_eq!(layout.inner_area, Rect::new(1, 1, 98, 28));
        assert_eq!(layout.list_area.width + layout.detail_area.width, 98);
        assert_eq!(layout.status_area.y, 28);
        assert_eq!(layout.content_area().height, 25);
    }

    #[test]
    fn small_terminals_are_clamped_to_the_minimum() {
        let layout = Layout::calculate(Rect::new(0, 0, 10, 5));
        assert_eq!(layout.inner_area.width, Layout::MIN_WIDTH);
        assert_eq!(layout.list_area.width, 24);
        assert_eq!(layout.detail_area.width, 16);
    }
}
