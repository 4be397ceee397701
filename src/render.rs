/// Rendering seam.
///
/// The engine decides *what* is visible; a `Renderer` decides how it looks.
/// One render cycle is `before_refresh`, `render_row` for every visible
/// record, `render_body`, `render_paging`, `render_counter`, `after_refresh`.

use crate::paging::{Counter, PageLinkKind, PagingWindow};
use crate::record::Record;

pub trait Renderer {
    /// Opaque handle of one rendered row.
    type Row;

    /// Render one record. `id` is the record's position in the store.
    fn render_row(&mut self, id: usize, record: &Record) -> Self::Row;

    /// Replace the visible body with `rows`, in display order.
    fn render_body(&mut self, rows: Vec<Self::Row>);

    fn render_paging(&mut self, _window: &PagingWindow) {}

    fn render_counter(&mut self, _counter: &Counter) {}

    /// Loading indicator of a bulk sync; `1.0` means done.
    fn render_progress(&mut self, _fraction: f32) {}

    fn before_refresh(&mut self) {}

    fn after_refresh(&mut self) {}
}

/// Minimal fallback: renders rows as ` | `-separated cell text.
#[derive(Debug, Clone, Default)]
pub struct TextRenderer {
    pub body: Vec<String>,
    pub paging: String,
    pub counter: String,
    /// Last reported load progress; `None` once loading finished.
    pub progress: Option<f32>,
    /// Completed render cycles.
    pub refreshes: usize,
}

impl TextRenderer {
    pub fn new() -> Self {
        TextRenderer::default()
    }

    /// Body, paging bar and counter as one block of text.
    pub fn output(&self) -> String {
        let mut out = self.body.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&self.paging);
        out.push('\n');
        out.push_str(&self.counter);
        out
    }
}

impl Renderer for TextRenderer {
    type Row = String;

    fn render_row(&mut self, _id: usize, record: &Record) -> String {
        record
            .iter()
            .map(|(_, value)| value.filter_text())
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn render_body(&mut self, rows: Vec<String>) {
        self.body = rows;
    }

    fn render_paging(&mut self, window: &PagingWindow) {
        self.paging = window
            .links()
            .iter()
            .map(|link| {
                let label = match link.kind {
                    PageLinkKind::First => "<<".to_string(),
                    PageLinkKind::Prev => "<".to_string(),
                    PageLinkKind::Page(page) => page.to_string(),
                    PageLinkKind::Next => ">".to_string(),
                    PageLinkKind::Last => ">>".to_string(),
                };
                if matches!(link.kind, PageLinkKind::Page(_)) && link.active {
                    format!("[{}]", label)
                } else {
                    label
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
    }

    fn render_counter(&mut self, counter: &Counter) {
        self.counter = counter.to_string();
    }

    fn render_progress(&mut self, fraction: f32) {
        self.progress = if fraction >= 1.0 { None } else { Some(fraction) };
    }

    fn after_refresh(&mut self) {
        self.refreshes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CellValue;

    #[test]
    fn test_text_renderer() {
        let mut renderer = TextRenderer::new();
        let row = renderer.render_row(
            0,
            &Record::from_pairs(vec![("a", CellValue::from(1)), ("b", CellValue::from("<i>x</i>"))]),
        );
        assert_eq!(row, "1 | x");

        renderer.render_body(vec![row]);
        renderer.render_paging(&PagingWindow::new(2, 3, 9));
        renderer.render_counter(&Counter::compute(20, 20, 45, 45));

        assert_eq!(renderer.paging, "<< < 1 [2] 3 > >>");
        assert_eq!(
            renderer.output(),
            "1 | x\n<< < 1 [2] 3 > >>\nPage 2 on 3. Showing 21 to 40 of 45 entries."
        );
    }

    #[test]
    fn test_progress_cleared_when_done() {
        let mut renderer = TextRenderer::new();
        renderer.render_progress(0.5);
        assert_eq!(renderer.progress, Some(0.5));
        renderer.render_progress(1.0);
        assert_eq!(renderer.progress, None);
    }
}
