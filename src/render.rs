//! Turns a [`Table`] into a paginated bordered grid.
//!
//! The renderer only computes positions and texts; drawing the result is the
//! job of [`crate::output`].

use tracing::{debug, info};

use crate::error::ReportError;
use crate::layout::{ColumnLayout, PageBreakPolicy, PageGeometry, RenderPlan};
use crate::table::{Table, PLACEHOLDER};

/// Columns that never make it into a report.
pub const EXCLUDED_COLUMNS: [&str; 4] = ["_id", "description", "iconsrc", "kategori"];

/// Maximum number of characters shown in a body cell.
pub const DEFAULT_TRUNCATE: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStyle {
    /// Column names, drawn in bold.
    Header,
    Body,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellBox {
    pub x: f64,
    pub width: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowBox {
    pub y: f64,
    pub height: f64,
    pub style: RowStyle,
    pub cells: Vec<CellBox>,
}

impl RowBox {
    pub fn texts(&self) -> Vec<&str> {
        self.cells.iter().map(|cell| cell.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    pub text: String,
    pub y: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based.
    pub number: usize,
    pub heading: Option<Heading>,
    pub header: RowBox,
    pub rows: Vec<RowBox>,
}

/// A rendered report, owned by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub title: String,
    pub geometry: PageGeometry,
    pub plan: RenderPlan,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Body rows across all pages, in output order.
    pub fn body_rows(&self) -> impl Iterator<Item = &RowBox> {
        self.pages.iter().flat_map(|page| page.rows.iter())
    }
}

/// Layout policy and page setup shared by every report a renderer produces.
#[derive(Debug, Clone)]
pub struct Renderer {
    layout: ColumnLayout,
    geometry: PageGeometry,
    exclude: Vec<String>,
    truncate: usize,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(ColumnLayout::municipal(), PageGeometry::a4_landscape())
    }
}

impl Renderer {
    pub fn new(layout: ColumnLayout, geometry: PageGeometry) -> Self {
        Self {
            layout,
            geometry,
            exclude: EXCLUDED_COLUMNS.iter().map(|name| name.to_string()).collect(),
            truncate: DEFAULT_TRUNCATE,
        }
    }

    pub fn exclude<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.exclude = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Maximum characters per body cell. A limit of 0 is raised to 1 so no
    /// cell ends up blank.
    pub fn truncate(mut self, limit: usize) -> Self {
        self.truncate = limit.max(1);
        self
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn render(&self, mut table: Table, title: &str) -> Result<Document, ReportError> {
        table.prune(&self.exclude);
        table.fill_missing(PLACEHOLDER);
        if table.columns().is_empty() {
            return Err(ReportError::EmptyTable(title.to_string()));
        }

        let policy = PageBreakPolicy::new(&self.geometry)?;
        let plan = RenderPlan::resolve(&self.layout, table.columns(), self.geometry.usable_width());
        let left = self.geometry.margin_left;

        let row = |y: f64, style: RowStyle, texts: Vec<String>| RowBox {
            y,
            height: policy.row_height(),
            style,
            cells: plan
                .columns()
                .iter()
                .zip(texts)
                .map(|(column, text)| CellBox {
                    x: left + column.offset,
                    width: column.width,
                    text,
                })
                .collect(),
        };

        let ranges = policy.paginate(table.row_count());
        let mut pages = Vec::with_capacity(ranges.len());
        for (index, range) in ranges.into_iter().enumerate() {
            let heading = (index == 0).then(|| Heading {
                text: title.to_string(),
                y: self.geometry.margin_top,
                height: self.geometry.title_height,
            });
            let header = row(
                policy.header_top(index),
                RowStyle::Header,
                table.columns().to_vec(),
            );
            let rows = table.rows()[range]
                .iter()
                .enumerate()
                .map(|(slot, cells)| {
                    let texts = cells
                        .iter()
                        .map(|cell| truncate(&cell.to_string(), self.truncate))
                        .collect();
                    row(policy.row_top(index, slot), RowStyle::Body, texts)
                })
                .collect();
            pages.push(Page {
                number: index + 1,
                heading,
                header,
                rows,
            });
        }

        debug!(title, pages = pages.len(), "paginated report");
        info!(
            title,
            columns = plan.len(),
            rows = table.row_count(),
            pages = pages.len(),
            "rendered report"
        );
        Ok(Document {
            title: title.to_string(),
            geometry: self.geometry,
            plan,
            pages,
        })
    }
}

/// Keeps the first `limit` characters. No ellipsis is added.
pub fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}
