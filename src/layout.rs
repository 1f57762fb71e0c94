//! Column widths and page geometry.
//!
//! Everything here is measured in millimetres, the unit the page geometry is
//! configured in. Drawing backends scale to pixels on their own.

use std::collections::HashMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ReportError;

/// Tolerance used when comparing vertical positions against the break line.
const EPSILON: f64 = 1e-9;

/// Preferred widths per column name, with a fallback for unknown names.
///
/// Widths are relative: a render rescales them to fill the usable page
/// width, so only their ratios matter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnLayout {
    pub default_width: f64,
    pub widths: HashMap<String, f64>,
}

impl ColumnLayout {
    pub fn new(default_width: f64) -> Self {
        Self {
            default_width,
            widths: HashMap::new(),
        }
    }

    pub fn with_width(mut self, column: impl Into<String>, width: f64) -> Self {
        self.widths.insert(column.into(), width);
        self
    }

    /// Preferred width for `column`, matched by exact name.
    pub fn preferred(&self, column: &str) -> f64 {
        self.widths
            .get(column)
            .copied()
            .unwrap_or(self.default_width)
    }

    /// Widths used for the municipal datasets: hotspot and BTS columns.
    pub fn municipal() -> Self {
        Self::new(30.0)
            .with_width("id", 10.0)
            .with_width("title", 60.0)
            .with_width("kecamatan", 30.0)
            .with_width("kelurahan", 30.0)
            .with_width("longitude", 25.0)
            .with_width("latitude", 25.0)
            .with_width("Kode Kecamatan", 35.0)
            .with_width("Kecamatan", 45.0)
            .with_width("Jumlah", 20.0)
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self::municipal()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedColumn {
    pub name: String,
    /// Distance from the left margin.
    pub offset: f64,
    pub width: f64,
}

/// Resolved width of every rendered column for one render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    columns: Vec<PlannedColumn>,
}

impl RenderPlan {
    /// Scales the preferred widths so they add up to `usable_width`.
    pub fn resolve<S: AsRef<str>>(
        layout: &ColumnLayout,
        columns: &[S],
        usable_width: f64,
    ) -> Self {
        let preferred: Vec<f64> = columns
            .iter()
            .map(|column| layout.preferred(column.as_ref()).max(0.0))
            .collect();
        let total: f64 = preferred.iter().sum();

        let mut offset = 0.0;
        let columns = columns
            .iter()
            .zip(&preferred)
            .map(|(name, width)| {
                let width = if total > 0.0 {
                    width * usable_width / total
                } else {
                    usable_width / preferred.len() as f64
                };
                let column = PlannedColumn {
                    name: name.as_ref().to_string(),
                    offset,
                    width,
                };
                offset += width;
                column
            })
            .collect();

        let plan = Self { columns };
        debug!(columns = plan.len(), total_width = plan.total_width(), "resolved render plan");
        plan
    }

    pub fn columns(&self) -> &[PlannedColumn] {
        &self.columns
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|column| column.name.as_str())
    }

    pub fn total_width(&self) -> f64 {
        self.columns.iter().map(|column| column.width).sum()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Page size, margins and the fixed heights of the elements placed on a page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub width: f64,
    pub height: f64,
    pub margin_left: f64,
    pub margin_right: f64,
    pub margin_top: f64,
    /// Distance from the bottom edge at which a page breaks.
    pub margin_bottom: f64,
    pub row_height: f64,
    pub title_height: f64,
    /// Space left between the title and the header row.
    pub title_gap: f64,
}

impl PageGeometry {
    /// A4 in landscape orientation.
    pub fn a4_landscape() -> Self {
        Self {
            width: 297.0,
            height: 210.0,
            margin_left: 10.0,
            margin_right: 10.0,
            margin_top: 10.0,
            margin_bottom: 20.0,
            row_height: 10.0,
            title_height: 10.0,
            title_gap: 5.0,
        }
    }

    pub fn usable_width(&self) -> f64 {
        self.width - self.margin_left - self.margin_right
    }

    /// Vertical position no row may extend past.
    pub fn break_line(&self) -> f64 {
        self.height - self.margin_bottom
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4_landscape()
    }
}

/// Decides where pages break and where the header row sits on each page.
///
/// The first page carries the title above its header row. Every page starts
/// with a header row, and a body row goes to the next page whenever its
/// bottom edge would cross the break line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBreakPolicy {
    top: f64,
    break_line: f64,
    row_height: f64,
    title_offset: f64,
}

impl PageBreakPolicy {
    pub fn new(geometry: &PageGeometry) -> Result<Self, ReportError> {
        if !(geometry.usable_width() > 0.0) {
            return Err(ReportError::InvalidGeometry(format!(
                "usable width is {} mm",
                geometry.usable_width()
            )));
        }
        if !(geometry.row_height > 0.0) {
            return Err(ReportError::InvalidGeometry(format!(
                "row height is {} mm",
                geometry.row_height
            )));
        }

        let policy = Self {
            top: geometry.margin_top,
            break_line: geometry.break_line(),
            row_height: geometry.row_height,
            title_offset: geometry.title_height + geometry.title_gap,
        };
        if policy.rows_per_page(0) == 0 || policy.rows_per_page(1) == 0 {
            return Err(ReportError::InvalidGeometry(String::from(
                "a page cannot hold the header row and one body row",
            )));
        }
        Ok(policy)
    }

    /// Top edge of the header row on page `page` (0-based).
    pub fn header_top(&self, page: usize) -> f64 {
        if page == 0 {
            self.top + self.title_offset
        } else {
            self.top
        }
    }

    /// Top edge of the `slot`-th body row on page `page`.
    pub fn row_top(&self, page: usize, slot: usize) -> f64 {
        self.header_top(page) + self.row_height * (slot + 1) as f64
    }

    pub fn row_height(&self) -> f64 {
        self.row_height
    }

    pub fn rows_per_page(&self, page: usize) -> usize {
        let first_row = self.header_top(page) + self.row_height;
        let room = self.break_line - first_row;
        if room < 0.0 {
            return 0;
        }
        ((room + EPSILON) / self.row_height).floor() as usize
    }

    /// Splits `row_count` body rows into per-page ranges. There is always at
    /// least one page, even without rows.
    pub fn paginate(&self, row_count: usize) -> Vec<Range<usize>> {
        let mut pages = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.rows_per_page(pages.len())).min(row_count);
            pages.push(start..end);
            if end >= row_count {
                break;
            }
            start = end;
        }
        pages
    }
}
