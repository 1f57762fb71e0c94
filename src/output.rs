//! Draws a [`Document`] as SVG pages.

use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::drawing::{DrawingArea, DrawingAreaErrorKind};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::info;

use crate::error::OutputError;
use crate::render::{Document, Page, RowBox, RowStyle};

/// Pixels per millimetre on the drawn pages.
const SCALE: f64 = 4.0;

const FONT_FAMILY: &str = "DejaVu Sans";
const HEADING_SIZE: f64 = 10.0;
const CELL_SIZE: f64 = 8.0;
/// Horizontal room kept between a cell border and its text, in millimetres.
const CELL_PADDING: f64 = 1.0;

fn px(mm: f64) -> i32 {
    (mm * SCALE).round() as i32
}

/// Font sizes are given in points, like on paper.
fn font_px(points: f64) -> f64 {
    points * 25.4 / 72.0 * SCALE
}

#[derive(Debug, Clone, Default)]
pub struct SvgWriter {
    generated: Option<OffsetDateTime>,
}

impl SvgWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps every page footer with the generation time.
    pub fn generated_at(mut self, time: OffsetDateTime) -> Self {
        self.generated = Some(time);
        self
    }

    /// Draws one page and returns the SVG markup.
    pub fn page_svg(&self, document: &Document, page: &Page) -> Result<String, OutputError> {
        let draw_err = |e: DrawingAreaErrorKind<std::io::Error>| OutputError::Draw {
            page: page.number,
            message: e.to_string(),
        };

        let geometry = &document.geometry;
        let size = (px(geometry.width) as u32, px(geometry.height) as u32);
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, size).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            if let Some(heading) = &page.heading {
                let style = (FONT_FAMILY, font_px(HEADING_SIZE))
                    .into_font()
                    .style(FontStyle::Bold)
                    .color(&BLACK)
                    .pos(Pos::new(HPos::Center, VPos::Center));
                let center = (
                    px(geometry.width / 2.0),
                    px(heading.y + heading.height / 2.0),
                );
                root.draw(&Text::new(heading.text.clone(), center, style))
                    .map_err(draw_err)?;
            }

            for row in std::iter::once(&page.header).chain(&page.rows) {
                draw_row(&root, row).map_err(draw_err)?;
            }

            let mut footer = format!("Page {} of {}", page.number, document.page_count());
            if let Some(generated) = self.generated {
                let format = format_description!("[year]-[month]-[day] [hour]:[minute] UTC");
                if let Ok(stamp) = generated.to_offset(time::UtcOffset::UTC).format(&format) {
                    footer = format!("{footer} · generated {stamp}");
                }
            }
            let style = (FONT_FAMILY, font_px(CELL_SIZE))
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Right, VPos::Center));
            let anchor = (
                px(geometry.width - geometry.margin_right),
                px(geometry.height - geometry.margin_bottom / 2.0),
            );
            root.draw(&Text::new(footer, anchor, style))
                .map_err(draw_err)?;

            root.present().map_err(draw_err)?;
        }
        Ok(svg)
    }

    /// Writes every page to `<dir>/<stem>-<nnn>.svg` and returns the paths.
    pub fn write(
        &self,
        document: &Document,
        dir: &Path,
        stem: &str,
    ) -> Result<Vec<PathBuf>, OutputError> {
        std::fs::create_dir_all(dir).map_err(|source| OutputError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths = Vec::with_capacity(document.page_count());
        for page in &document.pages {
            let svg = self.page_svg(document, page)?;
            let path = dir.join(format!("{stem}-{:03}.svg", page.number));
            std::fs::write(&path, svg).map_err(|source| OutputError::Io {
                path: path.clone(),
                source,
            })?;
            paths.push(path);
        }

        info!(
            title = %document.title,
            pages = paths.len(),
            dir = %dir.display(),
            "saved report"
        );
        Ok(paths)
    }
}

fn draw_row<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    row: &RowBox,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let mut font = (FONT_FAMILY, font_px(CELL_SIZE)).into_font();
    if row.style == RowStyle::Header {
        font = font.style(FontStyle::Bold);
    }
    let style = font.color(&BLACK).pos(Pos::new(HPos::Left, VPos::Center));

    let top = px(row.y);
    let bottom = px(row.y + row.height);
    let middle = px(row.y + row.height / 2.0);
    for cell in &row.cells {
        let left = px(cell.x);
        let right = px(cell.x + cell.width);
        area.draw(&Rectangle::new(
            [(left, top), (right, bottom)],
            BLACK.stroke_width(1),
        ))?;
        area.draw(&Text::new(
            cell.text.clone(),
            (px(cell.x + CELL_PADDING), middle),
            style.clone(),
        ))?;
    }
    Ok(())
}
