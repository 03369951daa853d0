// src/report.rs
// =============================================================================
// Renders a merged URL -> status mapping into bytes.
//
// The engine calls `Renderer::render` exactly once per report, with every
// requested URL resolved. Three formats ship:
// - json: a pretty-printed JSON object, url -> "available" | "not-available"
// - text: a fixed-width table followed by a summary, like the CLI prints
// - pdf:  the same table laid out on A4 pages in a monospace font
// =============================================================================

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::str::FromStr;

use printpdf::{BuiltinFont, Mm, PdfDocument};
use serde::{Deserialize, Serialize};

use crate::checker::LinkStatus;
use crate::error::RenderError;

/// Turns the merged report mapping into an output document
pub trait Renderer: Send + Sync {
    fn render(&self, statuses: &BTreeMap<String, LinkStatus>) -> Result<Vec<u8>, RenderError>;

    /// MIME type of the rendered bytes
    fn content_type(&self) -> &'static str;
}

/// Output formats a client can ask for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Text,
    Pdf,
}

impl ReportFormat {
    pub fn renderer(self) -> &'static dyn Renderer {
        match self {
            ReportFormat::Json => &JsonRenderer,
            ReportFormat::Text => &TextRenderer,
            ReportFormat::Pdf => &PdfRenderer,
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "text" | "table" => Ok(ReportFormat::Text),
            "pdf" => Ok(ReportFormat::Pdf),
            other => Err(format!("unknown report format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, statuses: &BTreeMap<String, LinkStatus>) -> Result<Vec<u8>, RenderError> {
        Ok(serde_json::to_vec_pretty(statuses)?)
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn render(&self, statuses: &BTreeMap<String, LinkStatus>) -> Result<Vec<u8>, RenderError> {
        Ok(render_table(statuses)?.into_bytes())
    }

    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }
}

// A4 portrait, in millimetres
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const LINE_HEIGHT: f32 = 4.5;
const TITLE_SIZE: f32 = 14.0;
// 76 Courier columns at 8pt fit inside the margins
const BODY_SIZE: f32 = 8.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfRenderer;

impl Renderer for PdfRenderer {
    fn render(&self, statuses: &BTreeMap<String, LinkStatus>) -> Result<Vec<u8>, RenderError> {
        let table = render_table(statuses)?;

        let (doc, page, layer) = PdfDocument::new(
            "Link report",
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            "Report",
        );
        let title_font = doc
            .add_builtin_font(BuiltinFont::CourierBold)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;
        let body_font = doc
            .add_builtin_font(BuiltinFont::Courier)
            .map_err(|e| RenderError::Pdf(e.to_string()))?;

        let mut current = doc.get_page(page).get_layer(layer);
        let mut y = PAGE_HEIGHT - MARGIN;
        current.use_text("Link report", TITLE_SIZE, Mm(MARGIN), Mm(y), &title_font);
        y -= LINE_HEIGHT * 2.0;

        for line in table.lines() {
            if y < MARGIN {
                let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Report");
                current = doc.get_page(page).get_layer(layer);
                y = PAGE_HEIGHT - MARGIN;
            }
            current.use_text(line, BODY_SIZE, Mm(MARGIN), Mm(y), &body_font);
            y -= LINE_HEIGHT;
        }

        doc.save_to_bytes().map_err(|e| RenderError::Pdf(e.to_string()))
    }

    fn content_type(&self) -> &'static str {
        "application/pdf"
    }
}

/// Formats statuses as a human-readable table with a summary block
pub fn render_table(statuses: &BTreeMap<String, LinkStatus>) -> Result<String, std::fmt::Error> {
    let mut out = String::new();

    writeln!(out, "{:<60} {:<15}", "URL", "STATUS")?;
    writeln!(out, "{}", "=".repeat(76))?;

    for (url, status) in statuses {
        // Truncate URL if too long for display
        let url_display = if url.chars().count() > 57 {
            let cut: String = url.chars().take(57).collect();
            format!("{}...", cut)
        } else {
            url.clone()
        };
        writeln!(out, "{:<60} {:<15}", url_display, status)?;
    }

    let available = statuses.values().filter(|s| s.is_available()).count();

    writeln!(out)?;
    writeln!(out, "Summary:")?;
    writeln!(out, "   Available: {}", available)?;
    writeln!(out, "   Not available: {}", statuses.len() - available)?;
    writeln!(out, "   Total: {}", statuses.len())?;

    Ok(out)
}
