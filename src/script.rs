//! Layout script generation.
//!
//! The renderer executes a small script that sets the viewport, paper size
//! and header/footer callbacks, then opens the input and paints it to the
//! output path. [`LayoutScript`] models that script as typed parts and
//! refuses to serialize text that is not structurally well formed.

use crate::artifacts::write_temp_file;
use crate::config::{Margin, Orientation, PageLayout, PaperFormat};
use crate::document::RenderedDocument;
use crate::error::{ExportError, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

const SCRIPT_PREFIX: &str = "report-script-";
const SCRIPT_SUFFIX: &str = ".js";

/// Renderer viewport in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// A4 proportions at high resolution, swapped for landscape.
    pub fn for_orientation(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Landscape => Viewport {
                width: 3508,
                height: 2480,
            },
            Orientation::Portrait => Viewport {
                width: 2480,
                height: 3508,
            },
        }
    }
}

/// A header or footer band: its height and the templated callback body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBand {
    pub height: String,
    pub contents: String,
}

/// Typed form of the layout script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutScript {
    pub viewport: Viewport,
    pub format: PaperFormat,
    pub orientation: Orientation,
    pub margin: Margin,
    pub footer: Option<PageBand>,
    pub header: Option<PageBand>,
}

impl LayoutScript {
    pub fn new(layout: &PageLayout, document: &RenderedDocument) -> Self {
        let band = |height: &str, contents: Option<&str>| {
            contents.map(|contents| PageBand {
                height: height.to_string(),
                contents: contents.to_string(),
            })
        };

        Self {
            viewport: Viewport::for_orientation(layout.orientation),
            format: layout.format,
            orientation: layout.orientation,
            margin: layout.margin.clone(),
            footer: band(&layout.footer_height, document.footer()),
            header: band(&layout.header_height, document.header()),
        }
    }

    /// Serializes the script, failing if the result would not parse.
    pub fn render(&self) -> Result<String> {
        let mut out = String::new();
        out.push_str("var args = require(\"system\").args;\n");
        out.push_str("var page = require(\"webpage\").create();\n\n");
        let _ = writeln!(
            out,
            "page.viewportSize = {{ width: {}, height: {} }};\n",
            self.viewport.width, self.viewport.height
        );
        out.push_str("page.paperSize = {\n");
        let _ = writeln!(out, "    format: {},", quote(&self.format.to_string()));
        let _ = writeln!(out, "    orientation: {},", quote(&self.orientation.to_string()));
        let _ = writeln!(out, "    margin: {},", margin_expr(&self.margin));
        let _ = writeln!(out, "    footer: {},", band_expr(self.footer.as_ref()));
        let _ = writeln!(out, "    header: {}", band_expr(self.header.as_ref()));
        out.push_str("};\n\n");
        out.push_str(concat!(
            "page.open(args[1], function(status) {\n",
            "    console.log(\"Status: \" + status);\n",
            "    if (status === \"success\") {\n",
            "        page.render(args[2]);\n",
            "        phantom.exit(0);\n",
            "    } else {\n",
            "        console.error(\"Unable to load \" + args[1] + \": \" + status);\n",
            "        phantom.exit(1);\n",
            "    }\n",
            "});\n",
        ));

        check_well_formed(&out)?;
        Ok(out)
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn margin_expr(margin: &Margin) -> String {
    match margin {
        Margin::Sides {
            top,
            right,
            bottom,
            left,
        } => format!(
            "{{top: {}, right: {}, bottom: {}, left: {}}}",
            quote(top),
            quote(right),
            quote(bottom),
            quote(left)
        ),
        Margin::Literal(raw) if raw.trim_start().starts_with('{') => raw.trim().to_string(),
        Margin::Literal(raw) => quote(raw),
    }
}

fn band_expr(band: Option<&PageBand>) -> String {
    match band {
        None => "{}".to_string(),
        Some(band) => format!(
            "{{\n        height: {},\n        contents: phantom.callback(function(numPage, totalPages) {{ return \"{}\"; }})\n    }}",
            quote(&band.height),
            band.contents
        ),
    }
}

/// Verifies that string literals terminate on their own line and that
/// brackets outside literals balance.
pub fn check_well_formed(script: &str) -> Result<()> {
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut literal: Option<(char, usize)> = None;
    let mut escaped = false;

    for (idx, ch) in script.char_indices() {
        if let Some((open, start)) = literal {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                literal = None;
            } else if ch == '\n' {
                return Err(ExportError::MalformedScript(format!(
                    "unterminated string literal starting at byte {}",
                    start
                )));
            }
            continue;
        }

        match ch {
            '"' | '\'' => literal = Some((ch, idx)),
            '(' | '{' | '[' => stack.push((ch, idx)),
            ')' | '}' | ']' => {
                let expected = match ch {
                    ')' => '(',
                    '}' => '{',
                    _ => '[',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => {
                        return Err(ExportError::MalformedScript(format!(
                            "unbalanced `{}` at byte {}",
                            ch, idx
                        )))
                    }
                }
            }
            _ => {}
        }
    }

    if let Some((_, start)) = literal {
        return Err(ExportError::MalformedScript(format!(
            "unterminated string literal starting at byte {}",
            start
        )));
    }
    if let Some((open, idx)) = stack.pop() {
        return Err(ExportError::MalformedScript(format!(
            "unclosed `{}` at byte {}",
            open, idx
        )));
    }
    Ok(())
}

/// Writes layout scripts into a temporary directory.
#[derive(Debug, Clone)]
pub struct LayoutScriptGenerator {
    temp_dir: PathBuf,
}

impl LayoutScriptGenerator {
    pub fn new(temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: temp_dir.into(),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Renders the script for `layout` and `document` into a fresh temporary
    /// file and returns its path. The caller owns the file.
    pub fn generate(&self, layout: &PageLayout, document: &RenderedDocument) -> Result<PathBuf> {
        let script = LayoutScript::new(layout, document).render()?;
        let path = write_temp_file(&self.temp_dir, SCRIPT_PREFIX, SCRIPT_SUFFIX, &script)?;
        debug!(
            script = %path.display(),
            bytes = script.len(),
            has_header = document.header().is_some(),
            has_footer = document.footer().is_some(),
            "Layout script generated"
        );
        Ok(path)
    }
}
