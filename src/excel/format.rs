//! Format snapshot: column widths and header-row alignment of a reference workbook
//!
//! The snapshot is read directly from the package XML (`xl/workbook.xml`, the
//! workbook relationships, the active worksheet and `xl/styles.xml`) because the
//! workbook reader only exposes cell values.

use super::{column_index_to_letter, column_letter_to_index, ExcelExporter, MAX_COLUMNS};
use crate::error::{SaveError, SaveResult};
use crate::types::Table;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rust_xlsxwriter::{Format, FormatAlign};
use std::collections::HashMap;
use std::fs;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

//==============================================================================
// Snapshot Types
//==============================================================================

/// Cell alignment as stored in a `<cellXfs>` entry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellAlignment {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: bool,
    pub shrink_to_fit: bool,
    pub indent: u8,
    /// Raw OOXML rotation (0-90 up, 91-180 down, 255 stacked)
    pub text_rotation: u16,
}

impl CellAlignment {
    pub fn is_default(&self) -> bool {
        *self == CellAlignment::default()
    }

    /// Build a writer format carrying this alignment, or None for the default
    pub fn to_format(&self) -> Option<Format> {
        if self.is_default() {
            return None;
        }

        let mut format = Format::new();
        if let Some(align) = self.horizontal.as_deref().and_then(map_horizontal) {
            format = format.set_align(align);
        }
        if let Some(align) = self.vertical.as_deref().and_then(map_vertical) {
            format = format.set_align(align);
        }
        if self.wrap_text {
            format = format.set_text_wrap();
        }
        if self.shrink_to_fit {
            format = format.set_shrink();
        }
        if self.indent > 0 {
            format = format.set_indent(self.indent);
        }
        if let Some(rotation) = writer_rotation(self.text_rotation) {
            format = format.set_rotation(rotation);
        }
        Some(format)
    }
}

fn map_horizontal(s: &str) -> Option<FormatAlign> {
    match s {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "fill" => Some(FormatAlign::Fill),
        "justify" => Some(FormatAlign::Justify),
        "centerContinuous" => Some(FormatAlign::CenterAcross),
        "distributed" => Some(FormatAlign::Distributed),
        _ => None,
    }
}

fn map_vertical(s: &str) -> Option<FormatAlign> {
    match s {
        "top" => Some(FormatAlign::Top),
        "center" => Some(FormatAlign::VerticalCenter),
        "bottom" => Some(FormatAlign::Bottom),
        "justify" => Some(FormatAlign::VerticalJustify),
        "distributed" => Some(FormatAlign::VerticalDistributed),
        _ => None,
    }
}

/// Map the stored rotation back to the writer's signed degrees
fn writer_rotation(raw: u16) -> Option<i16> {
    match raw {
        0 => None,
        1..=90 => Some(raw as i16),
        91..=180 => Some(-(raw as i16 - 90)),
        255 => Some(270),
        _ => None,
    }
}

/// Captured formatting for one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFormat {
    /// Column letter (A, B, ...)
    pub letter: String,
    /// Width in character units, None when the column has no explicit width
    pub width: Option<f64>,
    /// Alignment of the column's header cell
    pub alignment: CellAlignment,
}

/// Column widths and header alignments of a workbook's active sheet
#[derive(Debug, Clone, PartialEq)]
pub struct FormatSnapshot {
    /// Title of the sheet the snapshot was taken from
    pub sheet_title: String,
    /// One entry per column, left to right, starting at column A
    pub columns: Vec<ColumnFormat>,
}

impl FormatSnapshot {
    /// Capture the active sheet of `reference`
    pub fn capture(reference: &Path) -> SaveResult<Self> {
        let file = File::open(reference).map_err(|e| {
            SaveError::Format(format!(
                "Failed to open reference workbook {}: {}",
                reference.display(),
                e
            ))
        })?;
        let mut archive = ZipArchive::new(file).map_err(|e| {
            SaveError::Format(format!(
                "Reference {} is not a valid workbook: {}",
                reference.display(),
                e
            ))
        })?;

        let workbook_xml = read_zip_file(&mut archive, "xl/workbook.xml")?;
        let (sheets, active_tab) = parse_workbook_sheets(&workbook_xml)?;
        let (sheet_title, rel_id) = sheets
            .get(active_tab)
            .or_else(|| sheets.first())
            .cloned()
            .ok_or_else(|| SaveError::Format("Reference workbook has no sheets".to_string()))?;

        let rels_xml = read_zip_file(&mut archive, "xl/_rels/workbook.xml.rels")?;
        let targets = parse_relationships(&rels_xml)?;
        let target = targets.get(&rel_id).ok_or_else(|| {
            SaveError::Format(format!("No worksheet part for sheet '{}'", sheet_title))
        })?;
        let sheet_path = match target.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => format!("xl/{}", target),
        };

        let sheet_xml = read_zip_file(&mut archive, &sheet_path)?;
        let layout = parse_sheet_layout(&sheet_xml)?;

        // A workbook without styles.xml has only default alignment
        let alignments = if archive.file_names().any(|name| name == "xl/styles.xml") {
            parse_cell_xf_alignments(&read_zip_file(&mut archive, "xl/styles.xml")?)?
        } else {
            Vec::new()
        };

        let columns = (1..=layout.max_column)
            .map(|col| ColumnFormat {
                letter: column_index_to_letter(col - 1),
                width: layout.raw_widths.get(&col).map(|w| raw_width_to_char_units(*w)),
                alignment: layout
                    .header_styles
                    .get(&col)
                    .and_then(|style| alignments.get(*style))
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect::<Vec<_>>();

        debug!(
            reference = %reference.display(),
            sheet = %sheet_title,
            columns = columns.len(),
            "Captured format snapshot"
        );

        Ok(Self {
            sheet_title,
            columns,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, letter: &str) -> Option<&ColumnFormat> {
        self.columns.iter().find(|c| c.letter == letter)
    }

}

/// Rewrite `target` with `table`'s data, shaped by `reference`'s formatting.
///
/// The sheet takes the reference's active sheet title; every column captured from
/// the reference gets its width, and every cell in that column (header and data)
/// gets the reference header cell's alignment.
pub fn transplant_format(reference: &Path, target: &Path, table: &Table) -> SaveResult<()> {
    let snapshot = FormatSnapshot::capture(reference)?;
    let bytes = ExcelExporter::new(table).with_snapshot(&snapshot).to_bytes()?;
    fs::write(target, bytes)?;
    debug!(
        reference = %reference.display(),
        target = %target.display(),
        "Transplanted column formatting"
    );
    Ok(())
}

/// Convert a stored `<col width>` to the character units the writer accepts.
///
/// The writer pads widths for the default font (7px digits, 5px padding), so the
/// stored value has to be unpadded for a save → capture → save cycle to be stable.
fn raw_width_to_char_units(raw: f64) -> f64 {
    if raw <= 0.0 {
        return 0.0;
    }
    let max_digit_width = 7.0_f64;
    let padding = 5.0_f64;
    if raw < (max_digit_width + padding) / max_digit_width {
        (raw * max_digit_width).round() / (max_digit_width + padding)
    } else {
        ((raw * max_digit_width).round() - padding) / max_digit_width
    }
}

//==============================================================================
// Package XML Parsing
//==============================================================================

fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> SaveResult<String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| SaveError::Format(format!("Part '{}' not found in workbook: {}", path, e)))?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| SaveError::Format(format!("Failed to read '{}': {}", path, e)))?;
    Ok(content)
}

fn xml_error(part: &str, e: quick_xml::Error) -> SaveError {
    SaveError::Format(format!("Malformed {}: {}", part, e))
}

fn attr_string(e: &BytesStart, name: &[u8]) -> SaveResult<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| SaveError::Format(format!("Bad XML attribute: {}", e)))?;
        if attr.key.as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|e| SaveError::Format(format!("Bad XML attribute value: {}", e)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn attr_parse<T: std::str::FromStr>(e: &BytesStart, name: &[u8]) -> SaveResult<Option<T>> {
    Ok(attr_string(e, name)?.and_then(|s| s.trim().parse().ok()))
}

fn attr_flag(e: &BytesStart, name: &[u8]) -> SaveResult<bool> {
    Ok(matches!(attr_string(e, name)?.as_deref(), Some("1") | Some("true")))
}

/// Returns (sheet name, relationship id) pairs in workbook order, plus the active tab
fn parse_workbook_sheets(xml: &str) -> SaveResult<(Vec<(String, String)>, usize)> {
    let mut sheets = Vec::new();
    let mut active_tab = 0usize;
    let mut seen_view = false;
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"workbookView" if !seen_view => {
                    // Only the first view decides the active sheet
                    seen_view = true;
                    if let Some(tab) = attr_parse::<usize>(e, b"activeTab")? {
                        active_tab = tab;
                    }
                }
                b"sheet" => {
                    let name = attr_string(e, b"name")?;
                    let rid = attr_string(e, b"r:id")?;
                    if let (Some(name), Some(rid)) = (name, rid) {
                        sheets.push((name, rid));
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("xl/workbook.xml", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok((sheets, active_tab))
}

fn parse_relationships(xml: &str) -> SaveResult<HashMap<String, String>> {
    let mut targets = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) =
                    (attr_string(e, b"Id")?, attr_string(e, b"Target")?)
                {
                    targets.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("xl/_rels/workbook.xml.rels", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(targets)
}

/// Layout facts about one worksheet. Column keys are 1-based.
#[derive(Debug, Default)]
struct SheetLayout {
    max_column: usize,
    raw_widths: HashMap<usize, f64>,
    header_styles: HashMap<usize, usize>,
}

fn parse_sheet_layout(xml: &str) -> SaveResult<SheetLayout> {
    let mut layout = SheetLayout::default();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut current_row = 0usize;
    let mut last_col_in_row = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"col" => {
                    let min = attr_parse::<usize>(e, b"min")?;
                    let max = attr_parse::<usize>(e, b"max")?;
                    let width = attr_parse::<f64>(e, b"width")?;
                    if let (Some(min), Some(max), Some(width)) = (min, max, width) {
                        if min == 0 || min > max || max > MAX_COLUMNS {
                            return Err(SaveError::Format(format!(
                                "Column range {}..{} is outside the worksheet",
                                min, max
                            )));
                        }
                        for col in min..=max {
                            layout.raw_widths.insert(col, width);
                        }
                    }
                }
                b"row" => {
                    current_row = match attr_parse::<usize>(e, b"r")? {
                        Some(r) => r,
                        None => current_row
                            .checked_add(1)
                            .ok_or_else(|| SaveError::Format("Too many rows".to_string()))?,
                    };
                    last_col_in_row = 0;
                }
                b"c" => {
                    let (row, col) = match attr_string(e, b"r")? {
                        Some(r) => parse_cell_ref(&r).ok_or_else(|| {
                            SaveError::Format(format!("Invalid cell reference '{}'", r))
                        })?,
                        None if last_col_in_row < MAX_COLUMNS => {
                            (current_row, last_col_in_row + 1)
                        }
                        None => {
                            return Err(SaveError::Format(format!(
                                "Row {} has more than {} cells",
                                current_row, MAX_COLUMNS
                            )))
                        }
                    };
                    last_col_in_row = col;
                    layout.max_column = layout.max_column.max(col);
                    if row == 1 {
                        let style = attr_parse::<usize>(e, b"s")?.unwrap_or(0);
                        layout.header_styles.insert(col, style);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("worksheet", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(layout)
}

/// Parse "B12" into (12, 2), both 1-based
fn parse_cell_ref(r: &str) -> Option<(usize, usize)> {
    let split = r.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = r.split_at(split);
    let col = column_letter_to_index(&letters.replace('$', ""))? + 1;
    let row = digits.parse::<usize>().ok()?;
    Some((row, col))
}

/// Alignment for every `<xf>` in `<cellXfs>`, indexed by style id
fn parse_cell_xf_alignments(xml: &str) -> SaveResult<Vec<CellAlignment>> {
    let mut alignments = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_cell_xfs = false;
    let mut in_xf = false;
    let mut current = CellAlignment::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    in_xf = true;
                    current = CellAlignment::default();
                }
                b"alignment" if in_xf => current = parse_alignment(e)?,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"xf" if in_cell_xfs => alignments.push(CellAlignment::default()),
                b"alignment" if in_xf => current = parse_alignment(e)?,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"xf" if in_xf => {
                    alignments.push(std::mem::take(&mut current));
                    in_xf = false;
                }
                b"cellXfs" => break,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error("xl/styles.xml", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(alignments)
}

fn parse_alignment(e: &BytesStart) -> SaveResult<CellAlignment> {
    Ok(CellAlignment {
        horizontal: attr_string(e, b"horizontal")?,
        vertical: attr_string(e, b"vertical")?,
        wrap_text: attr_flag(e, b"wrapText")?,
        shrink_to_fit: attr_flag(e, b"shrinkToFit")?,
        indent: attr_parse::<u8>(e, b"indent")?.unwrap_or(0),
        text_rotation: attr_parse::<u16>(e, b"textRotation")?.unwrap_or(0),
    })
}
