//! Serializes recorded pages into a PDF file.
//!
//! The writer emits objects in a fixed order with ids assigned up front, so
//! the same `Document` always produces the same bytes. Text goes out through
//! one of two font paths: an embedded TrueType face wired up as a Type0 /
//! Identity-H composite font, or the built-in Helvetica with WinAnsi
//! encoding when no face could be acquired.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::Instant;

use crate::fonts::{FontMetrics, ReportFont};
use crate::normalize::is_zero_width_mark;
use crate::surface::{Command, Document, Page};
use crate::trace::TraceLogger;
use crate::types::{Color, Pt};

const PDF_CATALOG_ID: usize = 1;
const PDF_PAGES_ID: usize = 2;
const PDF_RESOURCES_ID: usize = 3;

/// Every page references the same single-font resource dictionary.
const FONT_RESOURCE: &str = "F1";
const FALLBACK_BASE_FONT: &str = "Helvetica";

pub(crate) fn document_to_pdf(
    document: &Document,
    title: Option<&str>,
    trace: &TraceLogger,
) -> io::Result<Vec<u8>> {
    let mut bytes: Vec<u8> = Vec::new();
    write_document(document, title, trace, &mut bytes)?;
    Ok(bytes)
}

fn write_document<W: Write>(
    document: &Document,
    title: Option<&str>,
    trace: &TraceLogger,
    writer: &mut W,
) -> io::Result<usize> {
    let started = Instant::now();
    let page_count = document.pages.len();
    let face = document.face.as_deref();
    let glyph_map = face.map(|face| collect_glyph_map(face, document));

    // Ids are assigned before anything is written: 1..=3 are fixed, pages
    // take two ids each (content stream, then page object), the font block
    // follows, and the info dictionary closes the table.
    let font_start_id = 4 + page_count * 2;
    let font_object_count = if face.is_some() { 5 } else { 1 };
    let font_id = if face.is_some() {
        // The Type0 wrapper is the last of the five embedded-font objects.
        font_start_id + 4
    } else {
        font_start_id
    };
    let info_id = font_start_id + font_object_count;
    let total_objects = info_id;

    let mut offset = 0usize;
    let mut offsets = vec![0usize; total_objects + 1];
    write_bytes(writer, b"%PDF-1.7\n", &mut offset)?;
    write_bytes(writer, b"%\xE2\xE3\xCF\xD3\n", &mut offset)?;

    let mut replaced_total = 0usize;
    let mut fallback_total = 0usize;
    for (index, page) in document.pages.iter().enumerate() {
        let content_id = 4 + index * 2;
        let page_id = content_id + 1;
        let content = render_page(
            page,
            document.page_size.height,
            face,
            &mut replaced_total,
            &mut fallback_total,
        );
        write_pdf_object(
            writer,
            &mut offset,
            &mut offsets,
            content_id,
            &stream_object(&content),
        )?;
        let page_obj = format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources {} 0 R /Contents {} 0 R >>",
            PDF_PAGES_ID,
            fmt_pt(document.page_size.width),
            fmt_pt(document.page_size.height),
            PDF_RESOURCES_ID,
            content_id
        );
        write_pdf_object(writer, &mut offset, &mut offsets, page_id, &page_obj)?;
    }

    match (face, glyph_map.as_ref()) {
        (Some(face), Some(glyphs)) => {
            let objects = build_embedded_font_objects(face, glyphs, font_start_id);
            for (index, object) in objects.iter().enumerate() {
                write_pdf_object(writer, &mut offset, &mut offsets, font_start_id + index, object)?;
            }
        }
        _ => {
            write_pdf_object(
                writer,
                &mut offset,
                &mut offsets,
                font_start_id,
                &base_font_object(FALLBACK_BASE_FONT),
            )?;
        }
    }

    write_pdf_object(
        writer,
        &mut offset,
        &mut offsets,
        PDF_RESOURCES_ID,
        &format!("<< /Font << /{} {} 0 R >> >>", FONT_RESOURCE, font_id),
    )?;

    let kids = (0..page_count)
        .map(|index| format!("{} 0 R", 5 + index * 2))
        .collect::<Vec<_>>()
        .join(" ");
    write_pdf_object(
        writer,
        &mut offset,
        &mut offsets,
        PDF_PAGES_ID,
        &format!("<< /Type /Pages /Count {} /Kids [{}] >>", page_count, kids),
    )?;

    let mut catalog = format!("<< /Type /Catalog /Pages {} 0 R /Lang (ar)", PDF_PAGES_ID);
    if title.is_some() {
        catalog.push_str(" /ViewerPreferences << /DisplayDocTitle true >>");
    }
    catalog.push_str(" >>");
    write_pdf_object(writer, &mut offset, &mut offsets, PDF_CATALOG_ID, &catalog)?;
    write_pdf_object(writer, &mut offset, &mut offsets, info_id, &info_object(title))?;

    let xref_start = offset;
    write_str(writer, &format!("xref\n0 {}\n", total_objects + 1), &mut offset)?;
    write_bytes(writer, b"0000000000 65535 f \n", &mut offset)?;
    for id in 1..=total_objects {
        let object_offset = offsets.get(id).copied().unwrap_or(0);
        write_str(writer, &format!("{:010} 00000 n \n", object_offset), &mut offset)?;
    }
    let trailer = format!(
        "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF",
        total_objects + 1,
        PDF_CATALOG_ID,
        info_id,
        xref_start
    );
    write_str(writer, &trailer, &mut offset)?;

    if replaced_total > 0 {
        trace.increment("pdf.winansi_replaced", replaced_total as u64);
    }
    if fallback_total > 0 {
        trace.increment("pdf.winansi_ascii_fallbacks", fallback_total as u64);
    }
    trace.log_span_ms("pdf.write", started.elapsed().as_secs_f64() * 1000.0);
    trace.event(
        "pdf.written",
        &format!(
            "\"pages\":{},\"bytes\":{},\"embedded\":{}",
            page_count,
            offset,
            face.is_some()
        ),
    );
    Ok(offset)
}

/// Lowers one page's commands to content-stream operators. The surface
/// records geometry top-left-down; PDF wants bottom-left-up, so every y
/// flips through the page height here and nowhere else.
fn render_page(
    page: &Page,
    page_height: Pt,
    face: Option<&ReportFont>,
    replaced_total: &mut usize,
    fallback_total: &mut usize,
) -> String {
    let mut out = String::new();
    for cmd in &page.commands {
        match cmd {
            Command::SetFillColor(color) => {
                out.push_str(&format!(
                    "{} {} {} rg\n",
                    fmt(color.r),
                    fmt(color.g),
                    fmt(color.b)
                ));
            }
            Command::SetStrokeColor(color) => {
                out.push_str(&format!(
                    "{} {} {} RG\n",
                    fmt(color.r),
                    fmt(color.g),
                    fmt(color.b)
                ));
            }
            Command::SetLineWidth(width) => {
                out.push_str(&format!("{} w\n", fmt_pt(*width)));
            }
            Command::FillRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re\nf\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::StrokeRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re\nS\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *height),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::MoveTo { x, y } => {
                out.push_str(&format!("{} {} m\n", fmt_pt(*x), fmt_pt(page_height - *y)));
            }
            Command::LineTo { x, y } => {
                out.push_str(&format!("{} {} l\n", fmt_pt(*x), fmt_pt(page_height - *y)));
            }
            Command::CurveTo {
                x1,
                y1,
                x2,
                y2,
                x3,
                y3,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} {} {} c\n",
                    fmt_pt(*x1),
                    fmt_pt(page_height - *y1),
                    fmt_pt(*x2),
                    fmt_pt(page_height - *y2),
                    fmt_pt(*x3),
                    fmt_pt(page_height - *y3),
                ));
            }
            Command::ClosePath => out.push_str("h\n"),
            Command::Fill => out.push_str("f\n"),
            Command::Stroke => out.push_str("S\n"),
            Command::DrawText { x, y, size, text } => {
                out.push_str("BT\n");
                out.push_str(&format!("/{} {} Tf\n", FONT_RESOURCE, fmt_pt(*size)));
                out.push_str(&format!(
                    "{} {} Td\n",
                    fmt_pt(*x),
                    fmt_pt(page_height - *y - *size)
                ));
                match face {
                    Some(face) => {
                        out.push_str(&encode_glyph_hex(face, text));
                        out.push_str(" Tj\n");
                    }
                    None => {
                        let encoded = encode_winansi_pdf_string(text);
                        *replaced_total += encoded.replaced;
                        *fallback_total += encoded.fallbacks;
                        out.push_str(&format!("({}) Tj\n", encoded.text));
                    }
                }
                out.push_str("ET\n");
            }
            Command::Meta { .. } => {}
        }
    }
    out
}

/// Glyphs actually drawn anywhere in the document, keyed by glyph id. The
/// mapped character feeds the ToUnicode CMap so extracted text reads back
/// as the original characters.
fn collect_glyph_map(face: &ReportFont, document: &Document) -> BTreeMap<u16, String> {
    let mut map: BTreeMap<u16, String> = BTreeMap::new();
    for page in &document.pages {
        for cmd in &page.commands {
            if let Command::DrawText { text, .. } = cmd {
                for (gid, ch) in face.glyph_run(text) {
                    if gid != 0 {
                        map.entry(gid).or_insert_with(|| ch.to_string());
                    }
                }
            }
        }
    }
    if map.is_empty() {
        // A document with no drawable glyphs still embeds a valid font.
        if let Some(gid) = face.glyph_index(' ') {
            if gid != 0 {
                map.insert(gid, " ".to_string());
            }
        }
    }
    map
}

/// Five objects starting at `start_id`: font program, descriptor,
/// CIDFontType2, ToUnicode CMap, and the Type0 wrapper the resource
/// dictionary points at.
fn build_embedded_font_objects(
    face: &ReportFont,
    glyph_map: &BTreeMap<u16, String>,
    start_id: usize,
) -> Vec<String> {
    let font_file_id = start_id;
    let descriptor_id = start_id + 1;
    let cid_font_id = start_id + 2;
    let to_unicode_id = start_id + 3;

    let base = face.postscript_name();
    let metrics = face.metrics();

    let mut objects = Vec::with_capacity(5);
    objects.push(font_file_object(face.data()));
    objects.push(font_descriptor_object(base, metrics, font_file_id));

    let mut w_entries: Vec<String> = Vec::new();
    for gid in glyph_map.keys() {
        let advance = face.glyph_advance(*gid);
        let width = if advance > 0 {
            advance
        } else {
            metrics.missing_width
        };
        w_entries.push(format!("{} [{}]", gid, width));
    }
    let w_array = if w_entries.is_empty() {
        String::new()
    } else {
        format!("/W [{}]", w_entries.join(" "))
    };

    objects.push(format!(
        "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> /FontDescriptor {} 0 R {} /CIDToGIDMap /Identity >>",
        base, descriptor_id, w_array
    ));
    objects.push(stream_object(&to_unicode_cmap(glyph_map)));
    objects.push(format!(
        "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
        base, cid_font_id, to_unicode_id
    ));
    objects
}

fn font_descriptor_object(base: &str, metrics: &FontMetrics, font_file_id: usize) -> String {
    // Flags 4 marks a symbolic font; Arabic coverage sits outside the
    // standard Latin charset the non-symbolic flag promises.
    format!(
        "<< /Type /FontDescriptor /FontName /{} /Flags 4 /FontBBox [{} {} {} {}] /ItalicAngle {} /Ascent {} /Descent {} /CapHeight {} /StemV 80 /MissingWidth {} /FontFile2 {} 0 R >>",
        base,
        metrics.bbox.0,
        metrics.bbox.1,
        metrics.bbox.2,
        metrics.bbox.3,
        metrics.italic_angle,
        metrics.ascent,
        metrics.descent,
        metrics.cap_height,
        metrics.missing_width,
        font_file_id
    )
}

/// Embedded font program as an ASCIIHexDecode stream. Hex keeps the file
/// byte-stable and diffable at the cost of size; /Length1 carries the
/// decoded length TrueType embedding requires.
fn font_file_object(data: &[u8]) -> String {
    let hex = ascii_hex_encode(data);
    let mut stream_data = String::new();
    stream_data.push_str(&hex);
    stream_data.push('>');
    stream_data.push('\n');
    let length = stream_data.as_bytes().len();
    format!(
        "<< /Length {} /Length1 {} /Filter /ASCIIHexDecode >>\nstream\n{}endstream",
        length,
        data.len(),
        stream_data
    )
}

fn ascii_hex_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for (index, byte) in data.iter().enumerate() {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02X}", byte);
        if index % 32 == 31 {
            out.push('\n');
        }
    }
    out
}

fn base_font_object(name: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        name
    )
}

fn to_unicode_cmap(glyph_map: &BTreeMap<u16, String>) -> String {
    let entries: Vec<(u16, &String)> = glyph_map.iter().map(|(gid, s)| (*gid, s)).collect();

    let mut out = String::new();
    out.push_str("/CIDInit /ProcSet findresource begin\n");
    out.push_str("12 dict begin\n");
    out.push_str("begincmap\n");
    out.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> def\n");
    out.push_str("/CMapName /Adobe-Identity-UCS def\n");
    out.push_str("/CMapType 2 def\n");
    out.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

    let mut idx = 0usize;
    while idx < entries.len() {
        let end = (idx + 100).min(entries.len());
        out.push_str(&format!("{} beginbfchar\n", end - idx));
        for (gid, s) in &entries[idx..end] {
            let mut uni = String::new();
            for unit in s.encode_utf16() {
                uni.push_str(&format!("{:04X}", unit));
            }
            out.push_str(&format!("<{:04X}> <{}>\n", gid, uni));
        }
        out.push_str("endbfchar\n");
        idx = end;
    }

    out.push_str("endcmap\n");
    out.push_str("CMapName currentdict /CMap defineresource pop\n");
    out.push_str("end\nend\n");
    out
}

/// Identity-H string: one four-digit hex glyph id per drawn character.
/// Missing characters come through as glyph 0 so layout stays aligned.
fn encode_glyph_hex(face: &ReportFont, text: &str) -> String {
    let mut out = String::from("<");
    for (gid, _ch) in face.glyph_run(text) {
        out.push_str(&format!("{:04X}", gid));
    }
    out.push('>');
    out
}

struct WinAnsiEncoded {
    text: String,
    replaced: usize,
    fallbacks: usize,
}

/// Encodes a visual string for the WinAnsi base font. Arabic-Indic digits
/// and the percent sign map to their ASCII forms so scores stay readable
/// without an embedded face; anything else outside the codepage becomes
/// `?` and is counted.
fn encode_winansi_pdf_string(input: &str) -> WinAnsiEncoded {
    let mut out = String::new();
    let mut replaced = 0usize;
    let mut fallbacks = 0usize;
    for ch in input.chars() {
        if is_zero_width_mark(ch) {
            continue;
        }
        match ch {
            '\u{0660}'..='\u{0669}' => {
                out.push((b'0' + (ch as u32 - 0x0660) as u8) as char);
                fallbacks += 1;
                continue;
            }
            '\u{066A}' => {
                out.push('%');
                fallbacks += 1;
                continue;
            }
            '\u{2265}' => {
                out.push_str(">=");
                fallbacks += 1;
                continue;
            }
            '\u{2264}' => {
                out.push_str("<=");
                fallbacks += 1;
                continue;
            }
            _ => {}
        }

        let byte = match ch {
            // ASCII
            '\u{0000}'..='\u{007F}' => ch as u8,
            // Latin-1
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            // WinAnsi extensions (cp1252)
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            _ => {
                replaced += 1;
                b'?'
            }
        };

        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b if b < 0x20 || b >= 0x7f => out.push_str(&format!("\\{:03o}", b)),
            b => out.push(b as char),
        }
    }

    WinAnsiEncoded {
        text: out,
        replaced,
        fallbacks,
    }
}

fn stream_object(content: &str) -> String {
    let length = content.as_bytes().len();
    format!("<< /Length {} >>\nstream\n{}\nendstream", length, content)
}

fn info_object(title: Option<&str>) -> String {
    let mut entries: Vec<String> = vec!["/Producer (Taqrir)".to_string()];
    if let Some(title) = title {
        entries.push(format!("/Title {}", pdf_text_string(title)));
    }
    format!("<< {} >>", entries.join(" "))
}

/// Literal string for ASCII input, UTF-16BE hex string with a BOM for
/// anything else. Metadata fields are usually Arabic, so the hex form is
/// the common case.
fn pdf_text_string(input: &str) -> String {
    if input.is_ascii() {
        format!("({})", escape_pdf_string(input))
    } else {
        let mut out = String::from("<FEFF");
        for unit in input.encode_utf16() {
            out.push_str(&format!("{:04X}", unit));
        }
        out.push('>');
        out
    }
}

fn escape_pdf_string(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}

fn write_pdf_object<W: Write>(
    writer: &mut W,
    offset: &mut usize,
    offsets: &mut [usize],
    obj_id: usize,
    body: &str,
) -> io::Result<()> {
    if let Some(slot) = offsets.get_mut(obj_id) {
        *slot = *offset;
    }
    write_str(writer, &format!("{} 0 obj\n", obj_id), offset)?;
    write_bytes(writer, body.as_bytes(), offset)?;
    write_bytes(writer, b"\nendobj\n", offset)?;
    Ok(())
}

fn write_bytes<W: Write>(writer: &mut W, data: &[u8], offset: &mut usize) -> io::Result<()> {
    writer.write_all(data)?;
    *offset += data.len();
    Ok(())
}

fn write_str<W: Write>(writer: &mut W, data: &str, offset: &mut usize) -> io::Result<()> {
    write_bytes(writer, data.as_bytes(), offset)
}

fn fmt(value: f32) -> String {
    fmt_pt(Pt::from_f32(value))
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

/// Decimal rendering of a millipoint value with trailing zeros trimmed.
/// Every coordinate in the file goes through here, which caps operand
/// precision at three digits and keeps output stable.
fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Size;

    fn fallback_doc(commands: Vec<Command>) -> Document {
        Document {
            page_size: Size {
                width: Pt::from_i32(200),
                height: Pt::from_i32(100),
            },
            pages: vec![Page { commands }],
            face: None,
        }
    }

    fn pdf_text(document: &Document, title: Option<&str>) -> String {
        let bytes = document_to_pdf(document, title, &TraceLogger::disabled()).unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[test]
    fn one_page_file_has_a_complete_skeleton() {
        let doc = fallback_doc(vec![Command::FillRect {
            x: Pt::from_i32(10),
            y: Pt::from_i32(10),
            width: Pt::from_i32(30),
            height: Pt::from_i32(20),
        }]);
        let text = pdf_text(&doc, Some("Report"));
        assert!(text.starts_with("%PDF-1.7\n"));
        assert!(text.ends_with("%%EOF"));
        // 3 fixed + content + page + base font + info = 7 objects.
        assert!(text.contains("xref\n0 8\n"));
        assert!(text.contains("/Size 8"));
        assert!(text.contains("/Root 1 0 R"));
        assert!(text.contains("/Info 7 0 R"));
        assert!(text.contains("/Font << /F1 6 0 R >>"));
        assert!(text.contains("/BaseFont /Helvetica"));
        assert!(text.contains("/Title (Report)"));
        assert!(text.contains("/Lang (ar)"));
        assert!(text.contains("/MediaBox [0 0 200 100]"));
    }

    #[test]
    fn rects_flip_into_bottom_left_coordinates() {
        let doc = fallback_doc(vec![Command::FillRect {
            x: Pt::from_i32(10),
            y: Pt::from_i32(10),
            width: Pt::from_i32(30),
            height: Pt::from_i32(20),
        }]);
        let text = pdf_text(&doc, None);
        assert!(text.contains("10 70 30 20 re\nf\n"));
    }

    #[test]
    fn path_operators_flip_through_page_space() {
        let doc = fallback_doc(vec![
            Command::MoveTo {
                x: Pt::from_i32(10),
                y: Pt::from_i32(10),
            },
            Command::LineTo {
                x: Pt::from_i32(20),
                y: Pt::from_i32(30),
            },
            Command::CurveTo {
                x1: Pt::from_i32(1),
                y1: Pt::from_i32(2),
                x2: Pt::from_i32(3),
                y2: Pt::from_i32(4),
                x3: Pt::from_i32(5),
                y3: Pt::from_i32(6),
            },
            Command::ClosePath,
            Command::Stroke,
        ]);
        let text = pdf_text(&doc, None);
        assert!(text.contains("10 90 m\n20 70 l\n1 98 3 96 5 94 c\nh\nS\n"));
    }

    #[test]
    fn color_and_width_operators_use_milli_precision() {
        let doc = fallback_doc(vec![
            Command::SetFillColor(Color::from_rgb8(31, 78, 95)),
            Command::SetStrokeColor(Color::WHITE),
            Command::SetLineWidth(Pt::from_f32(0.75)),
            Command::StrokeRect {
                x: Pt::ZERO,
                y: Pt::ZERO,
                width: Pt::from_i32(10),
                height: Pt::from_i32(10),
            },
        ]);
        let text = pdf_text(&doc, None);
        assert!(text.contains("0.122 0.306 0.373 rg\n"));
        assert!(text.contains("1 1 1 RG\n"));
        assert!(text.contains("0.75 w\n"));
        assert!(text.contains("0 90 10 10 re\nS\n"));
    }

    #[test]
    fn text_without_face_uses_the_base_font() {
        let doc = fallback_doc(vec![Command::DrawText {
            x: Pt::from_i32(40),
            y: Pt::from_i32(20),
            size: Pt::from_i32(12),
            text: "٨٢٪".to_string(),
        }]);
        let text = pdf_text(&doc, None);
        assert!(text.contains("BT\n/F1 12 Tf\n40 68 Td\n(82%) Tj\nET\n"));
    }

    #[test]
    fn meta_markers_never_reach_the_content_stream() {
        let doc = fallback_doc(vec![Command::Meta {
            key: "section".to_string(),
            value: "cover".to_string(),
        }]);
        let text = pdf_text(&doc, None);
        assert!(!text.contains("section"));
        assert!(text.contains("<< /Length 0 >>"));
    }

    #[test]
    fn output_is_byte_identical_across_runs() {
        let doc = fallback_doc(vec![
            Command::SetFillColor(Color::from_rgb8(42, 157, 143)),
            Command::FillRect {
                x: Pt::from_i32(5),
                y: Pt::from_i32(5),
                width: Pt::from_i32(50),
                height: Pt::from_i32(12),
            },
            Command::DrawText {
                x: Pt::from_i32(60),
                y: Pt::from_i32(40),
                size: Pt::from_f32(10.5),
                text: "النتيجة ٩٠٪".to_string(),
            },
        ]);
        let first = document_to_pdf(&doc, Some("تقرير"), &TraceLogger::disabled()).unwrap();
        let second = document_to_pdf(&doc, Some("تقرير"), &TraceLogger::disabled()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn winansi_maps_arabic_indic_digits_to_ascii() {
        let encoded = encode_winansi_pdf_string("٨٢٪");
        assert_eq!(encoded.text, "82%");
        assert_eq!(encoded.fallbacks, 3);
        assert_eq!(encoded.replaced, 0);
    }

    #[test]
    fn winansi_replaces_unmappable_chars_and_escapes_delimiters() {
        let encoded = encode_winansi_pdf_string("نص(1)");
        assert_eq!(encoded.text, "??\\(1\\)");
        assert_eq!(encoded.replaced, 2);
    }

    #[test]
    fn winansi_skips_directional_marks() {
        let encoded = encode_winansi_pdf_string("\u{2067}٥٠٪\u{2069}");
        assert_eq!(encoded.text, "50%");
        assert_eq!(encoded.replaced, 0);
    }

    #[test]
    fn winansi_encodes_cp1252_extensions_as_octal() {
        let encoded = encode_winansi_pdf_string("…");
        assert_eq!(encoded.text, "\\205");
        assert_eq!(encoded.replaced, 0);
    }

    #[test]
    fn to_unicode_cmap_covers_astral_chars() {
        let mut map = BTreeMap::new();
        map.insert(3u16, "A".to_string());
        map.insert(4u16, "\u{1F600}".to_string());
        let cmap = to_unicode_cmap(&map);
        assert!(cmap.contains("<0003> <0041>"));
        assert!(cmap.contains("<0004> <D83DDE00>"));
        assert!(cmap.contains("2 beginbfchar"));
    }

    #[test]
    fn arabic_title_encodes_as_utf16_hex() {
        assert_eq!(pdf_text_string("تقرير"), "<FEFF062A06420631064A0631>");
        assert_eq!(pdf_text_string("Report (2025)"), "(Report \\(2025\\))");
    }

    #[test]
    fn font_stream_hex_wraps_every_32_bytes() {
        let hex = ascii_hex_encode(&[0xAB_u8; 33]);
        assert_eq!(hex.len(), 64 + 1 + 2);
        assert_eq!(&hex[64..65], "\n");
        assert!(hex.starts_with("ABAB"));
    }

    #[test]
    fn point_formatting_trims_trailing_zeros() {
        assert_eq!(fmt_pt(Pt::from_f32(12.5)), "12.5");
        assert_eq!(fmt_pt(Pt::from_i32(12)), "12");
        assert_eq!(fmt_pt(Pt::ZERO), "0");
        assert_eq!(fmt_pt(Pt::from_f32(-0.75)), "-0.75");
        assert_eq!(fmt(0.251), "0.251");
    }
}
