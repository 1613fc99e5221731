use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Pt};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use dg_core::{Error, Result};
use crate::layout::Block;

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 54.0;
const BULLET_INDENT: f32 = 18.0;

/// Helvetica advance widths (1/1000 em) for printable ASCII, starting at the space.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' ' .. '/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0' .. '?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@' .. 'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P' .. '_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`' .. 'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p' .. '~'
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Regular,
    Bold,
    Oblique,
}

#[derive(Debug, Clone, Copy)]
struct Style {
    face: Face,
    size: f32,
    indent: f32,
    space_after: f32,
}

fn style(block: &Block) -> Style {
    let (face, size, indent, space_after) = match block {
        Block::Title(_) => (Face::Bold, 20.0, 0.0, 6.0),
        Block::Subtitle(_) => (Face::Oblique, 10.0, 0.0, 0.0),
        Block::Heading(_) => (Face::Bold, 14.0, 0.0, 4.0),
        Block::Meta(_) => (Face::Regular, 9.0, 0.0, 0.0),
        Block::Section(_) => (Face::Bold, 12.0, 0.0, 3.0),
        Block::Body(_) => (Face::Regular, 10.0, 0.0, 2.0),
        Block::Emphasis(_) => (Face::Oblique, 10.0, 0.0, 2.0),
        Block::Bullet(_) => (Face::Regular, 10.0, BULLET_INDENT, 2.0),
        Block::Spacer(_) => (Face::Regular, 10.0, 0.0, 0.0),
    };
    Style { face, size, indent, space_after }
}

/// The built-in fonts only cover a single-byte charset: fold typography to ASCII, drop the rest.
pub fn to_font_charset(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            ' '..='~' => out.push(c),
            '\t' | '\n' | '\r' | '\u{a0}' => out.push(' '),
            '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{2032}' => out.push('\''),
            '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{2033}' => out.push('"'),
            '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
            '\u{2022}' | '\u{25cf}' | '\u{25e6}' => out.push('*'),
            '\u{2026}' => out.push_str("..."),
            _ => {}
        }
    }
    out
}

pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let units: u32 = text
        .bytes()
        .map(|b| match b {
            b' '..=b'~' => u32::from(HELVETICA_WIDTHS[usize::from(b - b' ')]),
            _ => 556,
        })
        .sum();
    // Helvetica-Bold runs about 6% wider on average.
    let scale = if bold { 1.06 } else { 1.0 };
    units as f32 / 1000.0 * size * scale
}

/// Greedy word wrap. Words wider than a line are hard-broken.
pub fn wrap(text: &str, size: f32, bold: bool, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", line, word)
        };
        if text_width(&candidate, size, bold) <= max_width {
            line = candidate;
            continue;
        }
        if !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        let mut piece = String::new();
        for c in word.chars() {
            piece.push(c);
            if text_width(&piece, size, bold) > max_width && piece.len() > 1 {
                piece.pop();
                lines.push(std::mem::take(&mut piece));
                piece.push(c);
            }
        }
        line = piece;
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    oblique: IndirectFontRef,
}

impl Fonts {
    fn get(&self, face: Face) -> &IndirectFontRef {
        match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Oblique => &self.oblique,
        }
    }
}

fn pdf_error(e: printpdf::Error) -> Error {
    Error::Report(format!("PDF error: {}", e))
}

/// Cursor over the current page; opens new pages as the content runs off the bottom.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Self {
        let (doc, page, layer) = PdfDocument::new(
            title,
            Mm::from(Pt(PAGE_WIDTH)),
            Mm::from(Pt(PAGE_HEIGHT)),
            "Layer 1",
        );
        let layer = doc.get_page(page).get_layer(layer);
        Self {
            doc,
            layer,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        }
    }

    fn ensure_room(&mut self, height: f32) {
        if self.y - height >= MARGIN {
            return;
        }
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            Mm::from(Pt(PAGE_WIDTH)),
            Mm::from(Pt(PAGE_HEIGHT)),
            format!("Layer {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn line(&mut self, text: &str, x: f32, size: f32, font: &IndirectFontRef) {
        let leading = size * 1.3;
        self.ensure_room(leading);
        self.y -= leading;
        self.layer
            .use_text(text, size, Mm::from(Pt(x)), Mm::from(Pt(self.y)), font);
    }

    fn skip(&mut self, height: f32) {
        // A spacer at the bottom of a page never carries over.
        self.y = (self.y - height).max(MARGIN);
    }
}

/// Write the blocks to `path` as a paginated US Letter PDF.
pub fn write_pdf(path: &Path, title: &str, blocks: &[Block]) -> Result<usize> {
    let mut writer = PageWriter::new(&to_font_charset(title));
    let fonts = Fonts {
        regular: writer.doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?,
        bold: writer.doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?,
        oblique: writer.doc.add_builtin_font(BuiltinFont::HelveticaOblique).map_err(pdf_error)?,
    };
    let content_width = PAGE_WIDTH - 2.0 * MARGIN;

    for block in blocks {
        let text = match block {
            Block::Spacer(height) => {
                writer.skip(*height);
                continue;
            }
            Block::Title(t)
            | Block::Subtitle(t)
            | Block::Heading(t)
            | Block::Meta(t)
            | Block::Section(t)
            | Block::Body(t)
            | Block::Emphasis(t)
            | Block::Bullet(t) => to_font_charset(t),
        };
        let style = style(block);
        let font = fonts.get(style.face);
        let bold = style.face == Face::Bold;
        let x = MARGIN + style.indent;

        for (i, line) in wrap(&text, style.size, bold, content_width - style.indent).iter().enumerate() {
            if i == 0 && matches!(block, Block::Bullet(_)) {
                writer.line(line, x, style.size, font);
                writer.layer.use_text(
                    "-",
                    style.size,
                    Mm::from(Pt(x - 10.0)),
                    Mm::from(Pt(writer.y)),
                    &fonts.regular,
                );
            } else {
                writer.line(line, x, style.size, font);
            }
        }
        writer.skip(style.space_after);
    }

    let pages = writer.pages;
    let file = File::create(path)?;
    writer.doc.save(&mut BufWriter::new(file)).map_err(pdf_error)?;
    Ok(pages)
}
