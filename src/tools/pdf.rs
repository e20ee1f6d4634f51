//! Single-page PDF writer for budget documents.
//!
//! Produces PDF 1.4 with the standard Helvetica fonts in WinAnsi encoding,
//! so no font embedding is needed.

use std::fmt::Write as _;

/// A4 width in points.
pub const PAGE_WIDTH: f32 = 595.28;
/// A4 height in points.
pub const PAGE_HEIGHT: f32 = 841.89;
const CM: f32 = 28.3465;

/// Standard font faces used on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
    Oblique,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
            Self::Oblique => "F3",
        }
    }

    /// Average glyph width as a fraction of the font size, for centring.
    fn avg_width(self) -> f32 {
        match self {
            Self::Bold => 0.58,
            _ => 0.52,
        }
    }
}

/// Builds the content stream of one page.
#[derive(Debug, Default)]
pub struct PageBuilder {
    ops: String,
}

impl PageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw `text` with its baseline starting at (`x`, `y`).
    pub fn text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str) -> &mut Self {
        let _ = writeln!(
            self.ops,
            "BT /{} {size:.1} Tf {x:.2} {y:.2} Td ({}) Tj ET",
            font.resource(),
            escape_text(text)
        );
        self
    }

    /// Draw `text` roughly centred on `cx`.
    pub fn centred_text(&mut self, font: Font, size: f32, cx: f32, y: f32, text: &str) -> &mut Self {
        let width = text.chars().count() as f32 * size * font.avg_width();
        self.text(font, size, cx - width / 2.0, y, text)
    }

    /// Stroke a line from (`x1`, `y1`) to (`x2`, `y2`).
    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) -> &mut Self {
        let _ = writeln!(self.ops, "{x1:.2} {y1:.2} m {x2:.2} {y2:.2} l S");
        self
    }

    /// Serialise the page as a complete PDF document.
    pub fn finish(&self) -> Vec<u8> {
        let font = |name: &str| {
            format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{name} /Encoding /WinAnsiEncoding >>"
            )
        };
        let content = encode_win_ansi(&self.ops);
        let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        stream.extend_from_slice(&content);
        stream.extend_from_slice(b"\nendstream");

        let objects: Vec<Vec<u8>> = vec![
            b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
            b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec(),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 5 0 R /F2 6 0 R /F3 7 0 R >> >> /Contents 4 0 R >>"
            )
            .into_bytes(),
            stream,
            font("Helvetica").into_bytes(),
            font("Helvetica-Bold").into_bytes(),
            font("Helvetica-Oblique").into_bytes(),
        ];

        let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }
        let xref_at = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            let _ = write!(xref, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            objects.len() + 1
        );
        out.extend_from_slice(xref.as_bytes());
        out
    }
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' | '\r' | '\t' => out.push(' '),
            _ => out.push(c),
        }
    }
    out
}

/// Latin-1 characters map to themselves in WinAnsi; anything else becomes `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Parse price and quantity and multiply them. Unparsable input totals 0.
pub fn budget_total(price: &str, quantity: &str) -> f64 {
    match (price.trim().parse::<f64>(), quantity.trim().parse::<i64>()) {
        (Ok(p), Ok(q)) if p.is_finite() => p * q as f64,
        _ => 0.0,
    }
}

/// Render the budget document for one item.
pub fn render_budget(user: &str, item: &str, price: &str, quantity: &str) -> Vec<u8> {
    let total = budget_total(price, quantity);
    let (w, h) = (PAGE_WIDTH, PAGE_HEIGHT);
    let mut page = PageBuilder::new();
    page.text(Font::Bold, 20.0, 2.0 * CM, h - 3.0 * CM, "Presupuesto - Lucy Assistant")
        .text(Font::Regular, 12.0, 2.0 * CM, h - 4.0 * CM, &format!("Usuario: {user}"))
        .line(2.0 * CM, h - 4.5 * CM, w - 2.0 * CM, h - 4.5 * CM)
        .text(Font::Bold, 14.0, 2.0 * CM, h - 6.0 * CM, "Detalle del Pedido")
        .text(Font::Regular, 12.0, 3.0 * CM, h - 7.0 * CM, &format!("Item: {item}"))
        .text(
            Font::Regular,
            12.0,
            3.0 * CM,
            h - 8.0 * CM,
            &format!("Precio Unitario: ${price}"),
        )
        .text(Font::Regular, 12.0, 3.0 * CM, h - 9.0 * CM, &format!("Cantidad: {quantity}"))
        .text(Font::Bold, 14.0, w - 7.0 * CM, h - 11.0 * CM, &format!("Total: ${total:.2}"))
        .centred_text(
            Font::Oblique,
            10.0,
            w / 2.0,
            2.0 * CM,
            "Gracias por confiar en Lucy - Soberanía Digital Local",
        );
    page.finish()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn total_multiplies_or_zeroes() {
        assert!((budget_total("10.5", "3") - 31.5).abs() < f64::EPSILON);
        assert_eq!(budget_total("diez", "3"), 0.0);
        assert_eq!(budget_total("10", "2.5"), 0.0);
    }

    #[test]
    fn document_structure() {
        let pdf = render_budget("u1", "Mesa (roble)", "100", "2");
        assert!(pdf.starts_with(b"%PDF-1.4"));
        assert!(pdf.ends_with(b"%%EOF\n"));
        let text = String::from_utf8_lossy(&pdf);
        assert!(text.contains("Mesa \\(roble\\)"));
        assert!(text.contains("Total: $200.00"));
        assert!(text.contains("/BaseFont /Helvetica-Oblique"));
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let pdf = PageBuilder::new().finish();
        let xref = pdf.windows(5).position(|w| w == b"xref\n").unwrap();
        let table = std::str::from_utf8(&pdf[xref..]).unwrap();
        let first = table.lines().nth(3).unwrap();
        let offset: usize = first[..10].parse().unwrap();
        assert!(pdf[offset..].starts_with(b"1 0 obj"));
    }

    #[test]
    fn latin1_is_preserved() {
        assert_eq!(encode_win_ansi("ñ€"), vec![0xF1, b'?']);
    }
}
