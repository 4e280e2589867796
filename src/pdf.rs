use crate::assets::{AssetStore, ImageAsset};
use crate::canvas::{Command, Document, Page};
use crate::debug::DebugLogger;
use crate::error::ReportError;
use crate::font::BaseFont;
use crate::types::{Color, Pt};
use fixed::types::I32F32;
use image::GenericImageView;
use std::collections::BTreeMap;
use std::io::Write;

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const RESOURCES_ID: usize = 3;

#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub title: Option<String>,
    pub producer: String,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            title: None,
            producer: "govreport".to_string(),
        }
    }
}

struct ImageData {
    width: u32,
    height: u32,
    color_space: &'static str,
    filter: &'static str,
    data: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

/// Serializes a laid-out document. Text uses the base-14 Helvetica faces with
/// WinAnsi encoding; every image must be registered in `assets`.
pub fn document_to_pdf(
    document: &Document,
    assets: &AssetStore,
    options: &PdfOptions,
    debug: Option<&DebugLogger>,
) -> Result<Vec<u8>, ReportError> {
    let fonts = collect_font_names(document)?;
    let font_map: BTreeMap<String, String> = fonts
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.clone(), format!("F{}", idx + 1)))
        .collect();

    let mut images: Vec<(String, ImageData)> = Vec::new();
    for resource_id in document.image_resources() {
        let asset = assets.get(&resource_id).ok_or_else(|| {
            ReportError::missing_asset(resource_id.as_str(), "", "image is not registered")
        })?;
        images.push((resource_id, decode_image(asset)?));
    }

    let mut objects: BTreeMap<usize, Vec<u8>> = BTreeMap::new();
    let mut next_id = RESOURCES_ID + 1;

    let mut font_entries = Vec::new();
    for name in &fonts {
        let key = font_map.get(name).cloned().unwrap_or_default();
        objects.insert(next_id, font_object(name).into_bytes());
        font_entries.push((key, next_id));
        next_id += 1;
    }

    let mut image_map: BTreeMap<String, String> = BTreeMap::new();
    let mut image_entries = Vec::new();
    for (idx, (resource_id, image)) in images.iter().enumerate() {
        let smask_id = image.alpha.as_ref().map(|alpha| {
            let id = next_id;
            objects.insert(id, smask_object(image, alpha).into_bytes());
            next_id += 1;
            id
        });
        let key = format!("Im{}", idx + 1);
        objects.insert(next_id, image_object(image, smask_id).into_bytes());
        image_entries.push((key.clone(), next_id));
        image_map.insert(resource_id.clone(), key);
        next_id += 1;
    }

    let mut resources = vec!["/ProcSet [/PDF /Text /ImageB /ImageC]".to_string()];
    if !font_entries.is_empty() {
        resources.push(format!("/Font {}", resource_dict(&font_entries)));
    }
    if !image_entries.is_empty() {
        resources.push(format!("/XObject {}", resource_dict(&image_entries)));
    }
    objects.insert(
        RESOURCES_ID,
        format!("<< {} >>", resources.join(" ")).into_bytes(),
    );

    let page_height = document.page_size.height;
    let mut page_ids = Vec::with_capacity(document.pages.len());
    let mut replaced_chars = 0usize;
    for page in &document.pages {
        let (content, replaced) = render_page(page, page_height, &font_map, &image_map);
        replaced_chars += replaced;
        let content_id = next_id;
        let page_id = next_id + 1;
        next_id += 2;
        objects.insert(content_id, stream_object(&content).into_bytes());
        objects.insert(
            page_id,
            format!(
                "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /Resources {} 0 R /Contents {} 0 R >>",
                PAGES_ID,
                fmt_pt(document.page_size.width),
                fmt_pt(document.page_size.height),
                RESOURCES_ID,
                content_id
            )
            .into_bytes(),
        );
        page_ids.push(page_id);
    }

    let kids = page_ids
        .iter()
        .map(|id| format!("{} 0 R", id))
        .collect::<Vec<_>>()
        .join(" ");
    objects.insert(
        PAGES_ID,
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids, page_ids.len()).into_bytes(),
    );
    objects.insert(
        CATALOG_ID,
        format!("<< /Type /Catalog /Pages {} 0 R >>", PAGES_ID).into_bytes(),
    );
    let info_id = next_id;
    objects.insert(info_id, info_object(options).into_bytes());

    if let Some(logger) = debug {
        logger.increment("pdf.pages", page_ids.len() as u64);
        logger.increment("pdf.images", images.len() as u64);
        if replaced_chars > 0 {
            logger.increment("pdf.winansi_replaced", replaced_chars as u64);
        }
    }
    if replaced_chars > 0 {
        tracing::warn!(
            replaced = replaced_chars,
            "characters outside WinAnsi were replaced"
        );
    }

    build_pdf(&objects, info_id)
}

fn collect_font_names(document: &Document) -> Result<Vec<String>, ReportError> {
    let mut names: Vec<String> = Vec::new();
    let mut push = |name: &str| -> Result<(), ReportError> {
        if BaseFont::from_pdf_name(name).is_none() {
            return Err(ReportError::InvalidConfiguration(format!(
                "font '{}' is not a supported base font",
                name
            )));
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
        Ok(())
    };
    for page in &document.pages {
        let mut current = BaseFont::Helvetica.pdf_name().to_string();
        for cmd in &page.commands {
            match cmd {
                Command::SetFontName(name) => current = name.clone(),
                Command::DrawString { .. } => push(&current)?,
                _ => {}
            }
        }
    }
    Ok(names)
}

fn decode_image(asset: &ImageAsset) -> Result<ImageData, ReportError> {
    let missing = |err: String| ReportError::missing_asset(asset.resource_id.as_str(), &asset.path, err);
    let decoded = image::load_from_memory_with_format(&asset.data, asset.format)
        .map_err(|err| missing(err.to_string()))?;
    let (width, height) = decoded.dimensions();

    if asset.format == image::ImageFormat::Jpeg {
        let color_space = match decoded.color() {
            image::ColorType::L8 | image::ColorType::La8 => "/DeviceGray",
            _ => "/DeviceRGB",
        };
        return Ok(ImageData {
            width,
            height,
            color_space,
            filter: "/DCTDecode",
            data: asset.data.clone(),
            alpha: None,
        });
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        if a != 255 {
            has_alpha = true;
        }
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }
    Ok(ImageData {
        width,
        height,
        color_space: "/DeviceRGB",
        filter: "/FlateDecode",
        data: flate_compress(&rgb).map_err(|err| missing(err.to_string()))?,
        alpha: if has_alpha {
            Some(flate_compress(&alpha).map_err(|err| missing(err.to_string()))?)
        } else {
            None
        },
    })
}

fn render_page(
    page: &Page,
    page_height: Pt,
    font_map: &BTreeMap<String, String>,
    image_map: &BTreeMap<String, String>,
) -> (String, usize) {
    let mut out = String::new();
    let mut replaced = 0usize;
    let mut font_size = Pt::from_f32(12.0);
    let mut font_name = BaseFont::Helvetica.pdf_name().to_string();
    let flip = |y: Pt| page_height - y;

    for cmd in &page.commands {
        match cmd {
            Command::SaveState => out.push_str("q\n"),
            Command::RestoreState => out.push_str("Q\n"),
            Command::Meta { .. } => {}
            Command::SetFillColor(color) => out.push_str(&color_to_pdf_fill(*color)),
            Command::SetStrokeColor(color) => out.push_str(&color_to_pdf_stroke(*color)),
            Command::SetLineWidth(width) => out.push_str(&format!("{} w\n", fmt_pt(*width))),
            Command::SetFontName(name) => font_name = name.clone(),
            Command::SetFontSize(size) => font_size = *size,
            Command::MoveTo { x, y } => {
                out.push_str(&format!("{} {} m\n", fmt_pt(*x), fmt_pt(flip(*y))));
            }
            Command::LineTo { x, y } => {
                out.push_str(&format!("{} {} l\n", fmt_pt(*x), fmt_pt(flip(*y))));
            }
            Command::ClosePath => out.push_str("h\n"),
            Command::Fill => out.push_str("f\n"),
            Command::Stroke => out.push_str("S\n"),
            Command::DrawString { x, y, text } => {
                let Some(key) = font_map.get(&font_name) else {
                    continue;
                };
                let encoded = encode_winansi_pdf_string(text);
                replaced += encoded.replaced;
                out.push_str(&format!(
                    "BT /{} {} Tf {} {} Td ({}) Tj ET\n",
                    key,
                    fmt_pt(font_size),
                    fmt_pt(*x),
                    fmt_pt(flip(*y + font_size)),
                    encoded.text
                ));
            }
            Command::DrawRect {
                x,
                y,
                width,
                height,
            } => {
                out.push_str(&format!(
                    "{} {} {} {} re f\n",
                    fmt_pt(*x),
                    fmt_pt(flip(*y + *height)),
                    fmt_pt(*width),
                    fmt_pt(*height)
                ));
            }
            Command::DrawImage {
                x,
                y,
                width,
                height,
                resource_id,
            } => {
                if let Some(key) = image_map.get(resource_id) {
                    out.push_str(&format!(
                        "q {} 0 0 {} {} {} cm /{} Do Q\n",
                        fmt_pt(*width),
                        fmt_pt(*height),
                        fmt_pt(*x),
                        fmt_pt(flip(*y + *height)),
                        key
                    ));
                }
            }
        }
    }
    (out, replaced)
}

fn build_pdf(objects: &BTreeMap<usize, Vec<u8>>, info_id: usize) -> Result<Vec<u8>, ReportError> {
    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.7\n");
    out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

    let max_id = objects.keys().next_back().copied().unwrap_or(0);
    let mut offsets = vec![0usize; max_id + 1];
    for (obj_id, body) in objects {
        offsets[*obj_id] = out.len();
        write!(out, "{} 0 obj\n", obj_id)?;
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_start = out.len();
    write!(out, "xref\n0 {}\n", max_id + 1)?;
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets.iter().skip(1) {
        write!(out, "{:010} 00000 n \n", offset)?;
    }
    write!(
        out,
        "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF",
        max_id + 1,
        CATALOG_ID,
        info_id,
        xref_start
    )?;
    Ok(out)
}

fn font_object(name: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        name
    )
}

fn resource_dict(entries: &[(String, usize)]) -> String {
    let items: Vec<String> = entries
        .iter()
        .map(|(key, id)| format!("/{} {} 0 R", key, id))
        .collect();
    format!("<< {} >>", items.join(" "))
}

fn image_object(image: &ImageData, smask_id: Option<usize>) -> String {
    let stream_data = encode_stream_data(&image.data);
    let filters = match image.filter {
        "/DCTDecode" => "[/ASCIIHexDecode /DCTDecode]",
        _ => "[/ASCIIHexDecode /FlateDecode]",
    };
    let smask = smask_id
        .map(|id| format!(" /SMask {} 0 R", id))
        .unwrap_or_default();
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} /BitsPerComponent 8 /Length {} /Filter {}{} >>\nstream\n{}\nendstream",
        image.width,
        image.height,
        image.color_space,
        stream_data.len(),
        filters,
        smask,
        stream_data
    )
}

fn smask_object(image: &ImageData, alpha: &[u8]) -> String {
    let stream_data = encode_stream_data(alpha);
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent 8 /Length {} /Filter [/ASCIIHexDecode /FlateDecode] >>\nstream\n{}\nendstream",
        image.width,
        image.height,
        stream_data.len(),
        stream_data
    )
}

fn stream_object(content: &str) -> String {
    format!(
        "<< /Length {} >>\nstream\n{}\nendstream",
        content.len(),
        content
    )
}

fn info_object(options: &PdfOptions) -> String {
    let mut entries = Vec::new();
    if let Some(title) = &options.title {
        entries.push(format!("/Title ({})", encode_winansi_pdf_string(title).text));
    }
    entries.push(format!(
        "/Producer ({})",
        encode_winansi_pdf_string(&options.producer).text
    ));
    format!("<< {} >>", entries.join(" "))
}

fn flate_compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn encode_stream_data(data: &[u8]) -> String {
    let mut hex = ascii_hex_encode(data);
    hex.push('>');
    hex
}

fn ascii_hex_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2 + data.len() / 32);
    for (index, byte) in data.iter().enumerate() {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02X}", byte);
        if index % 32 == 31 {
            out.push('\n');
        }
    }
    out
}

struct WinAnsiEncoded {
    text: String,
    replaced: usize,
}

fn encode_winansi_pdf_string(input: &str) -> WinAnsiEncoded {
    let mut out = String::new();
    let mut replaced = 0usize;
    for ch in input.chars() {
        let byte = match ch {
            '\u{0000}'..='\u{007F}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
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
    WinAnsiEncoded { text: out, replaced }
}

fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = I32F32::from_num(value);
    let scaled = (fixed * I32F32::from_num(1000)).round();
    let milli: i64 = scaled.to_num();
    format_milli(milli)
}

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
        s
    }
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

fn color_to_pdf_fill(color: Color) -> String {
    format!("{} {} {} rg\n", fmt(color.r), fmt(color.g), fmt(color.b))
}

fn color_to_pdf_stroke(color: Color) -> String {
    format!("{} {} {} RG\n", fmt(color.r), fmt(color.g), fmt(color.b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetKind;
    use crate::canvas::Canvas;
    use crate::types::Size;

    fn one_page(draw: impl FnOnce(&mut Canvas)) -> Document {
        let mut canvas = Canvas::new(Size::letter());
        draw(&mut canvas);
        canvas.finish()
    }

    fn count_token(bytes: &[u8], token: &[u8]) -> usize {
        bytes.windows(token.len()).filter(|w| *w == token).count()
    }

    fn png_asset(id: &str, rgba: [u8; 4]) -> ImageAsset {
        let img = image::RgbaImage::from_pixel(4, 2, image::Rgba(rgba));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        ImageAsset::from_bytes(id, AssetKind::Chart, format!("{id}.png"), out.into_inner()).unwrap()
    }

    #[test]
    fn text_is_flipped_to_pdf_space_and_encoded() {
        let doc = one_page(|canvas| {
            canvas.set_font_name("Helvetica-Bold");
            canvas.set_font_size(Pt::from_f32(10.0));
            canvas.draw_string(Pt::from_f32(36.0), Pt::from_f32(100.0), "vis-à-vis (1)");
        });
        let bytes = document_to_pdf(&doc, &AssetStore::default(), &PdfOptions::default(), None).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(bytes.starts_with(b"%PDF-1.7\n"));
        assert!(text.contains("/BaseFont /Helvetica-Bold"));
        // 792 - 100 - 10
        assert!(text.contains("BT /F1 10 Tf 36 682 Td (vis-\\340-vis \\(1\\)) Tj ET"));
        assert!(text.ends_with("%%EOF"));
    }

    #[test]
    fn images_are_shared_across_pages_with_soft_masks() {
        let mut canvas = Canvas::new(Size::letter());
        for _ in 0..2 {
            canvas.draw_image(Pt::ZERO, Pt::ZERO, Pt::from_f32(10.0), Pt::from_f32(5.0), "chart");
            canvas.show_page();
        }
        let doc = canvas.finish_without_show();
        let mut assets = AssetStore::default();
        assets.insert(png_asset("chart", [10, 20, 30, 128]));
        let bytes = document_to_pdf(&doc, &assets, &PdfOptions::default(), None).unwrap();
        assert_eq!(count_token(&bytes, b"/Subtype /Image"), 2);
        assert_eq!(count_token(&bytes, b"/SMask"), 1);
        assert_eq!(count_token(&bytes, b"/Im1 Do"), 2);
        assert_eq!(count_token(&bytes, b"/Type /Page "), 2);
    }

    #[test]
    fn unregistered_images_are_missing_assets() {
        let doc = one_page(|canvas| {
            canvas.draw_image(Pt::ZERO, Pt::ZERO, Pt::from_f32(1.0), Pt::from_f32(1.0), "logo");
        });
        let err = document_to_pdf(&doc, &AssetStore::default(), &PdfOptions::default(), None)
            .unwrap_err();
        assert_eq!(err.code(), "MISSING_ASSET");
    }

    #[test]
    fn unknown_fonts_are_rejected() {
        let doc = one_page(|canvas| {
            canvas.set_font_name("Comic");
            canvas.draw_string(Pt::ZERO, Pt::ZERO, "x");
        });
        let err = document_to_pdf(&doc, &AssetStore::default(), &PdfOptions::default(), None)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_CONFIGURATION");
    }

    #[test]
    fn numbers_format_without_trailing_zeros() {
        assert_eq!(format_milli(12_500), "12.5");
        assert_eq!(format_milli(-250), "-0.25");
        assert_eq!(fmt(0.0), "0");
        assert_eq!(color_to_pdf_fill(Color::WHITE), "1 1 1 rg\n");
    }

    #[test]
    fn output_parses_with_title() {
        let doc = one_page(|canvas| canvas.draw_string(Pt::ZERO, Pt::ZERO, "hello"));
        let options = PdfOptions {
            title: Some("Summary Report".to_string()),
            ..PdfOptions::default()
        };
        let bytes = document_to_pdf(&doc, &AssetStore::default(), &options, None).unwrap();
        let parsed = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 1);
        assert!(String::from_utf8_lossy(&bytes).contains("/Title (Summary Report)"));
    }
}
