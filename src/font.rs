use crate::error::ReportError;
use crate::types::Pt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_skia::PathBuilder;
use ttf_parser::OutlineBuilder;

/// The three PDF base-14 faces the report uses. They are never embedded, so text
/// measurement relies on the standard AFM advance widths below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
}

impl BaseFont {
    pub fn pdf_name(self) -> &'static str {
        match self {
            BaseFont::Helvetica => "Helvetica",
            BaseFont::HelveticaBold => "Helvetica-Bold",
            BaseFont::HelveticaOblique => "Helvetica-Oblique",
        }
    }

    pub fn from_pdf_name(name: &str) -> Option<BaseFont> {
        match name {
            "Helvetica" => Some(BaseFont::Helvetica),
            "Helvetica-Bold" => Some(BaseFont::HelveticaBold),
            "Helvetica-Oblique" => Some(BaseFont::HelveticaOblique),
            _ => None,
        }
    }

    /// Advance width in 1/1000 em.
    pub fn char_width(self, ch: char) -> u16 {
        let table = match self {
            BaseFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
            BaseFont::Helvetica | BaseFont::HelveticaOblique => &HELVETICA_WIDTHS,
        };
        let code = ch as u32;
        if (32..=126).contains(&code) {
            return table[(code - 32) as usize];
        }
        let bold = self == BaseFont::HelveticaBold;
        match ch {
            '\u{2018}' | '\u{2019}' => {
                if bold {
                    278
                } else {
                    222
                }
            }
            '\u{201C}' | '\u{201D}' => {
                if bold {
                    500
                } else {
                    333
                }
            }
            '\u{2014}' | '\u{2026}' => 1000,
            '\u{2013}' => 556,
            '\u{2022}' => 350,
            '\u{00A0}' => 278,
            _ => 556,
        }
    }

    pub fn measure(self, text: &str, size: Pt) -> Pt {
        let units: i64 = text.chars().map(|ch| i64::from(self.char_width(ch))).sum();
        Pt::from_milli_i64(size.to_milli_i64() * units / 1000)
    }
}

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const CHART_FONT_CANDIDATES: [&str; 6] = [
    "DejaVuSans-Bold.ttf",
    "DejaVuSans.ttf",
    "LiberationSans-Bold.ttf",
    "LiberationSans-Regular.ttf",
    "Arial.ttf",
    "arial.ttf",
];

/// TrueType face used to draw chart labels into the raster.
#[derive(Debug, Clone)]
pub struct ChartFont {
    data: Arc<Vec<u8>>,
    path: PathBuf,
}

impl ChartFont {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|err| ReportError::missing_asset("chart font", path, err))?;
        if let Err(err) = ttf_parser::Face::parse(&data, 0) {
            return Err(ReportError::missing_asset("chart font", path, err));
        }
        Ok(Self {
            data: Arc::new(data),
            path: path.to_path_buf(),
        })
    }

    /// First parseable candidate found under the usual system font directories.
    pub fn probe_system() -> Option<Self> {
        for dir in system_font_dirs() {
            for name in CHART_FONT_CANDIDATES {
                if let Some(path) = find_file(&dir, name, 4) {
                    if let Ok(font) = Self::load(&path) {
                        return Some(font);
                    }
                }
            }
        }
        None
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Width in pixels of `text` at `px` pixels per em.
    pub fn measure(&self, text: &str, px: f32) -> f32 {
        let Ok(face) = ttf_parser::Face::parse(&self.data, 0) else {
            return 0.0;
        };
        let scale = px / f32::from(face.units_per_em().max(1));
        text.chars()
            .map(|ch| {
                face.glyph_index(ch)
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| f32::from(adv) * scale)
                    .unwrap_or(px * 0.5)
            })
            .sum()
    }

    /// Outline of `text` laid on `baseline` in pixmap space (y down).
    pub fn text_path(&self, text: &str, x: f32, baseline: f32, px: f32) -> Option<tiny_skia::Path> {
        let face = ttf_parser::Face::parse(&self.data, 0).ok()?;
        let scale = px / f32::from(face.units_per_em().max(1));
        let mut builder = GlyphPathBuilder::new(x, baseline, scale);
        for ch in text.chars() {
            let Some(gid) = face.glyph_index(ch) else {
                builder.origin_x += px * 0.5;
                continue;
            };
            face.outline_glyph(gid, &mut builder);
            let advance = face.glyph_hor_advance(gid).unwrap_or(0);
            builder.origin_x += f32::from(advance) * scale;
        }
        builder.finish()
    }
}

struct GlyphPathBuilder {
    builder: PathBuilder,
    origin_x: f32,
    origin_y: f32,
    scale: f32,
}

impl GlyphPathBuilder {
    fn new(origin_x: f32, origin_y: f32, scale: f32) -> Self {
        Self {
            builder: PathBuilder::new(),
            origin_x,
            origin_y,
            scale,
        }
    }

    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.origin_y - y * self.scale)
    }

    fn finish(self) -> Option<tiny_skia::Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x, y) = self.point(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x2, y2) = self.point(x2, y2);
        let (x, y) = self.point(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

fn find_file(dir: &Path, name: &str, depth: usize) -> Option<PathBuf> {
    let candidate = dir.join(name);
    if candidate.is_file() {
        return Some(candidate);
    }
    if depth == 0 {
        return None;
    }
    let mut subdirs: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    subdirs.sort();
    subdirs
        .iter()
        .find_map(|sub| find_file(sub, name, depth - 1))
}

fn system_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(extra) = std::env::var("GOVREPORT_FONT_DIR") {
        for path in std::env::split_paths(&extra) {
            if !path.as_os_str().is_empty() {
                dirs.push(path);
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        dirs.push(PathBuf::from(r"C:\Windows\Fonts"));
        if let Ok(windir) = std::env::var("WINDIR") {
            dirs.push(PathBuf::from(windir).join("Fonts"));
        }
    }

    #[cfg(target_os = "linux")]
    {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join(".fonts"));
        }
    }

    #[cfg(target_os = "macos")]
    {
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from("/Library/Fonts"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(PathBuf::from(home).join("Library/Fonts"));
        }
    }

    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_widths_match_afm() {
        let size = Pt::from_f32(10.0);
        // "Hi" = 722 + 222
        assert_eq!(BaseFont::Helvetica.measure("Hi", size).to_milli_i64(), 9_440);
        // bold "Hi" = 722 + 278
        assert_eq!(
            BaseFont::HelveticaBold.measure("Hi", size).to_milli_i64(),
            10_000
        );
        assert_eq!(
            BaseFont::HelveticaOblique.measure("Hi", size),
            BaseFont::Helvetica.measure("Hi", size)
        );
    }

    #[test]
    fn typographic_punctuation_has_widths() {
        assert_eq!(BaseFont::Helvetica.char_width('\u{2019}'), 222);
        assert_eq!(BaseFont::HelveticaBold.char_width('\u{2019}'), 278);
        assert_eq!(BaseFont::Helvetica.char_width('\u{2014}'), 1000);
        assert_eq!(BaseFont::Helvetica.char_width('é'), 556);
    }

    #[test]
    fn pdf_names_round_trip() {
        for font in [
            BaseFont::Helvetica,
            BaseFont::HelveticaBold,
            BaseFont::HelveticaOblique,
        ] {
            assert_eq!(BaseFont::from_pdf_name(font.pdf_name()), Some(font));
        }
    }

    #[test]
    fn loading_a_non_font_is_a_missing_asset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.ttf");
        fs::write(&path, b"not a font").unwrap();
        let err = ChartFont::load(&path).unwrap_err();
        assert_eq!(err.code(), "MISSING_ASSET");
        let err = ChartFont::load(dir.path().join("absent.ttf")).unwrap_err();
        assert_eq!(err.code(), "MISSING_ASSET");
    }
}
