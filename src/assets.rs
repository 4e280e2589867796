use crate::error::ReportError;
use crate::page_template::DecorImage;
use image::GenericImageView;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const LOGO_FILE: &str = "logo.png";
pub const BACKGROUND_FILE: &str = "background.png";
pub const CHART_FONT_FILE: &str = "fonts/chart.ttf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Logo,
    Background,
    Chart,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Logo => "logo",
            AssetKind::Background => "background",
            AssetKind::Chart => "chart",
        }
    }
}

/// Where the branding files live. Unset entries fall back to the assets directory.
#[derive(Debug, Clone, Default)]
pub struct AssetPaths {
    pub logo: Option<PathBuf>,
    pub background: Option<PathBuf>,
    pub chart_font: Option<PathBuf>,
}

impl AssetPaths {
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let font = dir.join(CHART_FONT_FILE);
        Self {
            logo: Some(dir.join(LOGO_FILE)),
            background: Some(dir.join(BACKGROUND_FILE)),
            chart_font: font.is_file().then_some(font),
        }
    }
}

/// A decoded-once raster with its source bytes kept for embedding.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub resource_id: String,
    pub kind: AssetKind,
    pub path: PathBuf,
    pub format: image::ImageFormat,
    pub width_px: u32,
    pub height_px: u32,
    pub data: Vec<u8>,
}

impl ImageAsset {
    pub fn load(
        resource_id: impl Into<String>,
        kind: AssetKind,
        path: impl AsRef<Path>,
    ) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let data =
            std::fs::read(path).map_err(|err| ReportError::missing_asset(kind.as_str(), path, err))?;
        Self::from_bytes(resource_id, kind, path, data)
    }

    pub fn from_bytes(
        resource_id: impl Into<String>,
        kind: AssetKind,
        path: impl AsRef<Path>,
        data: Vec<u8>,
    ) -> Result<Self, ReportError> {
        let path = path.as_ref();
        let format = image::guess_format(&data)
            .map_err(|err| ReportError::missing_asset(kind.as_str(), path, err))?;
        if !matches!(format, image::ImageFormat::Png | image::ImageFormat::Jpeg) {
            return Err(ReportError::missing_asset(
                kind.as_str(),
                path,
                format!("unsupported image format {:?}", format),
            ));
        }
        let decoded = image::load_from_memory_with_format(&data, format)
            .map_err(|err| ReportError::missing_asset(kind.as_str(), path, err))?;
        let (width_px, height_px) = decoded.dimensions();
        if width_px == 0 || height_px == 0 {
            return Err(ReportError::missing_asset(kind.as_str(), path, "empty image"));
        }
        Ok(Self {
            resource_id: resource_id.into(),
            kind,
            path: path.to_path_buf(),
            format,
            width_px,
            height_px,
            data,
        })
    }

    pub fn decor(&self) -> DecorImage {
        DecorImage {
            resource_id: self.resource_id.clone(),
            width_px: self.width_px,
            height_px: self.height_px,
        }
    }
}

/// Every image a document may reference, by resource id.
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    images: BTreeMap<String, ImageAsset>,
}

impl AssetStore {
    pub fn insert(&mut self, asset: ImageAsset) {
        self.images.insert(asset.resource_id.clone(), asset);
    }

    pub fn get(&self, resource_id: &str) -> Option<&ImageAsset> {
        self.images.get(resource_id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn of_kind(&self, kind: AssetKind) -> impl Iterator<Item = &ImageAsset> {
        self.images.values().filter(move |asset| asset.kind == kind)
    }
}
