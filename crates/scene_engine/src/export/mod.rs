//! Export pipeline
//!
//! Encodes a rendered frame as a PNG data URL or the live scene graph as a
//! base64 COLLADA document. The engine decides what to render; this module
//! only encodes.

pub mod collada;

use std::io::Cursor;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::render::RenderError;

/// Prefix of raster export payloads
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The format string is not one this engine knows
    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// The format is known but has no encoder
    #[error("Export format '{0}' is not implemented")]
    NotImplemented(&'static str),

    /// Rendering the export frame failed
    #[error("Export render failed: {0}")]
    Render(#[from] RenderError),

    /// Encoding the payload failed
    #[error("Export encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    /// The back end produced a frame of the wrong kind
    #[error("Export needs a raster frame")]
    NotRaster,

    /// The export frame exceeds the largest frame a back end allocates
    #[error("Export frame of {width}x{height} pixels is too large; lower the export pixel ratio")]
    TooLarge {
        /// Width in device pixels
        width: u32,
        /// Height in device pixels
        height: u32,
    },
}

impl ExportError {
    /// Classify a failure rendering the off-screen export frame
    ///
    /// The size cap only concerns the export frame, so it is reported to the
    /// caller instead of ending the engine.
    pub fn from_export_frame(err: RenderError) -> Self {
        match err {
            RenderError::OutOfMemory { width, height } => Self::TooLarge { width, height },
            other => Self::Render(other),
        }
    }
}

/// Export target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportFormat {
    /// PNG snapshot of the viewport
    RasterImage,
    /// COLLADA 1.4.1 document
    ColladaDocument,
    /// glTF (recognized, no encoder)
    GltfDocument,
    /// USDZ (recognized, no encoder)
    UsdzDocument,
}

impl ExportFormat {
    /// Wire name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RasterImage => "raster-image",
            Self::ColladaDocument => "collada-document",
            Self::GltfDocument => "gltf-document",
            Self::UsdzDocument => "usdz-document",
        }
    }

    /// Fail for formats without an encoder
    pub fn ensure_supported(self) -> Result<Self, ExportError> {
        match self {
            Self::RasterImage | Self::ColladaDocument => Ok(self),
            Self::GltfDocument | Self::UsdzDocument => Err(ExportError::NotImplemented(self.as_str())),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raster-image" => Ok(Self::RasterImage),
            "collada-document" => Ok(Self::ColladaDocument),
            "gltf-document" => Ok(Self::GltfDocument),
            "usdz-document" => Ok(Self::UsdzDocument),
            other => Err(ExportError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoded export payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResponse {
    /// Format that produced `data`
    pub format: ExportFormat,
    /// Data URL (raster) or base64 document
    pub data: String,
    /// When the export was taken
    pub timestamp: DateTime<Utc>,
}

/// Base64 for transport
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// PNG bytes of an RGBA image
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// `data:image/png;base64,...` URL of an RGBA image
pub fn png_data_url(image: &RgbaImage) -> Result<String, ExportError> {
    let png = encode_png(image)?;
    Ok(format!("{PNG_DATA_URL_PREFIX}{}", encode_base64(&png)))
}
