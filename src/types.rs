//! Shared types and enums used across GridGarage.
//! Includes `ParameterType`, `Direction`, `PixelType`, `ResampleMethod`, and the
//! label lists offered as parameter choices.
use serde::{Deserialize, Serialize};

/// Raster format labels accepted by the `raster_format` parameter: the formats
/// the GDAL provider can write.
pub const RASTER_FORMATS: &[&str] = &["Esri Grid", "TIFF", "IMG", "BIL", "BIP", "BSQ"];

/// Label of the native raster format: outputs carry no file extension.
pub const NATIVE_RASTER_FORMAT: &str = "Esri Grid";

/// Declared datatype of a tool parameter.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum ParameterType {
    Boolean,
    Double,
    Long,
    String,
    TableView,
    Field,
    Workspace,
    Dataset,
    Table,
}

impl std::fmt::Display for ParameterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParameterType::Boolean => "Boolean",
            ParameterType::Double => "Double",
            ParameterType::Long => "Long",
            ParameterType::String => "String",
            ParameterType::TableView => "Table View",
            ParameterType::Field => "Field",
            ParameterType::Workspace => "Workspace",
            ParameterType::Dataset => "Dataset",
            ParameterType::Table => "Table",
        };
        write!(f, "{}", s)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Input,
    /// Filled in by the tool itself (result tables).
    Derived,
}

/// Output pixel types, labelled the way the copy tool's `pixel_type` choice list spells them.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum PixelType {
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl PixelType {
    pub const LABELS: &'static [&'static str] = &[
        "1_BIT",
        "2_BIT",
        "4_BIT",
        "8_BIT_UNSIGNED",
        "8_BIT_SIGNED",
        "16_BIT_UNSIGNED",
        "16_BIT_SIGNED",
        "32_BIT_UNSIGNED",
        "32_BIT_SIGNED",
        "32_BIT_FLOAT",
        "64_BIT",
    ];

    /// Sub-byte types widen to `U8`; signed bytes widen to `I16`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_uppercase().as_str() {
            "1_BIT" | "2_BIT" | "4_BIT" | "8_BIT_UNSIGNED" => Some(PixelType::U8),
            "8_BIT_SIGNED" | "16_BIT_SIGNED" => Some(PixelType::I16),
            "16_BIT_UNSIGNED" => Some(PixelType::U16),
            "32_BIT_SIGNED" => Some(PixelType::I32),
            "32_BIT_UNSIGNED" => Some(PixelType::U32),
            "32_BIT_FLOAT" => Some(PixelType::F32),
            "64_BIT" => Some(PixelType::F64),
            _ => None,
        }
    }
}

impl std::fmt::Display for PixelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PixelType::U8 => write!(f, "U8"),
            PixelType::I16 => write!(f, "I16"),
            PixelType::U16 => write!(f, "U16"),
            PixelType::I32 => write!(f, "I32"),
            PixelType::U32 => write!(f, "U32"),
            PixelType::F32 => write!(f, "F32"),
            PixelType::F64 => write!(f, "F64"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub enum ResampleMethod {
    Nearest,
    Bilinear,
    Cubic,
    Average,
}

impl ResampleMethod {
    pub const LABELS: &'static [&'static str] = &["NEAREST", "BILINEAR", "CUBIC", "AVERAGE"];

    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_uppercase().as_str() {
            "NEAREST" => Some(ResampleMethod::Nearest),
            "BILINEAR" => Some(ResampleMethod::Bilinear),
            "CUBIC" => Some(ResampleMethod::Cubic),
            "AVERAGE" => Some(ResampleMethod::Average),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResampleMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResampleMethod::Nearest => write!(f, "NEAREST"),
            ResampleMethod::Bilinear => write!(f, "BILINEAR"),
            ResampleMethod::Cubic => write!(f, "CUBIC"),
            ResampleMethod::Average => write!(f, "AVERAGE"),
        }
    }
}

/// Severity of a message handed to the host.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}
