use crate::error::{Error, Result};

/// Per-image color space (glossary: "Base type").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Rgb,
    Grayscale,
    Indexed,
}

impl BaseType {
    pub(crate) fn new(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Rgb),
            1 => Ok(Self::Grayscale),
            2 => Ok(Self::Indexed),
            _ => Err(Error::UnsupportedFormat),
        }
    }
}

/// Per-image sample precision: bit depth crossed with linear/gamma. Twelve
/// codes total (glossary: "Precision codes").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    U8Linear,
    U8Gamma,
    U16Linear,
    U16Gamma,
    U32Linear,
    U32Gamma,
    HalfLinear,
    HalfGamma,
    FloatLinear,
    FloatGamma,
    DoubleLinear,
    DoubleGamma,
}

impl Precision {
    /// The pre-2.10 default, used for files whose version predates the
    /// `PROP_PRECISION` field (spec.md §4.3 step 6).
    pub(crate) const LEGACY_DEFAULT: Self = Self::U8Gamma;

    pub(crate) fn new(code: u32) -> Result<Self> {
        match code {
            100 => Ok(Self::U8Linear),
            150 => Ok(Self::U8Gamma),
            200 => Ok(Self::U16Linear),
            250 => Ok(Self::U16Gamma),
            300 => Ok(Self::U32Linear),
            350 => Ok(Self::U32Gamma),
            500 => Ok(Self::HalfLinear),
            550 => Ok(Self::HalfGamma),
            600 => Ok(Self::FloatLinear),
            650 => Ok(Self::FloatGamma),
            700 => Ok(Self::DoubleLinear),
            750 => Ok(Self::DoubleGamma),
            other => Err(Error::UnsupportedPrecision(other)),
        }
    }

    /// Bytes used to store one channel sample at this precision.
    pub(crate) fn bytes_per_channel(self) -> usize {
        use Precision::*;

        match self {
            U8Linear | U8Gamma => 1,
            U16Linear | U16Gamma | HalfLinear | HalfGamma => 2,
            U32Linear | U32Gamma | FloatLinear | FloatGamma => 4,
            DoubleLinear | DoubleGamma => 8,
        }
    }
}

/// Per-tile compression scheme (spec.md §3, `PROP_COMPRESSION`). `None`
/// tiles are stored as plain, uncompressed byte planes; `Rle` tiles are the
/// GIMP-specific run-length scheme `tile` decodes (spec.md §4.5, "only RLE
/// is implemented"). A code outside the two known values falls back to
/// `Rle`, the long-standing format default, with a warning, the same
/// tolerance policy used for unknown blend modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Rle,
}

impl CompressionType {
    /// Used when the image carries no `PROP_COMPRESSION` property at all.
    pub(crate) const DEFAULT: Self = Self::Rle;

    pub(crate) fn new(code: u8) -> Self {
        match code {
            0 => Self::None,
            1 => Self::Rle,
            other => {
                log::warn!("unknown compression type {other}, assuming RLE");
                Self::Rle
            }
        }
    }
}
