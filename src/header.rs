use crate::cursor::ByteCursor;
use crate::error::{Error, Result};
use crate::format::{BaseType, Precision};
use crate::property::{Property, PropertyReader};

const MAGIC: &[u8; 9] = b"gimp xcf ";

/// The parsed image-level header: magic/version, dimensions, color mode,
/// precision, image-level properties, and the two pointer lists that
/// bottom out the file's tree of layers and channels (spec.md §4.3).
pub(crate) struct Header {
    pub(crate) version: u32,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) base_type: BaseType,
    pub(crate) precision: Precision,
    pub(crate) properties: Vec<Property>,
    pub(crate) layer_ptrs: Vec<u64>,
    pub(crate) channel_ptrs: Vec<u64>,
}

impl Header {
    pub(crate) fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let magic = cursor.read_bytes(MAGIC.len())?;
        if magic != MAGIC {
            return Err(Error::UnsupportedFormat);
        }

        let version_tag = cursor.read_bytes(4)?;
        let version = parse_version(version_tag)?;

        // Padding byte following the version tag.
        let _ = cursor.read_u8()?;

        let width = cursor.read_u32()?;
        let height = cursor.read_u32()?;
        let base_type = BaseType::new(cursor.read_u32()?)?;

        let precision = if version >= 4 {
            Precision::new(cursor.read_u32()?)?
        } else {
            Precision::LEGACY_DEFAULT
        };

        let properties = PropertyReader::read_all(cursor)?;

        let layer_ptrs = read_pointer_list(cursor, version)?;
        let channel_ptrs = read_pointer_list(cursor, version)?;

        Ok(Self {
            version,
            width,
            height,
            base_type,
            precision,
            properties,
            layer_ptrs,
            channel_ptrs,
        })
    }
}

/// `"file"` is v000; `"vNNN"` is parsed as a decimal. Versions above the
/// twelve documented ones are accepted conservatively, since the record
/// shape doesn't change (spec.md §4.3 step 2).
fn parse_version(tag: &[u8]) -> Result<u32> {
    if tag == b"file" {
        return Ok(0);
    }

    if tag[0] != b'v' {
        return Err(Error::UnsupportedFormat);
    }

    std::str::from_utf8(&tag[1..])
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or(Error::UnsupportedFormat)
}

fn read_pointer_list(cursor: &mut ByteCursor<'_>, version: u32) -> Result<Vec<u64>> {
    let mut ptrs = Vec::new();

    loop {
        let ptr = cursor.read_pointer(version)?;
        if ptr == 0 {
            break;
        }
        ptrs.push(ptr);
    }

    Ok(ptrs)
}
