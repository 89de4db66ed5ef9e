use crate::cursor::ByteCursor;
use crate::error::{Error, Result};

/// A single parsed property from a property list (spec-level term:
/// "property-list"). Unknown types are retained as opaque bytes so that
/// callers stay forward-compatible with files written by newer GIMP
/// versions, per the tolerance policy in spec.md §7.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Property {
    Colormap(Vec<[u8; 3]>),
    Opacity(u32),
    Mode(u32),
    Visible(bool),
    /// Types 10-14: mask/alpha-lock booleans. GIMP never needed distinct
    /// Rust-level behavior for these five beyond "a flag"; the original
    /// type code is kept for callers who care which flag it was.
    Flag(u32, bool),
    Offsets(i32, i32),
    Compression(u8),
    Parasites(Vec<Parasite>),
    GroupItem,
    ItemPath(Vec<u32>),
    FloatOpacity(f32),
    Unknown(u32, Box<[u8]>),
}

/// A named, opaque metadata blob attached to an image or layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Parasite {
    pub(crate) name: String,
    pub(crate) flags: u32,
    pub(crate) data: Vec<u8>,
}

/// Types whose payload has a shape PropertyReader understands and pre-parses
/// into a `Parasite` list. Parasite payload shape: `(u32 name-len, name
/// asciiz, u32 flags, u32 data-len, bytes)` repeated until the property's
/// declared length is exhausted.
fn read_parasites(payload: &[u8]) -> Result<Vec<Parasite>> {
    let mut cursor = ByteCursor::new(payload);
    let mut parasites = Vec::new();

    while cursor.position() < payload.len() as u64 {
        let name_len = cursor.read_u32()? as usize;
        let name = cursor.read_fixed_str(name_len)?;
        let flags = cursor.read_u32()?;
        let data_len = cursor.read_u32()? as usize;
        let data = cursor.read_bytes(data_len)?.to_vec();

        parasites.push(Parasite { name, flags, data });
    }

    Ok(parasites)
}

pub(crate) struct PropertyReader;

impl PropertyReader {
    /// Reads properties until a `type = 0` (END) terminator, dispatching by
    /// type per the table in spec.md §4.2. Every property's payload is
    /// consumed by exactly `length` bytes, whether or not the type was
    /// recognized, so a parser error in one property never desyncs the
    /// cursor for the rest of the list.
    pub(crate) fn read_all(cursor: &mut ByteCursor<'_>) -> Result<Vec<Property>> {
        let mut properties = Vec::new();

        loop {
            let ptype = cursor.read_u32()?;
            let length = cursor.read_u32()? as usize;

            if ptype == 0 {
                break;
            }

            let payload = cursor.read_bytes(length)?;
            properties.push(Self::parse_one(ptype, payload)?);
        }

        Ok(properties)
    }

    fn parse_one(ptype: u32, payload: &[u8]) -> Result<Property> {
        let mut cursor = ByteCursor::new(payload);

        Ok(match ptype {
            1 => {
                let n = cursor.read_u32()? as usize;
                let mut entries = Vec::with_capacity(n);
                for _ in 0..n {
                    let r = cursor.read_u8()?;
                    let g = cursor.read_u8()?;
                    let b = cursor.read_u8()?;
                    entries.push([r, g, b]);
                }
                Property::Colormap(entries)
            }
            6 => {
                if payload.len() < 4 {
                    return Err(Error::MalformedProperty("OPACITY needs 4 bytes"));
                }
                Property::Opacity(cursor.read_u32()?)
            }
            7 => Property::Mode(cursor.read_u32()?),
            8 => Property::Visible(cursor.read_u32()? != 0),
            10..=14 => Property::Flag(ptype, cursor.read_u32()? != 0),
            15 => {
                let dx = cursor.read_i32()?;
                let dy = cursor.read_i32()?;
                Property::Offsets(dx, dy)
            }
            17 => Property::Compression(cursor.read_u8()?),
            21 => Property::Parasites(read_parasites(payload)?),
            29 => Property::GroupItem,
            30 => {
                if payload.len() % 4 != 0 {
                    return Err(Error::MalformedProperty("ITEM_PATH length not a multiple of 4"));
                }
                let mut path = Vec::with_capacity(payload.len() / 4);
                for _ in 0..payload.len() / 4 {
                    path.push(cursor.read_u32()?);
                }
                Property::ItemPath(path)
            }
            33 => Property::FloatOpacity(cursor.read_f32()?),
            other => {
                log::warn!("unknown property type {other}, keeping {} opaque bytes", payload.len());
                Property::Unknown(other, payload.into())
            }
        })
    }
}
