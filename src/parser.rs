use linked_hash_map::LinkedHashMap;

use crate::cursor::ByteCursor;
use crate::error::Result;
use crate::format::{BaseType, CompressionType, Precision};
use crate::header::Header;
use crate::hierarchy::Hierarchy;
use crate::layer::Layer;
use crate::property::Property;
use crate::render::{self, Sink, Visibility};

/// A parsed XCF buffer: image-level metadata, every layer compiled eagerly
/// into a `Layer`, and the group tree reconstructed from their item paths.
/// Borrows the input buffer for the lifetime of the parse (layers are
/// compiled once, up front, so nothing needs to hold onto it afterward).
pub struct Parser<'a> {
    buf: &'a [u8],
    version: u32,
    width: u32,
    height: u32,
    base_type: BaseType,
    precision: Precision,
    compression_type: CompressionType,
    colormap: Vec<[u8; 3]>,
    layers: Vec<Layer>,
    hierarchy: Hierarchy,
    /// Maps both canonical and qualified names to a layer index, in
    /// file order, so `layer_by_name` doesn't need a linear scan. A
    /// `LinkedHashMap` rather than a plain `HashMap` so that a caller
    /// iterating it (not currently exposed, but kept this way since
    /// nothing here needs hash-order chaos) would see files' own layer
    /// order.
    name_index: LinkedHashMap<String, usize>,
    /// Channel (saved-selection) records exist in the file but are out of
    /// scope here; only their count survives parsing.
    channel_count: usize,
}

impl<'a> Parser<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        let mut cursor = ByteCursor::new(buf);
        let header = Header::parse(&mut cursor)?;

        let colormap = header
            .properties
            .iter()
            .find_map(|p| match p {
                Property::Colormap(entries) => Some(entries.clone()),
                _ => None,
            })
            .unwrap_or_default();

        let compression_type = header
            .properties
            .iter()
            .find_map(|p| match p {
                Property::Compression(code) => Some(CompressionType::new(*code)),
                _ => None,
            })
            .unwrap_or(CompressionType::DEFAULT);

        let mut layers = Vec::with_capacity(header.layer_ptrs.len());
        for &ptr in &header.layer_ptrs {
            let mut layer_cursor = ByteCursor::at(buf, ptr)?;
            layers.push(Layer::parse(&mut layer_cursor, header.version)?);
        }

        let hierarchy = crate::hierarchy::build(&mut layers);

        let mut name_index = LinkedHashMap::new();
        for (index, layer) in layers.iter().enumerate() {
            if !name_index.contains_key(&layer.canonical_name) {
                name_index.insert(layer.canonical_name.clone(), index);
            }
            if !name_index.contains_key(&layer.qualified_name) {
                name_index.insert(layer.qualified_name.clone(), index);
            }
        }

        Ok(Self {
            buf,
            version: header.version,
            width: header.width,
            height: header.height,
            base_type: header.base_type,
            precision: header.precision,
            compression_type,
            colormap,
            layers,
            hierarchy,
            name_index,
            channel_count: header.channel_ptrs.len(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn base_type(&self) -> BaseType {
        self.base_type
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn compression_type(&self) -> CompressionType {
        self.compression_type
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn colormap(&self) -> &[[u8; 3]] {
        &self.colormap
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn layer_by_index(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_by_name(&self, name: &str) -> Option<&Layer> {
        self.name_index.get(name).and_then(|&i| self.layers.get(i))
    }

    /// Flattens the image onto `sink`, compositing every visible, non-group
    /// layer back to front (spec.md §4.9).
    pub fn render(&self, sink: &mut dyn Sink, visibility: Visibility) -> Result<()> {
        render::render(
            self.buf,
            self.version,
            self.precision,
            self.compression_type,
            self.width,
            self.height,
            &self.layers,
            &self.colormap,
            sink,
            &visibility,
        )
    }
}
