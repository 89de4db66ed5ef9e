use crate::blend::BlendMode;
use crate::cursor::ByteCursor;
use crate::error::Result;
use crate::property::{Property, PropertyReader};

/// Pixel layout a layer's tiles are stored in (spec.md §4.4 step 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    Rgb,
    Rgba,
    Gray,
    GrayAlpha,
    Indexed,
    IndexedAlpha,
}

impl LayerType {
    pub(crate) fn new(code: u32) -> Result<Self> {
        use LayerType::*;

        match code {
            0 => Ok(Rgb),
            1 => Ok(Rgba),
            2 => Ok(Gray),
            3 => Ok(GrayAlpha),
            4 => Ok(Indexed),
            5 => Ok(IndexedAlpha),
            _ => Err(crate::error::Error::UnsupportedFormat),
        }
    }

    pub(crate) fn channel_count(self) -> usize {
        use LayerType::*;

        match self {
            Rgb => 3,
            Rgba => 4,
            Gray => 1,
            GrayAlpha => 2,
            Indexed => 1,
            IndexedAlpha => 2,
        }
    }
}

/// One layer record: its own bounds and pixel format, plus everything its
/// property list carries (spec.md §4.4). Compiled eagerly when the file is
/// parsed rather than lazily on first access: the whole point of this
/// crate is to flatten the file into pixels, and there's no caller that
/// benefits from deferring a parse step that small.
#[derive(Debug, Clone)]
pub struct Layer {
    /// The name exactly as stored in the file.
    pub name: String,
    /// `name` with trailing `" copy"` / `" #N"` duplication suffixes
    /// stripped (spec.md §4.4, "Name canonicalization").
    pub canonical_name: String,
    /// `canonical_name` joined with its ancestor group names; filled in by
    /// the hierarchy builder once the whole layer list is known.
    pub qualified_name: String,
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
    pub color_mode: LayerType,
    pub blend_mode: BlendMode,
    pub opacity: u8,
    pub visible: bool,
    pub is_group: bool,
    pub item_path: Vec<u32>,
    pub(crate) parasites: Vec<crate::property::Parasite>,
    pub(crate) hierarchy_ptr: u64,
    pub(crate) mask_ptr: u64,
}

impl Layer {
    pub(crate) fn parse(cursor: &mut ByteCursor<'_>, version: u32) -> Result<Self> {
        let width = cursor.read_u32()?;
        let height = cursor.read_u32()?;
        let color_mode = LayerType::new(cursor.read_u32()?)?;

        let name_len = cursor.read_u32()? as usize;
        let name = cursor.read_fixed_str(name_len)?;

        let properties = PropertyReader::read_all(cursor)?;

        let hierarchy_ptr = cursor.read_pointer(version)?;
        let mask_ptr = cursor.read_pointer(version)?;
        if mask_ptr != 0 {
            log::warn!("layer '{name}' carries a mask, which this crate never composites");
        }

        let mut blend_mode = BlendMode::new(0);
        let mut opacity_u32: u32 = 255;
        let mut float_opacity: Option<f32> = None;
        let mut visible = true;
        let mut is_group = false;
        let mut item_path = Vec::new();
        let mut x = 0i32;
        let mut y = 0i32;
        let mut parasites = Vec::new();

        for prop in properties {
            match prop {
                Property::Mode(m) => blend_mode = BlendMode::new(m),
                Property::Opacity(o) => opacity_u32 = o,
                Property::FloatOpacity(o) => float_opacity = Some(o),
                Property::Visible(v) => visible = v,
                Property::GroupItem => is_group = true,
                Property::ItemPath(path) => item_path = path,
                Property::Offsets(dx, dy) => {
                    x = dx;
                    y = dy;
                }
                Property::Parasites(mut found) => parasites.append(&mut found),
                _ => {}
            }
        }

        // FLOAT_OPACITY overrides the legacy OPACITY field when both are
        // present, since it's the one GIMP itself keeps current.
        let opacity = match float_opacity {
            Some(o) => (num_traits::clamp(o, 0.0, 1.0) * 255.0).round() as u8,
            None => opacity_u32.min(255) as u8,
        };

        let canonical_name = canonicalize_name(&name);

        Ok(Self {
            qualified_name: canonical_name.clone(),
            canonical_name,
            name,
            width,
            height,
            x,
            y,
            color_mode,
            blend_mode,
            opacity,
            visible,
            is_group,
            item_path,
            parasites,
            hierarchy_ptr,
            mask_ptr,
        })
    }

    /// The raw bytes of the first parasite named `name`, if the layer
    /// carries one (e.g. `"gimp-text-layer"` for a text layer's source
    /// markup).
    pub fn parasite(&self, name: &str) -> Option<&[u8]> {
        self.parasites
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    /// Decodes this layer's own pixels and writes them into `sink`, either
    /// at the layer's own canvas offset (`with_offset = true`) or flush
    /// against the sink's origin. Writes outside the sink's bounds are
    /// silently clipped (spec.md §6).
    pub fn make_image(
        &self,
        buf: &[u8],
        version: u32,
        precision: crate::format::Precision,
        compression: crate::format::CompressionType,
        colormap: &[[u8; 3]],
        sink: &mut dyn crate::render::Sink,
        with_offset: bool,
    ) -> Result<()> {
        let pixels =
            crate::tile::decode_layer_rgba(buf, version, precision, compression, self, colormap)?;
        let (ox, oy) = if with_offset { (self.x, self.y) } else { (0, 0) };
        let (sink_w, sink_h) = sink.dimensions();

        for j in 0..self.height {
            for i in 0..self.width {
                let dx = ox + i as i32;
                let dy = oy + j as i32;
                if dx < 0 || dy < 0 {
                    continue;
                }
                let (dx, dy) = (dx as u32, dy as u32);
                if dx >= sink_w || dy >= sink_h {
                    continue;
                }
                sink.set(dx, dy, pixels[(j * self.width + i) as usize]);
            }
        }

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn test_default() -> Self {
        Self {
            name: "test".into(),
            canonical_name: "test".into(),
            qualified_name: "test".into(),
            width: 0,
            height: 0,
            x: 0,
            y: 0,
            color_mode: LayerType::Rgb,
            blend_mode: BlendMode::new(0),
            opacity: 255,
            visible: true,
            is_group: false,
            item_path: Vec::new(),
            parasites: Vec::new(),
            hierarchy_ptr: 0,
            mask_ptr: 0,
        }
    }
}

/// Strips trailing `" copy"` repeats and `" #N"` duplicate-numbering
/// suffixes GIMP appends when a layer is duplicated (e.g. `"Background
/// copy #2"` -> `"Background"`).
pub(crate) fn canonicalize_name(name: &str) -> String {
    let mut s = name.trim_end();

    loop {
        if let Some(stripped) = s.strip_suffix(" copy") {
            s = stripped.trim_end();
            continue;
        }

        if let Some(pos) = s.rfind(" #") {
            let digits = &s[pos + 2..];
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                s = s[..pos].trim_end();
                continue;
            }
        }

        break;
    }

    s.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_copy_suffix() {
        assert_eq!(canonicalize_name("Background copy"), "Background");
    }

    #[test]
    fn strips_copy_and_numbered_suffix() {
        assert_eq!(canonicalize_name("Background copy #3"), "Background");
    }

    #[test]
    fn strips_repeated_copy_suffixes() {
        assert_eq!(canonicalize_name("Layer copy copy"), "Layer");
    }

    #[test]
    fn leaves_unrelated_hash_suffixes_alone() {
        assert_eq!(canonicalize_name("Issue #42"), "Issue #42");
    }

    fn layer_bytes(name: &str, width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&width.to_be_bytes());
        buf.extend_from_slice(&height.to_be_bytes());
        buf.extend_from_slice(&1u32.to_be_bytes()); // RGBA

        let name_bytes = [name.as_bytes(), b"\0"].concat();
        buf.extend_from_slice(&(name_bytes.len() as u32).to_be_bytes());
        buf.extend_from_slice(&name_bytes);

        // OPACITY = 128
        buf.extend_from_slice(&6u32.to_be_bytes());
        buf.extend_from_slice(&4u32.to_be_bytes());
        buf.extend_from_slice(&128u32.to_be_bytes());
        // property list END
        buf.extend_from_slice(&0u32.to_be_bytes());
        buf.extend_from_slice(&0u32.to_be_bytes());

        buf.extend_from_slice(&0u32.to_be_bytes()); // hierarchy_ptr
        buf.extend_from_slice(&0u32.to_be_bytes()); // mask_ptr
        buf
    }

    #[test]
    fn parses_name_and_opacity() {
        let bytes = layer_bytes("Background copy", 10, 20);
        let mut cursor = ByteCursor::new(&bytes);
        let layer = Layer::parse(&mut cursor, 3).unwrap();

        assert_eq!(layer.name, "Background copy");
        assert_eq!(layer.canonical_name, "Background");
        assert_eq!(layer.width, 10);
        assert_eq!(layer.height, 20);
        assert_eq!(layer.opacity, 128);
        assert_eq!(layer.color_mode, LayerType::Rgba);
    }

    #[test]
    fn float_opacity_overrides_legacy_opacity() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes()); // RGB
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.push(0); // empty name

        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&4u32.to_be_bytes());
        bytes.extend_from_slice(&255u32.to_be_bytes()); // OPACITY = 255

        bytes.extend_from_slice(&33u32.to_be_bytes());
        bytes.extend_from_slice(&4u32.to_be_bytes());
        bytes.extend_from_slice(&0.25f32.to_be_bytes()); // FLOAT_OPACITY = 0.25

        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());

        let mut cursor = ByteCursor::new(&bytes);
        let layer = Layer::parse(&mut cursor, 3).unwrap();
        assert_eq!(layer.opacity, 64); // round(0.25 * 255) = 64
    }
}
