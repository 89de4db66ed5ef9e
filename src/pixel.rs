use crate::layer::LayerType;

/// An 8-bit-per-channel, straight-alpha pixel. This is the crate's only
/// pixel representation; precision conversion (spec.md §4.5) always lands
/// here before compositing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self { r: 0, g: 0, b: 0, a: 0 };

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

pub(crate) struct PixelConverter;

impl PixelConverter {
    /// Converts a channel-interleaved, already 8-bit buffer (as produced by
    /// `tile::decode_layer_rgba`) into `Rgba` pixels, per the table in
    /// spec.md §4.6. An indexed colormap entry outside `colormap`'s range
    /// (a malformed but survivable file) resolves to opaque black rather
    /// than erroring, matching the tolerant stance spec.md §7 takes for
    /// recoverable oddities elsewhere in the format.
    pub(crate) fn convert(raw: &[u8], mode: LayerType, colormap: &[[u8; 3]]) -> Vec<Rgba> {
        let channels = mode.channel_count();
        raw.chunks_exact(channels)
            .map(|px| match mode {
                LayerType::Rgb => Rgba::new(px[0], px[1], px[2], 255),
                LayerType::Rgba => Rgba::new(px[0], px[1], px[2], px[3]),
                LayerType::Gray => Rgba::new(px[0], px[0], px[0], 255),
                LayerType::GrayAlpha => Rgba::new(px[0], px[0], px[0], px[1]),
                LayerType::Indexed => {
                    let [r, g, b] = indexed_lookup(colormap, px[0]);
                    Rgba::new(r, g, b, 255)
                }
                LayerType::IndexedAlpha => {
                    let [r, g, b] = indexed_lookup(colormap, px[0]);
                    Rgba::new(r, g, b, px[1])
                }
            })
            .collect()
    }
}

fn indexed_lookup(colormap: &[[u8; 3]], index: u8) -> [u8; 3] {
    colormap.get(index as usize).copied().unwrap_or([0, 0, 0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_gets_opaque_alpha() {
        let raw = [10, 20, 30];
        let pixels = PixelConverter::convert(&raw, LayerType::Rgb, &[]);
        assert_eq!(pixels, vec![Rgba::new(10, 20, 30, 255)]);
    }

    #[test]
    fn grayscale_expands_to_equal_rgb_channels() {
        let raw = [128, 64];
        let pixels = PixelConverter::convert(&raw, LayerType::GrayAlpha, &[]);
        assert_eq!(pixels, vec![Rgba::new(128, 128, 128, 64)]);
    }

    #[test]
    fn indexed_resolves_through_colormap() {
        let colormap = [[1, 2, 3], [4, 5, 6]];
        let raw = [1u8];
        let pixels = PixelConverter::convert(&raw, LayerType::Indexed, &colormap);
        assert_eq!(pixels, vec![Rgba::new(4, 5, 6, 255)]);
    }

    #[test]
    fn indexed_out_of_range_is_opaque_black() {
        let raw = [99u8, 200];
        let pixels = PixelConverter::convert(&raw, LayerType::IndexedAlpha, &[]);
        assert_eq!(pixels, vec![Rgba::new(0, 0, 0, 200)]);
    }
}
