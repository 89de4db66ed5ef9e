use std::collections::HashSet;

use crate::error::Result;
use crate::pixel::Rgba;

/// A destination for flattened pixels. `fill_rect` and `raw_rgba` have
/// default implementations built on `get`/`set`; a `Sink` that can do
/// better (a contiguous RGBA buffer, say) overrides them for speed.
pub trait Sink {
    fn dimensions(&self) -> (u32, u32);
    fn get(&self, x: u32, y: u32) -> Rgba;
    fn set(&mut self, x: u32, y: u32, pixel: Rgba);

    fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, pixel: Rgba) {
        for j in 0..height {
            for i in 0..width {
                self.set(x + i, y + j, pixel);
            }
        }
    }

    /// A fast path for sinks backed by a packed RGBA byte buffer. Returns
    /// `None` by default, which tells `render` to fall back to `set`.
    fn raw_rgba(&mut self) -> Option<&mut [u8]> {
        None
    }
}

/// Which layers `render` should composite. `FileDefined` honors each
/// layer's own `VISIBLE` property; `Only` overrides every layer's
/// visibility with an explicit index set (spec.md §4.9).
#[derive(Debug, Clone)]
pub enum Visibility {
    FileDefined,
    Only(HashSet<usize>),
}

impl Visibility {
    fn is_visible(&self, index: usize, file_defined: bool) -> bool {
        match self {
            Visibility::FileDefined => file_defined,
            Visibility::Only(indices) => indices.contains(&index),
        }
    }
}

/// Flattens every visible, non-group, non-zero-opacity layer onto `sink`,
/// composited in reverse file order (the file stores layers top-to-bottom;
/// the backdrop is built up from the bottom, so layers are visited back to
/// front) (spec.md §4.9). A single reused scratch buffer holds one layer's
/// decoded pixels at a time.
pub(crate) fn render(
    buf: &[u8],
    version: u32,
    precision: crate::format::Precision,
    compression: crate::format::CompressionType,
    width: u32,
    height: u32,
    layers: &[crate::layer::Layer],
    colormap: &[[u8; 3]],
    sink: &mut dyn Sink,
    visibility: &Visibility,
) -> Result<()> {
    for (index, layer) in layers.iter().enumerate().rev() {
        if layer.is_group {
            continue;
        }
        if layer.opacity == 0 {
            continue;
        }
        if !visibility.is_visible(index, layer.visible) {
            continue;
        }

        let pixels =
            crate::tile::decode_layer_rgba(buf, version, precision, compression, layer, colormap)?;

        for j in 0..layer.height {
            for i in 0..layer.width {
                let dx = layer.x + i as i32;
                let dy = layer.y + j as i32;
                if dx < 0 || dy < 0 {
                    continue;
                }
                let (dx, dy) = (dx as u32, dy as u32);
                if dx >= width || dy >= height {
                    continue;
                }

                let fg = pixels[(j * layer.width + i) as usize];
                if fg.a == 0 {
                    continue;
                }

                let bg = sink.get(dx, dy);
                let composited =
                    crate::blend::composite(bg, fg, layer.opacity, layer.blend_mode, dx, dy);
                sink.set(dx, dy, composited);
            }
        }
    }

    Ok(())
}
