//! Hand-built XCF byte buffers for the end-to-end scenarios in
//! `tests/`. There is no bundled binary fixture, so every scenario
//! constructs its own minimal-but-real file: a header, one or more
//! layers each with their own hierarchy/level/tile records, tile data
//! RLE-encoded the same way a real GIMP export would be.

pub const TILE_EDGE: u32 = 64;

pub struct LayerSpec {
    pub name: &'static str,
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
    pub layer_type: u32,
    pub fill: Vec<u8>, // one value per channel, repeated for every pixel
    pub opacity: u32,
    pub visible: bool,
    pub is_group: bool,
    pub item_path: Vec<u32>,
    pub mode: u32,
    pub parasite: Option<(&'static str, &'static [u8])>,
}

impl LayerSpec {
    pub fn solid(name: &'static str, width: u32, height: u32, layer_type: u32, fill: Vec<u8>) -> Self {
        Self {
            name,
            width,
            height,
            x: 0,
            y: 0,
            layer_type,
            fill,
            opacity: 255,
            visible: true,
            is_group: false,
            item_path: Vec::new(),
            mode: 0,
            parasite: None,
        }
    }

    pub fn group(name: &'static str, item_path: Vec<u32>) -> Self {
        Self {
            name,
            width: 0,
            height: 0,
            x: 0,
            y: 0,
            layer_type: 1,
            fill: Vec::new(),
            opacity: 255,
            visible: true,
            is_group: true,
            item_path,
            mode: 0,
            parasite: None,
        }
    }

    pub fn with_parasite(mut self, name: &'static str, data: &'static [u8]) -> Self {
        self.parasite = Some((name, data));
        self
    }
}

struct Builder {
    buf: Vec<u8>,
}

impl Builder {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn pos(&self) -> u64 {
        self.buf.len() as u64
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn u64_at(&mut self) -> usize {
        let at = self.buf.len();
        self.buf.extend_from_slice(&0u64.to_be_bytes());
        at
    }

    fn patch_u64(&mut self, at: usize, value: u64) {
        self.buf[at..at + 8].copy_from_slice(&value.to_be_bytes());
    }

    fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    fn cstr(&mut self, s: &str) {
        self.u32((s.len() + 1) as u32);
        self.bytes(s.as_bytes());
        self.u8(0);
    }

    /// One channel plane, RLE-encoded as a single long fill run.
    fn rle_fill_plane(&mut self, value: u8, count: u32) {
        self.u8(128);
        self.u16(count as u16);
        self.u8(value);
    }
}

/// Builds a v011 RGB/RGBA image (or, when `colormap` is non-empty,
/// an indexed image) out of the given layers, every layer's pixel data
/// filled solid per its `fill` spec.
pub fn build_xcf(
    width: u32,
    height: u32,
    base_type: u32,
    precision: u32,
    colormap: &[[u8; 3]],
    layers: &[LayerSpec],
) -> Vec<u8> {
    let mut b = Builder::new();

    b.bytes(b"gimp xcf ");
    b.bytes(b"v011");
    b.u8(0);
    b.u32(width);
    b.u32(height);
    b.u32(base_type);
    b.u32(precision);

    if !colormap.is_empty() {
        b.u32(1); // PROP_COLORMAP
        b.u32(4 + colormap.len() as u32 * 3);
        b.u32(colormap.len() as u32);
        for [r, g, bl] in colormap {
            b.u8(*r);
            b.u8(*g);
            b.u8(*bl);
        }
    }
    b.u32(0); // property-list END
    b.u32(0);

    let layer_ptr_patches: Vec<usize> = layers.iter().map(|_| b.u64_at()).collect();
    b.u64_at(); // layer list terminator

    b.u64_at(); // channel list terminator (no channels)

    let bytes_per_channel = match precision {
        100 | 150 => 1,
        200 | 250 => 2,
        300 | 350 | 600 | 650 => 4,
        _ => 1,
    };

    for (spec, patch_at) in layers.iter().zip(layer_ptr_patches) {
        let layer_offset = b.pos();
        b.patch_u64(patch_at, layer_offset);

        b.u32(spec.width);
        b.u32(spec.height);
        b.u32(spec.layer_type);
        b.cstr(spec.name);

        // OPACITY
        b.u32(6);
        b.u32(4);
        b.u32(spec.opacity);

        // VISIBLE
        b.u32(8);
        b.u32(4);
        b.u32(spec.visible as u32);

        // MODE
        b.u32(7);
        b.u32(4);
        b.u32(spec.mode);

        if spec.is_group {
            b.u32(29); // GROUP_ITEM
            b.u32(0);
        }

        if !spec.item_path.is_empty() {
            b.u32(30); // ITEM_PATH
            b.u32(spec.item_path.len() as u32 * 4);
            for p in &spec.item_path {
                b.u32(*p);
            }
        }

        if let Some((name, data)) = spec.parasite {
            let mut payload = Vec::new();
            payload.extend_from_slice(&(name.len() as u32 + 1).to_be_bytes());
            payload.extend_from_slice(name.as_bytes());
            payload.push(0);
            payload.extend_from_slice(&0u32.to_be_bytes()); // flags
            payload.extend_from_slice(&(data.len() as u32).to_be_bytes());
            payload.extend_from_slice(data);

            b.u32(21); // PARASITES
            b.u32(payload.len() as u32);
            b.bytes(&payload);
        }

        b.u32(0); // property-list END
        b.u32(0);

        let hierarchy_patch = b.u64_at();
        b.u64_at(); // mask_ptr = 0

        if spec.is_group {
            continue;
        }

        let hierarchy_offset = b.pos();
        b.patch_u64(hierarchy_patch, hierarchy_offset);

        let channels = spec.fill.len().max(1);
        b.u32(spec.width);
        b.u32(spec.height);
        b.u32((channels * bytes_per_channel) as u32);
        let level_patch = b.u64_at();

        let level_offset = b.pos();
        b.patch_u64(level_patch, level_offset);
        b.u32(spec.width);
        b.u32(spec.height);

        let tiles_across = spec.width.div_ceil(TILE_EDGE).max(1);
        let tiles_down = spec.height.div_ceil(TILE_EDGE).max(1);
        let tile_count = tiles_across * tiles_down;

        let tile_patches: Vec<usize> = (0..tile_count).map(|_| b.u64_at()).collect();
        b.u64_at(); // tile list terminator

        for (k, patch_at) in tile_patches.into_iter().enumerate() {
            let tx = (k as u32 % tiles_across) * TILE_EDGE;
            let ty = (k as u32 / tiles_across) * TILE_EDGE;
            let tile_w = (spec.width - tx).min(TILE_EDGE);
            let tile_h = (spec.height - ty).min(TILE_EDGE);
            let tile_pixels = tile_w * tile_h;

            let tile_offset = b.pos();
            b.patch_u64(patch_at, tile_offset);

            for &value in &spec.fill {
                for byte_index in 0..bytes_per_channel {
                    // Every byte of a multi-byte sample gets the same
                    // fill value; real precision conversion only ever
                    // reads the high byte back out in this crate, so
                    // this is enough to exercise the full width.
                    let _ = byte_index;
                    b.rle_fill_plane(value, tile_pixels);
                }
            }
        }
    }

    b.buf
}

pub struct Canvas {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<xcf::Rgba>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![xcf::Rgba::TRANSPARENT; (width * height) as usize],
        }
    }

    pub fn at(&self, x: u32, y: u32) -> xcf::Rgba {
        self.pixels[(y * self.width + x) as usize]
    }
}

impl xcf::Sink for Canvas {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn get(&self, x: u32, y: u32) -> xcf::Rgba {
        self.at(x, y)
    }

    fn set(&mut self, x: u32, y: u32, pixel: xcf::Rgba) {
        self.pixels[(y * self.width + x) as usize] = pixel;
    }
}
