use crate::pixel::Rgba;

const EPSILON: f32 = 1.0 / 256.0;

/// The 22 blend modes GIMP's XCF format records as a plain integer
/// (spec.md §4.8). Values outside `0..=21` are a forward-compatibility
/// case, not a parse error: they fall back to `Normal` with a logged
/// warning (spec.md §7).
///
/// A tagged enum with an exhaustive match in `composite` replaces what the
/// reference implementation does with per-mode dynamic dispatch; there's
/// no call for a trait object when the whole set is closed and known at
/// compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Normal,
    Dissolve,
    Behind,
    Multiply,
    Screen,
    Overlay,
    Difference,
    Addition,
    Subtract,
    DarkenOnly,
    LightenOnly,
    Hue,
    Saturation,
    Color,
    Value,
    Divide,
    Dodge,
    Burn,
    HardLight,
    SoftLight,
    GrainExtract,
    GrainMerge,
}

impl BlendMode {
    pub(crate) fn new(code: u32) -> Self {
        use BlendMode::*;

        match code {
            0 => Normal,
            1 => Dissolve,
            2 => Behind,
            3 => Multiply,
            4 => Screen,
            5 => Overlay,
            6 => Difference,
            7 => Addition,
            8 => Subtract,
            9 => DarkenOnly,
            10 => LightenOnly,
            11 => Hue,
            12 => Saturation,
            13 => Color,
            14 => Value,
            15 => Divide,
            16 => Dodge,
            17 => Burn,
            18 => HardLight,
            19 => SoftLight,
            20 => GrainExtract,
            21 => GrainMerge,
            other => {
                log::warn!("unknown blend mode {other}, falling back to Normal");
                Normal
            }
        }
    }
}

fn to_unit(v: u8) -> f32 {
    v as f32 / 255.0
}

fn from_unit(v: f32) -> u8 {
    (num_traits::clamp(v, 0.0, 1.0) * 255.0).round() as u8
}

/// Per-channel blend function B(Cb, Cs), everything in `[0, 1]`. Hue,
/// Saturation, Color and Value are non-separable (they mix channels) and
/// are handled separately in `composite_rgb`.
fn blend_channel(mode: BlendMode, cb: f32, cs: f32) -> f32 {
    use BlendMode::*;

    match mode {
        Normal | Dissolve | Behind | Hue | Saturation | Color | Value => cs,
        Multiply => cb * cs,
        Screen => 1.0 - (1.0 - cb) * (1.0 - cs),
        Overlay => {
            if cb <= 0.5 {
                2.0 * cb * cs
            } else {
                1.0 - 2.0 * (1.0 - cb) * (1.0 - cs)
            }
        }
        Difference => (cb - cs).abs(),
        Addition => (cb + cs).min(1.0),
        Subtract => (cb - cs).max(0.0),
        DarkenOnly => cb.min(cs),
        LightenOnly => cb.max(cs),
        Divide => (cb / (cs + EPSILON)).min(1.0),
        Dodge => (cb / (1.0 - cs + EPSILON)).min(1.0),
        Burn => num_traits::clamp(1.0 - (1.0 - cb) / (cs + EPSILON), 0.0, 1.0),
        HardLight => {
            if cs <= 0.5 {
                2.0 * cb * cs
            } else {
                1.0 - 2.0 * (1.0 - cb) * (1.0 - cs)
            }
        }
        SoftLight => {
            if cs <= 0.5 {
                cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
            } else {
                let d = if cb <= 0.25 {
                    ((16.0 * cb - 12.0) * cb + 4.0) * cb
                } else {
                    cb.sqrt()
                };
                cb + (2.0 * cs - 1.0) * (d - cb)
            }
        }
        GrainExtract => num_traits::clamp(cb - cs + 0.5, 0.0, 1.0),
        GrainMerge => num_traits::clamp(cb + cs - 0.5, 0.0, 1.0),
    }
}

fn lum(c: [f32; 3]) -> f32 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

fn clip_color(mut c: [f32; 3]) -> [f32; 3] {
    let l = lum(c);
    let n = c[0].min(c[1]).min(c[2]);
    let x = c[0].max(c[1]).max(c[2]);

    if n < 0.0 {
        for v in &mut c {
            *v = l + (*v - l) * l / (l - n);
        }
    }
    if x > 1.0 {
        for v in &mut c {
            *v = l + (*v - l) * (1.0 - l) / (x - l);
        }
    }
    c
}

fn set_lum(c: [f32; 3], l: f32) -> [f32; 3] {
    let d = l - lum(c);
    clip_color([c[0] + d, c[1] + d, c[2] + d])
}

fn sat(c: [f32; 3]) -> f32 {
    c[0].max(c[1]).max(c[2]) - c[0].min(c[1]).min(c[2])
}

fn set_sat(c: [f32; 3], s: f32) -> [f32; 3] {
    let mut idx = [0usize, 1, 2];
    idx.sort_by(|&a, &b| c[a].partial_cmp(&c[b]).unwrap());
    let (lo, mid, hi) = (idx[0], idx[1], idx[2]);

    let mut out = [0.0f32; 3];
    if c[hi] > c[lo] {
        out[mid] = (c[mid] - c[lo]) * s / (c[hi] - c[lo]);
        out[hi] = s;
    }
    out[lo] = 0.0;
    out
}

/// Computes the blended, non-premultiplied RGB triple before alpha
/// compositing. Hue/Saturation/Color/Value mix channels together and so
/// can't be expressed as three independent `blend_channel` calls.
fn composite_rgb(mode: BlendMode, bg: [f32; 3], fg: [f32; 3]) -> [f32; 3] {
    use BlendMode::*;

    match mode {
        Hue => set_lum(set_sat(fg, sat(bg)), lum(bg)),
        Saturation => set_lum(set_sat(bg, sat(fg)), lum(bg)),
        Color => set_lum(fg, lum(bg)),
        Value => set_lum(bg, lum(fg)),
        _ => [
            blend_channel(mode, bg[0], fg[0]),
            blend_channel(mode, bg[1], fg[1]),
            blend_channel(mode, bg[2], fg[2]),
        ],
    }
}

/// A cheap, deterministic (seed `0`) per-pixel threshold used only by
/// `Dissolve`: position is hashed and compared against the foreground's
/// alpha so the same file always dissolves the same way.
fn dissolve_passes(x: u32, y: u32, alpha: f32) -> bool {
    let h = x
        .wrapping_mul(1_103_515_245)
        .wrapping_add(y.wrapping_mul(12_345))
        .wrapping_add(1);
    let threshold = (h % 256) as f32 / 255.0;
    threshold < alpha
}

/// Composites `fg` over `bg` at `(x, y)`, with `fg`'s own layer opacity
/// already folded into `opacity` (`0..=255`). Implements the general
/// backdrop-compositing formula (straight, non-premultiplied alpha):
///
/// `Co = (1 - as/ar) * Cb + (as/ar) * [(1 - ab) * Cs + ab * B(Cb, Cs)]`
/// `ar = ab + as - ab * as`
///
/// with `as` the foreground's effective alpha (its own alpha times
/// `opacity`) and `ab` the backdrop's alpha. `Behind` only ever paints
/// into already-opaque backdrop, so it skips straight to `bg` wherever
/// the backdrop is transparent.
pub(crate) fn composite(bg: Rgba, fg: Rgba, opacity: u8, mode: BlendMode, x: u32, y: u32) -> Rgba {
    let ab = to_unit(bg.a);
    let mut as_ = to_unit(fg.a) * to_unit(opacity);

    if mode == BlendMode::Dissolve {
        as_ = if dissolve_passes(x, y, as_) { 1.0 } else { 0.0 };
    }

    if mode == BlendMode::Behind && bg.a > 0 {
        return bg;
    }

    let ar = ab + as_ - ab * as_;
    if ar <= 0.0 {
        return Rgba::TRANSPARENT;
    }

    let cb = [to_unit(bg.r), to_unit(bg.g), to_unit(bg.b)];
    let cs = [to_unit(fg.r), to_unit(fg.g), to_unit(fg.b)];
    let blended = composite_rgb(mode, cb, cs);

    let mix = as_ / ar;
    let mut co = [0.0f32; 3];
    for i in 0..3 {
        let mixed_channel = (1.0 - ab) * cs[i] + ab * blended[i];
        co[i] = (1.0 - mix) * cb[i] + mix * mixed_channel;
    }

    Rgba::new(from_unit(co[0]), from_unit(co[1]), from_unit(co[2]), from_unit(ar))
}
