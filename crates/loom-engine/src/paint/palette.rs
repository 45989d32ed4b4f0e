use std::collections::HashMap;

use anyhow::{bail, Context, Result};

use super::Color;

const INITIAL_CAPACITY: usize = 16;

/// Something that names a color.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpec {
    /// A CSS color name (`"steelblue"`) or hex literal (`"#rgb"`, `"#rrggbb"`,
    /// `"#rrggbbaa"`).
    Css(String),
    /// Straight-alpha float components in `[0, 1]`.
    Rgba([f32; 4]),
    Rgba8([u8; 4]),
}

impl From<&str> for ColorSpec {
    fn from(s: &str) -> Self {
        ColorSpec::Css(s.to_string())
    }
}

impl From<String> for ColorSpec {
    fn from(s: String) -> Self {
        ColorSpec::Css(s)
    }
}

impl From<[f32; 3]> for ColorSpec {
    fn from([r, g, b]: [f32; 3]) -> Self {
        ColorSpec::Rgba([r, g, b, 1.0])
    }
}

impl From<[f32; 4]> for ColorSpec {
    fn from(c: [f32; 4]) -> Self {
        ColorSpec::Rgba(c)
    }
}

impl From<[u8; 4]> for ColorSpec {
    fn from(c: [u8; 4]) -> Self {
        ColorSpec::Rgba8(c)
    }
}

impl From<Color> for ColorSpec {
    fn from(c: Color) -> Self {
        ColorSpec::Rgba(c.as_array())
    }
}

impl ColorSpec {
    /// Resolves to straight-alpha RGBA8.
    pub fn to_rgba8(&self) -> Result<[u8; 4]> {
        match self {
            ColorSpec::Css(s) => parse_css(s),
            ColorSpec::Rgba(c) => {
                if c.iter().any(|v| !v.is_finite()) {
                    bail!("non-finite color components {c:?}");
                }
                Ok(Color::rgba(c[0], c[1], c[2], c[3]).to_rgba8())
            }
            ColorSpec::Rgba8(c) => Ok(*c),
        }
    }
}

fn parse_css(s: &str) -> Result<[u8; 4]> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex).with_context(|| format!("invalid hex color `{s}`"));
    }
    let lower = s.to_ascii_lowercase();
    NAMED
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, rgb)| [rgb[0], rgb[1], rgb[2], 255])
        .with_context(|| format!("unknown color name `{s}`"))
}

fn parse_hex(hex: &str) -> Result<[u8; 4]> {
    let digit = |c: u8| -> Result<u8> {
        (c as char)
            .to_digit(16)
            .map(|d| d as u8)
            .context("non-hex digit")
    };
    let b = hex.as_bytes();
    match b.len() {
        3 | 4 => {
            let mut out = [255u8; 4];
            for (i, &c) in b.iter().enumerate() {
                let d = digit(c)?;
                out[i] = d << 4 | d;
            }
            Ok(out)
        }
        6 | 8 => {
            let mut out = [255u8; 4];
            for (i, pair) in b.chunks(2).enumerate() {
                out[i] = digit(pair[0])? << 4 | digit(pair[1])?;
            }
            Ok(out)
        }
        n => bail!("expected 3, 4, 6 or 8 digits, got {n}"),
    }
}

/// Registry of distinct colors, mirrored into a `capacity × 1` texture.
///
/// Index 0 is always the default color. Registering an RGBA8 value that is
/// already present returns its existing index.
pub struct Palette {
    entries: Vec<[u8; 4]>,
    lookup: HashMap<[u8; 4], u32>,
    capacity: usize,
    dirty: bool,

    texture: Option<wgpu::Texture>,
    view: Option<wgpu::TextureView>,
    texture_capacity: usize,
    generation: u64,
}

impl Palette {
    pub fn new(default: Color) -> Self {
        let default = default.to_rgba8();
        let mut lookup = HashMap::new();
        lookup.insert(default, 0);
        Self {
            entries: vec![default],
            lookup,
            capacity: INITIAL_CAPACITY,
            dirty: true,
            texture: None,
            view: None,
            texture_capacity: 0,
            generation: 0,
        }
    }

    /// Returns the palette index for `spec`, adding it if new.
    pub fn register(&mut self, spec: impl Into<ColorSpec>) -> Result<u32> {
        let rgba = spec.into().to_rgba8()?;
        if let Some(&index) = self.lookup.get(&rgba) {
            return Ok(index);
        }

        let index = u32::try_from(self.entries.len()).context("palette index overflow")?;
        if self.entries.len() == self.capacity {
            self.capacity *= 2;
            log::debug!("palette grows to {} entries", self.capacity);
        }
        self.entries.push(rgba);
        self.lookup.insert(rgba, index);
        self.dirty = true;
        Ok(index)
    }

    pub fn get(&self, index: u32) -> Option<[u8; 4]> {
        self.entries.get(index as usize).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bumped whenever the texture is recreated; bind groups holding the old
    /// view must be rebuilt.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.view.as_ref()
    }

    /// Creates or grows the texture and uploads pending entries.
    pub fn ensure_gpu(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<()> {
        if self.texture.is_none() || self.texture_capacity != self.capacity {
            let max = device.limits().max_texture_dimension_2d as usize;
            anyhow::ensure!(
                self.capacity <= max,
                "palette of {} colors exceeds texture limit {max}",
                self.capacity
            );

            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("loom palette"),
                size: wgpu::Extent3d {
                    width: self.capacity as u32,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            self.view = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));
            self.texture = Some(texture);
            self.texture_capacity = self.capacity;
            self.generation += 1;
            self.dirty = true;
        }

        if !self.dirty {
            return Ok(());
        }
        let Some(texture) = self.texture.as_ref() else {
            return Ok(());
        };

        let mut texels = vec![0u8; self.capacity * 4];
        for (i, rgba) in self.entries.iter().enumerate() {
            texels[i * 4..i * 4 + 4].copy_from_slice(rgba);
        }
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &texels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.capacity as u32 * 4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: self.capacity as u32,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        self.dirty = false;
        Ok(())
    }

    /// Releases the texture; the next [`ensure_gpu`](Self::ensure_gpu)
    /// recreates it from the CPU entries.
    pub fn dispose(&mut self) {
        self.view = None;
        self.texture = None;
        self.texture_capacity = 0;
        self.dirty = true;
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(Color::rgb(0.6, 0.6, 0.6))
    }
}

#[rustfmt::skip]
const NAMED: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("lime", [0, 255, 0]),
    ("green", [0, 128, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("cyan", [0, 255, 255]),
    ("aqua", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("fuchsia", [255, 0, 255]),
    ("silver", [192, 192, 192]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("darkgray", [169, 169, 169]),
    ("lightgray", [211, 211, 211]),
    ("maroon", [128, 0, 0]),
    ("olive", [128, 128, 0]),
    ("purple", [128, 0, 128]),
    ("teal", [0, 128, 128]),
    ("navy", [0, 0, 128]),
    ("orange", [255, 165, 0]),
    ("gold", [255, 215, 0]),
    ("pink", [255, 192, 203]),
    ("hotpink", [255, 105, 180]),
    ("crimson", [220, 20, 60]),
    ("tomato", [255, 99, 71]),
    ("coral", [255, 127, 80]),
    ("salmon", [250, 128, 114]),
    ("brown", [165, 42, 42]),
    ("chocolate", [210, 105, 30]),
    ("tan", [210, 180, 140]),
    ("khaki", [240, 230, 140]),
    ("indigo", [75, 0, 130]),
    ("violet", [238, 130, 238]),
    ("orchid", [218, 112, 214]),
    ("plum", [221, 160, 221]),
    ("turquoise", [64, 224, 208]),
    ("skyblue", [135, 206, 235]),
    ("steelblue", [70, 130, 180]),
    ("royalblue", [65, 105, 225]),
    ("dodgerblue", [30, 144, 255]),
    ("slategray", [112, 128, 144]),
    ("seagreen", [46, 139, 87]),
    ("forestgreen", [34, 139, 34]),
    ("limegreen", [50, 205, 50]),
    ("darkgreen", [0, 100, 0]),
    ("darkred", [139, 0, 0]),
    ("darkblue", [0, 0, 139]),
    ("beige", [245, 245, 220]),
    ("ivory", [255, 255, 240]),
    ("lavender", [230, 230, 250]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_css_forms() {
        assert_eq!(ColorSpec::from("#f80").to_rgba8().unwrap(), [255, 136, 0, 255]);
        assert_eq!(ColorSpec::from("#FF8800").to_rgba8().unwrap(), [255, 136, 0, 255]);
        assert_eq!(ColorSpec::from("#ff880080").to_rgba8().unwrap(), [255, 136, 0, 128]);
        assert_eq!(ColorSpec::from("SteelBlue").to_rgba8().unwrap(), [70, 130, 180, 255]);
        assert_eq!(ColorSpec::from([1.0, 0.0, 0.0]).to_rgba8().unwrap(), [255, 0, 0, 255]);
        assert!(ColorSpec::from("#12345").to_rgba8().is_err());
        assert!(ColorSpec::from("#gg0000").to_rgba8().is_err());
        assert!(ColorSpec::from("notacolor").to_rgba8().is_err());
    }

    #[test]
    fn deduplicates_on_rgba8() {
        let mut p = Palette::new(Color::BLACK);
        assert_eq!(p.register("black").unwrap(), 0);
        let red = p.register("red").unwrap();
        assert_eq!(red, 1);
        assert_eq!(p.register("#ff0000").unwrap(), red);
        assert_eq!(p.register([1.0, 0.0, 0.0, 1.0]).unwrap(), red);
        assert_eq!(p.len(), 2);
        assert_eq!(p.get(1), Some([255, 0, 0, 255]));
    }

    #[test]
    fn capacity_doubles_when_full() {
        let mut p = Palette::new(Color::BLACK);
        for i in 1..=16u8 {
            p.register([i, 0, 0, 255]).unwrap();
        }
        assert_eq!(p.len(), 17);
        assert_eq!(p.capacity(), 32);
    }
}
