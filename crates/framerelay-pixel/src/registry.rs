use std::fmt;

use crate::convert;
use crate::error::Result;
use crate::normalize::PixelView;

/// Converts a validated pixel view into dense 8-bit RGBA.
pub type ConvertFn = fn(&PixelView<'_>) -> Result<Vec<u8>>;

/// Rewrites canonical RGBA samples in place into the sample order sent
/// downstream.
pub type EmitFn = fn(&mut [u8]);

/// Built-in source pixel layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// `image` / `RGBA`: BGR(A) sample order, swapped to RGB and swapped
    /// back on output.
    Rgba,
    /// `raw` / `*IMAGE_YUV422_8BPP*`: packed UYVY 4:2:2.
    Yuv422,
}

impl PixelLayout {
    pub fn name(self) -> &'static str {
        match self {
            PixelLayout::Rgba => "RGBA",
            PixelLayout::Yuv422 => "YUV422_8BPP",
        }
    }

    /// The registry entry for this layout.
    pub fn descriptor(self) -> LayoutDescriptor {
        match self {
            PixelLayout::Rgba => LayoutDescriptor {
                name: self.name(),
                kind: "image",
                pattern: "RGBA",
                matching: FormatMatch::Exact,
                channels: 4,
                bits_per_pixel: 32,
                convert: convert::rgba_recipe,
                emit: convert::restore_source_order,
            },
            PixelLayout::Yuv422 => LayoutDescriptor {
                name: self.name(),
                kind: "raw",
                pattern: "IMAGE_YUV422_8BPP",
                matching: FormatMatch::Contains,
                channels: 2,
                bits_per_pixel: 16,
                convert: convert::yuv422_recipe,
                emit: convert::keep_canonical_order,
            },
        }
    }
}

/// How a descriptor's pattern is compared to an envelope's `format` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMatch {
    /// `format == pattern`.
    Exact,
    /// `format` contains `pattern` anywhere.
    Contains,
}

/// Describes one source pixel layout and how to convert it.
///
/// `channels` and `bits_per_pixel` are nominal. The envelope's declared bit
/// depth decides the actual sample count per pixel; the conversion rejects
/// counts it cannot handle.
#[derive(Clone, Copy)]
pub struct LayoutDescriptor {
    pub name: &'static str,
    pub kind: &'static str,
    pub pattern: &'static str,
    pub matching: FormatMatch,
    pub channels: u32,
    pub bits_per_pixel: u32,
    pub convert: ConvertFn,
    pub emit: EmitFn,
}

impl LayoutDescriptor {
    /// Whether this descriptor accepts the given envelope tags.
    pub fn matches(&self, kind: &str, format: &str) -> bool {
        if kind != self.kind {
            return false;
        }
        match self.matching {
            FormatMatch::Exact => format == self.pattern,
            FormatMatch::Contains => format.contains(self.pattern),
        }
    }
}

impl fmt::Debug for LayoutDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("pattern", &self.pattern)
            .field("matching", &self.matching)
            .field("channels", &self.channels)
            .field("bits_per_pixel", &self.bits_per_pixel)
            .finish_non_exhaustive()
    }
}

/// Ordered list of layout descriptors. Lookup returns the first match.
#[derive(Debug, Clone)]
pub struct LayoutRegistry {
    descriptors: Vec<LayoutDescriptor>,
}

impl LayoutRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Registry holding the RGBA and YUV 4:2:2 layouts.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(PixelLayout::Rgba.descriptor());
        registry.register(PixelLayout::Yuv422.descriptor());
        registry
    }

    /// Append a descriptor. Earlier entries win on overlapping matches.
    pub fn register(&mut self, descriptor: LayoutDescriptor) {
        tracing::debug!(
            layout = descriptor.name,
            kind = descriptor.kind,
            pattern = descriptor.pattern,
            "registered pixel layout"
        );
        self.descriptors.push(descriptor);
    }

    /// Resolve envelope tags to a layout, if any is known.
    pub fn lookup(&self, kind: &str, format: &str) -> Option<&LayoutDescriptor> {
        self.descriptors.iter().find(|d| d.matches(kind, format))
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayoutDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
