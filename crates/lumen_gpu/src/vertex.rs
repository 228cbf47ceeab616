//! Vertex layouts and shape descriptors

use bytemuck::{Pod, Zeroable};
use lumen_core::{Color, Rect};

/// Position + color vertex
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ColoredVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

/// Position + color + texture coordinate vertex
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TexturedVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub uv: [f32; 2],
}

/// Vertex layout of a buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    PositionColored,
    PositionColoredTextured,
}

impl VertexFormat {
    /// Size in bytes of one vertex
    pub const fn stride(self) -> usize {
        match self {
            VertexFormat::PositionColored => std::mem::size_of::<ColoredVertex>(),
            VertexFormat::PositionColoredTextured => std::mem::size_of::<TexturedVertex>(),
        }
    }
}

/// Primitive topology
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    #[default]
    TriangleList,
    TriangleStrip,
    LineList,
}

/// What a cached asset must look like to be reused
///
/// An asset whose descriptor differs from the requested one is replaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShapeDescriptor {
    pub vertex_count: u32,
    pub format: VertexFormat,
    pub primitive: PrimitiveType,
    /// Size of an attached render-target texture, if any
    pub texture: Option<(u32, u32)>,
}

impl ShapeDescriptor {
    pub fn vertices(vertex_count: u32, format: VertexFormat, primitive: PrimitiveType) -> Self {
        Self {
            vertex_count,
            format,
            primitive,
            texture: None,
        }
    }

    /// A texture with no vertex buffer
    pub fn texture(width: u32, height: u32) -> Self {
        Self {
            vertex_count: 0,
            format: VertexFormat::PositionColoredTextured,
            primitive: PrimitiveType::TriangleList,
            texture: Some((width, height)),
        }
    }

    pub fn with_texture(mut self, width: u32, height: u32) -> Self {
        self.texture = Some((width, height));
        self
    }

    /// Bytes needed for the vertex buffer
    pub fn buffer_size(&self) -> usize {
        self.vertex_count as usize * self.format.stride()
    }

    /// Bytes needed for the texture, at four bytes per texel
    pub fn texture_size(&self) -> usize {
        self.texture
            .map(|(w, h)| w as usize * h as usize * 4)
            .unwrap_or(0)
    }
}

/// Two triangles covering `rect`
pub fn quad_colored(rect: &Rect, color: Color) -> [ColoredVertex; 6] {
    let c = color.to_array();
    let [tl, tr, br, bl] = rect.corners().map(|p| [p.x, p.y, 0.0]);
    let v = |position| ColoredVertex { position, color: c };
    [v(tl), v(tr), v(br), v(tl), v(br), v(bl)]
}

/// Two textured triangles covering `rect`, mapping the full texture
pub fn quad_textured(rect: &Rect, color: Color) -> [TexturedVertex; 6] {
    quad_textured_region(rect, color, &Rect::new(0.0, 0.0, 1.0, 1.0))
}

/// Two textured triangles covering `rect`, mapping the `uv` region of the
/// texture in normalised coordinates
pub fn quad_textured_region(rect: &Rect, color: Color, uv: &Rect) -> [TexturedVertex; 6] {
    let c = color.to_array();
    let [tl, tr, br, bl] = rect.corners().map(|p| [p.x, p.y, 0.0]);
    let [uv_tl, uv_tr, uv_br, uv_bl] = uv.corners().map(|p| [p.x, p.y]);
    let v = |position, uv| TexturedVertex {
        position,
        color: c,
        uv,
    };
    [
        v(tl, uv_tl),
        v(tr, uv_tr),
        v(br, uv_br),
        v(tl, uv_tl),
        v(br, uv_br),
        v(bl, uv_bl),
    ]
}
