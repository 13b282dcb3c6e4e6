use bytemuck::{Pod, Zeroable};

/// One corner of the particle quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    /// Corner offset in `[-1, 1]`, scaled by the particle size in the shader.
    pub coord: [f32; 2],
    pub tex_coord: [f32; 2],
}

const fn v(coord: [f32; 2], tex_coord: [f32; 2]) -> QuadVertex {
    QuadVertex { coord, tex_coord }
}

/// Two triangles covering `[-1, 1]^2`. Texture row 0 is the top of the sprite.
pub const QUAD_VERTICES: [QuadVertex; 6] = [
    v([1.0, 1.0], [1.0, 0.0]),
    v([-1.0, 1.0], [0.0, 0.0]),
    v([-1.0, -1.0], [0.0, 1.0]),
    v([1.0, 1.0], [1.0, 0.0]),
    v([-1.0, -1.0], [0.0, 1.0]),
    v([1.0, -1.0], [1.0, 1.0]),
];

const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    0 => Float32x2,
    1 => Float32x2,
];

pub fn quad_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}
