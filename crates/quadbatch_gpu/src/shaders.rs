//! WGSL shaders for textured quads
//!
//! One module with two vertex entry points: `vs_plain` ignores vertex color
//! (streams that are entirely opaque white) and `vs_tinted` reads it as
//! normalized RGBA8. Both share `fs_main`.

/// WGSL shader for batched quads
pub const QUAD_SHADER: &str = r#"
struct Projection {
    // x = ortho width, y = ortho height
    size: vec4<f32>,
};

@group(0) @binding(0) var<uniform> projection: Projection;
@group(1) @binding(0) var quad_texture: texture_2d<f32>;
@group(1) @binding(1) var quad_sampler: sampler;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
};

// Top-left origin, y down, like the command coordinates.
fn to_clip(position: vec2<f32>) -> vec4<f32> {
    let ndc = vec2<f32>(
        position.x / projection.size.x * 2.0 - 1.0,
        1.0 - position.y / projection.size.y * 2.0,
    );
    return vec4<f32>(ndc, 0.0, 1.0);
}

@vertex
fn vs_plain(
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    out.position = to_clip(position);
    out.uv = uv;
    out.color = vec4<f32>(1.0, 1.0, 1.0, 1.0);
    return out;
}

@vertex
fn vs_tinted(
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) color: vec4<f32>,
) -> VertexOutput {
    var out: VertexOutput;
    out.position = to_clip(position);
    out.uv = uv;
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(quad_texture, quad_sampler, in.uv) * in.color;
}
"#;
