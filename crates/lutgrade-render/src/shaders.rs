//! WGSL shader source for the GPU sampling pipeline.
//! Used by the wgpu path when the `wgpu` feature is enabled.

/// Packed-LUT grading. Reads RGBA8 words, emulates a 3D trilinear lookup
/// with two manual bilinear taps on the packed 2D texture plus a blue
/// lerp — identical arithmetic to the CPU path in `sampler.rs`.
pub const LUT_GRADE: &str = r#"
@group(0) @binding(0) var<storage, read> src: array<u32>;
@group(0) @binding(1) var<storage, read_write> dst: array<u32>;
@group(0) @binding(2) var<uniform> dims: vec4<u32>;  // img_w, img_h, lut_size, lut_w
@group(0) @binding(3) var<storage, read> lut: array<u32>;

fn texel(x: i32, y: i32) -> vec3<f32> {
    let lw = i32(dims.w);
    let lh = i32(dims.z);
    let cx = clamp(x, 0, lw - 1);
    let cy = clamp(y, 0, lh - 1);
    return unpack4x8unorm(lut[cy * lw + cx]).rgb;
}

fn tap(u: f32, v: f32) -> vec3<f32> {
    let x = u * f32(dims.w) - 0.5;
    let y = v * f32(dims.z) - 0.5;
    let x0 = floor(x);
    let y0 = floor(y);
    let fx = x - x0;
    let fy = y - y0;

    let t00 = texel(i32(x0), i32(y0));
    let t10 = texel(i32(x0) + 1, i32(y0));
    let t01 = texel(i32(x0), i32(y0) + 1);
    let t11 = texel(i32(x0) + 1, i32(y0) + 1);

    let top = mix(t00, t10, fx);
    let bot = mix(t01, t11, fx);
    return mix(top, bot, fy);
}

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) id: vec3<u32>) {
    let px = id.x;
    let total = dims.x * dims.y;
    if px >= total { return; }

    let c = unpack4x8unorm(src[px]);
    let n = f32(dims.z);
    let scaled = clamp(c.rgb, vec3<f32>(0.0), vec3<f32>(1.0)) * (n - 1.0);

    let b_low = floor(scaled.b);
    let b_high = min(b_low + 1.0, n - 1.0);
    let t = scaled.b - b_low;

    let v = (scaled.g + 0.5) / n;
    let u_low = (scaled.r + b_low * n + 0.5) / (n * n);
    let u_high = (scaled.r + b_high * n + 0.5) / (n * n);

    let graded = mix(tap(u_low, v), tap(u_high, v), t);
    dst[px] = pack4x8unorm(vec4<f32>(graded, c.a));
}
"#;
