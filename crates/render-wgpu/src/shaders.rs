/// Base pass: lit, checkered and unlit surfaces, plus flat-coloured lines
/// that share the same bindings.
pub const SCENE_SHADER: &str = r#"
struct Scene {
    view_proj: mat4x4<f32>,
    ambient: vec4<f32>,
    // xyz: direction the light travels, w: 1 when a light exists
    light_dir: vec4<f32>,
    light_color: vec4<f32>,
};

struct Draw {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    // linear rgb, a: opacity
    color: vec4<f32>,
    // x: lit, y: checker, z: emissive, w: double sided
    flags: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> scene: Scene;

@group(1) @binding(0)
var<uniform> draw: Draw;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = scene.view_proj * draw.model * vec4<f32>(vertex.position, 1.0);
    out.world_normal = (draw.normal_matrix * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.uv = vertex.uv;
    return out;
}

fn checker(uv: vec2<f32>) -> f32 {
    let cells = floor(uv * 10.0);
    let sum = cells.x + cells.y;
    let parity = sum - 2.0 * floor(sum * 0.5);
    return mix(1.0, 0.2, parity);
}

@fragment
fn fs_main(in: VertexOutput, @builtin(front_facing) front: bool) -> @location(0) vec4<f32> {
    var base = draw.color.rgb;
    if (draw.flags.y > 0.5) {
        base = base * checker(in.uv);
    }
    var rgb = base;
    if (draw.flags.x > 0.5) {
        var n = normalize(in.world_normal);
        if (!front && draw.flags.w > 0.5) {
            n = -n;
        }
        let diffuse = max(dot(n, -scene.light_dir.xyz), 0.0) * scene.light_dir.w;
        rgb = base * (scene.ambient.rgb + scene.light_color.rgb * diffuse);
    }
    if (draw.flags.z > 0.5) {
        rgb = rgb * 4.0;
    }
    return vec4<f32>(rgb, draw.color.a);
}

@vertex
fn vs_line(vertex: VertexInput) -> @builtin(position) vec4<f32> {
    return scene.view_proj * draw.model * vec4<f32>(vertex.position, 1.0);
}

@fragment
fn fs_line() -> @location(0) vec4<f32> {
    return draw.color;
}
"#;

/// Grid and light helpers, already in world space.
pub const HELPER_SHADER: &str = r#"
struct Scene {
    view_proj: mat4x4<f32>,
    ambient: vec4<f32>,
    light_dir: vec4<f32>,
    light_color: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> scene: Scene;

struct HelperVertex {
    @location(0) position: vec3<f32>,
    @location(1) color: vec4<f32>,
};

struct HelperOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_helper(vertex: HelperVertex) -> HelperOutput {
    var out: HelperOutput;
    out.clip_position = scene.view_proj * vec4<f32>(vertex.position, 1.0);
    out.color = vertex.color;
    return out;
}

@fragment
fn fs_helper(in: HelperOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

/// Bloom chain: bright pass, separable blur, composite onto the surface.
pub const POST_SHADER: &str = r#"
struct Post {
    // xy: texel step along the blur axis
    texel: vec4<f32>,
    // x: threshold, y: strength, z: radius
    bloom: vec4<f32>,
};

struct FullscreenOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0) var source: texture_2d<f32>;
@group(0) @binding(1) var source_sampler: sampler;
@group(0) @binding(2) var<uniform> post: Post;

@vertex
fn vs_fullscreen(@builtin(vertex_index) index: u32) -> FullscreenOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: FullscreenOutput;
    out.clip_position = vec4<f32>(uv * vec2<f32>(2.0, -2.0) + vec2<f32>(-1.0, 1.0), 0.0, 1.0);
    out.uv = uv;
    return out;
}

@fragment
fn fs_bright(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let color = textureSample(source, source_sampler, in.uv).rgb;
    let luma = dot(color, vec3<f32>(0.2126, 0.7152, 0.0722));
    let keep = max(luma - post.bloom.x, 0.0) / max(luma, 0.0001);
    return vec4<f32>(color * keep, 1.0);
}

@fragment
fn fs_blur(in: FullscreenOutput) -> @location(0) vec4<f32> {
    var weights = array<f32, 5>(0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216);
    let stride = post.texel.xy * (1.0 + post.bloom.z * 3.0);
    var sum = textureSample(source, source_sampler, in.uv).rgb * weights[0];
    for (var i = 1; i < 5; i = i + 1) {
        let offset = stride * f32(i);
        sum = sum + textureSample(source, source_sampler, in.uv + offset).rgb * weights[i];
        sum = sum + textureSample(source, source_sampler, in.uv - offset).rgb * weights[i];
    }
    return vec4<f32>(sum, 1.0);
}

@group(0) @binding(3) var bloom_texture: texture_2d<f32>;

@fragment
fn fs_composite(in: FullscreenOutput) -> @location(0) vec4<f32> {
    let scene_color = textureSample(source, source_sampler, in.uv).rgb;
    let bloom = textureSample(bloom_texture, source_sampler, in.uv).rgb;
    let color = scene_color + bloom * post.bloom.y;
    return vec4<f32>(min(color, vec3<f32>(1.0)), 1.0);
}
"#;
