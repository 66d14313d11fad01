/*!
# Progressive GPU Ray Tracer

This crate renders a procedurally generated field of spheres with a GPU compute kernel built on the
[wgpu](https://docs.rs/wgpu/latest/wgpu/) library.

## Overview

Every frame the kernel traces one ray per pixel, offset by a random sub-pixel jitter, into a raw sample image.
The raw sample is folded into a running average, so the picture converges to an anti-aliased image while the
camera stands still. Moving the camera or resizing the window throws the average away and starts over.

## Feature Overview

- **Procedural Scenes**: Non-overlapping spheres with random diffuse or metal materials resting on a ground plane.
- **Progressive Accumulation**: The presented image is the mean of all samples since the last camera change.
- **Environment Maps**: `.hdr`, `.exr`, `.png` and `.jpg` skies, or a flat sky when none is configured.
- **Full 3D Camera Control**: Fly through the scene with WASD, the arrow keys, space, shift and the mouse.
- **Scene Re-roll**: Press `R` to generate a new scene.

## Modules

- [`raytracing_lib`](../raytracing_lib/index.html): The render session, GPU resources, the frame dispatcher and the accumulation controller.
- [`scene`](../scene/index.html): Scene generation, camera, configuration and environment maps.
- [`wgpu_utils`](../wgpu_utils/index.html): Contains utility functions for working with the `wgpu` library.

## Usage

```rust no_run
// Passing `None` loads `res/config.toml`.
fn main() -> anyhow::Result<()> {
    pollster::block_on(raytracing_lib::run(None))
}
```

## Configuration

The first command line argument is the path of the config file, see `res/config.toml` for every option:

```sh
RUST_LOG=info cargo run -- res/config.toml
```

*/
pub use raytracing_lib::{run, RenderError, RenderSession};
pub use scene::{generate, Config, Scene, SceneSettings};
