//! Render-side collaborators
//!
//! The host game owns the graphics device and the sprite batch; this module
//! defines the narrow interfaces the overlay needs from them:
//!
//! - [`GraphicsDevice`]: back-buffer dimensions for sizing off-screen surfaces
//! - [`SpriteBatch`]: textured sprites, text and surface composition
//!
//! It also provides [`Surface`], a software RGBA8 render target with a sprite
//! rasterizer. Textures are treated as solid masks of their declared size and
//! [`TextureShape`], modulated by the sprite color.

use tracing::trace;

use crate::types::{Color, Rect, Vector2};

/// Coverage of a texture's texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureShape {
    /// Every texel is opaque
    #[default]
    Solid,
    /// Only texels inside the inscribed circle are opaque
    Disc,
}

/// Size and shape of a texture owned by the host's content pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub id: u32,
    pub width: u32,
    pub height: u32,
    pub shape: TextureShape,
}

impl TextureInfo {
    pub const fn new(id: u32, width: u32, height: u32, shape: TextureShape) -> Self {
        Self { id, width, height, shape }
    }

    fn covers(&self, texel: Vector2) -> bool {
        let (w, h) = (self.width as f32, self.height as f32);
        if texel.x < 0.0 || texel.y < 0.0 || texel.x >= w || texel.y >= h {
            return false;
        }
        match self.shape {
            TextureShape::Solid => true,
            TextureShape::Disc => {
                let radius = w.min(h) / 2.0;
                (texel - Vector2::new(w / 2.0, h / 2.0)).length() <= radius
            }
        }
    }
}

/// One textured quad, in the sprite-batch convention: the texel at `origin`
/// lands on `position`, the quad is scaled by `scale` around `origin`, then
/// rotated by `rotation` radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub texture: TextureInfo,
    pub position: Vector2,
    pub color: Color,
    pub rotation: f32,
    pub origin: Vector2,
    pub scale: Vector2,
    pub layer_depth: f32,
}

impl Sprite {
    /// Map a texel coordinate to screen space.
    pub fn texel_to_screen(&self, texel: Vector2) -> Vector2 {
        self.position + (texel - self.origin).scale_by(self.scale).rotate(self.rotation)
    }

    /// Map a screen coordinate back to texel space, `None` for degenerate scales.
    pub fn screen_to_texel(&self, screen: Vector2) -> Option<Vector2> {
        if self.scale.x.abs() < f32::EPSILON || self.scale.y.abs() < f32::EPSILON {
            return None;
        }
        let local = (screen - self.position).rotate(-self.rotation);
        Some(Vector2::new(local.x / self.scale.x, local.y / self.scale.y) + self.origin)
    }
}

/// Provided by the host: the device whose back buffer the overlay matches.
pub trait GraphicsDevice: Send + Sync {
    /// Back-buffer size as `(width, height)`.
    fn back_buffer_size(&self) -> (u32, u32);
}

/// Graphics device without a display, for tools and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessGraphics {
    pub width: u32,
    pub height: u32,
}

impl GraphicsDevice for HeadlessGraphics {
    fn back_buffer_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Provided by the host: the per-frame drawing context.
pub trait SpriteBatch {
    fn begin(&mut self) {}

    fn draw_sprite(&mut self, sprite: &Sprite);

    fn draw_string(&mut self, text: &str, position: Vector2, color: Color);

    /// Composite an off-screen surface into `dest`, modulated by `tint`.
    fn draw_surface(&mut self, surface: &Surface, dest: Rect, tint: Color);

    fn end(&mut self) {}
}

/// Software RGBA8 render target.
#[derive(Clone, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl std::fmt::Debug for Surface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Surface").field("width", &self.width).field("height", &self.height).finish()
    }
}

impl Surface {
    /// Transparent surface of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, pixels: vec![0; width as usize * height as usize * 4] }
    }

    /// Surface matching the device's back buffer.
    pub fn for_device(device: &dyn GraphicsDevice) -> Self {
        let (width, height) = device.back_buffer_size();
        Self::new(width, height)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA8 rows, top to bottom.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn clear(&mut self, color: Color) {
        let rgba = color.to_array();
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&rgba);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let mut rgba = [0u8; 4];
        rgba.copy_from_slice(&self.pixels[idx..idx + 4]);
        Some(Color::from_array(rgba))
    }

    /// Number of pixels exactly equal to `color`.
    pub fn count_pixels(&self, color: Color) -> usize {
        let rgba = color.to_array();
        self.pixels.chunks_exact(4).filter(|chunk| *chunk == rgba).count()
    }

    /// Sprite batch drawing into this surface.
    pub fn batch(&mut self) -> SurfaceBatch<'_> {
        SurfaceBatch { surface: self }
    }

    fn blend_pixel(&mut self, x: i32, y: i32, color: Color) {
        if x < 0 || y < 0 {
            return;
        }
        let (ux, uy) = (x as u32, y as u32);
        if ux >= self.width || uy >= self.height {
            return;
        }
        let idx = (uy as usize * self.width as usize + ux as usize) * 4;
        let dst = &mut self.pixels[idx..idx + 4];
        match color.a {
            0 => {}
            255 => dst.copy_from_slice(&color.to_array()),
            alpha => {
                let a = alpha as u16;
                let mix = |s: u8, d: u8| ((s as u16 * a + d as u16 * (255 - a) + 127) / 255) as u8;
                dst[0] = mix(color.r, dst[0]);
                dst[1] = mix(color.g, dst[1]);
                dst[2] = mix(color.b, dst[2]);
                dst[3] = dst[3].max(alpha);
            }
        }
    }
}

/// [`SpriteBatch`] rasterizing into a [`Surface`].
pub struct SurfaceBatch<'a> {
    surface: &'a mut Surface,
}

impl SpriteBatch for SurfaceBatch<'_> {
    fn draw_sprite(&mut self, sprite: &Sprite) {
        let texture = sprite.texture;
        if texture.width == 0 || texture.height == 0 {
            return;
        }

        let (w, h) = (texture.width as f32, texture.height as f32);
        let corners = [
            sprite.texel_to_screen(Vector2::new(0.0, 0.0)),
            sprite.texel_to_screen(Vector2::new(w, 0.0)),
            sprite.texel_to_screen(Vector2::new(0.0, h)),
            sprite.texel_to_screen(Vector2::new(w, h)),
        ];
        let min_x = corners.iter().map(|c| c.x).fold(f32::INFINITY, f32::min).floor().max(0.0);
        let min_y = corners.iter().map(|c| c.y).fold(f32::INFINITY, f32::min).floor().max(0.0);
        let max_x = corners
            .iter()
            .map(|c| c.x)
            .fold(f32::NEG_INFINITY, f32::max)
            .ceil()
            .min(self.surface.width as f32);
        let max_y = corners
            .iter()
            .map(|c| c.y)
            .fold(f32::NEG_INFINITY, f32::max)
            .ceil()
            .min(self.surface.height as f32);
        if !(min_x < max_x && min_y < max_y) {
            return;
        }

        for py in min_y as i32..max_y as i32 {
            for px in min_x as i32..max_x as i32 {
                let center = Vector2::new(px as f32 + 0.5, py as f32 + 0.5);
                let Some(texel) = sprite.screen_to_texel(center) else {
                    return;
                };
                if texture.covers(texel) {
                    self.surface.blend_pixel(px, py, sprite.color);
                }
            }
        }
    }

    fn draw_string(&mut self, text: &str, position: Vector2, _color: Color) {
        trace!(text, x = position.x, y = position.y, "Surface has no font, skipping text");
    }

    fn draw_surface(&mut self, source: &Surface, dest: Rect, tint: Color) {
        if dest.is_empty() || source.width == 0 || source.height == 0 {
            return;
        }
        for dy in 0..dest.height {
            let sy = (dy as u64 * source.height as u64 / dest.height as u64) as u32;
            for dx in 0..dest.width {
                let sx = (dx as u64 * source.width as u64 / dest.width as u64) as u32;
                if let Some(texel) = source.pixel(sx, sy) {
                    self.surface.blend_pixel(
                        dest.x + dx as i32,
                        dest.y + dy as i32,
                        texel.modulate(tint),
                    );
                }
            }
        }
    }
}

/// Draw call captured by [`RecordingBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Begin,
    Sprite(Sprite),
    Text { text: String, position: Vector2, color: Color },
    Surface { width: u32, height: u32, dest: Rect, tint: Color },
    End,
}

/// [`SpriteBatch`] that records every call instead of drawing.
#[derive(Debug, Default, Clone)]
pub struct RecordingBatch {
    pub commands: Vec<DrawCommand>,
}

impl RecordingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sprites(&self) -> impl Iterator<Item = &Sprite> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Sprite(sprite) => Some(sprite),
            _ => None,
        })
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|command| match command {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl SpriteBatch for RecordingBatch {
    fn begin(&mut self) {
        self.commands.push(DrawCommand::Begin);
    }

    fn draw_sprite(&mut self, sprite: &Sprite) {
        self.commands.push(DrawCommand::Sprite(*sprite));
    }

    fn draw_string(&mut self, text: &str, position: Vector2, color: Color) {
        self.commands.push(DrawCommand::Text { text: text.to_string(), position, color });
    }

    fn draw_surface(&mut self, surface: &Surface, dest: Rect, tint: Color) {
        self.commands.push(DrawCommand::Surface {
            width: surface.width(),
            height: surface.height(),
            dest,
            tint,
        });
    }

    fn end(&mut self) {
        self.commands.push(DrawCommand::End);
    }
}
