//! Selection outline pass
//!
//! Paints a ring of the highlight color around every outlined object, using
//! the per-pixel object ids from the main pass.

use std::collections::HashMap;

use image::RgbaImage;

use crate::config::OutlineSettings;
use crate::foundation::collections::ObjectKey;
use crate::picking::Highlight;

/// Draw outlines; returns the number of pixels painted
///
/// A pixel is painted when it lies within `thickness` pixels of a highlighted
/// object and does not itself show a highlighted object.
pub fn apply_outline(
    image: &mut RgbaImage,
    ids: &[Option<ObjectKey>],
    highlights: &HashMap<ObjectKey, Highlight>,
    settings: &OutlineSettings,
) -> usize {
    let (width, height) = image.dimensions();
    let radius = i64::from(settings.thickness.max(1));
    let highlight_at = |x: i64, y: i64| -> Option<Highlight> {
        if x < 0 || y < 0 || x >= i64::from(width) || y >= i64::from(height) {
            return None;
        }
        ids[(y * i64::from(width) + x) as usize].and_then(|key| highlights.get(&key).copied())
    };

    let mut paint: HashMap<(u32, u32), Highlight> = HashMap::new();
    for y in 0..i64::from(height) {
        for x in 0..i64::from(width) {
            let Some(kind) = highlight_at(x, y) else {
                continue;
            };
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= i64::from(width) || ny >= i64::from(height) {
                        continue;
                    }
                    if dx * dx + dy * dy > radius * radius || highlight_at(nx, ny).is_some() {
                        continue;
                    }
                    let slot = paint.entry((nx as u32, ny as u32)).or_insert(kind);
                    if kind == Highlight::Selected {
                        *slot = Highlight::Selected;
                    }
                }
            }
        }
    }

    for ((x, y), kind) in &paint {
        let color = match kind {
            Highlight::Selected => settings.selected_color,
            Highlight::Hovered => settings.hover_color,
        };
        image.put_pixel(*x, *y, image::Rgba(color.to_rgba8(1.0)));
    }
    paint.len()
}
