//! Foreground segmentation collaborator.

use serde::Serialize;

use super::Result;

/// Largest inset of the seed rectangle from each image edge, in pixels.
const MAX_INSET: u32 = 50;

/// Rectangle assumed to contain the foreground, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl SeedRegion {
    /// Centered seed inset by 50px, or by a quarter of the shorter side on small images.
    pub fn centered(width: u32, height: u32) -> Self {
        let inset = MAX_INSET.min(width / 4).min(height / 4);
        Self {
            x: inset,
            y: inset,
            width: width.saturating_sub(2 * inset).max(1),
            height: height.saturating_sub(2 * inset).max(1),
        }
    }
}

/// Produces a per-pixel foreground mask for an image.
///
/// The returned mask has one byte per pixel in row-major order; 0 marks
/// background, anything else is foreground opacity.
pub trait Segmenter: Send + Sync {
    fn segment(&self, rgba: &[u8], width: u32, height: u32, seed: SeedRegion) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_centered_seed_on_large_image() {
        assert_eq!(
            SeedRegion::centered(800, 600),
            SeedRegion { x: 50, y: 50, width: 700, height: 500 }
        );
    }

    #[test]
    fn test_centered_seed_on_small_image() {
        assert_eq!(
            SeedRegion::centered(40, 100),
            SeedRegion { x: 10, y: 10, width: 20, height: 80 }
        );
        assert_eq!(SeedRegion::centered(2, 2), SeedRegion { x: 0, y: 0, width: 2, height: 2 });
    }
}
