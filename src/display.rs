use bitvec::{BitArr, array::BitArray};

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// The 64x32 monochrome screen. Pixels are stored row-major, one bit each.
pub struct Framebuffer {
    pixels: BitArr!(for DISPLAY_WIDTH * DISPLAY_HEIGHT),
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            pixels: BitArray::ZERO,
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    /// XORs `sprite` onto the screen with its top-left corner at (`x`, `y`).
    ///
    /// Each row wraps around the right edge, but rows that would fall below
    /// the bottom edge are dropped. Returns true if any lit pixel was turned
    /// off.
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        let mut collision = false;

        for (row, &byte) in sprite.iter().enumerate() {
            let pixel_y = y + row;
            if pixel_y >= DISPLAY_HEIGHT {
                break;
            }

            for bit in 0..8 {
                if (byte >> (7 - bit)) & 1 == 0 {
                    continue;
                }

                let pixel_x = (x + bit) % DISPLAY_WIDTH;
                let index = pixel_y * DISPLAY_WIDTH + pixel_x;
                let current_pixel = self.pixels[index];

                collision |= current_pixel;
                self.pixels.set(index, !current_pixel);
            }
        }
        collision
    }

    /// Whether the pixel at (`x`, `y`) is lit.
    ///
    /// # Panics
    ///
    /// Panics if `x >= DISPLAY_WIDTH` or `y >= DISPLAY_HEIGHT`. Drawing wraps
    /// and clips on its own, so only callers walking the grid read pixels.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        assert!(x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT, "pixel ({x}, {y}) is off screen");
        self.pixels[y * DISPLAY_WIDTH + x]
    }

    pub fn lit_count(&self) -> usize {
        self.pixels.count_ones()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLYPH_ZERO: [u8; 5] = [0xF0, 0x90, 0x90, 0x90, 0xF0];

    #[test]
    fn draws_sprite_msb_first() {
        let mut fb = Framebuffer::new();
        assert!(!fb.draw_sprite(0, 0, &[0b1000_0001]));
        assert!(fb.pixel(0, 0));
        assert!(!fb.pixel(1, 0));
        assert!(fb.pixel(7, 0));
        assert_eq!(fb.lit_count(), 2);
    }

    #[test]
    fn drawing_twice_restores_and_collides() {
        let mut fb = Framebuffer::new();
        fb.draw_sprite(10, 5, &[0xFF]);
        let before = fb.lit_count();

        assert!(!fb.draw_sprite(20, 12, &GLYPH_ZERO));
        assert!(fb.draw_sprite(20, 12, &GLYPH_ZERO));
        assert_eq!(fb.lit_count(), before);
        assert!(fb.pixel(10, 5));
        assert!(!fb.pixel(20, 12));
    }

    #[test]
    fn blank_rows_never_collide() {
        let mut fb = Framebuffer::new();
        fb.draw_sprite(0, 0, &[0xFF]);
        assert!(!fb.draw_sprite(0, 0, &[0x00]));
        assert_eq!(fb.lit_count(), 8);
    }

    #[test]
    fn rows_wrap_horizontally() {
        let mut fb = Framebuffer::new();
        fb.draw_sprite(60, 0, &[0xFF]);
        for x in [60, 61, 62, 63, 0, 1, 2, 3] {
            assert!(fb.pixel(x, 0), "pixel {x} should be lit");
        }
        assert_eq!(fb.lit_count(), 8);
    }

    #[test]
    fn rows_below_the_bottom_edge_are_clipped() {
        let mut fb = Framebuffer::new();
        fb.draw_sprite(0, 30, &[0x80; 5]);
        assert!(fb.pixel(0, 30));
        assert!(fb.pixel(0, 31));
        assert!(!fb.pixel(0, 0));
        assert!(!fb.pixel(0, 1));
        assert_eq!(fb.lit_count(), 2);
    }

    #[test]
    #[should_panic(expected = "off screen")]
    fn reading_off_screen_pixels_panics() {
        Framebuffer::new().pixel(DISPLAY_WIDTH, 0);
    }

    #[test]
    fn clear_turns_everything_off() {
        let mut fb = Framebuffer::new();
        fb.draw_sprite(0, 0, &GLYPH_ZERO);
        fb.clear();
        assert_eq!(fb.lit_count(), 0);
    }
}
