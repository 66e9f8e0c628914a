/// Braille Unicode canvas for high-resolution terminal graphics.
/// Each character cell represents a 2x4 pixel grid (8 dots) and can carry
/// a tag naming what was drawn there last (a territory slot, for instance).
/// Unicode Braille patterns: U+2800 to U+28FF
pub struct BrailleCanvas {
    width: usize,  // Characters
    height: usize, // Characters
    dots: Vec<u8>, // Bit pattern per char, row-major
    tags: Vec<Option<u16>>,
}

impl BrailleCanvas {
    /// Create a new canvas with the given character dimensions.
    /// Effective pixel resolution: width*2 x height*4
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            dots: vec![0u8; width * height],
            tags: vec![None; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Braille dot layout per character:
    /// ```text
    /// (0,0) (1,0)   bits: 0x01 0x08
    /// (0,1) (1,1)   bits: 0x02 0x10
    /// (0,2) (1,2)   bits: 0x04 0x20
    /// (0,3) (1,3)   bits: 0x40 0x80
    /// ```
    #[inline(always)]
    fn locate(&self, x: usize, y: usize) -> Option<(usize, u8)> {
        let cx = x / 2;
        let cy = y / 4;
        if cx >= self.width || cy >= self.height {
            return None;
        }
        let bit = match (x % 2, y % 4) {
            (0, 0) => 0x01,
            (1, 0) => 0x08,
            (0, 1) => 0x02,
            (1, 1) => 0x10,
            (0, 2) => 0x04,
            (1, 2) => 0x20,
            (0, 3) => 0x40,
            (1, 3) => 0x80,
            _ => 0,
        };
        Some((cy * self.width + cx, bit))
    }

    pub fn set_pixel(&mut self, x: usize, y: usize) {
        if let Some((cell, bit)) = self.locate(x, y) {
            self.dots[cell] |= bit;
        }
    }

    /// Set a pixel and tag its cell; the last tag written wins
    pub fn set_tagged(&mut self, x: usize, y: usize, tag: u16) {
        if let Some((cell, bit)) = self.locate(x, y) {
            self.dots[cell] |= bit;
            self.tags[cell] = Some(tag);
        }
    }

    /// Set a pixel using signed coordinates (ignores negative values)
    pub fn set_pixel_signed(&mut self, x: i32, y: i32) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize);
        }
    }

    pub fn set_tagged_signed(&mut self, x: i32, y: i32, tag: u16) {
        if x >= 0 && y >= 0 {
            self.set_tagged(x as usize, y as usize, tag);
        }
    }

    /// Glyph and tag of one character cell; `None` when no dot is set
    pub fn cell(&self, col: usize, row: usize) -> Option<(char, Option<u16>)> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let idx = row * self.width + col;
        match self.dots[idx] {
            0 => None,
            bits => Some((braille_char(bits), self.tags[idx])),
        }
    }

    /// Convert the canvas to a string of Braille characters
    #[cfg(test)]
    pub fn to_string(&self) -> String {
        self.dots
            .chunks(self.width.max(1))
            .map(|row| row.iter().map(|&b| braille_char(b)).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[inline(always)]
fn braille_char(bits: u8) -> char {
    char::from_u32(0x2800 + bits as u32).unwrap_or(' ')
}
