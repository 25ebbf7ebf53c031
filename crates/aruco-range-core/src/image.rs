/// Borrowed 8-bit grayscale image, row-major, `data.len() == width * height`.
#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8],
}

/// Owned 8-bit grayscale image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImage {
    /// Image filled with a constant value.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        if x < self.width && y < self.height {
            self.data[y * self.width + x] = value;
        }
    }
}

impl GrayImageView<'_> {
    /// Pixel value, or 0 outside the image.
    #[inline]
    pub fn get(&self, x: i32, y: i32) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return 0;
        }
        self.data[y as usize * self.width + x as usize]
    }

    /// True when the buffer length matches the declared size.
    pub fn is_consistent(&self) -> bool {
        self.width.checked_mul(self.height) == Some(self.data.len())
    }
}

/// Bilinear interpolation at a sub-pixel position.
///
/// Integer coordinates hit pixel values exactly; neighbours outside the
/// image count as black.
#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let (left, top) = (x.floor(), y.floor());
    let (tx, ty) = (x - left, y - top);
    let (ix, iy) = (left as i32, top as i32);

    let taps = [
        ((1.0 - tx) * (1.0 - ty), src.get(ix, iy)),
        (tx * (1.0 - ty), src.get(ix + 1, iy)),
        ((1.0 - tx) * ty, src.get(ix, iy + 1)),
        (tx * ty, src.get(ix + 1, iy + 1)),
    ];
    taps.iter().map(|&(w, v)| w * f32::from(v)).sum()
}
