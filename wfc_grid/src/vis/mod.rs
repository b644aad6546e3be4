//! Conversion between image buffers and [`Grid2D`] pixel grids.
//!
//! The library only shuffles pixels between the two representations;
//! decoding and encoding actual file formats is left to the binaries,
//! which enable the formats they need on their own `image` dependency.

use image::{Rgb, RgbImage};

use crate::grid::Grid2D;

/// Pixel type used for image-backed grids.
pub type VisPixel = Rgb<u8>;

/// Reads an RGB image buffer into a pixel grid, row-major.
pub fn grid_from_image(image: &RgbImage) -> Grid2D<VisPixel> {
    let mut data = Vec::with_capacity((image.width() * image.height()) as usize);
    for y in 0..image.height() {
        for x in 0..image.width() {
            data.push(*image.get_pixel(x, y));
        }
    }
    Grid2D::from_vec(data, image.width() as usize)
}

/// Writes a pixel grid into a freshly allocated RGB image buffer.
pub fn image_from_grid(grid: &Grid2D<VisPixel>) -> RgbImage {
    let mut image = RgbImage::new(grid.width() as u32, grid.height() as u32);
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            image.put_pixel(x as u32, y as u32, grid[(y, x)]);
        }
    }
    image
}

#[cfg(test)]
mod test {
    use image::{Rgb, RgbImage};

    use super::{grid_from_image, image_from_grid};

    #[test]
    fn buffer_and_grid_hold_the_same_pixels() {
        let mut buffer = RgbImage::new(3, 2);
        buffer.put_pixel(2, 1, Rgb([10, 20, 30]));
        buffer.put_pixel(0, 0, Rgb([1, 2, 3]));

        let grid = grid_from_image(&buffer);
        assert_eq!(2, grid.height());
        assert_eq!(3, grid.width());
        assert_eq!(Rgb([10, 20, 30]), grid[(1, 2)]);
        assert_eq!(Rgb([1, 2, 3]), grid[(0, 0)]);

        assert_eq!(buffer, image_from_grid(&grid));
    }
}
