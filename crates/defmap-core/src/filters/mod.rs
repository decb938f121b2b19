pub mod box_blur;
pub mod gaussian_blur;
