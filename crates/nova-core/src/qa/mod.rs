pub mod classify;
pub mod count_pixels;
pub mod plots;
pub mod report;
