use image::{DynamicImage, GenericImageView};

/// A rectangle of a rasterized page, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CodeRegion {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// `x` in `[w/2, w)`, `y` in `[0, h/2)`, integer division.
    pub fn top_right_quadrant(width: u32, height: u32) -> Self {
        let left = width / 2;
        Self {
            x: left,
            y: 0,
            width: width - left,
            height: height / 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn crop(&self, page: &DynamicImage) -> DynamicImage {
        if (self.x, self.y) == (0, 0) && (self.width, self.height) == page.dimensions() {
            return page.clone();
        }
        page.crop_imm(self.x, self.y, self.width, self.height)
    }
}

/// Where on the page a strategy looks for its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionPolicy {
    FullPage,
    /// Printed barcodes sit in the top-right corner of the cover sheet.
    TopRightQuadrant,
}

impl RegionPolicy {
    pub fn select(&self, width: u32, height: u32) -> CodeRegion {
        match self {
            RegionPolicy::FullPage => CodeRegion::full(width, height),
            RegionPolicy::TopRightQuadrant => CodeRegion::top_right_quadrant(width, height),
        }
    }
}
