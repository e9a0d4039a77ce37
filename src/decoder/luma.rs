// SPDX-License-Identifier: GPL-3.0-only

//! Grayscale conversion of camera frames
//!
//! Every supported pixel format is reduced to a tightly packed 8-bit luma
//! plane before detection. Stride padding is dropped here, and buffers too
//! short for their declared geometry are rejected instead of read past.

use crate::backends::camera::{CameraFrame, PixelFormat};
use crate::errors::DecodeError;
use image::ImageFormat;

/// Tightly packed 8-bit grayscale image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumaPlane {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl LumaPlane {
    /// Extract the luma plane of `frame`
    pub fn from_frame(frame: &CameraFrame) -> Result<Self, DecodeError> {
        match frame.format {
            PixelFormat::Gray8 => {
                check_geometry(frame, 1)?;
                Ok(Self::map_rows(frame, 1, |px| px[0]))
            }
            PixelFormat::RGBA => {
                check_geometry(frame, 4)?;
                Ok(Self::map_rows(frame, 4, |px| rgb_to_luma(px[0], px[1], px[2])))
            }
            PixelFormat::YUYV => {
                check_geometry(frame, 2)?;
                // Y0 U Y1 V: every even byte is a luma sample
                Ok(Self::map_rows(frame, 2, |px| px[0]))
            }
            PixelFormat::MJPEG => {
                let img = image::load_from_memory_with_format(&frame.data, ImageFormat::Jpeg)?;
                let img = img.to_luma8();
                Ok(Self {
                    width: img.width(),
                    height: img.height(),
                    data: img.into_raw(),
                })
            }
        }
    }

    fn map_rows(frame: &CameraFrame, bytes_per_pixel: usize, luma: impl Fn(&[u8]) -> u8) -> Self {
        let width = frame.width as usize;
        let height = frame.height as usize;
        let stride = frame.stride as usize;

        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            let row = &frame.data[y * stride..y * stride + width * bytes_per_pixel];
            data.extend(row.chunks_exact(bytes_per_pixel).map(&luma));
        }

        Self {
            width: frame.width,
            height: frame.height,
            data,
        }
    }

    /// Sample at (x, y); callers stay within bounds
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width as usize + x]
    }

    /// Downscale so neither side exceeds `max_dimension`, keeping aspect ratio
    pub fn fit_within(self, max_dimension: u32) -> Self {
        if max_dimension == 0 || (self.width <= max_dimension && self.height <= max_dimension) {
            return self;
        }
        let scale = (self.width as f32 / max_dimension as f32)
            .max(self.height as f32 / max_dimension as f32);
        let new_width = ((self.width as f32 / scale) as u32).max(1);
        let new_height = ((self.height as f32 / scale) as u32).max(1);
        self.resized(new_width, new_height)
    }

    /// Bilinear resample to `dst_width` x `dst_height`
    pub fn resized(&self, dst_width: u32, dst_height: u32) -> Self {
        let src_width = self.width as usize;
        let src_height = self.height as usize;

        let mut data = Vec::with_capacity((dst_width * dst_height) as usize);

        let x_ratio = src_width as f32 / dst_width as f32;
        let y_ratio = src_height as f32 / dst_height as f32;

        for y in 0..dst_height {
            for x in 0..dst_width {
                let src_x = x as f32 * x_ratio;
                let src_y = y as f32 * y_ratio;

                let x0 = (src_x as usize).min(src_width - 1);
                let y0 = (src_y as usize).min(src_height - 1);
                let x1 = (x0 + 1).min(src_width - 1);
                let y1 = (y0 + 1).min(src_height - 1);

                let x_frac = src_x - x0 as f32;
                let y_frac = src_y - y0 as f32;

                let p00 = self.get(x0, y0) as f32;
                let p01 = self.get(x1, y0) as f32;
                let p10 = self.get(x0, y1) as f32;
                let p11 = self.get(x1, y1) as f32;

                let value = p00 * (1.0 - x_frac) * (1.0 - y_frac)
                    + p01 * x_frac * (1.0 - y_frac)
                    + p10 * (1.0 - x_frac) * y_frac
                    + p11 * x_frac * y_frac;

                data.push(value as u8);
            }
        }

        Self {
            width: dst_width,
            height: dst_height,
            data,
        }
    }

    /// Rotate 90° clockwise
    pub fn rotated_90(&self) -> Self {
        let src_width = self.width as usize;
        let src_height = self.height as usize;
        let mut data = Vec::with_capacity(self.data.len());

        // Destination is src_height wide and src_width tall
        for dst_y in 0..src_width {
            for dst_x in 0..src_height {
                data.push(self.get(dst_y, src_height - 1 - dst_x));
            }
        }

        Self {
            width: self.height,
            height: self.width,
            data,
        }
    }

    /// Photographic negative
    pub fn inverted(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|v| 255 - v).collect(),
        }
    }
}

/// ITU-R BT.601 luma in fixed point
fn rgb_to_luma(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 77 + g as u32 * 150 + b as u32 * 29) >> 8) as u8
}

fn check_geometry(frame: &CameraFrame, bytes_per_pixel: u32) -> Result<(), DecodeError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(DecodeError::InvalidGeometry(format!(
            "{}x{}",
            frame.width, frame.height
        )));
    }
    let row_bytes = frame.width as usize * bytes_per_pixel as usize;
    let stride = frame.stride as usize;
    if stride < row_bytes {
        return Err(DecodeError::InvalidGeometry(format!(
            "stride {} shorter than row of {} bytes",
            stride, row_bytes
        )));
    }
    let expected = stride * (frame.height as usize - 1) + row_bytes;
    if frame.data.len() < expected {
        return Err(DecodeError::MalformedBuffer {
            expected,
            actual: frame.data.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    fn frame(
        width: u32,
        height: u32,
        stride: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> CameraFrame {
        CameraFrame {
            width,
            height,
            data: Arc::from(data.as_slice()),
            format,
            stride,
            sequence: 0,
            captured_at: Instant::now(),
        }
    }

    #[test]
    fn test_rgba_with_stride_padding() {
        // Row 0: white, black. Row 1: red, blue. Two padding bytes per row.
        let mut data: Vec<u8> = Vec::new();
        data.extend([255, 255, 255, 255, 0, 0, 0, 255, 0, 0]);
        data.extend([255, 0, 0, 255, 0, 0, 255, 255, 0, 0]);

        let plane = LumaPlane::from_frame(&frame(2, 2, 10, PixelFormat::RGBA, data)).unwrap();
        assert_eq!(plane.data.len(), 4);
        assert_eq!(plane.data[0], 255);
        assert_eq!(plane.data[1], 0);
        assert_eq!(plane.data[2], 76); // 255 * 77 >> 8
        assert_eq!(plane.data[3], 28); // 255 * 29 >> 8
    }

    #[test]
    fn test_yuyv_takes_luma_bytes() {
        // Y0 U Y1 V for a 2x1 frame
        let data = vec![10u8, 128, 200, 128];
        let plane = LumaPlane::from_frame(&frame(2, 1, 4, PixelFormat::YUYV, data)).unwrap();
        assert_eq!(plane.data, vec![10, 200]);
    }

    #[test]
    fn test_short_buffer_is_malformed() {
        let short = frame(4, 4, 4, PixelFormat::Gray8, vec![0; 10]);
        let err = LumaPlane::from_frame(&short).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MalformedBuffer {
                expected: 16,
                actual: 10
            }
        );
    }

    #[test]
    fn test_narrow_stride_is_invalid() {
        let narrow = frame(4, 1, 2, PixelFormat::Gray8, vec![0; 4]);
        let err = LumaPlane::from_frame(&narrow).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidGeometry(_)));
    }

    #[test]
    fn test_corrupt_jpeg_is_error() {
        let corrupt = frame(2, 2, 0, PixelFormat::MJPEG, vec![0xFF, 0xD8, 0x00]);
        let err = LumaPlane::from_frame(&corrupt).unwrap_err();
        assert!(matches!(err, DecodeError::Image(_)));
    }

    #[test]
    fn test_downscale_keeps_gradient() {
        // 4x2 gradient, left dark to right bright
        let plane = LumaPlane {
            width: 4,
            height: 2,
            data: vec![0, 85, 170, 255, 0, 85, 170, 255],
        };

        let small = plane.resized(2, 1);
        assert_eq!(small.data.len(), 2);
        assert!(small.data[0] < 100);
        assert!(small.data[1] > 150);
    }

    #[test]
    fn test_fit_within_preserves_aspect() {
        let plane = LumaPlane {
            width: 1280,
            height: 720,
            data: vec![0; 1280 * 720],
        };
        let small = plane.fit_within(640);
        assert_eq!((small.width, small.height), (640, 360));
    }

    #[test]
    fn test_rotate_clockwise() {
        // 1 2 3        4 1
        // 4 5 6   ->   5 2
        //              6 3
        let plane = LumaPlane {
            width: 3,
            height: 2,
            data: vec![1, 2, 3, 4, 5, 6],
        };
        let rotated = plane.rotated_90();
        assert_eq!((rotated.width, rotated.height), (2, 3));
        assert_eq!(rotated.data, vec![4, 1, 5, 2, 6, 3]);
    }
}
