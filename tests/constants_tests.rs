// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use qrscan::constants::{app_info, capture, decoder, file_formats, timing};

#[test]
fn test_capture_defaults() {
    // Requested format matches a common 720p webcam mode
    assert_eq!(capture::DEFAULT_WIDTH, 1280);
    assert_eq!(capture::DEFAULT_HEIGHT, 720);
    assert_eq!(capture::DEFAULT_FRAMERATE, 40);
}

#[test]
fn test_min_usable_width_below_default() {
    assert!(
        capture::MIN_USABLE_FRAME_WIDTH < capture::DEFAULT_WIDTH,
        "Default-sized frames must be usable"
    );
}

#[test]
fn test_scan_interval_is_quarter_second() {
    assert_eq!(timing::DEFAULT_SCAN_INTERVAL.as_millis(), 250);
}

#[test]
fn test_fast_downscale_target() {
    assert!(decoder::FAST_MAX_DIMENSION >= 320);
}

#[test]
fn test_image_extensions_case_insensitive() {
    assert!(file_formats::is_image_extension("png"));
    assert!(file_formats::is_image_extension("JPG"));
    assert!(!file_formats::is_image_extension("mp4"));
}

#[test]
fn test_version_not_empty() {
    assert!(!app_info::version().is_empty());
}
