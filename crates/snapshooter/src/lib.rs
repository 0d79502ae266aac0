//! Snapshot comparison for visual regression tests.
//!
//! A rendered [`Bitmap`] is scored against a stored reference with a
//! per-channel tolerance, and a difference image is produced when the score
//! falls below the configured threshold.

pub mod bitmap;
pub mod compare;
pub mod composite;
pub mod config;
pub mod pixels;
pub mod store;

pub use self::bitmap::{Bitmap, BitmapError, Size};
pub use self::compare::diff::{DiffError, DifferenceRenderer, highlight_difference};
pub use self::compare::{
    CompareError, CompareOptions, Comparator, Side, Verdict, score_buffers, similarity,
};
pub use self::composite::{BlendMode, Compositor, DrawOp, SoftwareCompositor};
pub use self::pixels::{Decoder, ExtractError, PixelBuffer, PremultipliedRgba, extract_pixels};
pub use self::store::{
    Artifacts, SnapshotStatus, SnapshotStore, assert_snapshot, check_snapshot,
    current_test_snapshot_name, snapshot_name,
};
