//! Shared test utilities for the feature-service workspace.
//!
//! This crate provides common testing infrastructure including:
//! - An in-memory bundle store and opener with call counters
//! - Canned bundles and geometry text
//! - Approximate float assertions
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{cells_bundle, MemoryOpener};
//!
//! let opener = MemoryOpener::new(cells_bundle());
//! ```

pub mod fixtures;
pub mod memory;

// Re-export commonly used items at the crate root
pub use fixtures::*;
pub use memory::{MemoryBundle, MemoryOpener};

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Approximate equality of a GeoJSON position against an `(x, y)` pair.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_position_approx_eq;
///
/// assert_position_approx_eq!([1.0001, 2.0001], (1.0, 2.0), 0.001);
/// ```
#[macro_export]
macro_rules! assert_position_approx_eq {
    ($position:expr, ($x:expr, $y:expr), $epsilon:expr) => {{
        let position: [f64; 2] = $position;
        $crate::assert_approx_eq!(position[0], $x, $epsilon);
        $crate::assert_approx_eq!(position[1], $y, $epsilon);
    }};
}
