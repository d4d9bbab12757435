//! Hilbert curve ordering used by bulk loading.
//!
//! Inserting entries in Hilbert order keeps consecutive insertions spatially
//! close, so leaves fill with neighbours and fewer splits produce overlapping
//! siblings.

use crate::bounding_box::BoundingBox;

/// Maximum order for Hilbert curve encoding
const MAX_HILBERT_ORDER: u32 = 32;

/// Encodes normalized coordinates in `[0, 1]` to a Hilbert curve distance.
///
/// At order `n` the curve covers a `2^n x 2^n` grid, so the result is below `4^n`.
///
/// ```rust
/// use sam_rtree::hilbert::hilbert_index;
///
/// assert_eq!(hilbert_index(0.0, 0.0, 8), 0);
/// assert!(hilbert_index(0.5, 0.5, 16) < (1u64 << 32));
/// ```
pub fn hilbert_index(x: f64, y: f64, order: u32) -> u64 {
    debug_assert!((0.0..=1.0).contains(&x), "x must be in [0,1]");
    debug_assert!((0.0..=1.0).contains(&y), "y must be in [0,1]");
    debug_assert!(order > 0 && order <= MAX_HILBERT_ORDER, "order must be 1-32");

    let n = 1u64 << order;
    let xi = ((x * (n as f64 - 0.5)) as u64).min(n - 1);
    let yi = ((y * (n as f64 - 0.5)) as u64).min(n - 1);

    xy2d(n, xi, yi)
}

/// Encodes absolute coordinates, normalizing them against `bounds` first.
///
/// Points outside `bounds` are clamped to its edge; an axis with zero span
/// maps every coordinate to its middle.
pub fn hilbert_index_bounded(x: f64, y: f64, bounds: &BoundingBox, order: u32) -> u64 {
    let normalize = |v: f64, min: f64, span: f64| {
        if span > 0.0 {
            ((v - min) / span).clamp(0.0, 1.0)
        } else {
            0.5
        }
    };

    hilbert_index(
        normalize(x, bounds.min_x, bounds.width()),
        normalize(y, bounds.min_y, bounds.height()),
        order,
    )
}

/// Hilbert distance of a rectangle's center inside `bounds`.
pub fn hilbert_key(mbr: &BoundingBox, bounds: &BoundingBox, order: u32) -> u64 {
    let (cx, cy) = mbr.center();
    hilbert_index_bounded(cx, cy, bounds, order)
}

fn xy2d(n: u64, mut x: u64, mut y: u64) -> u64 {
    let mut d = 0u64;
    let mut s = n / 2;

    while s > 0 {
        let rx = ((x & s) > 0) as u64;
        let ry = ((y & s) > 0) as u64;
        d += s * s * ((3 * rx) ^ ry);
        rotate(s, &mut x, &mut y, rx, ry);
        s /= 2;
    }

    d
}

fn rotate(n: u64, x: &mut u64, y: &mut u64, rx: u64, ry: u64) {
    if ry == 0 {
        if rx == 1 {
            *x = n.wrapping_sub(1).wrapping_sub(*x);
            *y = n.wrapping_sub(1).wrapping_sub(*y);
        }
        std::mem::swap(x, y);
    }
}
