//! 探针与尿道的几何信息.

mod probe;
mod urethra;

pub use probe::{ProbeSet, ProbeSource};
pub use urethra::UrethraCurve;

use crate::Point3;

/// 两点欧几里得距离的平方.
#[inline]
pub(crate) fn squared_distance(a: &Point3, b: &Point3) -> f64 {
    a.iter().zip(b).map(|(p, q)| (p - q) * (p - q)).sum()
}

/// 两点在 xy 平面内的距离.
#[inline]
pub(crate) fn plane_distance(a: &Point3, b: &Point3) -> f64 {
    let (dx, dy) = (a[0] - b[0], a[1] - b[1]);
    (dx * dx + dy * dy).sqrt()
}
