//! 冰球概率经验模型.
//!
//! 对采样点 `p`, 记
//!
//! - `plane`: 各针尖到 `p` 的 xy 平面距离之和的平方;
//! - `axial`: 各针尖到 `p` 的 z 方向绝对偏差之和的平方;
//! - `urethra`: `p` 到对应尿道曲线点的三维距离,
//!
//! 则 `v = c0 + c1 * plane + c2 * axial + c3 * urethra`, 概率为 `logistic(v)`.
//! 三针模型的 `plane`, `axial` 额外除以 4.

use crate::consts::{coefficients, URETHRA_CUTOFF};
use crate::geometry::{plane_distance, squared_distance};
use crate::{Point3, ProbeSet};

/// 模型线性部分的系数.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    /// 常数项 `c0`.
    pub intercept: f64,

    /// 平面距离项 `c1`.
    pub plane: f64,

    /// z 方向偏差项 `c2`.
    pub axial: f64,

    /// 尿道距离项 `c3`.
    pub urethra: f64,
}

impl Coefficients {
    /// 线性组合 `v`.
    #[inline]
    pub fn linear(&self, plane: f64, axial: f64, urethra: f64) -> f64 {
        self.intercept + self.plane * plane + self.axial * axial + self.urethra * urethra
    }
}

/// 数值稳定的 logistic 函数 `exp(v) / (1 + exp(v))`.
///
/// 对任意 `v` 结果都在 `[0, 1]` 内, 不会溢出. `NaN` 视为 0.
#[inline]
pub fn logistic(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else if v >= 0.0 {
        1.0 / (1.0 + (-v).exp())
    } else {
        let e = v.exp();
        e / (1.0 + e)
    }
}

/// 针尖相对采样点的 `(平面距离之和, z 偏差之和)`, 均未平方.
#[inline]
fn spread(probes: &[Point3], sample: &Point3) -> (f64, f64) {
    probes.iter().fold((0.0, 0.0), |(plane, axial), tip| {
        (
            plane + plane_distance(tip, sample),
            axial + (sample[2] - tip[2]).abs(),
        )
    })
}

/// 双针模型.
///
/// 采样点到尿道点的距离不超过 `cutoff` 时直接返回 0.
pub fn two_probe(probes: &[Point3; 2], sample: Point3, urethra: Point3, cutoff: f64) -> f64 {
    let (plane, axial) = spread(probes, &sample);
    let dist = squared_distance(&sample, &urethra).sqrt();
    if dist > cutoff {
        logistic(coefficients::TWO_PROBE.linear(plane * plane, axial * axial, dist))
    } else {
        0.0
    }
}

/// 三针模型. 没有尿道安全距离.
pub fn three_probe(probes: &[Point3; 3], sample: Point3, urethra: Point3) -> f64 {
    let (plane, axial) = spread(probes, &sample);
    let dist = squared_distance(&sample, &urethra).sqrt();
    logistic(coefficients::THREE_PROBE.linear(
        plane * plane / 4.0,
        axial * axial / 4.0,
        dist,
    ))
}

/// 按探针组针数选择模型变体.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbabilityModel {
    urethra_cutoff: f64,
}

impl Default for ProbabilityModel {
    #[inline]
    fn default() -> Self {
        Self::new(URETHRA_CUTOFF)
    }
}

impl ProbabilityModel {
    /// `urethra_cutoff` 只对双针模型生效.
    #[inline]
    pub const fn new(urethra_cutoff: f64) -> Self {
        Self { urethra_cutoff }
    }

    /// 双针模型的尿道安全距离.
    #[inline]
    pub fn urethra_cutoff(&self) -> f64 {
        self.urethra_cutoff
    }

    /// 计算采样点 `sample` 处的冰球概率. `urethra` 为该切片对应的尿道曲线点.
    #[inline]
    pub fn evaluate(&self, probes: &ProbeSet, sample: Point3, urethra: Point3) -> f64 {
        match probes {
            ProbeSet::Two(p) => two_probe(p, sample, urethra, self.urethra_cutoff),
            ProbeSet::Three(p) => three_probe(p, sample, urethra),
        }
    }
}
