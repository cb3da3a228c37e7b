//! 尿道曲线.

use itertools::izip;
use ndarray::{Array, Array1};

use crate::fitting::natural_spline_f64;
use crate::{DegenerateInput, IceResult, Point3};

/// 由稀疏尿道标记点拟合并重采样得到的曲线.
///
/// 曲线以 z 为参数, `x(z)` 和 `y(z)` 分别为自然三次样条,
/// z 在首尾标记点之间等距取值. 创建后不可变.
#[derive(Debug, Clone, PartialEq)]
pub struct UrethraCurve {
    points: Vec<Point3>,
}

impl UrethraCurve {
    /// 拟合 `markers` 并重采样为 `count` 个点.
    ///
    /// `markers` 按解剖顺序给出, 至少两个点, z 值严格单调.
    pub fn fit(markers: &[Point3], count: usize) -> IceResult<Self> {
        if markers.len() < 2 {
            return Err(DegenerateInput::TooFewMarkers(markers.len()).into());
        }
        if count < 2 {
            return Err(DegenerateInput::ResampleCount(count).into());
        }

        let x: Array1<f64> = markers.iter().map(|p| p[0]).collect();
        let y: Array1<f64> = markers.iter().map(|p| p[1]).collect();
        let z: Array1<f64> = markers.iter().map(|p| p[2]).collect();

        let (z_first, z_last) = (z[0], z[z.len() - 1]);
        let mut z_new = Array::linspace(z_first, z_last, count);
        // 端点严格取首尾标记点的 z 值.
        z_new[count - 1] = z_last;

        let x_new = natural_spline_f64(z.view(), x.view(), z_new.view())?;
        let y_new = natural_spline_f64(z.view(), y.view(), z_new.view())?;

        let points: Vec<Point3> = izip!(x_new.iter(), y_new.iter(), z_new.iter())
            .map(|(&px, &py, &pz)| [px, py, pz])
            .collect();

        log::debug!(
            "尿道曲线: {} 个标记点 -> {} 个点, z: {z_first} -> {z_last}",
            markers.len(),
            points.len()
        );
        Ok(Self { points })
    }

    /// 曲线点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 曲线至少两个点, 永远非空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 全部曲线点.
    #[inline]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }
}
