//! 曲线拟合.
//!
//! 给定一系列点 `(x, y)`, 该模块拟合出一条自然三次样条曲线,
//! 并在任意自变量处求值.

use ndarray::{Array1, ArrayView1};

use crate::IceResult;

mod cubic_spline;

pub use cubic_spline::NaturalCubicSpline;

/// 拟合自然三次样条曲线, 并在 `at` 给出的每个位置求值.
///
/// `x` 是严格递增 (或递减) 的数组, `y` 是对应函数值, 至少两个点.
pub fn natural_spline_f64(
    x: ArrayView1<f64>,
    y: ArrayView1<f64>,
    at: ArrayView1<f64>,
) -> IceResult<Array1<f64>> {
    let spline = NaturalCubicSpline::<f64>::new(x, y)?;
    Ok(at.mapv(|v| spline.eval(v)))
}
