//! 自然三次样条曲线.

use ndarray::ArrayView1;
use num::Float;

use crate::{DegenerateInput, IceResult};

// ref: https://zhuanlan.zhihu.com/p/628508199
//
// 记 h_i = x_{i+1} - x_i, M_i 为节点处二阶导数. 自然边界下 M_0 = M_{n-1} = 0,
// 内部节点满足
//   h_{i-1} M_{i-1} + 2 (h_{i-1} + h_i) M_i + h_i M_{i+1}
//     = 6 ((y_{i+1} - y_i) / h_i - (y_i - y_{i-1}) / h_{i-1}).
// 系数矩阵三对角且严格对角占优, 追赶法即可稳定求解.

/// 自然三次样条 (两端二阶导数为零).
///
/// 节点在内部总是按 `x` 升序保存; 输入严格递减时会先翻转.
#[derive(Debug, Clone)]
pub struct NaturalCubicSpline<T: Float> {
    x: Vec<T>,
    y: Vec<T>,
    m: Vec<T>,
}

impl<T: Float> NaturalCubicSpline<T> {
    /// 以节点 `(x, y)` 构建样条.
    ///
    /// `x` 必须严格递增或严格递减, 且至少两个点. 两个点时退化为直线.
    pub fn new(x: ArrayView1<T>, y: ArrayView1<T>) -> IceResult<Self> {
        if x.len() != y.len() {
            return Err(DegenerateInput::LengthMismatch(x.len(), y.len()).into());
        }
        if x.len() < 2 {
            return Err(DegenerateInput::TooFewMarkers(x.len()).into());
        }
        if !x.iter().chain(y.iter()).all(|v| v.is_finite()) {
            return Err(DegenerateInput::NonFinite.into());
        }

        let increasing = x.windows(2).into_iter().all(|v| v[0] < v[1]);
        let decreasing = x.windows(2).into_iter().all(|v| v[0] > v[1]);
        let (mut xs, mut ys) = (x.to_vec(), y.to_vec());
        match (increasing, decreasing) {
            (true, _) => {}
            (false, true) => {
                xs.reverse();
                ys.reverse();
            }
            (false, false) => return Err(DegenerateInput::NotMonotonic.into()),
        }

        let m = Self::second_derivatives(&xs, &ys);
        Ok(Self { x: xs, y: ys, m })
    }

    /// 节点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// 样条至少有两个节点, 因此永远非空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 在 `t` 处求值. 区间外按两端的三次多项式外推.
    pub fn eval(&self, t: T) -> T {
        let n = self.x.len();
        // 第一个 x > t 的位置减一, 再截断到合法区间.
        let i = self
            .x
            .partition_point(|&v| v <= t)
            .saturating_sub(1)
            .min(n - 2);

        let six = Self::six();
        let h = self.x[i + 1] - self.x[i];
        let a = self.x[i + 1] - t;
        let b = t - self.x[i];
        let (m0, m1) = (self.m[i], self.m[i + 1]);

        m0 * a * a * a / (six * h)
            + m1 * b * b * b / (six * h)
            + (self.y[i] / h - m0 * h / six) * a
            + (self.y[i + 1] / h - m1 * h / six) * b
    }

    /// 求解各节点处的二阶导数. `x` 已保证严格递增.
    fn second_derivatives(x: &[T], y: &[T]) -> Vec<T> {
        let n = x.len();
        let mut m = vec![T::zero(); n];
        if n < 3 {
            return m;
        }

        let two = T::one() + T::one();
        let six = Self::six();
        let h: Vec<T> = x.windows(2).map(|w| w[1] - w[0]).collect();

        // 仅内部 n - 2 个未知量.
        let k = n - 2;
        let mut diag = Vec::with_capacity(k);
        let mut rhs = Vec::with_capacity(k);
        for i in 1..(n - 1) {
            diag.push(two * (h[i - 1] + h[i]));
            rhs.push(six * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]));
        }

        // 追赶法: 消元.
        // 第 r 行的下对角元为 h[r], 上对角元为 h[r + 1].
        for r in 1..k {
            let w = h[r] / diag[r - 1];
            diag[r] = diag[r] - w * h[r];
            rhs[r] = rhs[r] - w * rhs[r - 1];
        }

        // 回代.
        let mut sol = vec![T::zero(); k];
        sol[k - 1] = rhs[k - 1] / diag[k - 1];
        for r in (0..(k - 1)).rev() {
            sol[r] = (rhs[r] - h[r + 1] * sol[r + 1]) / diag[r];
        }

        m[1..(n - 1)].copy_from_slice(&sol);
        m
    }

    #[inline]
    fn six() -> T {
        let three = T::one() + T::one() + T::one();
        three + three
    }
}

#[cfg(test)]
mod tests {
    use super::NaturalCubicSpline;
    use crate::{DegenerateInput, IceError};
    use ndarray::array;

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_spline_passes_through_knots() {
        let x = array![0.0, 1.0, 2.5, 4.0, 7.0];
        let y = array![1.0, -2.0, 0.5, 3.0, 2.0];
        let s = NaturalCubicSpline::new(x.view(), y.view()).unwrap();
        for (xv, yv) in x.iter().zip(y.iter()) {
            assert!(f64_eq(s.eval(*xv), *yv), "{xv} -> {}", s.eval(*xv));
        }
    }

    #[test]
    fn test_spline_two_points_is_line() {
        let x = array![2.0, 6.0];
        let y = array![1.0, 9.0];
        let s = NaturalCubicSpline::new(x.view(), y.view()).unwrap();
        assert!(f64_eq(s.eval(4.0), 5.0));
        assert!(f64_eq(s.eval(3.0), 3.0));
    }

    /// 线性数据的自然样条仍是直线.
    #[test]
    fn test_spline_reproduces_linear_data() {
        let x = array![0.0, 1.0, 3.0, 4.0, 8.0];
        let y = x.mapv(|v| 2.0 * v - 1.0);
        let s = NaturalCubicSpline::new(x.view(), y.view()).unwrap();
        for t in [0.5, 1.7, 2.2, 3.9, 6.5] {
            assert!(f64_eq(s.eval(t), 2.0 * t - 1.0));
        }
    }

    /// 与手算结果对比: 节点 (0, 0), (1, 1), (2, 0), M_1 = -3.
    #[test]
    fn test_spline_hand_computed() {
        let x = array![0.0, 1.0, 2.0];
        let y = array![0.0, 1.0, 0.0];
        let s = NaturalCubicSpline::new(x.view(), y.view()).unwrap();
        // S(t) = -0.5 t^3 + 1.5 t, t in [0, 1].
        assert!(f64_eq(s.eval(0.5), -0.5 * 0.125 + 0.75));
        // 对称性.
        assert!(f64_eq(s.eval(0.5), s.eval(1.5)));
    }

    /// 自然边界: 两端二阶导数为零 (差分近似).
    #[test]
    fn test_spline_natural_boundary() {
        let x = array![0.0, 1.0, 2.0, 3.0];
        let y = array![0.0, 2.0, 1.0, 4.0];
        let s = NaturalCubicSpline::new(x.view(), y.view()).unwrap();
        let e = 1e-4;
        let d2 = |t: f64| (s.eval(t + e) - 2.0 * s.eval(t) + s.eval(t - e)) / (e * e);
        assert!(d2(e).abs() < 1e-2);
        assert!(d2(3.0 - e).abs() < 1e-2);
    }

    #[test]
    fn test_spline_decreasing_equals_increasing() {
        let x = array![0.0, 1.0, 2.0, 3.0];
        let y = array![0.0, 2.0, 1.0, 4.0];
        let up = NaturalCubicSpline::new(x.view(), y.view()).unwrap();
        let (xr, yr) = (
            x.iter().rev().copied().collect::<Vec<_>>(),
            y.iter().rev().copied().collect::<Vec<_>>(),
        );
        let down = NaturalCubicSpline::new(xr.as_slice().into(), yr.as_slice().into()).unwrap();
        for t in [0.3, 1.1, 2.9] {
            assert!(f64_eq(up.eval(t), down.eval(t)));
        }
    }

    #[test]
    fn test_spline_f32() {
        let x = array![0.0_f32, 1.0, 2.0];
        let y = array![0.0_f32, 1.0, 0.0];
        let s = NaturalCubicSpline::new(x.view(), y.view()).unwrap();
        assert!((s.eval(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_spline_invalid_input() {
        let err = |x: &[f64], y: &[f64]| {
            NaturalCubicSpline::new(x.into(), y.into()).unwrap_err()
        };
        assert_eq!(
            err(&[1.0], &[1.0]),
            IceError::DegenerateInput(DegenerateInput::TooFewMarkers(1))
        );
        assert_eq!(
            err(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0]),
            IceError::DegenerateInput(DegenerateInput::NotMonotonic)
        );
        assert_eq!(
            err(&[0.0, 2.0, 1.0], &[0.0, 1.0, 2.0]),
            IceError::DegenerateInput(DegenerateInput::NotMonotonic)
        );
        assert_eq!(
            err(&[0.0, 1.0], &[0.0, 1.0, 2.0]),
            IceError::DegenerateInput(DegenerateInput::LengthMismatch(2, 3))
        );
        assert_eq!(
            err(&[0.0, f64::NAN], &[0.0, 1.0]),
            IceError::DegenerateInput(DegenerateInput::NonFinite)
        );
    }
}
