//! 索引坐标系 `(i, j, k)` 与物理坐标系 `(x, y, z)` 之间的变换.
//!
//! 注意体数据按 `(k, j, i)` 存储, 而变换总是作用于 `[i, j, k]`.

use crate::config::LimitRule;
use crate::{DegenerateInput, IceResult, Idx3d, Point3};

/// 4x4 齐次仿射变换矩阵, 行优先.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine([[f64; 4]; 4]);

impl Default for Affine {
    #[inline]
    fn default() -> Self {
        Self::identity()
    }
}

impl Affine {
    /// 由行优先矩阵直接构建.
    #[inline]
    pub const fn new(rows: [[f64; 4]; 4]) -> Self {
        Self(rows)
    }

    /// 单位变换.
    pub const fn identity() -> Self {
        Self([
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// 轴对齐的索引 -> 物理变换: `p = origin + spacing * ijk`.
    pub const fn from_spacing_origin(spacing: [f64; 3], origin: Point3) -> Self {
        let [sx, sy, sz] = spacing;
        let [ox, oy, oz] = origin;
        Self([
            [sx, 0.0, 0.0, ox],
            [0.0, sy, 0.0, oy],
            [0.0, 0.0, sz, oz],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    /// 行优先矩阵.
    #[inline]
    pub fn rows(&self) -> &[[f64; 4]; 4] {
        &self.0
    }

    /// 作用于点 `p`: 齐次坐标乘法后丢弃第四维.
    #[inline]
    pub fn apply(&self, p: Point3) -> Point3 {
        let m = &self.0;
        let mut out = [0.0; 3];
        for (r, o) in out.iter_mut().enumerate() {
            *o = m[r][0] * p[0] + m[r][1] * p[1] + m[r][2] * p[2] + m[r][3];
        }
        out
    }

    /// 矩阵乘法 `self * rhs`.
    pub fn compose(&self, rhs: &Affine) -> Affine {
        let mut out = [[0.0; 4]; 4];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = (0..4).map(|t| self.0[r][t] * rhs.0[t][c]).sum();
            }
        }
        Affine(out)
    }

    /// 以部分主元 Gauss-Jordan 消元求逆. 不可逆时返回 `None`.
    pub fn inverse(&self) -> Option<Affine> {
        let mut a = self.0;
        let mut inv = Self::identity().0;
        let scale = a.iter().flatten().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if scale == 0.0 || !scale.is_finite() {
            return None;
        }

        for col in 0..4 {
            let pivot = (col..4).max_by(|&r, &s| a[r][col].abs().total_cmp(&a[s][col].abs()))?;
            if a[pivot][col].abs() <= scale * 1e-12 {
                return None;
            }
            a.swap(col, pivot);
            inv.swap(col, pivot);

            let p = a[col][col];
            for c in 0..4 {
                a[col][c] /= p;
                inv[col][c] /= p;
            }
            for r in (0..4).filter(|&r| r != col) {
                let f = a[r][col];
                if f == 0.0 {
                    continue;
                }
                for c in 0..4 {
                    a[r][c] -= f * a[col][c];
                    inv[r][c] -= f * inv[col][c];
                }
            }
        }
        Some(Affine(inv))
    }

    /// 与 `other` 的逐元素最大偏差.
    fn max_deviation(&self, other: &Affine) -> f64 {
        self.0
            .iter()
            .flatten()
            .zip(other.0.iter().flatten())
            .fold(0.0, |acc, (a, b)| acc.max((a - b).abs()))
    }
}

/// 索引空间与物理空间之间互逆的一对变换.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    index_to_physical: Affine,
    physical_to_index: Affine,
}

/// 判定两个变换互逆时允许的偏差.
const ROUND_TRIP_TOLERANCE: f64 = 1e-6;

impl CoordinateMapper {
    /// 由正变换及其逆变换构建. 两者的乘积偏离单位阵过多时返回
    /// [`DegenerateInput::TransformMismatch`].
    pub fn new(index_to_physical: Affine, physical_to_index: Affine) -> IceResult<Self> {
        let product = index_to_physical.compose(&physical_to_index);
        if !(product.max_deviation(&Affine::identity()) <= ROUND_TRIP_TOLERANCE) {
            return Err(DegenerateInput::TransformMismatch.into());
        }
        Ok(Self {
            index_to_physical,
            physical_to_index,
        })
    }

    /// 仅给出索引 -> 物理变换, 逆变换由求逆得到.
    pub fn from_index_to_physical(index_to_physical: Affine) -> IceResult<Self> {
        let physical_to_index = index_to_physical
            .inverse()
            .ok_or(DegenerateInput::SingularTransform)?;
        Ok(Self {
            index_to_physical,
            physical_to_index,
        })
    }

    /// 轴对齐网格的变换.
    #[inline]
    pub fn from_spacing_origin(spacing: [f64; 3], origin: Point3) -> IceResult<Self> {
        Self::from_index_to_physical(Affine::from_spacing_origin(spacing, origin))
    }

    /// 索引 -> 物理变换.
    #[inline]
    pub fn index_to_physical(&self) -> &Affine {
        &self.index_to_physical
    }

    /// 物理 -> 索引变换.
    #[inline]
    pub fn physical_to_index(&self) -> &Affine {
        &self.physical_to_index
    }

    /// 物理坐标 -> 连续索引坐标 `[i, j, k]`.
    #[inline]
    pub fn to_index(&self, p: Point3) -> Point3 {
        self.physical_to_index.apply(p)
    }

    /// 索引坐标 `[i, j, k]` -> 物理坐标.
    #[inline]
    pub fn to_physical(&self, ijk: Point3) -> Point3 {
        self.index_to_physical.apply(ijk)
    }

    /// 见 [`compute_limits`].
    #[inline]
    pub fn compute_limits(&self, probes: &[Point3], rule: &LimitRule) -> ScanLimits {
        compute_limits(probes, &self.physical_to_index, rule)
    }
}

/// 索引空间中的轴对齐扫描范围, 两端均包含.
///
/// 该范围可能部分或完全落在网格外, 扫描前应使用 [`ScanLimits::clip_to`] 裁剪.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// `(iMin, iMax)`.
    pub i: (i64, i64),

    /// `(jMin, jMax)`.
    pub j: (i64, i64),

    /// `(kMin, kMax)`.
    pub k: (i64, i64),
}

impl ScanLimits {
    /// 覆盖形状为 `(切片数, 行数, 列数)` 的整个网格.
    ///
    /// 形状的任一维为 0 时 panic.
    pub fn full((slices, rows, cols): Idx3d) -> Self {
        assert!(slices > 0 && rows > 0 && cols > 0, "网格不能为空");
        Self {
            i: (0, cols as i64 - 1),
            j: (0, rows as i64 - 1),
            k: (0, slices as i64 - 1),
        }
    }

    /// 按 `(iMin, iMax, jMin, jMax, kMin, kMax)` 顺序展开.
    #[inline]
    pub fn as_array(&self) -> [i64; 6] {
        [self.i.0, self.i.1, self.j.0, self.j.1, self.k.0, self.k.1]
    }

    /// 范围是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.i.0 > self.i.1 || self.j.0 > self.j.1 || self.k.0 > self.k.1
    }

    /// 范围内的体素个数.
    pub fn voxel_count(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        let len = |(lo, hi): (i64, i64)| {
            u64::try_from(i128::from(hi) - i128::from(lo) + 1).unwrap_or(u64::MAX)
        };
        len(self.i)
            .saturating_mul(len(self.j))
            .saturating_mul(len(self.k))
    }

    /// 与形状为 `(切片数, 行数, 列数)` 的网格求交.
    /// 交集为空 (包括网格本身为空) 时返回 `None`.
    pub fn clip_to(&self, shape: Idx3d) -> Option<Self> {
        if shape.0 == 0 || shape.1 == 0 || shape.2 == 0 {
            return None;
        }
        let full = Self::full(shape);
        let meet = |(a, b): (i64, i64), (c, d): (i64, i64)| (a.max(c), b.min(d));
        let clipped = Self {
            i: meet(self.i, full.i),
            j: meet(self.j, full.j),
            k: meet(self.k, full.k),
        };
        (!clipped.is_empty()).then_some(clipped)
    }

    /// 第 `k` 张切片是否在范围内.
    #[inline]
    pub fn contains_slice(&self, k: usize) -> bool {
        (self.k.0..=self.k.1).contains(&(k as i64))
    }
}

/// 由探针针尖位置推导索引空间扫描范围.
///
/// 每个针尖经 `physical_to_index` 映射到索引空间并向零取整,
/// 取各轴最小/最大值后按 `rule.margin` 向外扩展;
/// 上界截断到 `rule.upper_clamp`, 切片方向下界不小于 `rule.slice_floor`.
/// `i`, `j` 方向的下界不做截断.
/// 远离网格的针尖 (索引超出 `i64`) 按饱和运算处理, 不会溢出.
///
/// `probes` 为空时 panic.
pub fn compute_limits(probes: &[Point3], physical_to_index: &Affine, rule: &LimitRule) -> ScanLimits {
    assert!(!probes.is_empty(), "至少需要一根探针");

    let mut lo = [i64::MAX; 3];
    let mut hi = [i64::MIN; 3];
    for p in probes {
        let ijk = physical_to_index.apply(*p);
        for axis in 0..3 {
            let v = ijk[axis] as i64;
            lo[axis] = lo[axis].min(v);
            hi[axis] = hi[axis].max(v);
        }
    }

    let [mi, mj, mk] = rule.margin;
    let [ci, cj, ck] = rule.upper_clamp;
    let limits = ScanLimits {
        i: (lo[0].saturating_sub(mi), hi[0].saturating_add(mi).min(ci)),
        j: (lo[1].saturating_sub(mj), hi[1].saturating_add(mj).min(cj)),
        k: (
            lo[2].saturating_sub(mk).max(rule.slice_floor),
            hi[2].saturating_add(mk).min(ck),
        ),
    };
    log::debug!("探针推出的扫描范围: {:?}", limits.as_array());
    limits
}
