//! 运行配置.

use crate::consts::{self, grid, limits};
use crate::Idx3d;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 实际扫描的索引范围.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScanExtent {
    /// 扫描整个网格. 由探针推出的范围仍会计算并记录, 但不参与扫描.
    #[default]
    FullGrid,

    /// 只扫描探针附近 (由 [`LimitRule`] 推出) 的范围.
    ProbeLocal,
}

/// 由探针位置推导扫描范围的规则. 各数组均以 `[i, j, k]` 顺序给出.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LimitRule {
    /// 包围盒向外扩展量.
    pub margin: [i64; 3],

    /// 上界截断值.
    pub upper_clamp: [i64; 3],

    /// 切片方向下界的最小值.
    pub slice_floor: i64,
}

impl Default for LimitRule {
    fn default() -> Self {
        Self {
            margin: limits::MARGIN,
            upper_clamp: limits::UPPER_CLAMP,
            slice_floor: limits::SLICE_FLOOR,
        }
    }
}

/// 一次计算的全部可调参数. `Default` 即参考流程的取值.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlanConfig {
    /// 尿道曲线重采样点数.
    pub resample_count: usize,

    /// 掩膜阈值. 概率严格大于该值的体素被标记.
    pub threshold: f64,

    /// 扫描范围推导规则.
    pub limit_rule: LimitRule,

    /// 旧版多点探针的 z 修正量.
    pub legacy_z_offset: f64,

    /// 双针模型的尿道安全距离.
    pub urethra_cutoff: f64,

    /// 输出网格形状 `(切片数, 行数, 列数)`.
    pub shape: Idx3d,

    /// 实际扫描范围.
    pub extent: ScanExtent,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            resample_count: consts::RESAMPLE_COUNT,
            threshold: consts::PROBABILITY_THRESHOLD,
            limit_rule: LimitRule::default(),
            legacy_z_offset: consts::LEGACY_Z_OFFSET,
            urethra_cutoff: consts::URETHRA_CUTOFF,
            shape: grid::SHAPE,
            extent: ScanExtent::default(),
        }
    }
}

impl PlanConfig {
    /// 设置重采样点数.
    #[inline]
    pub fn with_resample_count(mut self, count: usize) -> Self {
        self.resample_count = count;
        self
    }

    /// 设置掩膜阈值.
    #[inline]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// 设置扫描范围推导规则.
    #[inline]
    pub fn with_limit_rule(mut self, rule: LimitRule) -> Self {
        self.limit_rule = rule;
        self
    }

    /// 设置旧版多点探针的 z 修正量.
    #[inline]
    pub fn with_legacy_z_offset(mut self, offset: f64) -> Self {
        self.legacy_z_offset = offset;
        self
    }

    /// 设置双针模型的尿道安全距离.
    #[inline]
    pub fn with_urethra_cutoff(mut self, cutoff: f64) -> Self {
        self.urethra_cutoff = cutoff;
        self
    }

    /// 设置输出网格形状 `(切片数, 行数, 列数)`.
    #[inline]
    pub fn with_shape(mut self, shape: Idx3d) -> Self {
        self.shape = shape;
        self
    }

    /// 设置实际扫描范围.
    #[inline]
    pub fn with_extent(mut self, extent: ScanExtent) -> Self {
        self.extent = extent;
        self
    }
}
