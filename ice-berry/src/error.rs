//! 运行时错误.

use std::fmt;

use crate::Idx3d;

/// 冰球概率计算的运行时结果.
pub type IceResult<T> = Result<T, IceError>;

/// 输入数据存在但无法使用.
#[derive(Debug, Clone, PartialEq)]
pub enum DegenerateInput {
    /// 尿道标记点不足. 参数为实际点数, 至少需要两个.
    TooFewMarkers(usize),

    /// 标记点的 z 值不严格单调.
    NotMonotonic,

    /// 出现 inf 或 NaN 坐标.
    NonFinite,

    /// 自变量与函数值个数不一致. `(x 个数, y 个数)`.
    LengthMismatch(usize, usize),

    /// 重采样点数不足. 参数为给定点数, 至少需要两个.
    ResampleCount(usize),

    /// 探针来源多于三个. 参数为实际个数.
    TooManyProbes(usize),

    /// 仿射变换不可逆.
    SingularTransform,

    /// 给定的正变换与逆变换不互逆.
    TransformMismatch,

    /// 输出网格形状的某一维为 0. 参数为 `(切片数, 行数, 列数)`.
    EmptyGrid(Idx3d),

    /// 扫描的切片数超出尿道曲线点数.
    UrethraTooShort {
        /// 需要的切片数.
        slices: usize,

        /// 尿道曲线点数.
        points: usize,
    },
}

/// 缺少必需的输入.
#[derive(Debug, Clone, PartialEq)]
pub enum MissingInput {
    /// 可读的探针不足两根. 参数为实际可读的个数.
    Probes(usize),

    /// 缺少索引/物理坐标变换.
    Transform,
}

/// 冰球概率计算错误.
#[derive(Debug, Clone, PartialEq)]
pub enum IceError {
    /// 输入数据退化.
    DegenerateInput(DegenerateInput),

    /// 缺少必需的输入.
    MissingRequiredInput(MissingInput),

    /// 扫描被外部取消. 此时不会产生任何部分结果.
    Cancelled,
}

impl From<DegenerateInput> for IceError {
    #[inline]
    fn from(e: DegenerateInput) -> Self {
        Self::DegenerateInput(e)
    }
}

impl From<MissingInput> for IceError {
    #[inline]
    fn from(e: MissingInput) -> Self {
        Self::MissingRequiredInput(e)
    }
}

impl fmt::Display for DegenerateInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewMarkers(n) => write!(f, "至少需要两个尿道标记点, 实际为 {n} 个"),
            Self::NotMonotonic => f.write_str("标记点的 z 值必须严格递增或严格递减"),
            Self::NonFinite => f.write_str("坐标中出现 inf 或 NaN"),
            Self::LengthMismatch(x, y) => write!(f, "x 值 ({x} 个) 和 y 值 ({y} 个) 必须一一对应"),
            Self::ResampleCount(n) => write!(f, "重采样点数至少为 2, 实际为 {n}"),
            Self::TooManyProbes(n) => write!(f, "最多支持三根探针, 实际为 {n} 根"),
            Self::SingularTransform => f.write_str("仿射变换矩阵不可逆"),
            Self::TransformMismatch => f.write_str("正变换与逆变换不互逆"),
            Self::EmptyGrid((k, j, i)) => write!(f, "输出网格 ({k}, {j}, {i}) 不能有为 0 的维度"),
            Self::UrethraTooShort { slices, points } => {
                write!(f, "扫描需要 {slices} 张切片, 但尿道曲线只有 {points} 个点")
            }
        }
    }
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Probes(n) => write!(f, "至少需要两根可读探针, 实际为 {n} 根"),
            Self::Transform => f.write_str("缺少索引/物理坐标变换"),
        }
    }
}

impl fmt::Display for IceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DegenerateInput(e) => write!(f, "输入退化: {e}"),
            Self::MissingRequiredInput(e) => write!(f, "缺少输入: {e}"),
            Self::Cancelled => f.write_str("扫描已取消"),
        }
    }
}

impl std::error::Error for DegenerateInput {}

impl std::error::Error for MissingInput {}

impl std::error::Error for IceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DegenerateInput(e) => Some(e),
            Self::MissingRequiredInput(e) => Some(e),
            Self::Cancelled => None,
        }
    }
}
