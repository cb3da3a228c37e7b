//! 通用常量. 这些值即参考流程中使用的默认配置, 见 [`crate::PlanConfig`].

/// 尿道曲线重采样点数.
pub const RESAMPLE_COUNT: usize = 40;

/// 概率大于该值的体素计入消融掩膜.
pub const PROBABILITY_THRESHOLD: f64 = 0.8;

/// 双针模型的尿道安全距离 (物理单位). 不超过该距离的体素概率恒为 0.
pub const URETHRA_CUTOFF: f64 = 5.0;

/// 旧版多点探针标记的 z 方向修正量.
pub const LEGACY_Z_OFFSET: f64 = -10.0;

/// 概率写入体数据前的放大倍数.
pub const PROBABILITY_SCALE: f64 = 10.0;

/// 默认网格形状, 按 `(切片数, 行数, 列数)` 组织.
pub mod grid {
    use crate::Idx3d;

    /// 默认切片数. 必须不大于尿道曲线重采样点数.
    pub const SLICES: usize = super::RESAMPLE_COUNT;

    /// 每张切片的行数 (j 方向).
    pub const ROWS: usize = 168;

    /// 每张切片的列数 (i 方向).
    pub const COLS: usize = 192;

    /// 默认网格形状.
    pub const SHAPE: Idx3d = (SLICES, ROWS, COLS);
}

/// 由探针位置推导扫描范围时使用的常量, 均以 `[i, j, k]` 顺序给出.
pub mod limits {
    /// 在探针包围盒基础上向外扩展的索引单位.
    pub const MARGIN: [i64; 3] = [30, 30, 5];

    /// 扫描范围上界的截断值.
    pub const UPPER_CLAMP: [i64; 3] = [190, 168, 19];

    /// 切片方向下界的最小值.
    pub const SLICE_FLOOR: i64 = 1;
}

/// 概率模型系数.
pub mod coefficients {
    use crate::model::Coefficients;

    /// 双针模型系数.
    pub const TWO_PROBE: Coefficients = Coefficients {
        intercept: 4.1,
        plane: -0.006,
        axial: -0.0038,
        urethra: 0.18,
    };

    /// 三针模型系数.
    pub const THREE_PROBE: Coefficients = Coefficients {
        intercept: 4.1,
        plane: -0.006,
        axial: -0.0038,
        urethra: 0.08,
    };
}
