//! 体素扫描.
//!
//! 对扫描范围内的每个 `(i, j, k)`, 计算体素中心的物理坐标, 取第 `k`
//! 个尿道曲线点, 求冰球概率并写入三个同形状的体数据 (按 `(k, j, i)` 索引):
//!
//! - 掩膜: 概率大于阈值时为 `1.0`, 否则为 `0.0`;
//! - 整数概率: `round(10 * p)`;
//! - 浮点概率: `10 * p`.

mod sink;

pub use sink::{CsvSink, VoxelSample, VoxelSink};

use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::{Array3, ArrayView3, ArrayViewMut2, Axis};

use sink::NoSink;

use crate::consts::PROBABILITY_SCALE;
use crate::{
    CoordinateMapper, DegenerateInput, IceError, IceResult, Idx3d, ProbabilityModel, ProbeSet,
    ScanLimits, UrethraCurve,
};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 扫描输出的三个体数据, 形状均为 `(切片数, 行数, 列数)`.
#[derive(Debug, Clone, PartialEq)]
pub struct IceballVolumes {
    mask: Array3<f32>,
    scaled: Array3<u8>,
    raw: Array3<f32>,
}

impl IceballVolumes {
    /// 创建全零体数据.
    pub fn zeros(shape: Idx3d) -> Self {
        Self {
            mask: Array3::zeros(shape),
            scaled: Array3::zeros(shape),
            raw: Array3::zeros(shape),
        }
    }

    /// 由三个已有体数据组装. 形状不一致时返回 `None`.
    pub fn from_parts(mask: Array3<f32>, scaled: Array3<u8>, raw: Array3<f32>) -> Option<Self> {
        let shape = mask.dim();
        if scaled.dim() != shape || raw.dim() != shape {
            return None;
        }
        Some(Self { mask, scaled, raw })
    }

    /// 数据形状 `(切片数, 行数, 列数)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.mask.dim()
    }

    /// 二值消融掩膜.
    #[inline]
    pub fn mask(&self) -> ArrayView3<'_, f32> {
        self.mask.view()
    }

    /// `round(10 * p)`.
    #[inline]
    pub fn scaled(&self) -> ArrayView3<'_, u8> {
        self.scaled.view()
    }

    /// `10 * p`.
    #[inline]
    pub fn raw(&self) -> ArrayView3<'_, f32> {
        self.raw.view()
    }

    /// 拆分为 `(掩膜, 整数概率, 浮点概率)`.
    #[inline]
    pub fn into_parts(self) -> (Array3<f32>, Array3<u8>, Array3<f32>) {
        (self.mask, self.scaled, self.raw)
    }

    /// 掩膜中被标记的体素个数.
    pub fn masked_count(&self) -> usize {
        self.mask.iter().filter(|v| **v != 0.0).count()
    }
}

/// 扫描统计.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScanSummary {
    /// 实际求值的体素个数.
    pub evaluated: u64,

    /// 写入掩膜的体素个数.
    pub masked: u64,

    /// 最大概率, 未放大.
    pub max_probability: f64,
}

impl ScanSummary {
    #[inline]
    fn record(&mut self, prob: f64, masked: bool) {
        self.evaluated += 1;
        self.masked += masked as u64;
        self.max_probability = self.max_probability.max(prob);
    }

    #[inline]
    fn merge(self, other: Self) -> Self {
        Self {
            evaluated: self.evaluated + other.evaluated,
            masked: self.masked + other.masked,
            max_probability: self.max_probability.max(other.max_probability),
        }
    }
}

/// 体素扫描器. 只读地持有一次计算的全部输入.
#[derive(Debug, Clone, Copy)]
pub struct VolumeScanner<'a> {
    mapper: &'a CoordinateMapper,
    probes: &'a ProbeSet,
    urethra: &'a UrethraCurve,
    model: ProbabilityModel,
    threshold: f64,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> VolumeScanner<'a> {
    /// 初始化. 概率严格大于 `threshold` 的体素写入掩膜.
    pub fn new(
        mapper: &'a CoordinateMapper,
        probes: &'a ProbeSet,
        urethra: &'a UrethraCurve,
        model: ProbabilityModel,
        threshold: f64,
    ) -> Self {
        Self {
            mapper,
            probes,
            urethra,
            model,
            threshold,
            cancel: None,
        }
    }

    /// 设置取消标志. 每张切片开始前检查一次, 被置位时扫描返回 [`IceError::Cancelled`].
    #[inline]
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// 扫描 `limits` 与 `volumes` 网格的交集, 返回填充后的体数据和统计.
    ///
    /// 打开 `rayon` feature 时按切片并行, 结果与串行扫描一致.
    /// 交集为空时原样返回 `volumes`.
    pub fn scan(
        &self,
        limits: &ScanLimits,
        mut volumes: IceballVolumes,
    ) -> IceResult<(IceballVolumes, ScanSummary)> {
        let Some(limits) = self.prepare(limits, volumes.shape())? else {
            return Ok((volumes, ScanSummary::default()));
        };

        #[cfg(feature = "rayon")]
        let summary = self.scan_parallel(&limits, &mut volumes)?;
        #[cfg(not(feature = "rayon"))]
        let summary = self.scan_sequential(&limits, &mut volumes, &mut NoSink)?;
        log::info!(
            "扫描完成: {} 个体素, 其中 {} 个写入掩膜",
            summary.evaluated,
            summary.masked
        );
        Ok((volumes, summary))
    }

    /// 同 [`VolumeScanner::scan`], 但每个体素都会交给 `sink`. 总是串行扫描.
    pub fn scan_with_sink<S: VoxelSink + ?Sized>(
        &self,
        limits: &ScanLimits,
        mut volumes: IceballVolumes,
        sink: &mut S,
    ) -> IceResult<(IceballVolumes, ScanSummary)> {
        let Some(limits) = self.prepare(limits, volumes.shape())? else {
            return Ok((volumes, ScanSummary::default()));
        };
        let summary = self.scan_sequential(&limits, &mut volumes, sink)?;
        log::info!(
            "扫描完成: {} 个体素, 其中 {} 个写入掩膜",
            summary.evaluated,
            summary.masked
        );
        Ok((volumes, summary))
    }

    /// 将范围裁剪到网格内, 并检查尿道曲线能覆盖所有待扫描的切片.
    fn prepare(&self, limits: &ScanLimits, shape: Idx3d) -> IceResult<Option<ScanLimits>> {
        let Some(clipped) = limits.clip_to(shape) else {
            log::warn!("扫描范围 {:?} 与网格 {shape:?} 不相交", limits.as_array());
            return Ok(None);
        };
        let slices = clipped.k.1 as usize + 1;
        if slices > self.urethra.len() {
            return Err(DegenerateInput::UrethraTooShort {
                slices,
                points: self.urethra.len(),
            }
            .into());
        }
        log::info!(
            "开始扫描: 范围 {:?}, 共 {} 个体素",
            clipped.as_array(),
            clipped.voxel_count()
        );
        Ok(Some(clipped))
    }

    #[inline]
    fn check_cancel(&self) -> IceResult<()> {
        match self.cancel {
            Some(flag) if flag.load(Ordering::Acquire) => Err(IceError::Cancelled),
            _ => Ok(()),
        }
    }

    fn scan_sequential<S: VoxelSink + ?Sized>(
        &self,
        limits: &ScanLimits,
        volumes: &mut IceballVolumes,
        sink: &mut S,
    ) -> IceResult<ScanSummary> {
        let IceballVolumes { mask, scaled, raw } = volumes;
        let mut summary = ScanSummary::default();
        for (k, ((m, s), r)) in mask
            .axis_iter_mut(Axis(0))
            .zip(scaled.axis_iter_mut(Axis(0)))
            .zip(raw.axis_iter_mut(Axis(0)))
            .enumerate()
            .filter(|(k, _)| limits.contains_slice(*k))
        {
            self.check_cancel()?;
            summary = summary.merge(self.fill_slice(k, limits, m, s, r, &mut *sink));
        }
        Ok(summary)
    }

    /// 各切片互不相交, 每个任务只写自己的切片.
    #[cfg(feature = "rayon")]
    fn scan_parallel(
        &self,
        limits: &ScanLimits,
        volumes: &mut IceballVolumes,
    ) -> IceResult<ScanSummary> {
        let IceballVolumes { mask, scaled, raw } = volumes;
        mask.axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(scaled.axis_iter_mut(Axis(0)).into_par_iter())
            .zip(raw.axis_iter_mut(Axis(0)).into_par_iter())
            .enumerate()
            .filter(|(k, _)| limits.contains_slice(*k))
            .map(|(k, ((m, s), r))| -> IceResult<ScanSummary> {
                self.check_cancel()?;
                Ok(self.fill_slice(k, limits, m, s, r, &mut NoSink))
            })
            .try_reduce(ScanSummary::default, |a, b| Ok(a.merge(b)))
    }

    /// 填充第 `k` 张切片在 `limits` 内的部分. `limits` 已裁剪到网格内.
    fn fill_slice<S: VoxelSink + ?Sized>(
        &self,
        k: usize,
        limits: &ScanLimits,
        mut mask: ArrayViewMut2<f32>,
        mut scaled: ArrayViewMut2<u8>,
        mut raw: ArrayViewMut2<f32>,
        sink: &mut S,
    ) -> ScanSummary {
        let urethra = self.urethra.points()[k];
        let mut summary = ScanSummary::default();
        for j in limits.j.0..=limits.j.1 {
            for i in limits.i.0..=limits.i.1 {
                let (ju, iu) = (j as usize, i as usize);
                let position = self.mapper.to_physical([i as f64, j as f64, k as f64]);
                let prob = self.model.evaluate(self.probes, position, urethra);

                let value = PROBABILITY_SCALE * prob;
                let masked = prob > self.threshold;
                raw[[ju, iu]] = value as f32;
                scaled[[ju, iu]] = value.round() as u8;
                mask[[ju, iu]] = if masked { 1.0 } else { 0.0 };

                summary.record(prob, masked);
                sink.record(&VoxelSample {
                    index: (k, ju, iu),
                    position,
                    probability: prob,
                    probes: self.probes,
                    urethra,
                });
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::{IceballVolumes, VolumeScanner};
    use crate::{
        CoordinateMapper, DegenerateInput, IceError, ProbabilityModel, ProbeSet, ScanLimits,
        UrethraCurve,
    };
    use std::sync::atomic::AtomicBool;

    const SHAPE: (usize, usize, usize) = (6, 20, 24);

    fn mapper() -> CoordinateMapper {
        CoordinateMapper::from_spacing_origin([1.0, 1.0, 2.0], [-12.0, -10.0, -6.0]).unwrap()
    }

    fn urethra(count: usize) -> UrethraCurve {
        UrethraCurve::fit(&[[-11.0, -9.0, -6.0], [-10.0, -8.0, 6.0]], count).unwrap()
    }

    fn probes() -> ProbeSet {
        ProbeSet::Two([[-2.0, 2.0, 0.0], [2.0, -2.0, 1.0]])
    }

    #[test]
    fn test_full_scan_values() {
        let (m, p, u) = (mapper(), probes(), urethra(6));
        let scanner = VolumeScanner::new(&m, &p, &u, ProbabilityModel::default(), 0.8);
        let (vol, summary) = scanner
            .scan(&ScanLimits::full(SHAPE), IceballVolumes::zeros(SHAPE))
            .unwrap();

        assert_eq!(vol.shape(), SHAPE);
        assert_eq!(summary.evaluated, (6 * 20 * 24) as u64);
        assert_eq!(summary.masked as usize, vol.masked_count());
        assert!(summary.masked > 0);
        assert!(vol.mask().iter().all(|v| *v == 0.0 || *v == 1.0));

        for ((idx, &raw), (&scaled, &mask)) in vol
            .raw()
            .indexed_iter()
            .zip(vol.scaled().iter().zip(vol.mask().iter()))
        {
            let (k, j, i) = idx;
            let pos = m.to_physical([i as f64, j as f64, k as f64]);
            let prob = ProbabilityModel::default().evaluate(&p, pos, u.points()[k]);
            assert_eq!(raw, (10.0 * prob) as f32);
            assert_eq!(scaled, (10.0 * prob).round() as u8);
            assert_eq!(mask == 1.0, prob > 0.8);
        }
    }

    /// 范围外的体素保持为 0, 范围超出网格的部分被裁剪.
    #[test]
    fn test_partial_limits() {
        let (m, p, u) = (mapper(), probes(), urethra(6));
        let scanner = VolumeScanner::new(&m, &p, &u, ProbabilityModel::new(0.0), 0.0);
        let limits = ScanLimits {
            i: (-5, 10),
            j: (3, 50),
            k: (2, 3),
        };
        let (vol, summary) = scanner.scan(&limits, IceballVolumes::zeros(SHAPE)).unwrap();
        assert_eq!(summary.evaluated, 11 * 17 * 2);

        for ((k, j, i), &v) in vol.raw().indexed_iter() {
            let inside = (2..=3).contains(&k) && j >= 3 && i <= 10;
            assert_eq!(v > 0.0, inside, "({k}, {j}, {i})");
        }
    }

    #[test]
    fn test_disjoint_limits_untouched() {
        let (m, p, u) = (mapper(), probes(), urethra(6));
        let scanner = VolumeScanner::new(&m, &p, &u, ProbabilityModel::default(), 0.8);
        let limits = ScanLimits {
            i: (100, 120),
            j: (0, 3),
            k: (0, 1),
        };
        let (vol, summary) = scanner.scan(&limits, IceballVolumes::zeros(SHAPE)).unwrap();
        assert_eq!(summary.evaluated, 0);
        assert_eq!(vol, IceballVolumes::zeros(SHAPE));
    }

    #[test]
    fn test_urethra_too_short() {
        let (m, p, u) = (mapper(), probes(), urethra(4));
        let scanner = VolumeScanner::new(&m, &p, &u, ProbabilityModel::default(), 0.8);
        let err = scanner
            .scan(&ScanLimits::full(SHAPE), IceballVolumes::zeros(SHAPE))
            .unwrap_err();
        assert_eq!(
            err,
            IceError::DegenerateInput(DegenerateInput::UrethraTooShort {
                slices: 6,
                points: 4
            })
        );
    }

    #[test]
    fn test_deterministic() {
        let (m, u) = (mapper(), urethra(6));
        let p = ProbeSet::Three([[-2.0, 2.0, 0.0], [2.0, -2.0, 1.0], [0.0, 3.0, -1.0]]);
        let scanner = VolumeScanner::new(&m, &p, &u, ProbabilityModel::default(), 0.8);
        let run = || {
            scanner
                .scan(&ScanLimits::full(SHAPE), IceballVolumes::zeros(SHAPE))
                .unwrap()
        };
        assert_eq!(run(), run());
    }

    /// 串行 (带 sink) 与默认路径结果一致, sink 按 (k, j, i) 升序收到每个体素.
    #[test]
    fn test_sink_matches_scan() {
        let (m, p, u) = (mapper(), probes(), urethra(6));
        let scanner = VolumeScanner::new(&m, &p, &u, ProbabilityModel::default(), 0.8);
        let limits = ScanLimits::full(SHAPE);

        let mut order = Vec::new();
        let mut sink = |s: &super::VoxelSample<'_>| order.push(s.index);
        let with_sink = scanner
            .scan_with_sink(&limits, IceballVolumes::zeros(SHAPE), &mut sink)
            .unwrap();
        let plain = scanner.scan(&limits, IceballVolumes::zeros(SHAPE)).unwrap();

        assert_eq!(with_sink, plain);
        assert_eq!(order.len(), 6 * 20 * 24);
        assert!(order.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_cancelled() {
        let (m, p, u) = (mapper(), probes(), urethra(6));
        let flag = AtomicBool::new(true);
        let scanner =
            VolumeScanner::new(&m, &p, &u, ProbabilityModel::default(), 0.8).with_cancel(&flag);
        let err = scanner
            .scan(&ScanLimits::full(SHAPE), IceballVolumes::zeros(SHAPE))
            .unwrap_err();
        assert_eq!(err, IceError::Cancelled);
    }
}
