//! 完整计算流程: 尿道曲线拟合 -> 探针组装 -> 扫描范围 -> 体素扫描.

use std::sync::atomic::AtomicBool;

use crate::scan::VoxelSink;
use crate::{
    CoordinateMapper, DegenerateInput, IceResult, IceballVolumes, MissingInput, PlanConfig, Point3,
    ProbabilityModel, ProbeSet, ProbeSource, ScanExtent, ScanLimits, ScanSummary, UrethraCurve,
    VolumeScanner,
};

/// 一次计算的输入.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanInput {
    /// 尿道标记点, 至少 2 个, z 坐标严格单调.
    pub markers: Vec<Point3>,

    /// 探针标记, 2 或 3 个.
    pub probes: Vec<ProbeSource>,

    /// 目标网格的坐标映射.
    pub mapper: Option<CoordinateMapper>,
}

/// 一次计算的结果.
#[derive(Debug, Clone, PartialEq)]
pub struct IceballPlan {
    /// 重采样后的尿道曲线.
    pub urethra: UrethraCurve,

    /// 实际使用的探针组.
    pub probes: ProbeSet,

    /// 由探针推出的扫描范围 (未裁剪).
    pub computed_limits: ScanLimits,

    /// 实际扫描的范围 (未裁剪).
    pub scanned_limits: ScanLimits,

    /// 输出体数据.
    pub volumes: IceballVolumes,

    /// 扫描统计.
    pub summary: ScanSummary,
}

/// 冰球概率场计算器.
#[derive(Debug, Clone)]
pub struct IceballPlanner<'a> {
    config: PlanConfig,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> IceballPlanner<'a> {
    /// 初始化.
    pub fn new(config: PlanConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// 设置取消标志, 见 [`VolumeScanner::with_cancel`].
    #[inline]
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// 配置.
    #[inline]
    pub fn config(&self) -> &PlanConfig {
        &self.config
    }

    /// 执行计算.
    ///
    /// 任何一步失败都会直接返回错误, 不产生部分结果.
    pub fn run(&self, input: &PlanInput) -> IceResult<IceballPlan> {
        self.run_inner(input, None::<&mut dyn VoxelSink>)
    }

    /// 同 [`IceballPlanner::run`], 但每个被扫描的体素都会交给 `sink`. 扫描串行进行.
    pub fn run_with_sink<S: VoxelSink + ?Sized>(
        &self,
        input: &PlanInput,
        sink: &mut S,
    ) -> IceResult<IceballPlan> {
        self.run_inner(input, Some(sink))
    }

    fn run_inner<S: VoxelSink + ?Sized>(
        &self,
        input: &PlanInput,
        sink: Option<&mut S>,
    ) -> IceResult<IceballPlan> {
        let cfg = &self.config;
        let (slices, rows, cols) = cfg.shape;
        if slices == 0 || rows == 0 || cols == 0 {
            return Err(DegenerateInput::EmptyGrid(cfg.shape).into());
        }

        let urethra = UrethraCurve::fit(&input.markers, cfg.resample_count)?;
        let probes = ProbeSet::assemble(&input.probes, cfg.legacy_z_offset)?;
        let mapper = input
            .mapper
            .as_ref()
            .ok_or(MissingInput::Transform)?;

        let computed_limits = mapper.compute_limits(probes.tips(), &cfg.limit_rule);
        let scanned_limits = match cfg.extent {
            ScanExtent::FullGrid => ScanLimits::full(cfg.shape),
            ScanExtent::ProbeLocal => computed_limits,
        };
        log::info!(
            "探针推出的范围 {:?}, 实际扫描范围 {:?}",
            computed_limits.as_array(),
            scanned_limits.as_array()
        );

        let mut scanner = VolumeScanner::new(
            mapper,
            &probes,
            &urethra,
            ProbabilityModel::new(cfg.urethra_cutoff),
            cfg.threshold,
        );
        if let Some(flag) = self.cancel {
            scanner = scanner.with_cancel(flag);
        }

        let volumes = IceballVolumes::zeros(cfg.shape);
        let (volumes, summary) = match sink {
            Some(sink) => scanner.scan_with_sink(&scanned_limits, volumes, sink)?,
            None => scanner.scan(&scanned_limits, volumes)?,
        };

        Ok(IceballPlan {
            urethra,
            probes,
            computed_limits,
            scanned_limits,
            volumes,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{IceballPlanner, PlanInput};
    use crate::{
        CoordinateMapper, DegenerateInput, IceError, MissingInput, PlanConfig, ProbeSource,
        ScanExtent, ScanLimits,
    };
    use std::sync::atomic::AtomicBool;

    fn input() -> PlanInput {
        PlanInput {
            markers: vec![[-10.0, -2.0, -50.0], [-9.0, -1.0, -20.0], [-8.0, 1.5, 40.0]],
            probes: vec![
                ProbeSource::Tip([-8.6, 11.8, 0.7]),
                ProbeSource::Tip([-8.5, 4.1, 4.3]),
            ],
            mapper: Some(
                CoordinateMapper::from_spacing_origin([1.0, 1.0, 3.0], [-30.0, -20.0, -60.0])
                    .unwrap(),
            ),
        }
    }

    fn config() -> PlanConfig {
        PlanConfig::default().with_shape((40, 48, 64))
    }

    #[test]
    fn test_full_grid() {
        let plan = IceballPlanner::new(config()).run(&input()).unwrap();
        assert_eq!(plan.urethra.len(), 40);
        assert_eq!(plan.probes.len(), 2);
        assert_eq!(plan.scanned_limits, ScanLimits::full((40, 48, 64)));
        assert_eq!(plan.summary.evaluated, 40 * 48 * 64);
        assert_eq!(plan.volumes.shape(), (40, 48, 64));
        assert!(plan.summary.masked > 0);
        assert!(plan.summary.max_probability <= 1.0);
    }

    /// 探针 (-8.6, 11.8, 0.7) -> 索引 (21.4, 31.8, 20.23), (-8.5, 4.1, 4.3) -> (21.5, 24.1, 21.43).
    #[test]
    fn test_probe_local() {
        let cfg = config().with_extent(ScanExtent::ProbeLocal);
        let plan = IceballPlanner::new(cfg).run(&input()).unwrap();
        assert_eq!(plan.computed_limits, plan.scanned_limits);
        assert_eq!(plan.computed_limits.as_array(), [-9, 51, -6, 61, 15, 19]);

        // 裁剪到网格: i 0..=51, j 0..=47, k 15..=19.
        assert_eq!(plan.summary.evaluated, 52 * 48 * 5);
        for ((k, _, _), v) in plan.volumes.raw().indexed_iter() {
            if !(15..=19).contains(&k) {
                assert_eq!(*v, 0.0);
            }
        }
    }

    #[test]
    fn test_errors() {
        let planner = IceballPlanner::new(config());

        let mut no_mapper = input();
        no_mapper.mapper = None;
        assert_eq!(
            planner.run(&no_mapper).unwrap_err(),
            IceError::MissingRequiredInput(MissingInput::Transform)
        );

        let mut one_marker = input();
        one_marker.markers.truncate(1);
        assert_eq!(
            planner.run(&one_marker).unwrap_err(),
            IceError::DegenerateInput(DegenerateInput::TooFewMarkers(1))
        );

        let mut one_probe = input();
        one_probe.probes.truncate(1);
        assert_eq!(
            planner.run(&one_probe).unwrap_err(),
            IceError::MissingRequiredInput(MissingInput::Probes(1))
        );

        let flag = AtomicBool::new(true);
        assert_eq!(
            IceballPlanner::new(config())
                .with_cancel(&flag)
                .run(&input())
                .unwrap_err(),
            IceError::Cancelled
        );
    }

    #[test]
    fn test_empty_grid() {
        for shape in [(0, 48, 64), (40, 0, 64), (40, 48, 0)] {
            for extent in [ScanExtent::FullGrid, ScanExtent::ProbeLocal] {
                let cfg = config().with_shape(shape).with_extent(extent);
                assert_eq!(
                    IceballPlanner::new(cfg).run(&input()).unwrap_err(),
                    IceError::DegenerateInput(DegenerateInput::EmptyGrid(shape))
                );
            }
        }
    }

    /// 针尖远在网格之外: 范围饱和, 扫描照常进行.
    #[test]
    fn test_far_tip() {
        let mut far = input();
        far.probes = vec![
            ProbeSource::Tip([1e300, 0.0, 0.0]),
            ProbeSource::Tip([-1e300, 4.1, 4.3]),
        ];

        let full = IceballPlanner::new(config()).run(&far).unwrap();
        assert_eq!(full.summary.evaluated, 40 * 48 * 64);
        assert_eq!(
            full.computed_limits.as_array(),
            [i64::MIN, 190, -10, 54, 15, 19]
        );

        let cfg = config().with_extent(ScanExtent::ProbeLocal);
        let local = IceballPlanner::new(cfg).run(&far).unwrap();
        assert_eq!(local.scanned_limits, full.computed_limits);
        assert_eq!(local.summary.evaluated, 64 * 48 * 5);
    }

    #[test]
    fn test_sink_same_result() {
        let planner = IceballPlanner::new(config());
        let mut count = 0_u64;
        let with_sink = planner
            .run_with_sink(&input(), &mut |_: &crate::scan::VoxelSample<'_>| count += 1)
            .unwrap();
        assert_eq!(count, with_sink.summary.evaluated);
        assert_eq!(with_sink, planner.run(&input()).unwrap());
    }
}
