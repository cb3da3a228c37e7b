//! 程序运行函数.

use crate::result::IceballResult;
use ice_berry::prelude::*;
use ice_berry::volume::EmitError;
use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::time::Instant;
use utils::loader::{self, LoadError};

/// 运行错误.
#[derive(Debug)]
pub enum RunError {
    /// 场景加载错误.
    Load(LoadError),

    /// 计算错误.
    Plan(IceError),

    /// 结果写出错误.
    Emit(EmitError),

    /// 无法确定输出目录.
    NoOutputDir,
}

impl From<LoadError> for RunError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

impl From<IceError> for RunError {
    fn from(e: IceError) -> Self {
        Self::Plan(e)
    }
}

impl From<EmitError> for RunError {
    fn from(e: EmitError) -> Self {
        Self::Emit(e)
    }
}

impl From<std::io::Error> for RunError {
    fn from(e: std::io::Error) -> Self {
        Self::Emit(EmitError::Io(e))
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load(e) => write!(f, "{e}"),
            Self::Plan(e) => write!(f, "计算失败: {e}"),
            Self::Emit(e) => write!(f, "{e}"),
            Self::NoOutputDir => f.write_str("无法确定输出目录, 请设置 $ICEBALL_OUT_DIR"),
        }
    }
}

impl std::error::Error for RunError {}

/// 实际运行.
///
/// 若设置了 `$ICEBALL_VOXEL_CSV`, 每个被扫描的体素都会写入该文件 (此时扫描串行进行).
pub fn run() -> Result<IceballResult, RunError> {
    let scenario = loader::scenario_from_env_or_demo()?;
    loader::validate(&scenario)?;
    let out_dir = loader::out_dir_from_env_or_home().ok_or(RunError::NoOutputDir)?;

    let (config, input) = scenario.into_plan()?;
    let planner = IceballPlanner::new(config);

    println!("Running iceball estimation...");
    let start = Instant::now();
    let plan = match std::env::var("ICEBALL_VOXEL_CSV") {
        Ok(p) if !p.is_empty() => {
            let mut sink = CsvSink::new(BufWriter::new(File::create(&p)?));
            let plan = planner.run_with_sink(&input, &mut sink)?;
            log::info!("{} 行体素记录已写入 {p}", sink.rows());
            sink.finish()?;
            plan
        }
        _ => planner.run(&input)?,
    };
    let elapsed = start.elapsed();

    // `into_plan` 总会给出坐标映射.
    let affine = input
        .mapper
        .map(|m| *m.index_to_physical())
        .unwrap_or_default();
    NiftiSink::new(&out_dir).emit(&plan.volumes, &affine)?;
    NpzSink::new(out_dir.join("iceball.npz")).emit(&plan.volumes, &affine)?;
    SlicePreviewSink::new(out_dir.join("preview")).emit(&plan.volumes, &affine)?;

    Ok(IceballResult::new(plan, elapsed, out_dir))
}
