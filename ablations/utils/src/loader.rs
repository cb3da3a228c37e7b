//! 对 `ice-berry` 输入的更一层封装. 提供场景文件与输出目录的加载.

use ice_berry::{CoordinateMapper, IceError, IceResult, InputVolume, PlanConfig, PlanInput};
use ice_berry::{Point3, ProbeSource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::{env, io};

/// 一次实验的全部输入.
///
/// 给出 `input_volume` 时, 网格形状和坐标变换均取自该 nii 文件头,
/// 否则使用 `spacing` 和 `origin` 构建轴对齐变换, 网格形状取自 `config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// 尿道标记点.
    pub markers: Vec<Point3>,

    /// 探针标记.
    pub probes: Vec<ProbeSource>,

    /// 目标网格 nii 文件.
    pub input_volume: Option<PathBuf>,

    /// 体素间距.
    pub spacing: [f64; 3],

    /// 第 0 个体素中心的物理坐标.
    pub origin: Point3,

    /// 计算参数.
    pub config: PlanConfig,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::demo()
    }
}

impl Scenario {
    /// 内置演示场景: 双针, 参考网格.
    pub fn demo() -> Self {
        Self {
            markers: vec![
                [-10.0, -2.0, -50.0],
                [-9.0, -1.0, -20.0],
                [-7.5, 0.5, 10.0],
                [-8.0, 1.5, 40.0],
            ],
            probes: vec![
                ProbeSource::Tip([-8.6, 11.8, 0.7]),
                ProbeSource::Tip([-8.5, 4.1, 4.3]),
            ],
            input_volume: None,
            spacing: [0.625, 0.625, 3.0],
            origin: [-68.5, -44.5, -60.0],
            config: PlanConfig::default(),
        }
    }

    /// 从 json 文件加载.
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// 转换为计算输入. 若给出了 `input_volume`, 同时用其网格形状覆盖 `config.shape`.
    pub fn into_plan(self) -> Result<(PlanConfig, PlanInput), LoadError> {
        let (mapper, config) = match &self.input_volume {
            Some(path) => {
                let volume = InputVolume::open(path)?;
                let shape = volume.shape();
                (volume.mapper()?, self.config.with_shape(shape))
            }
            None => (
                CoordinateMapper::from_spacing_origin(self.spacing, self.origin)?,
                self.config,
            ),
        };
        let input = PlanInput {
            markers: self.markers,
            probes: self.probes,
            mapper: Some(mapper),
        };
        Ok((config, input))
    }
}

/// 场景加载错误.
#[derive(Debug)]
pub enum LoadError {
    /// 底层 I/O 错误.
    Io(io::Error),

    /// json 解析错误.
    Json(serde_json::Error),

    /// nii 文件头读取错误.
    Nifti(ice_berry::volume::NiftiError),

    /// 坐标变换不可用.
    Transform(IceError),
}

impl From<io::Error> for LoadError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<ice_berry::volume::NiftiError> for LoadError {
    fn from(e: ice_berry::volume::NiftiError) -> Self {
        Self::Nifti(e)
    }
}

impl From<IceError> for LoadError {
    fn from(e: IceError) -> Self {
        Self::Transform(e)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O 错误: {e}"),
            Self::Json(e) => write!(f, "场景文件解析错误: {e}"),
            Self::Nifti(e) => write!(f, "nii 文件头读取错误: {e}"),
            Self::Transform(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LoadError {}

/// 获取实验场景.
///
/// 1. 若环境变量 `$ICEBALL_SCENARIO` 非空, 则从该 json 文件加载;
/// 2. 否则, 返回内置演示场景.
pub fn scenario_from_env_or_demo() -> Result<Scenario, LoadError> {
    match env::var("ICEBALL_SCENARIO") {
        Ok(p) if !p.is_empty() => Scenario::from_json(p),
        _ => Ok(Scenario::demo()),
    }
}

/// 获取输出目录.
///
/// 1. 若环境变量 `$ICEBALL_OUT_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/iceball`.
pub fn out_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var("ICEBALL_OUT_DIR") {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => ice_berry::volume::home_iceball_dir_with::<&str, _>([]),
    }
}

/// 检查场景能否组装出计算输入, 不执行扫描.
pub fn validate(scenario: &Scenario) -> IceResult<()> {
    let cfg = &scenario.config;
    ice_berry::UrethraCurve::fit(&scenario.markers, cfg.resample_count)?;
    ice_berry::ProbeSet::assemble(&scenario.probes, cfg.legacy_z_offset)?;
    Ok(())
}
