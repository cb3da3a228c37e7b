#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 根据尿道标记点、冷冻探针针尖位置和目标体素网格,
//! 逐体素计算 "冰球概率", 并阈值化得到消融掩膜.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 概率模型是拟合出的经验 logistic 函数, 不代表任何物理/热学精度.
//! 2. 调用方传入形状不一致的输出缓冲区属于编程错误, 程序会直接 panic.
//!   所有与输入数据相关的问题都以 [`IceError`] 返回.
//!
//! # 开发计划
//!
//! ### 自然三次样条插值 ✅
//!
//! 以 z 为参数分别拟合 `x(z)`, `y(z)`, 两端二阶导数为零.
//! 三对角方程组直接追赶求解, 不依赖 LAPACK.
//!
//! 实现位于 `ice-berry/src/fitting`.
//!
//! ### 尿道曲线与探针组 ✅
//!
//! 1. 稀疏尿道标记点 -> 固定点数 (默认 40) 的重采样曲线.
//! 2. 探针组在组装时即确定为双针或三针模式, 缺少第三根探针不是错误.
//! 3. 旧版 "每针多点" 标记格式在适配层统一做 `-10` 的 z 修正.
//!
//! 实现位于 `ice-berry/src/geometry`.
//!
//! ### 索引坐标系 <-> 物理坐标系 ✅
//!
//! 4x4 仿射变换及其逆, 以及由探针位置推出的索引空间扫描范围.
//!
//! 实现位于 `ice-berry/src/transform.rs`.
//!
//! ### 冰球概率模型 ✅
//!
//! 双针/三针两套系数. 双针模型在距尿道不超过 5 个物理单位时直接返回 0.
//!
//! 实现位于 `ice-berry/src/model.rs`.
//!
//! ### 体素扫描 ✅
//!
//! 逐体素填充掩膜、10 倍整数概率和 10 倍浮点概率三个体数据.
//! 打开 `rayon` feature 后按切片并行, 结果与串行一致.
//!
//! 实现位于 `ice-berry/src/scan`.
//!
//! ### 输入输出 ✅
//!
//! 从 nii 文件头读取网格形状与仿射变换; 结果可写为 nii / npz / png 切片预览.
//!
//! 实现位于 `ice-berry/src/volume`.

/// 三维索引, 按 `(k, j, i)` 即 `(切片, 行, 列)` 组织.
pub type Idx3d = (usize, usize, usize);

/// 三维点 `[x, y, z]`. 物理坐标和连续索引坐标均使用该类型.
pub type Point3 = [f64; 3];

pub mod config;
pub mod consts;
mod error;
pub mod fitting;
pub mod geometry;
pub mod model;
pub mod planner;
pub mod prelude;
pub mod scan;
pub mod transform;
pub mod volume;

pub use config::{LimitRule, PlanConfig, ScanExtent};
pub use error::{DegenerateInput, IceError, IceResult, MissingInput};
pub use geometry::{ProbeSet, ProbeSource, UrethraCurve};
pub use model::ProbabilityModel;
pub use planner::{IceballPlan, IceballPlanner, PlanInput};
pub use scan::{IceballVolumes, ScanSummary, VolumeScanner};
pub use transform::{Affine, CoordinateMapper, ScanLimits};
pub use volume::InputVolume;
