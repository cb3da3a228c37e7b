//! 🧊欢迎光临🧊
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx3d, Point3};

pub use crate::config::{LimitRule, PlanConfig, ScanExtent};
pub use crate::consts::{grid, PROBABILITY_THRESHOLD, RESAMPLE_COUNT};
pub use crate::error::{DegenerateInput, IceError, IceResult, MissingInput};

pub use crate::geometry::{ProbeSet, ProbeSource, UrethraCurve};
pub use crate::model::ProbabilityModel;
pub use crate::transform::{Affine, CoordinateMapper, ScanLimits};

pub use crate::planner::{IceballPlan, IceballPlanner, PlanInput};
pub use crate::scan::{CsvSink, IceballVolumes, ScanSummary, VolumeScanner, VoxelSample, VoxelSink};
pub use crate::volume::{
    home_iceball_dir_with, InputVolume, NiftiSink, NpzSink, SlicePreviewSink, VolumeSink,
};
