//! 冷冻探针针尖.

use crate::{DegenerateInput, IceResult, MissingInput, Point3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 单根探针的原始标记.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ProbeSource {
    /// 单点标记, 即针尖位置, 原样使用.
    Tip(Point3),

    /// 旧版 "每针多点" 标记. 第一个点为针尖, 使用前需做 z 修正.
    /// 空列表视为该探针不可读.
    LegacyTrack(Vec<Point3>),
}

impl ProbeSource {
    /// 获取针尖位置. `legacy_z_offset` 仅作用于旧版多点标记.
    ///
    /// 标记不可读 (空列表或坐标非有限值) 时返回 `None`.
    pub fn tip(&self, legacy_z_offset: f64) -> Option<Point3> {
        let tip = match self {
            Self::Tip(p) => *p,
            Self::LegacyTrack(track) => {
                let [x, y, z] = *track.first()?;
                [x, y, z + legacy_z_offset]
            }
        };
        tip.iter().all(|v| v.is_finite()).then_some(tip)
    }
}

/// 一次计算使用的探针组. 针数决定概率模型的变体.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeSet {
    /// 双针.
    Two([Point3; 2]),

    /// 三针.
    Three([Point3; 3]),
}

impl ProbeSet {
    /// 由原始标记组装探针组.
    ///
    /// 前两根探针必须可读, 否则返回 [`MissingInput::Probes`];
    /// 第三根探针缺失或不可读时退回双针模式, 这不是错误.
    /// 多于三个标记时返回 [`DegenerateInput::TooManyProbes`].
    pub fn assemble(sources: &[ProbeSource], legacy_z_offset: f64) -> IceResult<Self> {
        if sources.len() > 3 {
            return Err(DegenerateInput::TooManyProbes(sources.len()).into());
        }
        let tips: Vec<Option<Point3>> = sources.iter().map(|s| s.tip(legacy_z_offset)).collect();

        let (a, b) = match tips.as_slice() {
            [Some(a), Some(b), ..] => (*a, *b),
            _ => {
                let readable = tips.iter().take(2).flatten().count();
                return Err(MissingInput::Probes(readable).into());
            }
        };

        let set = match tips.get(2) {
            Some(Some(c)) => Self::Three([a, b, *c]),
            Some(None) => {
                log::warn!("第三根探针不可读, 退回双针模式");
                Self::Two([a, b])
            }
            None => Self::Two([a, b]),
        };
        log::info!("探针组: {} 针", set.len());
        Ok(set)
    }

    /// 所有针尖位置.
    #[inline]
    pub fn tips(&self) -> &[Point3] {
        match self {
            Self::Two(p) => p.as_slice(),
            Self::Three(p) => p.as_slice(),
        }
    }

    /// 针数, 2 或 3.
    #[inline]
    pub fn len(&self) -> usize {
        self.tips().len()
    }

    /// 探针组永远非空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }
}
