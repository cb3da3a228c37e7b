//! 逐体素诊断输出.

use std::io::{self, Write};

use itertools::Itertools;

use crate::{Idx3d, Point3, ProbeSet};

/// 单个体素的一次求值.
#[derive(Debug, Clone, Copy)]
pub struct VoxelSample<'a> {
    /// `(k, j, i)` 索引.
    pub index: Idx3d,

    /// 体素中心的物理坐标.
    pub position: Point3,

    /// 冰球概率, 未放大.
    pub probability: f64,

    /// 本次计算的探针组.
    pub probes: &'a ProbeSet,

    /// 该切片对应的尿道曲线点.
    pub urethra: Point3,
}

/// 接收扫描过程中每个体素的求值结果.
///
/// 传入 sink 时扫描总是串行进行, 体素按 `k`, `j`, `i` 升序到达.
pub trait VoxelSink {
    /// 记录一个体素.
    fn record(&mut self, sample: &VoxelSample<'_>);
}

impl<F> VoxelSink for F
where
    F: FnMut(&VoxelSample<'_>),
{
    #[inline]
    fn record(&mut self, sample: &VoxelSample<'_>) {
        self(sample)
    }
}

/// 什么都不做.
pub(crate) struct NoSink;

impl VoxelSink for NoSink {
    #[inline(always)]
    fn record(&mut self, _sample: &VoxelSample<'_>) {}
}

/// 以 `;` 分隔的文本表格形式写出每个体素.
///
/// 列依次为概率, 物理坐标, 各针尖坐标, 尿道点坐标. 表头在第一行数据前写出.
/// 写入失败不会中断扫描: 第一个 I/O 错误会被保存, 由 [`CsvSink::finish`] 返回.
pub struct CsvSink<W: Write> {
    writer: W,
    rows: u64,
    error: Option<io::Error>,
}

impl<W: Write> CsvSink<W> {
    /// 初始化.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            rows: 0,
            error: None,
        }
    }

    /// 已写出的数据行数.
    #[inline]
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// 刷新并取回底层 writer. 若写入过程中出现过错误, 返回第一个错误.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_header(&mut self, probes: usize) -> io::Result<()> {
        let probe_cols = (1..=probes)
            .flat_map(|n| ["X", "Y", "Z"].map(|axis| format!("Pr{n}{axis}")))
            .join(";");
        writeln!(self.writer, "value;PosX;PosY;PosZ;{probe_cols};UrX;UrY;UrZ")
    }

    fn write_row(&mut self, sample: &VoxelSample<'_>) -> io::Result<()> {
        if self.rows == 0 {
            self.write_header(sample.probes.len())?;
        }
        let tips = sample.probes.tips().iter().flatten().join(";");
        let [x, y, z] = sample.position;
        let [ux, uy, uz] = sample.urethra;
        writeln!(
            self.writer,
            "{};{x};{y};{z};{tips};{ux};{uy};{uz}",
            sample.probability
        )?;
        self.rows += 1;
        Ok(())
    }
}

impl<W: Write> VoxelSink for CsvSink<W> {
    fn record(&mut self, sample: &VoxelSample<'_>) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.write_row(sample) {
            log::warn!("诊断表格写入失败, 后续体素将被忽略: {e}");
            self.error = Some(e);
        }
    }
}
