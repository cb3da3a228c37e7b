//! 扫描结果的持久化存储.

use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use ndarray_npy::{NpzWriter, WriteNpzError};
use nifti::writer::WriterOptions;
use nifti::{NiftiError, NiftiHeader};

use crate::{Affine, IceballVolumes};

/// 表明一个可以持久化存储扫描结果的对象.
pub trait VolumeSink {
    /// 错误类型.
    type Error;

    /// 存储 `volumes`. `affine` 为索引 -> 物理变换.
    fn emit(&mut self, volumes: &IceballVolumes, affine: &Affine) -> Result<(), Self::Error>;
}

/// 结果存储错误.
#[derive(Debug)]
pub enum EmitError {
    /// 底层 I/O 错误.
    Io(io::Error),

    /// nii 文件写入错误.
    Nifti(NiftiError),

    /// npz 文件写入错误.
    Npz(WriteNpzError),

    /// 切片预览图写入错误.
    Image(image::ImageError),
}

impl From<io::Error> for EmitError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<NiftiError> for EmitError {
    fn from(e: NiftiError) -> Self {
        Self::Nifti(e)
    }
}

impl From<WriteNpzError> for EmitError {
    fn from(e: WriteNpzError) -> Self {
        Self::Npz(e)
    }
}

impl From<image::ImageError> for EmitError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O 错误: {e}"),
            Self::Nifti(e) => write!(f, "nii 写入错误: {e}"),
            Self::Npz(e) => write!(f, "npz 写入错误: {e}"),
            Self::Image(e) => write!(f, "预览图写入错误: {e}"),
        }
    }
}

impl std::error::Error for EmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Nifti(e) => Some(e),
            Self::Npz(e) => Some(e),
            Self::Image(e) => Some(e),
        }
    }
}

/// 将三个体数据分别写为目录 `dir` 下的 nii.gz 文件:
///
/// - `ablationMask.nii.gz`: 掩膜;
/// - `predictedIceball.nii.gz`: `round(10 * p)`;
/// - `iceballImage.nii.gz`: `10 * p`.
///
/// 仿射变换写入 sform.
#[derive(Debug, Clone)]
pub struct NiftiSink {
    dir: PathBuf,
}

impl NiftiSink {
    /// 掩膜文件名.
    pub const MASK: &'static str = "ablationMask.nii.gz";

    /// 整数概率文件名.
    pub const SCALED: &'static str = "predictedIceball.nii.gz";

    /// 浮点概率文件名.
    pub const RAW: &'static str = "iceballImage.nii.gz";

    /// 初始化. 目录不存在时会在写入前创建.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// 输出目录.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// 以 sform 记录 `affine` 的文件头. `pixdim` 取各列的长度.
fn reference_header(affine: &Affine) -> NiftiHeader {
    let m = affine.rows();
    let mut h = NiftiHeader::default();
    let row = |r: [f64; 4]| r.map(|v| v as f32);
    (h.srow_x, h.srow_y, h.srow_z) = (row(m[0]), row(m[1]), row(m[2]));
    h.sform_code = 1;
    h.qform_code = 0;
    for col in 0..3 {
        let norm = (0..3).map(|r| m[r][col] * m[r][col]).sum::<f64>().sqrt();
        h.pixdim[col + 1] = norm as f32;
    }
    h
}

/// `(k, j, i)` -> nifti 惯用的 `[i, j, k]` 后写出.
macro_rules! write_nii {
    ($path: expr, $header: expr, $data: expr) => {
        WriterOptions::new($path)
            .reference_header($header)
            .write_nifti(&$data.permuted_axes([2, 1, 0]))
    };
}

impl VolumeSink for NiftiSink {
    type Error = EmitError;

    fn emit(&mut self, volumes: &IceballVolumes, affine: &Affine) -> Result<(), EmitError> {
        fs::create_dir_all(&self.dir)?;
        let header = reference_header(affine);
        write_nii!(self.dir.join(Self::MASK), &header, volumes.mask())?;
        write_nii!(self.dir.join(Self::SCALED), &header, volumes.scaled())?;
        write_nii!(self.dir.join(Self::RAW), &header, volumes.raw())?;
        log::info!("nii 结果已写入 {}", self.dir.display());
        Ok(())
    }
}

/// 将三个体数据写入同一个 npz 文件, 条目名分别为 `mask.npy`, `scaled.npy`,
/// `raw.npy` (numpy 中按 `mask`, `scaled`, `raw` 访问), 形状均为 `(切片数, 行数, 列数)`.
#[derive(Debug, Clone)]
pub struct NpzSink {
    path: PathBuf,
}

impl NpzSink {
    /// 掩膜条目名.
    pub const MASK: &'static str = "mask.npy";

    /// 整数概率条目名.
    pub const SCALED: &'static str = "scaled.npy";

    /// 浮点概率条目名.
    pub const RAW: &'static str = "raw.npy";

    /// 初始化. `path` 为 npz 文件路径.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl VolumeSink for NpzSink {
    type Error = EmitError;

    /// npz 不记录仿射变换, 忽略 `affine`.
    fn emit(&mut self, volumes: &IceballVolumes, _affine: &Affine) -> Result<(), EmitError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut npz = NpzWriter::new(File::create(&self.path)?);
        npz.add_array(Self::MASK, &volumes.mask())?;
        npz.add_array(Self::SCALED, &volumes.scaled())?;
        npz.add_array(Self::RAW, &volumes.raw())?;
        npz.finish()?;
        log::info!("npz 结果已写入 {}", self.path.display());
        Ok(())
    }
}

/// 将浮点概率按切片保存为灰度 png, 便于肉眼检查.
///
/// `10 * p` 线性映射到 `[0, 255]`. 全零的切片不输出.
/// 文件名为 `slice_{k:03}.png`.
#[derive(Debug, Clone)]
pub struct SlicePreviewSink {
    dir: PathBuf,
}

impl SlicePreviewSink {
    /// 初始化. 目录不存在时会在写入前创建.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

#[inline]
fn gray(raw: f32) -> u8 {
    (raw * 25.5).round().clamp(0.0, 255.0) as u8
}

impl VolumeSink for SlicePreviewSink {
    type Error = EmitError;

    fn emit(&mut self, volumes: &IceballVolumes, _affine: &Affine) -> Result<(), EmitError> {
        fs::create_dir_all(&self.dir)?;
        let raw = volumes.raw();
        let mut written = 0;
        for (k, slice) in raw.outer_iter().enumerate() {
            if slice.iter().all(|v| *v == 0.0) {
                continue;
            }
            let (height, width) = slice.dim();
            let mut buf = image::GrayImage::new(width as u32, height as u32);
            for ((h, w), &v) in slice.indexed_iter() {
                buf.put_pixel(w as u32, h as u32, image::Luma([gray(v)]));
            }
            buf.save(self.dir.join(format!("slice_{k:03}.png")))?;
            written += 1;
        }
        log::info!("{written} 张切片预览已写入 {}", self.dir.display());
        Ok(())
    }
}
