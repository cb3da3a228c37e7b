//! 输入网格描述与结果输出.

use std::path::{Path, PathBuf};

use nifti::NiftiHeader;

use crate::{Affine, CoordinateMapper, IceResult, Idx3d};

mod emit;

pub use emit::{EmitError, NiftiSink, NpzSink, SlicePreviewSink, VolumeSink};
pub use nifti::NiftiError;

/// nii 文件头较大, 分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 目标体素网格. 只读取 nii 文件头, 不加载体数据本身.
#[derive(Debug, Clone)]
pub struct InputVolume {
    header: BoxedHeader,
}

/// 将 (W, H, z) 转换成 (z, H, W).
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

impl InputVolume {
    /// 打开 nii 文件 (可以是 `.nii.gz`), 只解析其文件头.
    pub fn open<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let header = NiftiHeader::from_file(path.as_ref())?;
        Ok(Self::from_header(header))
    }

    /// 直接由文件头构建.
    #[inline]
    pub fn from_header(header: NiftiHeader) -> Self {
        Self {
            header: Box::new(header),
        }
    }

    /// 文件头.
    #[inline]
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// 网格形状 `(切片数, 行数, 列数)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        get_shape_from_header(&self.header)
    }

    /// 索引 -> 物理变换.
    ///
    /// 优先使用 sform (`sform_code > 0`), 其次 qform (`qform_code > 0`),
    /// 都没有时退化为按 `pixdim` 缩放的对角矩阵.
    pub fn index_to_physical(&self) -> Affine {
        let h = &self.header;
        if h.sform_code > 0 {
            let row = |r: [f32; 4]| r.map(f64::from);
            Affine::new([
                row(h.srow_x),
                row(h.srow_y),
                row(h.srow_z),
                [0.0, 0.0, 0.0, 1.0],
            ])
        } else if h.qform_code > 0 {
            qform_affine(h)
        } else {
            let [_, sx, sy, sz, ..] = h.pixdim.map(f64::from);
            Affine::from_spacing_origin([sx, sy, sz], [0.0; 3])
        }
    }

    /// 由文件头构建坐标映射.
    #[inline]
    pub fn mapper(&self) -> IceResult<CoordinateMapper> {
        CoordinateMapper::from_index_to_physical(self.index_to_physical())
    }
}

/// 四元数 (b, c, d) 表示的旋转, 加上 `pixdim` 缩放和 `quatern_x/y/z` 平移.
fn qform_affine(h: &NiftiHeader) -> Affine {
    let [b, c, d] = [h.quatern_b, h.quatern_c, h.quatern_d].map(f64::from);
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
    let [qfac, dx, dy, dz, ..] = h.pixdim.map(f64::from);
    let qfac = if qfac < 0.0 { -1.0 } else { 1.0 };
    let scale = [dx, dy, qfac * dz];

    let r = [
        [
            a * a + b * b - c * c - d * d,
            2.0 * (b * c - a * d),
            2.0 * (b * d + a * c),
        ],
        [
            2.0 * (b * c + a * d),
            a * a + c * c - b * b - d * d,
            2.0 * (c * d - a * b),
        ],
        [
            2.0 * (b * d - a * c),
            2.0 * (c * d + a * b),
            a * a + d * d - c * c - b * b,
        ],
    ];
    let offset = [h.quatern_x, h.quatern_y, h.quatern_z].map(f64::from);

    let mut rows = [[0.0; 4]; 4];
    for (row, (rot, off)) in rows.iter_mut().zip(r.iter().zip(offset)) {
        for col in 0..3 {
            row[col] = rot[col] * scale[col];
        }
        row[3] = off;
    }
    rows[3][3] = 1.0;
    Affine::new(rows)
}

/// 获取 `{用户主目录}/dataset/iceball` 目录下给定继续项组成的全路径.
pub fn home_iceball_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.push("iceball");
    ans.extend(it);
    Some(ans)
}

#[cfg(test)]
mod tests {
    use super::InputVolume;
    use crate::Affine;
    use nifti::NiftiHeader;

    fn header() -> NiftiHeader {
        let mut h = NiftiHeader::default();
        h.dim = [3, 192, 168, 40, 1, 1, 1, 1];
        h.pixdim = [1.0, 0.625, 0.625, 3.0, 0.0, 0.0, 0.0, 0.0];
        // 默认文件头的 sform_code / qform_code 都是 1, 这里清零以走 pixdim 分支.
        h.sform_code = 0;
        h.qform_code = 0;
        h
    }

    #[test]
    fn test_shape() {
        assert_eq!(InputVolume::from_header(header()).shape(), (40, 168, 192));
    }

    #[test]
    fn test_pixdim_fallback() {
        let v = InputVolume::from_header(header());
        assert_eq!(
            v.index_to_physical(),
            Affine::from_spacing_origin([0.625, 0.625, 3.0], [0.0; 3])
        );
    }

    #[test]
    fn test_sform_preferred() {
        let mut h = header();
        h.sform_code = 1;
        h.qform_code = 1;
        h.srow_x = [-0.5, 0.0, 0.0, 10.0];
        h.srow_y = [0.0, 0.5, 0.0, -20.0];
        h.srow_z = [0.0, 0.0, 2.0, 4.0];
        let m = InputVolume::from_header(h).mapper().unwrap();
        assert_eq!(m.to_physical([2.0, 4.0, 1.0]), [9.0, -18.0, 6.0]);
        let ijk = m.to_index([9.0, -18.0, 6.0]);
        for (a, b) in ijk.iter().zip([2.0, 4.0, 1.0]) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    /// 单位四元数 + qfac = -1: 只翻转 z 轴.
    #[test]
    fn test_qform_identity_rotation() {
        let mut h = header();
        h.qform_code = 1;
        h.pixdim[0] = -1.0;
        (h.quatern_x, h.quatern_y, h.quatern_z) = (1.0, 2.0, 3.0);
        let v = InputVolume::from_header(h);
        assert_eq!(
            v.index_to_physical(),
            Affine::new([
                [0.625, 0.0, 0.0, 1.0],
                [0.0, 0.625, 0.0, 2.0],
                [0.0, 0.0, -3.0, 3.0],
                [0.0, 0.0, 0.0, 1.0],
            ])
        );
    }

    /// 绕 z 轴旋转 180 度: (b, c, d) = (0, 0, 1).
    #[test]
    fn test_qform_rotation() {
        let mut h = header();
        h.qform_code = 1;
        h.quatern_d = 1.0;
        let p = InputVolume::from_header(h)
            .index_to_physical()
            .apply([1.0, 1.0, 1.0]);
        assert_eq!(p, [-0.625, -0.625, 3.0]);
    }
}
