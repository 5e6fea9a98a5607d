//! fvecs 格式的读写
//!
//! 每条记录为小端 i32 维度后跟 dim 个 f32，见
//! <http://corpus-texmex.irisa.fr/>。

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::Array2;

/// 读取整个 fvecs 文件为 N x dim 矩阵
pub fn read_fvecs(path: impl AsRef<Path>) -> Result<Array2<f32>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);

    let mut dim = 0usize;
    let mut data = Vec::new();
    loop {
        let d = match reader.read_i32::<LittleEndian>() {
            Ok(d) => d,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };
        ensure!(d > 0, "invalid vector dimension {} in {}", d, path.display());
        if dim == 0 {
            dim = d as usize;
        } else if d as usize != dim {
            bail!("inconsistent dimension in {}: expected {}, got {}", path.display(), dim, d);
        }
        let start = data.len();
        data.resize(start + dim, 0.0);
        reader
            .read_f32_into::<LittleEndian>(&mut data[start..])
            .with_context(|| format!("truncated vector record in {}", path.display()))?;
    }
    ensure!(dim != 0, "empty fvecs file: {}", path.display());

    let rows = data.len() / dim;
    Ok(Array2::from_shape_vec((rows, dim), data)?)
}

/// 按 fvecs 格式写出矩阵，主要用于生成测试数据
pub fn write_fvecs(path: impl AsRef<Path>, vectors: &Array2<f32>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for row in vectors.outer_iter() {
        writer.write_i32::<LittleEndian>(row.len() as i32)?;
        for &v in row {
            writer.write_f32::<LittleEndian>(v)?;
        }
    }
    writer.flush()?;
    Ok(())
}
