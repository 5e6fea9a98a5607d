//! 数据集容器
//!
//! 以压缩 npz 保存两组向量和合成元数据，标量属性存为 0 维 i64 数组。

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use ndarray::{Array0, Array1, Array2, arr0, s};
use ndarray_npy::{NpzReader, NpzWriter};
use rand::Rng;

use crate::config::{GIST_DIM, SIFT_DIM};

/// 基准测试数据集：每条记录包含一个 SIFT 向量、一个 GIST 向量和四个元数据字段
#[derive(Debug, Clone)]
pub struct Dataset {
    pub sift: Array2<f32>,
    pub gist: Array2<f32>,
    pub image_id: Array1<i32>,
    pub category: Array1<i32>,
    pub confidence: Array1<f32>,
    pub votes: Array1<i32>,
}

impl Dataset {
    /// 取前 n 条向量并生成随机元数据
    pub fn build(sift: Array2<f32>, gist: Array2<f32>, n: usize) -> Result<Self> {
        ensure!(sift.ncols() == SIFT_DIM, "SIFT vectors should be {}D, got {}D", SIFT_DIM, sift.ncols());
        ensure!(gist.ncols() == GIST_DIM, "GIST vectors should be {}D, got {}D", GIST_DIM, gist.ncols());
        ensure!(
            n <= sift.nrows() && n <= gist.nrows(),
            "number of records {} is greater than the number of available vectors ({} SIFT, {} GIST)",
            n,
            sift.nrows(),
            gist.nrows()
        );

        let sift = sift.slice_move(s![..n, ..]);
        let gist = gist.slice_move(s![..n, ..]);

        let mut rng = rand::rng();
        let image_id = Array1::from_iter(0..n as i32);
        let category = Array1::from_shape_fn(n, |_| rng.random_range(0..10));
        let confidence = Array1::from_shape_fn(n, |_| rng.random_range(0.0..1.0));
        let votes = Array1::from_shape_fn(n, |_| rng.random_range(0..100));

        Ok(Self { sift, gist, image_id, category, confidence, votes })
    }

    pub fn len(&self) -> usize {
        self.sift.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut npz = NpzWriter::new_compressed(file);
        npz.add_array("sift", &self.sift)?;
        npz.add_array("gist", &self.gist)?;
        npz.add_array("image_id", &self.image_id)?;
        npz.add_array("category", &self.category)?;
        npz.add_array("confidence", &self.confidence)?;
        npz.add_array("votes", &self.votes)?;
        npz.add_array("num_records", &arr0(self.len() as i64))?;
        npz.add_array("sift_dim", &arr0(SIFT_DIM as i64))?;
        npz.add_array("gist_dim", &arr0(GIST_DIM as i64))?;
        npz.finish()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let mut npz = NpzReader::new(file)?;

        let sift: Array2<f32> = npz.by_name("sift")?;
        let gist: Array2<f32> = npz.by_name("gist")?;
        let image_id: Array1<i32> = npz.by_name("image_id")?;
        let category: Array1<i32> = npz.by_name("category")?;
        let confidence: Array1<f32> = npz.by_name("confidence")?;
        let votes: Array1<i32> = npz.by_name("votes")?;
        let num_records: Array0<i64> = npz.by_name("num_records")?;
        let sift_dim: Array0<i64> = npz.by_name("sift_dim")?;
        let gist_dim: Array0<i64> = npz.by_name("gist_dim")?;

        let n = num_records.into_scalar() as usize;
        ensure!(sift_dim.into_scalar() as usize == SIFT_DIM, "unexpected SIFT dimension in {}", path.display());
        ensure!(gist_dim.into_scalar() as usize == GIST_DIM, "unexpected GIST dimension in {}", path.display());
        ensure!(sift.ncols() == SIFT_DIM && gist.ncols() == GIST_DIM, "vector shape mismatch in {}", path.display());
        for (name, len) in [
            ("sift", sift.nrows()),
            ("gist", gist.nrows()),
            ("image_id", image_id.len()),
            ("category", category.len()),
            ("confidence", confidence.len()),
            ("votes", votes.len()),
        ] {
            ensure!(len == n, "array {} has {} records, expected {}", name, len, n);
        }

        Ok(Self { sift, gist, image_id, category, confidence, votes })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;
    use tempfile::NamedTempFile;

    use super::*;

    fn vectors(n: usize, dim: usize) -> Array2<f32> {
        Array2::from_shape_fn((n, dim), |(i, j)| (i * dim + j) as f32)
    }

    #[test]
    fn build_truncates_and_fills_metadata() -> Result<()> {
        let dataset = Dataset::build(vectors(1000, SIFT_DIM), vectors(1000, GIST_DIM), 500)?;
        assert_eq!(dataset.len(), 500);

        // image_id 为稠密递增序列
        assert!(dataset.image_id.iter().enumerate().all(|(i, &id)| id == i as i32));
        assert!(dataset.category.iter().all(|&c| (0..10).contains(&c)));
        assert!(dataset.confidence.iter().all(|&c| (0.0..1.0).contains(&c)));
        assert!(dataset.votes.iter().all(|&v| (0..100).contains(&v)));
        Ok(())
    }

    #[test]
    fn build_rejects_wrong_dimension() {
        let err = Dataset::build(vectors(10, 64), vectors(10, GIST_DIM), 10).unwrap_err();
        assert!(err.to_string().contains("SIFT vectors should be 128D"));

        let err = Dataset::build(vectors(10, SIFT_DIM), vectors(10, 100), 10).unwrap_err();
        assert!(err.to_string().contains("GIST vectors should be 960D"));
    }

    #[test]
    fn build_rejects_insufficient_records() {
        let err = Dataset::build(vectors(10, SIFT_DIM), vectors(10, GIST_DIM), 11).unwrap_err();
        assert!(err.to_string().contains("greater than the number of available vectors"));
    }

    #[test]
    fn load_rejects_length_mismatch() -> Result<()> {
        let file = NamedTempFile::new()?;
        let mut npz = NpzWriter::new_compressed(std::fs::File::create(file.path())?);
        npz.add_array("sift", &vectors(5, SIFT_DIM))?;
        npz.add_array("gist", &vectors(5, GIST_DIM))?;
        npz.add_array("image_id", &Array1::<i32>::zeros(5))?;
        // category 长度与 num_records 不一致
        npz.add_array("category", &Array1::<i32>::zeros(4))?;
        npz.add_array("confidence", &Array1::<f32>::zeros(5))?;
        npz.add_array("votes", &Array1::<i32>::zeros(5))?;
        npz.add_array("num_records", &arr0(5i64))?;
        npz.add_array("sift_dim", &arr0(SIFT_DIM as i64))?;
        npz.add_array("gist_dim", &arr0(GIST_DIM as i64))?;
        npz.finish()?;

        let err = Dataset::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("category"));
        Ok(())
    }

    #[test]
    fn save_load_roundtrip() -> Result<()> {
        let file = NamedTempFile::new()?;
        let dataset = Dataset::build(vectors(20, SIFT_DIM), vectors(20, GIST_DIM), 20)?;
        dataset.save(file.path())?;

        let loaded = Dataset::load(file.path())?;
        assert_eq!(loaded.len(), 20);
        assert_eq!(loaded.sift, dataset.sift);
        assert_eq!(loaded.gist, dataset.gist);
        assert_eq!(loaded.category, dataset.category);
        assert_eq!(loaded.confidence, dataset.confidence);
        Ok(())
    }
}
