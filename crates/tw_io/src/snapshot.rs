// crates/tw_io/src/snapshot.rs

//! 快照器
//!
//! Legacy VTK（ASCII 点云 + 逐点标量场）与 CSV 两种导出。
//! 文件名 `<名称>_<步号>.<后缀>`，目录不存在时自动创建。

use crate::IoError;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tw_physics::{PhysicalQuantity, Simulation};

/// 快照契约
pub trait Snapshotter {
    /// 落盘一帧
    fn snapshot(&mut self, sim: &dyn Simulation, step: usize) -> Result<(), IoError>;
}

/// Legacy VTK ASCII 导出
pub struct VtkSnapshotter {
    directory: PathBuf,
    name: String,
    quantities: Vec<PhysicalQuantity>,
}

impl VtkSnapshotter {
    /// 创建导出器
    pub fn new(
        directory: impl Into<PathBuf>,
        name: impl Into<String>,
        quantities: Vec<PhysicalQuantity>,
    ) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
            quantities,
        }
    }
}

impl Snapshotter for VtkSnapshotter {
    fn snapshot(&mut self, sim: &dyn Simulation, step: usize) -> Result<(), IoError> {
        create_dir_all(&self.directory)?;
        let path = self.directory.join(format!("{}_{:06}.vtk", self.name, step));
        let mut w = BufWriter::new(File::create(&path)?);

        let positions = sim.positions();
        writeln!(w, "# vtk DataFile Version 3.0")?;
        writeln!(w, "{} step {} t = {:.6e}", self.name, step, sim.time())?;
        writeln!(w, "ASCII")?;
        writeln!(w, "DATASET POLYDATA")?;
        writeln!(w, "POINTS {} double", positions.len())?;
        for p in &positions {
            writeln!(w, "{:.9e} {:.9e} {:.9e}", p[0], p[1], p[2])?;
        }

        writeln!(w, "POINT_DATA {}", positions.len())?;
        for &q in &self.quantities {
            writeln!(w, "SCALARS {:?} double 1", q)?;
            writeln!(w, "LOOKUP_TABLE default")?;
            for v in sim.sample(q) {
                writeln!(w, "{:.9e}", v)?;
            }
        }
        info!(path = %path.display(), "VTK 快照已写出");
        Ok(())
    }
}

/// CSV 导出（坐标 + 各量一列）
pub struct CsvSnapshotter {
    directory: PathBuf,
    name: String,
    quantities: Vec<PhysicalQuantity>,
}

impl CsvSnapshotter {
    /// 创建导出器
    pub fn new(
        directory: impl Into<PathBuf>,
        name: impl Into<String>,
        quantities: Vec<PhysicalQuantity>,
    ) -> Self {
        Self {
            directory: directory.into(),
            name: name.into(),
            quantities,
        }
    }
}

impl Snapshotter for CsvSnapshotter {
    fn snapshot(&mut self, sim: &dyn Simulation, step: usize) -> Result<(), IoError> {
        create_dir_all(&self.directory)?;
        let path = self.directory.join(format!("{}_{:06}.csv", self.name, step));
        let mut w = BufWriter::new(File::create(&path)?);

        write!(w, "x,y,z")?;
        for q in &self.quantities {
            write!(w, ",{:?}", q)?;
        }
        writeln!(w)?;

        let positions = sim.positions();
        let fields: Vec<Vec<f64>> = self.quantities.iter().map(|&q| sim.sample(q)).collect();
        for (i, p) in positions.iter().enumerate() {
            write!(w, "{:.9e},{:.9e},{:.9e}", p[0], p[1], p[2])?;
            for field in &fields {
                write!(w, ",{:.9e}", field[i])?;
            }
            writeln!(w)?;
        }
        info!(path = %path.display(), "CSV 快照已写出");
        Ok(())
    }
}
