// crates/tw_mesh/src/inm.rs

//! INM 四面体网格文件加载
//!
//! 格式（空白分隔 ASCII）：
//!
//! ```text
//! N                  点数
//! x y z              × N 行
//! M                  单元数
//! v0 v1 v2 v3 mat    × M 行，顶点 1 起编号
//! 0                  结束标志
//! ```
//!
//! 材料号 0 表示空域。读入后立即做悬挂单元修正，
//! 再把剖分交给网格层。

use crate::builder::TriangulationBuilder;
use crate::error::MeshError;
use crate::triangulation::{Triangulation, EMPTY_SPACE};
use nalgebra::SVector;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// 空域材料号
pub const EMPTY_MATERIAL: u32 = 0;

/// 从 INM 文件加载四面体剖分
///
/// 单元属主 id 取材料号本身（0 映射为空域）。
pub fn load_inm(path: impl AsRef<Path>) -> Result<Triangulation<3>, MeshError> {
    let path = path.as_ref();
    info!(path = %path.display(), "开始读取 INM 网格");

    let file = File::open(path)?;
    let mut reader = Lines::new(BufReader::new(file), path);

    let n_points: usize = reader.next_scalar("点数")?;
    if n_points < 4 {
        return Err(reader.error("点数不足以构成四面体"));
    }

    let mut b = TriangulationBuilder::<3>::new();
    for i in 0..n_points {
        let fields = reader.next_fields(3, "点坐标")?;
        b.add_point(SVector::<f64, 3>::new(
            reader.parse(&fields[0], "x")?,
            reader.parse(&fields[1], "y")?,
            reader.parse(&fields[2], "z")?,
        ));
        if i % 100_000 == 0 && i != 0 {
            info!(loaded = i, "点读取中");
        }
    }

    let n_cells: usize = reader.next_scalar("单元数")?;
    if n_cells < 1 {
        return Err(reader.error("单元数必须为正"));
    }
    for i in 0..n_cells {
        let fields = reader.next_fields(5, "单元")?;
        let mut verts = [0u32; 4];
        for (k, v) in verts.iter_mut().enumerate() {
            let one_based: usize = reader.parse(&fields[k], "顶点号")?;
            if one_based == 0 || one_based > n_points {
                return Err(reader.error("顶点号超出范围"));
            }
            *v = (one_based - 1) as u32;
        }
        let material: u32 = reader.parse(&fields[4], "材料号")?;
        let grid_id = if material == EMPTY_MATERIAL {
            EMPTY_SPACE
        } else {
            material
        };
        b.add_cell(&verts, grid_id);
        if (i + 1) % 500_000 == 0 {
            info!(loaded = i + 1, "单元读取中");
        }
    }

    // 结束标志
    let terminator: i64 = reader.next_scalar("结束标志")?;
    if terminator != 0 {
        return Err(reader.error("缺少结束标志 0"));
    }

    let mut tri = b.build()?;
    info!(
        n_vertices = tri.n_vertices(),
        n_cells = tri.n_cells(),
        "INM 网格读取完成"
    );

    tri.correct_hanged_cells();
    Ok(tri)
}

/// 逐行读取器，带行号追踪
struct Lines<'a, R: BufRead> {
    reader: R,
    path: &'a Path,
    line_no: usize,
}

impl<'a, R: BufRead> Lines<'a, R> {
    fn new(reader: R, path: &'a Path) -> Self {
        Self {
            reader,
            path,
            line_no: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> MeshError {
        MeshError::BadFormat {
            path: self.path.to_path_buf(),
            line: self.line_no,
            message: message.into(),
        }
    }

    fn next_line(&mut self, what: &str) -> Result<String, MeshError> {
        loop {
            let mut line = String::new();
            let n = self.reader.read_line(&mut line)?;
            self.line_no += 1;
            if n == 0 {
                return Err(self.error(format!("读取 {} 时文件意外结束", what)));
            }
            if !line.trim().is_empty() {
                return Ok(line);
            }
        }
    }

    fn next_fields(&mut self, count: usize, what: &str) -> Result<Vec<String>, MeshError> {
        let line = self.next_line(what)?;
        let fields: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if fields.len() != count {
            return Err(self.error(format!(
                "{} 需要 {} 个字段，实际 {}",
                what,
                count,
                fields.len()
            )));
        }
        Ok(fields)
    }

    fn next_scalar<T: std::str::FromStr>(&mut self, what: &str) -> Result<T, MeshError> {
        let fields = self.next_fields(1, what)?;
        self.parse(&fields[0], what)
    }

    fn parse<T: std::str::FromStr>(&self, field: &str, what: &str) -> Result<T, MeshError> {
        field
            .parse()
            .map_err(|_| self.error(format!("{} 解析失败: {:?}", what, field)))
    }
}

// ============================================================
// 测试
// ============================================================
