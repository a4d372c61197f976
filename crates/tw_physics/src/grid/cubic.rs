// crates/tw_physics/src/grid/cubic.rs

//! 结构化立方网格
//!
//! 轴对齐张量积网格，节点存储按 halo 加宽：每个面外侧
//! `border_size` 层辅助节点，镜像反射实现边界条件，
//! 特征步的一维模板直接越过边界读取。
//! 邻接就是线性索引 ±stride。

use nalgebra::SVector;
use tw_foundation::{ensure, TwError, TwResult};

/// 结构化立方网格（几何与索引，不含状态）
#[derive(Debug, Clone)]
pub struct CubicGrid<const D: usize> {
    /// 每轴实节点数
    sizes: [usize; 3],
    /// 每轴空间步长
    steps: [f64; 3],
    /// 原点（实节点 0 的坐标）
    origin: [f64; 3],
    /// halo 层数
    border_size: usize,
    /// 每轴 padded 跨度
    strides: [usize; 3],
    /// padded 总节点数
    total: usize,
}

impl<const D: usize> CubicGrid<D> {
    /// 创建网格
    ///
    /// `lengths[a]` 覆盖 `sizes[a] − 1` 个区间。
    pub fn new(sizes: [usize; D], lengths: [f64; D], border_size: usize) -> TwResult<Self> {
        let mut s3 = [1usize; 3];
        let mut h3 = [1.0f64; 3];
        for a in 0..D {
            ensure!(
                sizes[a] >= 2,
                TwError::bad_config(format!("轴 {} 节点数必须 >= 2: {}", a, sizes[a]))
            );
            ensure!(
                lengths[a] > 0.0,
                TwError::bad_config(format!("轴 {} 长度必须为正: {}", a, lengths[a]))
            );
            s3[a] = sizes[a];
            h3[a] = lengths[a] / (sizes[a] - 1) as f64;
        }

        let padded = |a: usize| {
            if a < D {
                s3[a] + 2 * border_size
            } else {
                1
            }
        };
        let mut strides = [0usize; 3];
        strides[0] = 1;
        strides[1] = padded(0);
        strides[2] = padded(0) * padded(1);
        let total = padded(0) * padded(1) * padded(2);

        Ok(Self {
            sizes: s3,
            steps: h3,
            origin: [0.0; 3],
            border_size,
            strides,
            total,
        })
    }

    /// 平移原点
    pub fn with_origin(mut self, origin: [f64; D]) -> Self {
        for a in 0..D {
            self.origin[a] = origin[a];
        }
        self
    }

    /// 每轴实节点数
    #[inline]
    pub fn size(&self, axis: usize) -> usize {
        self.sizes[axis]
    }

    /// 每轴空间步长
    #[inline]
    pub fn step(&self, axis: usize) -> f64 {
        self.steps[axis]
    }

    /// halo 层数
    #[inline]
    pub fn border_size(&self) -> usize {
        self.border_size
    }

    /// padded 总节点数（状态分配用）
    #[inline]
    pub fn total_nodes(&self) -> usize {
        self.total
    }

    /// 实节点数
    pub fn real_nodes(&self) -> usize {
        (0..D).map(|a| self.sizes[a]).product()
    }

    /// 最小空间步长
    pub fn min_step(&self) -> f64 {
        (0..D).fold(f64::MAX, |acc, a| acc.min(self.steps[a]))
    }

    /// 实坐标（可为 halo 坐标 `-border_size..size+border_size`）到线性索引
    #[inline]
    pub fn index(&self, coords: [isize; D]) -> usize {
        let mut idx = 0usize;
        for a in 0..D {
            let shifted = coords[a] + self.border_size as isize;
            debug_assert!(
                shifted >= 0 && (shifted as usize) < self.sizes[a] + 2 * self.border_size,
                "坐标越过 halo: 轴 {} 坐标 {}",
                a,
                coords[a]
            );
            idx += shifted as usize * self.strides[a];
        }
        idx
    }

    /// 沿轴的线性索引跨度
    #[inline]
    pub fn stride(&self, axis: usize) -> usize {
        self.strides[axis]
    }

    /// 节点空间坐标
    pub fn coords(&self, node: [isize; D]) -> SVector<f64, D> {
        let mut p = SVector::<f64, D>::zeros();
        for a in 0..D {
            p[a] = self.origin[a] + node[a] as f64 * self.steps[a];
        }
        p
    }

    /// 遍历全部实节点
    pub fn for_each_real<F: FnMut([isize; D], usize)>(&self, mut f: F) {
        let mut coords = [0isize; D];
        loop {
            f(coords, self.index(coords));
            // 逐轴进位
            let mut a = 0;
            loop {
                coords[a] += 1;
                if (coords[a] as usize) < self.sizes[a] {
                    break;
                }
                coords[a] = 0;
                a += 1;
                if a == D {
                    return;
                }
            }
        }
    }

    /// 遍历轴向切片 `coords[axis] == k` 上的全部实节点
    pub fn for_each_in_slice<F: FnMut([isize; D], usize)>(
        &self,
        axis: usize,
        k: isize,
        mut f: F,
    ) {
        let mut coords = [0isize; D];
        coords[axis] = k;
        loop {
            f(coords, self.index(coords));
            let mut a = 0;
            loop {
                if a == axis {
                    a += 1;
                    if a == D {
                        return;
                    }
                    continue;
                }
                coords[a] += 1;
                if (coords[a] as usize) < self.sizes[a] {
                    break;
                }
                coords[a] = 0;
                a += 1;
                if a == D {
                    return;
                }
            }
        }
    }
}

// ============================================================
// 测试
// ============================================================
