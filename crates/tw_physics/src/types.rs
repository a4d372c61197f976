// crates/tw_physics/src/types.rs

//! 求解器核心枚举
//!
//! 物理量、波型、边界/接触条件、分裂方式等封闭集合。
//! 全部带 serde 派生，配置层直接复用。

use serde::{Deserialize, Serialize};

/// 标量可观测物理量
///
/// 每个模型暴露其中的一个子集，通过
/// [`WaveModel::get_quantity`](crate::rheology::models::WaveModel::get_quantity) /
/// `set_quantity` 读写 PDE 向量。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhysicalQuantity {
    /// 速度 x 分量
    Vx,
    /// 速度 y 分量
    Vy,
    /// 速度 z 分量
    Vz,
    /// 应力分量 σ_xx
    Sxx,
    /// 应力分量 σ_xy
    Sxy,
    /// 应力分量 σ_xz
    Sxz,
    /// 应力分量 σ_yy
    Syy,
    /// 应力分量 σ_yz
    Syz,
    /// 应力分量 σ_zz
    Szz,
    /// 压力 p = -tr(σ)/D（声学模型为本征变量）
    Pressure,
    /// 密度
    Density,
}

/// 命名特征波
///
/// 波型到 `u1` 列号的映射是公共契约的一部分，
/// 初值播种依赖它（见 [`crate::rheology::gcm_matrix`]）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveKind {
    /// 前行纵波
    PForward,
    /// 后行纵波
    PBackward,
    /// 前行横波（第一支）
    S1Forward,
    /// 后行横波（第一支）
    S1Backward,
    /// 前行横波（第二支，仅 3D）
    S2Forward,
    /// 后行横波（第二支，仅 3D）
    S2Backward,
}

/// 边界条件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderKind {
    /// 固定外力（给定面力）
    FixedForce,
    /// 固定速度
    FixedVelocity,
    /// 无反射（外行不变量置零）
    NonReflection,
    /// 自由表面（零面力）
    FreeBorder,
}

/// 接触条件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    /// 粘接：速度与面力全分量连续（弹性-弹性）
    Adhesion,
    /// 滑移：法向速度与压力连续（声学-声学）
    Slide,
}

/// 方向分裂的层组合方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SplittingKind {
    /// 各阶段串联，层交换
    #[default]
    Product,
    /// 各阶段独立写层，最后取平均
    Sum,
}

/// 边界节点矩阵基约定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GcmMode {
    /// 所有节点共用全局基，修正在每个阶段后进行
    #[default]
    GlobalBasis,
    /// 边界节点的矩阵写在边界局部基，仅阶段 0 后修正
    LocalBasis,
}

/// 节点分类
///
/// 构建时按顶点周围的网格 id 集合惰性判定，网格不动则不变。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// 体内节点
    Inner,
    /// 自由边界节点（与空域相邻）
    Border,
    /// 接触节点（恰与另一个物体相邻）
    Contact,
    /// 多体接触节点（三个及以上物体）
    MultiContact,
}

/// 空间区域谓词
///
/// 初值填充、边界条件补丁、材料覆盖都以区域限定作用范围。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Area {
    /// 全域
    #[default]
    Everywhere,
    /// 轴对齐盒（缺省维度不限制）
    Box {
        /// 各轴下界
        min: Vec<f64>,
        /// 各轴上界
        max: Vec<f64>,
    },
    /// 单轴区间
    Slab {
        /// 轴号
        axis: usize,
        /// 下界
        from: f64,
        /// 上界
        to: f64,
    },
}

impl Area {
    /// 点是否落在区域内（闭区间）
    pub fn contains(&self, p: &[f64]) -> bool {
        match self {
            Area::Everywhere => true,
            Area::Box { min, max } => p
                .iter()
                .enumerate()
                .all(|(a, &x)| {
                    let lo = min.get(a).copied().unwrap_or(f64::NEG_INFINITY);
                    let hi = max.get(a).copied().unwrap_or(f64::INFINITY);
                    x >= lo && x <= hi
                }),
            Area::Slab { axis, from, to } => match p.get(*axis) {
                Some(&x) => x >= *from && x <= *to,
                None => false,
            },
        }
    }
}

/// 标量时间依赖（边界条件右端）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeDependency {
    /// 常值
    Constant {
        /// 值
        value: f64,
    },
    /// 正弦激励
    Sine {
        /// 振幅
        amplitude: f64,
        /// 角频率
        omega: f64,
        /// 初相位
        phase: f64,
    },
}

impl TimeDependency {
    /// 恒零
    pub fn zero() -> Self {
        TimeDependency::Constant { value: 0.0 }
    }

    /// 求值
    #[inline]
    pub fn at(&self, t: f64) -> f64 {
        match self {
            TimeDependency::Constant { value } => *value,
            TimeDependency::Sine {
                amplitude,
                omega,
                phase,
            } => amplitude * (omega * t + phase).sin(),
        }
    }
}
