// crates/tw_physics/src/rheology/materials.rs

//! 材料参数
//!
//! 材料一经装入节点即不可变，节点通过索引共享。

use serde::{Deserialize, Serialize};
use tw_foundation::{ensure, TwError, TwResult};

/// 各向同性材料（Lamé 参数）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsotropicMaterial {
    /// 密度
    pub rho: f64,
    /// Lamé 第一参数 λ
    pub lambda: f64,
    /// 剪切模量 μ
    pub mu: f64,
}

impl IsotropicMaterial {
    /// 创建并校验
    pub fn new(rho: f64, lambda: f64, mu: f64) -> TwResult<Self> {
        ensure!(
            rho > 0.0,
            TwError::bad_config(format!("材料密度必须为正: rho = {}", rho))
        );
        ensure!(
            lambda > 0.0,
            TwError::bad_config(format!("lambda 必须为正: {}", lambda))
        );
        ensure!(mu >= 0.0, TwError::bad_config(format!("mu 不能为负: {}", mu)));
        Ok(Self { rho, lambda, mu })
    }

    /// 纵波速度（弹性）
    #[inline]
    pub fn c_p(&self) -> f64 {
        ((self.lambda + 2.0 * self.mu) / self.rho).sqrt()
    }

    /// 横波速度
    #[inline]
    pub fn c_s(&self) -> f64 {
        (self.mu / self.rho).sqrt()
    }

    /// 声学纵波速度
    #[inline]
    pub fn c_acoustic(&self) -> f64 {
        (self.lambda / self.rho).sqrt()
    }

    /// 杨氏模量
    #[inline]
    pub fn young_modulus(&self) -> f64 {
        self.mu * (3.0 * self.lambda + 2.0 * self.mu) / (self.lambda + self.mu)
    }

    /// 声阻抗 √(E·ρ)
    #[inline]
    pub fn acoustic_impedance(&self) -> f64 {
        (self.young_modulus() * self.rho).sqrt()
    }
}

/// 正交各向异性材料（3D）
///
/// 刚度分量按 Voigt 记号给出，可附带旋转角把材料主轴
/// 转到计算坐标系。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrthotropicMaterial {
    /// 密度
    pub rho: f64,
    /// 刚度分量 (c11, c12, c13, c22, c23, c33, c44, c55, c66)
    pub c: [f64; 9],
    /// 主轴旋转角（绕 x、y、z 轴，弧度），缺省不旋转
    #[serde(default)]
    pub rotation: Option<[f64; 3]>,
}

impl OrthotropicMaterial {
    /// 创建并校验
    pub fn new(rho: f64, c: [f64; 9]) -> TwResult<Self> {
        ensure!(
            rho > 0.0,
            TwError::bad_config(format!("材料密度必须为正: rho = {}", rho))
        );
        // 对角刚度必须为正，非对角只需有限
        for (name, value) in [
            ("c11", c[0]),
            ("c22", c[3]),
            ("c33", c[5]),
            ("c44", c[6]),
            ("c55", c[7]),
            ("c66", c[8]),
        ] {
            ensure!(
                value > 0.0,
                TwError::bad_config(format!("刚度分量 {} 必须为正: {}", name, value))
            );
        }
        Ok(Self {
            rho,
            c,
            rotation: None,
        })
    }

    /// 附带主轴旋转
    pub fn with_rotation(mut self, angles: [f64; 3]) -> Self {
        self.rotation = Some(angles);
        self
    }

    /// Voigt 6x6 刚度矩阵（正交各向异性填充模式）
    pub fn stiffness_voigt(&self) -> [[f64; 6]; 6] {
        let [c11, c12, c13, c22, c23, c33, c44, c55, c66] = self.c;
        let mut m = [[0.0; 6]; 6];
        m[0][0] = c11;
        m[0][1] = c12;
        m[0][2] = c13;
        m[1][0] = c12;
        m[1][1] = c22;
        m[1][2] = c23;
        m[2][0] = c13;
        m[2][1] = c23;
        m[2][2] = c33;
        m[3][3] = c44; // yz
        m[4][4] = c55; // xz
        m[5][5] = c66; // xy
        m
    }
}

/// 材料：各向同性或正交各向异性
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Material {
    /// 各向同性
    Isotropic(IsotropicMaterial),
    /// 正交各向异性
    Orthotropic(OrthotropicMaterial),
}

impl Material {
    /// 密度
    pub fn rho(&self) -> f64 {
        match self {
            Material::Isotropic(m) => m.rho,
            Material::Orthotropic(m) => m.rho,
        }
    }

    /// 各向同性视图；正交各向异性返回错误
    pub fn as_isotropic(&self) -> TwResult<&IsotropicMaterial> {
        match self {
            Material::Isotropic(m) => Ok(m),
            Material::Orthotropic(_) => Err(TwError::bad_config(
                "该模型只支持各向同性材料".to_string(),
            )),
        }
    }

    /// 简短描述，用于错误信息
    pub fn describe(&self) -> String {
        match self {
            Material::Isotropic(m) => format!(
                "isotropic(rho={}, lambda={}, mu={})",
                m.rho, m.lambda, m.mu
            ),
            Material::Orthotropic(m) => format!("orthotropic(rho={})", m.rho),
        }
    }
}

// ============================================================
// 测试
// ============================================================
