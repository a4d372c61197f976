// crates/tw_config/src/statement.rs

//! 任务与语句定义
//!
//! 字段命名与 JSON 键保持 snake_case；缺省值通过
//! `#[serde(default = "...")]` 函数给出，便于最小化配置。

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tw_physics::types::{
    Area, BorderKind, ContactKind, GcmMode, PhysicalQuantity, SplittingKind, TimeDependency,
    WaveKind,
};
use tw_physics::Material;

/// 任务：一组语句
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// 语句列表，顺序执行
    pub statements: Vec<Statement>,
}

impl Task {
    /// 从 JSON 文件加载并校验
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let task: Task = serde_json::from_str(&content)?;
        task.validate()?;
        Ok(task)
    }

    /// 保存到 JSON 文件
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// 校验全部语句
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.statements.is_empty() {
            return Err(ConfigError::invalid("statements", "[]", "任务不能为空"));
        }
        for statement in &self.statements {
            statement.validate()?;
        }
        Ok(())
    }
}

/// 模型类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// 弹性模型
    Elastic,
    /// 声学模型
    Acoustic,
}

/// 一条语句：一次完整的模拟描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    /// 语句名（输出文件前缀）
    #[serde(default = "default_name")]
    pub name: String,

    /// 模型类别
    pub model: ModelKind,

    /// 空间维度
    pub dimension: usize,

    /// 立方网格一维插值阶数
    #[serde(default = "default_accuracy_order")]
    pub accuracy_order: usize,

    /// CFL 安全系数
    #[serde(default = "default_courant")]
    pub courant_number: f64,

    /// 分裂配置
    #[serde(default)]
    pub splitting: SplittingConfig,

    /// 特征法模式
    #[serde(default)]
    pub gcm: GcmConfig,

    /// 网格来源
    pub grid: GridConfig,

    /// 物体列表
    pub bodies: Vec<BodyConfig>,

    /// 初值
    #[serde(default)]
    pub initial: InitialConfig,

    /// 边界条件补丁
    #[serde(default)]
    pub border_conditions: Vec<BorderConditionConfig>,

    /// 接触条件
    #[serde(default)]
    pub contact_conditions: ContactConditionsConfig,

    /// 内部裂缝（立方网格）
    #[serde(default)]
    pub fractures: Vec<FractureConfig>,

    /// 快照器（核心不解释内容）
    #[serde(default)]
    pub snapshotters: Vec<SnapshotterConfig>,

    /// 终止时刻
    #[serde(default = "default_final_time")]
    pub final_time: f64,

    /// 快照数量上限（0 表示不限）
    #[serde(default)]
    pub number_of_snaps: usize,

    /// 每个快照间隔的步数
    #[serde(default = "default_steps_per_snap")]
    pub steps_per_snap: usize,
}

fn default_name() -> String {
    "statement".to_string()
}
fn default_accuracy_order() -> usize {
    2
}
fn default_courant() -> f64 {
    0.9
}
fn default_final_time() -> f64 {
    1.0
}
fn default_steps_per_snap() -> usize {
    1
}

/// 分裂配置
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SplittingConfig {
    /// 分裂阶数
    #[serde(default = "default_splitting_order")]
    pub order: usize,
    /// 层组合方式
    #[serde(default)]
    pub kind: SplittingKind,
}

fn default_splitting_order() -> usize {
    1
}

impl Default for SplittingConfig {
    fn default() -> Self {
        Self {
            order: 1,
            kind: SplittingKind::Product,
        }
    }
}

/// 特征法模式配置
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct GcmConfig {
    /// 边界基约定
    #[serde(default)]
    pub mode: GcmMode,
}

/// 网格来源
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridConfig {
    /// 结构化立方网格
    Cubic {
        /// 每轴节点数
        sizes: Vec<usize>,
        /// 每轴长度
        lengths: Vec<f64>,
    },
    /// 单纯形网格
    Simplex {
        /// 外部网格文件（INM 格式，三维）
        #[serde(default)]
        mesh_file: Option<PathBuf>,
        /// 目标空间步长（内置生成器）
        #[serde(default)]
        spatial_step: f64,
        /// 生成域每轴长度（内置生成器）
        #[serde(default)]
        lengths: Vec<f64>,
    },
}

/// 物体配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyConfig {
    /// 物体（网格）id
    pub id: u32,
    /// 材料
    pub material: Material,
    /// 物体级模型覆盖；一条语句的所有物体必须同模型，
    /// 不一致在校验阶段拒绝
    #[serde(default)]
    pub model: Option<ModelKind>,
    /// 占据区域（内置生成器按重心归属；mesh_file 与立方网格下
    /// 作为材料覆盖区域）
    #[serde(default)]
    pub area: Area,
}

/// 初值配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InitialConfig {
    /// 均匀量填充
    #[serde(default)]
    pub quantities: Vec<QuantityFill>,
    /// 特征波播种
    #[serde(default)]
    pub waves: Vec<WaveSeed>,
}

/// 均匀量填充
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantityFill {
    /// 物理量
    pub quantity: PhysicalQuantity,
    /// 值
    pub value: f64,
    /// 区域
    #[serde(default)]
    pub area: Area,
}

/// 特征波播种
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveSeed {
    /// 波型
    pub wave: WaveKind,
    /// 传播方向轴号
    pub direction: usize,
    /// 定标物理量
    pub quantity: PhysicalQuantity,
    /// 定标幅值
    pub amplitude: f64,
    /// 区域
    #[serde(default)]
    pub area: Area,
}

/// 边界条件补丁
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorderConditionConfig {
    /// 作用网格 id（单纯形网格用；缺省作用于全部物体）
    #[serde(default)]
    pub grid: Option<u32>,
    /// 作用区域
    #[serde(default)]
    pub area: Area,
    /// 条件类型
    pub kind: BorderKind,
    /// 条件右端时间函数（单纯形修正器形式）
    #[serde(default)]
    pub values: Vec<TimeDependency>,
    /// 镜像反射的量（立方网格 halo 形式）
    #[serde(default)]
    pub quantities: Vec<(PhysicalQuantity, TimeDependency)>,
    /// 是否作用于多体接触节点
    #[serde(default)]
    pub use_for_multicontact: bool,
}

/// 接触条件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConditionsConfig {
    /// 缺省接触类型
    #[serde(default = "default_contact")]
    pub default: ContactKind,
    /// 物体对覆盖
    #[serde(default)]
    pub pairs: Vec<PairContact>,
}

fn default_contact() -> ContactKind {
    ContactKind::Adhesion
}

impl Default for ContactConditionsConfig {
    fn default() -> Self {
        Self {
            default: ContactKind::Adhesion,
            pairs: Vec::new(),
        }
    }
}

/// 指定物体对的接触类型
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairContact {
    /// 物体对
    pub grids: (u32, u32),
    /// 接触类型
    pub kind: ContactKind,
}

/// 内部裂缝（立方网格）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FractureConfig {
    /// 法向轴
    pub direction: usize,
    /// 裂缝面坐标
    pub coordinate: f64,
    /// 作用区域
    #[serde(default)]
    pub area: Area,
    /// 裂缝面条件量
    #[serde(default)]
    pub values: Vec<(PhysicalQuantity, TimeDependency)>,
}

/// 快照器配置（核心只透传）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotterConfig {
    /// 输出格式
    pub format: String,
    /// 输出目录
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
    /// 导出的物理量
    #[serde(default)]
    pub quantities: Vec<PhysicalQuantity>,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("snapshots")
}

impl Statement {
    /// 语句级校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=3).contains(&self.dimension) {
            return Err(ConfigError::invalid(
                "dimension",
                self.dimension,
                "维度必须在 1..=3",
            ));
        }
        if !(1..=5).contains(&self.accuracy_order) {
            return Err(ConfigError::invalid(
                "accuracy_order",
                self.accuracy_order,
                "插值阶数必须在 1..=5",
            ));
        }
        if self.courant_number <= 0.0 {
            return Err(ConfigError::invalid(
                "courant_number",
                self.courant_number,
                "Courant 数必须为正",
            ));
        }
        if !(1..=2).contains(&self.splitting.order) {
            return Err(ConfigError::invalid(
                "splitting.order",
                self.splitting.order,
                "分裂阶数必须是 1 或 2",
            ));
        }
        if self.splitting.order == 2 && self.dimension == 3 {
            return Err(ConfigError::NotImplemented {
                feature: "三维二阶方向分裂".to_string(),
            });
        }
        if self.splitting.order == 2 && self.splitting.kind == SplittingKind::Sum {
            return Err(ConfigError::invalid(
                "splitting",
                "sum/2",
                "sum 分裂只支持一阶调度",
            ));
        }
        if self.bodies.is_empty() {
            return Err(ConfigError::invalid("bodies", "[]", "至少一个物体"));
        }
        for body in &self.bodies {
            if let Some(model) = body.model {
                if model != self.model {
                    return Err(ConfigError::NotImplemented {
                        feature: format!(
                            "一条语句里的混合模型（物体 {} 要求 {:?}，语句为 {:?}）",
                            body.id, model, self.model
                        ),
                    });
                }
            }
        }

        match &self.grid {
            GridConfig::Cubic { sizes, lengths } => {
                if sizes.len() != self.dimension || lengths.len() != self.dimension {
                    return Err(ConfigError::invalid(
                        "grid",
                        format!("sizes={:?} lengths={:?}", sizes, lengths),
                        "sizes/lengths 长度必须等于维度",
                    ));
                }
                if self.bodies.len() != 1 {
                    // 立方网格是单物体网格，分层介质用材料覆盖区域表达
                    if self.bodies.iter().skip(1).any(|b| matches!(b.area, Area::Everywhere)) {
                        return Err(ConfigError::invalid(
                            "bodies",
                            self.bodies.len(),
                            "立方网格的附加物体必须给出材料覆盖区域",
                        ));
                    }
                }
            }
            GridConfig::Simplex {
                mesh_file,
                spatial_step,
                lengths,
            } => {
                if self.dimension == 1 {
                    return Err(ConfigError::invalid(
                        "grid.kind",
                        "simplex",
                        "单纯形网格只支持二维与三维",
                    ));
                }
                if mesh_file.is_none() {
                    if *spatial_step <= 0.0 {
                        return Err(ConfigError::invalid(
                            "grid.spatial_step",
                            spatial_step,
                            "内置生成器需要正的空间步长",
                        ));
                    }
                    if lengths.len() != self.dimension {
                        return Err(ConfigError::invalid(
                            "grid.lengths",
                            format!("{:?}", lengths),
                            "内置生成器需要每轴长度",
                        ));
                    }
                } else if self.dimension != 3 {
                    return Err(ConfigError::invalid(
                        "grid.mesh_file",
                        "..",
                        "网格文件加载只支持三维 INM 格式",
                    ));
                }
                // 单纯形特征步要求 CFL 界
                let bound = if self.splitting.order == 2 { 0.5 } else { 1.0 };
                if self.courant_number > bound {
                    return Err(ConfigError::invalid(
                        "courant_number",
                        self.courant_number,
                        format!("单纯形网格要求 C <= {}", bound),
                    ));
                }
            }
        }

        // 接触条件与模型的相容性
        let contact_ok = |kind: ContactKind| match (self.model, kind) {
            (ModelKind::Elastic, ContactKind::Adhesion) => true,
            (ModelKind::Acoustic, ContactKind::Slide) => true,
            _ => false,
        };
        if self.bodies.len() > 1 {
            if !contact_ok(self.contact_conditions.default) {
                return Err(ConfigError::NotImplemented {
                    feature: format!(
                        "{:?} 模型与 {:?} 接触条件的组合",
                        self.model, self.contact_conditions.default
                    ),
                });
            }
            for pair in &self.contact_conditions.pairs {
                if !contact_ok(pair.kind) {
                    return Err(ConfigError::NotImplemented {
                        feature: format!(
                            "{:?} 模型与 {:?} 接触条件的组合",
                            self.model, pair.kind
                        ),
                    });
                }
            }
        }

        for fracture in &self.fractures {
            if fracture.direction >= self.dimension {
                return Err(ConfigError::invalid(
                    "fractures.direction",
                    fracture.direction,
                    "裂缝轴号越界",
                ));
            }
        }

        Ok(())
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tw_physics::IsotropicMaterial;

    fn minimal_statement() -> Statement {
        Statement {
            name: "test".to_string(),
            model: ModelKind::Elastic,
            dimension: 2,
            accuracy_order: 2,
            courant_number: 0.9,
            splitting: SplittingConfig::default(),
            gcm: GcmConfig::default(),
            grid: GridConfig::Cubic {
                sizes: vec![10, 10],
                lengths: vec![1.0, 1.0],
            },
            bodies: vec![BodyConfig {
                id: 1,
                material: Material::Isotropic(
                    IsotropicMaterial::new(1.0, 2.0, 0.5).unwrap(),
                ),
                model: None,
                area: Area::Everywhere,
            }],
            initial: InitialConfig::default(),
            border_conditions: Vec::new(),
            contact_conditions: ContactConditionsConfig::default(),
            fractures: Vec::new(),
            snapshotters: Vec::new(),
            final_time: 1.0,
            number_of_snaps: 0,
            steps_per_snap: 1,
        }
    }

    #[test]
    fn test_valid_statement() {
        assert!(minimal_statement().validate().is_ok());
    }

    #[test]
    fn test_invalid_courant() {
        let mut s = minimal_statement();
        s.courant_number = -0.5;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_3d_second_order_not_implemented() {
        let mut s = minimal_statement();
        s.dimension = 3;
        s.grid = GridConfig::Cubic {
            sizes: vec![4, 4, 4],
            lengths: vec![1.0, 1.0, 1.0],
        };
        s.splitting.order = 2;
        let err = s.validate().unwrap_err();
        assert!(matches!(err, ConfigError::NotImplemented { .. }));
    }

    #[test]
    fn test_simplex_cfl_bound() {
        let mut s = minimal_statement();
        s.grid = GridConfig::Simplex {
            mesh_file: None,
            spatial_step: 0.1,
            lengths: vec![1.0, 1.0],
        };
        s.courant_number = 1.5;
        assert!(s.validate().is_err());
        s.courant_number = 0.8;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_acoustic_adhesion_rejected() {
        let mut s = minimal_statement();
        s.model = ModelKind::Acoustic;
        s.grid = GridConfig::Simplex {
            mesh_file: None,
            spatial_step: 0.1,
            lengths: vec![1.0, 1.0],
        };
        s.courant_number = 0.5;
        s.bodies.push(BodyConfig {
            id: 2,
            material: Material::Isotropic(IsotropicMaterial::new(1.0, 2.0, 0.0).unwrap()),
            model: None,
            area: Area::Everywhere,
        });
        // 缺省 adhesion 对声学模型不可用
        let err = s.validate().unwrap_err();
        assert!(matches!(err, ConfigError::NotImplemented { .. }));
    }

    #[test]
    fn test_json_round_trip() {
        let task = Task {
            statements: vec![minimal_statement()],
        };
        let json = serde_json::to_string_pretty(&task).unwrap();
        let parsed: Task = serde_json::from_str(&json).unwrap();
        assert!(parsed.validate().is_ok());
        assert_eq!(parsed.statements[0].name, "test");
    }
}
