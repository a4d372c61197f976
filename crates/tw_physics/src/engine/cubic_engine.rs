// crates/tw_physics/src/engine/cubic_engine.rs

//! 立方网格驱动
//!
//! 单物体结构化网格上的完整时间步：halo 镜像边界、
//! 轴向特征步、裂缝一维辅助子问题、ODE 与用户修正器。
//! 区域化的材料覆盖支持分层介质。

use super::timestep::max_abs_component;
use super::{stage_schedule, CflCalculator, Simulation};
use crate::error::PhysicsError;
use crate::gcm::cubic::{interpolate_along, stage};
use crate::grid::CubicGrid;
use crate::rheology::gcm_matrix::MatrixStore;
use crate::rheology::materials::Material;
use crate::rheology::models::WaveModel;
use crate::state::PdeStorage;
use crate::types::{Area, PhysicalQuantity, SplittingKind, TimeDependency, WaveKind};
use nalgebra::{SMatrix, SVector};
use std::marker::PhantomData;
use tracing::{info, warn};
use tw_foundation::{ensure, TwError, TwResult};

/// 边界条件补丁（作用于区域内的边界面节点）
#[derive(Debug, Clone)]
pub struct CubicBorderCondition {
    /// 作用区域
    pub area: Area,
    /// 被反射的物理量与其时间函数 `g(t)`：`q_virt = −q_real + 2·g(t)`
    pub values: Vec<(PhysicalQuantity, TimeDependency)>,
}

/// 内部裂缝（单侧描述，初始化时拆成两侧）
#[derive(Debug, Clone)]
pub struct CubicFracture {
    /// 裂缝法向轴
    pub axis: usize,
    /// 裂缝面坐标
    pub coordinate: f64,
    /// 作用区域
    pub area: Area,
    /// 裂缝面上的条件量
    pub values: Vec<(PhysicalQuantity, TimeDependency)>,
}

/// 拆分后的单侧裂缝
#[derive(Debug, Clone)]
struct FractureSide {
    axis: usize,
    /// 裂缝侧第一排实节点坐标
    index: isize,
    /// +1 指向体内一侧，-1 指向另一侧
    inner_sign: isize,
    area: Area,
    values: Vec<(PhysicalQuantity, TimeDependency)>,
}

/// 幅值爆炸阈值（线性问题里幅值只该缓慢变化）
pub(crate) const BLOWUP_LIMIT: f64 = 1e100;

/// ODE 推进回调：`(ode 值, PDE 向量, Δt)`
pub type OdeUpdate<const M: usize> = Box<dyn Fn(&mut f64, &mut SVector<f64, M>, f64) + Send + Sync>;
/// 节点修正回调（损伤、塑性等）
pub type NodeCorrector<const M: usize> = Box<dyn Fn(&mut SVector<f64, M>) + Send + Sync>;

/// 立方网格引擎
pub struct CubicEngine<Mdl, const D: usize, const M: usize, const K: usize> {
    grid: CubicGrid<D>,
    store: MatrixStore<D, M>,
    storage: PdeStorage<M>,
    materials: Vec<Material>,
    basis: SMatrix<f64, D, D>,
    cfl: CflCalculator,
    order: usize,
    splitting_order: usize,
    splitting: SplittingKind,
    border_conditions: Vec<CubicBorderCondition>,
    fractures: Vec<FractureSide>,
    ode_update: Option<OdeUpdate<M>>,
    correctors: Vec<NodeCorrector<M>>,
    time: f64,
    last_tau: f64,
    step_index: usize,
    _model: PhantomData<Mdl>,
}

impl<Mdl, const D: usize, const M: usize, const K: usize> CubicEngine<Mdl, D, M, K>
where
    Mdl: WaveModel<D, M, K>,
{
    /// 创建引擎
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sizes: [usize; D],
        lengths: [f64; D],
        material: Material,
        order: usize,
        courant: f64,
        splitting: SplittingKind,
        splitting_order: usize,
    ) -> TwResult<Self> {
        ensure!(
            (1..=5).contains(&order),
            TwError::bad_config(format!("插值阶数必须在 1..=5: {}", order))
        );
        ensure!(
            !(splitting == SplittingKind::Sum && splitting_order == 2),
            TwError::bad_config("sum 分裂只支持一阶调度".to_string())
        );
        // 组合合法性（含三维二阶拒绝）提前暴露
        stage_schedule(D, splitting_order, 1.0)?;

        // halo 深度覆盖模板宽度与最大回溯位移
        let border_size = order + courant.ceil() as usize + 1;
        let grid = CubicGrid::<D>::new(sizes, lengths, border_size)?;
        let cfl = CflCalculator::new(courant, grid.min_step())?;

        let basis = SMatrix::<f64, D, D>::identity();
        let mut store = MatrixStore::<D, M>::new();
        let matrix_idx = store.intern(0, &basis, || {
            Mdl::construct_gcm_matrices(&material, &basis)
        })?;

        let n_layers = match splitting {
            SplittingKind::Sum => D,
            SplittingKind::Product => 1,
        };
        let mut storage = PdeStorage::<M>::new(grid.total_nodes(), n_layers, false);
        for i in 0..grid.total_nodes() {
            storage.set_matrix_idx(i, matrix_idx);
        }

        info!(
            model = Mdl::NAME,
            nodes = grid.real_nodes(),
            border_size,
            order,
            "立方网格引擎就绪"
        );

        Ok(Self {
            grid,
            store,
            storage,
            materials: vec![material],
            basis,
            cfl,
            order,
            splitting_order,
            splitting,
            border_conditions: Vec::new(),
            fractures: Vec::new(),
            ode_update: None,
            correctors: Vec::new(),
            time: 0.0,
            last_tau: 0.0,
            step_index: 0,
            _model: PhantomData,
        })
    }

    /// 网格只读访问
    pub fn grid(&self) -> &CubicGrid<D> {
        &self.grid
    }

    /// 节点 PDE 值读取（实坐标）
    pub fn pde_at(&self, coords: [isize; D]) -> &SVector<f64, M> {
        self.storage.pde(self.grid.index(coords))
    }

    /// 区域内材料覆盖（分层介质）
    pub fn set_material_in_area(&mut self, material: Material, area: &Area) -> TwResult<()> {
        let material_idx = self.materials.len() as u32;
        self.materials.push(material);
        let basis = self.basis;
        let matrix_idx = self.store.intern(material_idx, &basis, || {
            Mdl::construct_gcm_matrices(&material, &basis)
        })?;

        let mut targets = Vec::new();
        self.grid.for_each_real(|coords, idx| {
            if area.contains(self.grid.coords(coords).as_slice()) {
                targets.push(idx);
            }
        });
        for idx in targets {
            self.storage.set_matrix_idx(idx, matrix_idx);
            self.storage.set_material_idx(idx, material_idx);
        }
        Ok(())
    }

    /// 添加边界条件补丁
    pub fn add_border_condition(&mut self, condition: CubicBorderCondition) {
        self.border_conditions.push(condition);
    }

    /// 添加内部裂缝
    pub fn add_fracture(&mut self, fracture: CubicFracture) -> TwResult<()> {
        let axis = fracture.axis;
        ensure!(
            axis < D,
            TwError::bad_config(format!("裂缝轴号越界: {}", axis))
        );
        let h = self.grid.step(axis);
        let index = (fracture.coordinate / h).round() as isize;
        ensure!(
            index > 0 && (index as usize) < self.grid.size(axis) - 1,
            TwError::bad_config(format!("裂缝坐标 {} 不在体内", fracture.coordinate))
        );
        self.fractures.push(FractureSide {
            axis,
            index,
            inner_sign: -1,
            area: fracture.area.clone(),
            values: fracture.values.clone(),
        });
        self.fractures.push(FractureSide {
            axis,
            index: index + 1,
            inner_sign: 1,
            area: fracture.area,
            values: fracture.values,
        });
        Ok(())
    }

    /// 安装 ODE 推进回调并启用 ODE 槽位
    pub fn set_ode_update(&mut self, update: OdeUpdate<M>) {
        if !self.storage.has_ode() {
            let n_layers = self.storage.n_layers();
            let mut with_ode = PdeStorage::<M>::new(self.storage.len(), n_layers, true);
            for i in 0..self.storage.len() {
                *with_ode.pde_mut(i) = *self.storage.pde(i);
                with_ode.set_matrix_idx(i, self.storage.matrix_idx(i));
                with_ode.set_material_idx(i, self.storage.material_idx(i));
            }
            self.storage = with_ode;
        }
        self.ode_update = Some(update);
    }

    /// 追加用户修正器
    pub fn add_corrector(&mut self, corrector: NodeCorrector<M>) {
        self.correctors.push(corrector);
    }

    /// 区域内均匀填充物理量（叠加语义）
    pub fn fill_quantity(
        &mut self,
        q: PhysicalQuantity,
        value: f64,
        area: &Area,
    ) -> TwResult<()> {
        let mut increment = SVector::<f64, M>::zeros();
        ensure!(
            Mdl::set_quantity(q, value, &mut increment),
            TwError::bad_config(format!("模型 {} 不暴露物理量 {:?}", Mdl::NAME, q))
        );
        let mut targets = Vec::new();
        self.grid.for_each_real(|coords, idx| {
            if area.contains(self.grid.coords(coords).as_slice()) {
                targets.push(idx);
            }
        });
        for idx in targets {
            *self.storage.pde_mut(idx) += increment;
        }
        Ok(())
    }

    /// 区域内播种命名特征波
    ///
    /// 取阶段方向 `u1` 的波列，按指定物理量缩放到给定幅值。
    pub fn seed_wave(
        &mut self,
        wave: WaveKind,
        axis: usize,
        q: PhysicalQuantity,
        amplitude: f64,
        area: &Area,
    ) -> TwResult<()> {
        ensure!(
            axis < D,
            TwError::bad_config(format!("波方向轴号越界: {}", axis))
        );
        let mut targets = Vec::new();
        self.grid.for_each_real(|coords, idx| {
            if area.contains(self.grid.coords(coords).as_slice()) {
                targets.push(idx);
            }
        });
        for idx in targets {
            let material = &self.materials[self.storage.material_idx(idx) as usize];
            let column = Mdl::wave_column(material, wave).ok_or_else(|| {
                TwError::bad_config(format!("模型/材料组合不支持波型 {:?}", wave))
            })?;
            let gm = self.store.get(self.storage.matrix_idx(idx)).stage(axis);
            let shape: SVector<f64, M> = gm.u1.column(column).clone_owned();
            let current = Mdl::get_quantity(q, &shape).ok_or_else(|| {
                TwError::bad_config(format!("模型 {} 不暴露物理量 {:?}", Mdl::NAME, q))
            })?;
            ensure!(
                current != 0.0,
                TwError::bad_config(format!("波型 {:?} 在量 {:?} 上分量为零，无法定标", wave, q))
            );
            *self.storage.pde_mut(idx) += shape * (amplitude / current);
        }
        Ok(())
    }

    /// 执行一个完整阶段（测试用入口）
    pub fn run_stage(&mut self, axis: usize, tau: f64) {
        self.apply_border_before_stage(axis, tau);
        stage(
            self.order,
            axis,
            tau,
            &self.grid,
            &self.store,
            &mut self.storage,
            0,
        );
        self.apply_fractures(axis, tau, 0);
        self.storage.swap_layer(0);
    }

    /// halo 镜像填充：阶段轴两侧
    fn apply_border_before_stage(&mut self, axis: usize, _tau: f64) {
        let t = self.time;
        for side in [false, true] {
            let k_border = if side {
                self.grid.size(axis) as isize - 1
            } else {
                0
            };
            let inner_sign: isize = if side { -1 } else { 1 };

            let mut border_nodes = Vec::new();
            self.grid.for_each_in_slice(axis, k_border, |coords, _| {
                border_nodes.push(coords);
            });

            for condition in &self.border_conditions.clone() {
                for &coords in &border_nodes {
                    if !condition.area.contains(self.grid.coords(coords).as_slice()) {
                        continue;
                    }
                    for a in 1..=self.grid.border_size() as isize {
                        let mut real = coords;
                        real[axis] += inner_sign * a;
                        let mut virt = coords;
                        virt[axis] -= inner_sign * a;
                        let real_idx = self.grid.index(real);
                        let virt_idx = self.grid.index(virt);

                        *self.storage.pde_mut(virt_idx) = *self.storage.pde(real_idx);
                        for (q, dep) in &condition.values {
                            let real_value =
                                Mdl::get_quantity(*q, self.storage.pde(real_idx)).unwrap_or(0.0);
                            let virt_value = -real_value + 2.0 * dep.at(t);
                            Mdl::set_quantity(*q, virt_value, self.storage.pde_mut(virt_idx));
                        }
                    }
                }
            }
        }
    }

    /// 裂缝一维辅助子问题
    ///
    /// 对每个裂缝侧：沿法向抽出 `2·border_size` 节点到一维缓冲，
    /// 在缓冲左端做镜像反射，跑一维特征步，把近侧结果写回。
    fn apply_fractures(&mut self, axis: usize, tau: f64, layer: usize) {
        if self.fractures.is_empty() {
            return;
        }
        let b = self.grid.border_size() as isize;
        let h = self.grid.step(axis);
        let stride = self.grid.stride(axis) as isize;
        let t = self.time;

        let fractures = self.fractures.clone();
        for fr in fractures.iter().filter(|f| f.axis == axis) {
            let mut slice_nodes = Vec::new();
            self.grid.for_each_in_slice(axis, fr.index, |coords, idx| {
                if fr.area.contains(self.grid.coords(coords).as_slice()) {
                    slice_nodes.push(idx);
                }
            });

            for &idx0 in &slice_nodes {
                // 缓冲: [0, b) 反射 halo, [b, 3b) 从网格复制
                let len = (3 * b) as usize;
                let mut buffer = vec![SVector::<f64, M>::zeros(); len];
                for i in 0..(2 * b) {
                    let node = (idx0 as isize + i * fr.inner_sign * stride) as usize;
                    buffer[(b + i) as usize] = *self.storage.pde(node);
                }
                for a in 1..=b {
                    let mut virt = buffer[(b + a) as usize];
                    for (q, dep) in &fr.values {
                        let real_value = Mdl::get_quantity(*q, &virt).unwrap_or(0.0);
                        Mdl::set_quantity(*q, -real_value + 2.0 * dep.at(t), &mut virt);
                    }
                    buffer[(b - a) as usize] = virt;
                }

                // 一维特征步：带符号时间步
                let signed_tau = tau * fr.inner_sign as f64;
                let gm = self.store.get(self.storage.matrix_idx(idx0)).stage(axis);
                for j in 0..b {
                    let mut invariants = SVector::<f64, M>::zeros();
                    for k in 0..M {
                        let delta = -signed_tau * gm.l[k] / h;
                        let value = if delta == 0.0 {
                            buffer[(b + j) as usize]
                        } else {
                            interpolate_along(&buffer, (b + j) as usize, 1, delta, self.order)
                        };
                        invariants[k] = (gm.u.row(k) * value)[0];
                    }
                    let target = (idx0 as isize + j * fr.inner_sign * stride) as usize;
                    *self.storage.pde_next_mut(layer, target) = gm.u1 * invariants;
                }
            }
        }
    }

    /// 以给定 Δt 尝试一个完整时间步
    fn try_step(&mut self, tau: f64) -> TwResult<bool> {
        let schedule = stage_schedule(D, self.splitting_order, tau)?;
        for (s, sub_tau) in schedule {
            let layer = match self.splitting {
                SplittingKind::Sum => s,
                SplittingKind::Product => 0,
            };
            self.apply_border_before_stage(s, sub_tau);
            stage(
                self.order,
                s,
                sub_tau,
                &self.grid,
                &self.store,
                &mut self.storage,
                layer,
            );
            self.apply_fractures(s, sub_tau, layer);
            if self.splitting == SplittingKind::Product {
                self.storage.swap_layer(0);
            }
        }
        if self.splitting == SplittingKind::Sum {
            self.storage.average_next_into_current();
        }

        // ODE 与用户修正器
        if let Some(update) = &self.ode_update {
            let mut targets = Vec::new();
            self.grid.for_each_real(|_, idx| targets.push(idx));
            for idx in targets {
                let mut ode = self.storage.ode(idx).unwrap_or(0.0);
                let mut u = *self.storage.pde(idx);
                update(&mut ode, &mut u, tau);
                *self.storage.pde_mut(idx) = u;
                self.storage.set_ode(idx, ode)?;
            }
        }
        for corrector in &self.correctors {
            for i in 0..self.storage.len() {
                corrector(self.storage.pde_mut(i));
            }
        }

        // 幅值爆炸与非有限值都按 CFL 违例处理
        Ok(self.storage.current_is_finite()
            && max_abs_component(self.storage.pde_all()) < BLOWUP_LIMIT)
    }
}

impl<Mdl, const D: usize, const M: usize, const K: usize> Simulation
    for CubicEngine<Mdl, D, M, K>
where
    Mdl: WaveModel<D, M, K>,
{
    fn step(&mut self) -> TwResult<()> {
        let mut tau = self.cfl.compute_tau(self.store.max_eigenvalue())?;
        let backup = self.storage.snapshot_current();

        for attempt in 0..2 {
            if self.try_step(tau)? {
                self.time += tau;
                self.last_tau = tau;
                self.step_index += 1;
                return Ok(());
            }
            if attempt == 0 {
                warn!(
                    step = self.step_index,
                    tau, "检测到 CFL 违例，时间步减半重试"
                );
                self.storage.restore_current(&backup);
                tau *= 0.5;
            }
        }
        Err(PhysicsError::CflViolation {
            step: self.step_index,
        }
        .into())
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn tau(&self) -> f64 {
        self.last_tau
    }

    fn step_index(&self) -> usize {
        self.step_index
    }

    fn n_nodes(&self) -> usize {
        self.grid.real_nodes()
    }

    fn positions(&self) -> Vec<[f64; 3]> {
        let mut out = Vec::with_capacity(self.grid.real_nodes());
        self.grid.for_each_real(|coords, _| {
            let p = self.grid.coords(coords);
            let mut p3 = [0.0; 3];
            for a in 0..D {
                p3[a] = p[a];
            }
            out.push(p3);
        });
        out
    }

    fn sample(&self, q: PhysicalQuantity) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.grid.real_nodes());
        self.grid.for_each_real(|_, idx| {
            out.push(Mdl::get_quantity(q, self.storage.pde(idx)).unwrap_or(f64::NAN));
        });
        out
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rheology::materials::IsotropicMaterial;
    use crate::rheology::models::Elastic2d;

    fn engine(order: usize) -> CubicEngine<Elastic2d, 2, 5, 2> {
        CubicEngine::<Elastic2d, 2, 5, 2>::new(
            [10, 10],
            [2.0, 3.0],
            Material::Isotropic(IsotropicMaterial::new(4.0, 2.0, 0.5).unwrap()),
            order,
            1.0,
            SplittingKind::Product,
            1,
        )
        .unwrap()
    }

    #[test]
    fn test_constant_state_preserved() {
        let mut e = engine(2);
        e.fill_quantity(PhysicalQuantity::Sxx, 1.5, &Area::Everywhere)
            .unwrap();
        // halo 为零，波会从边界"流入"零值；先只测一步内部守恒较弱，
        // 这里改用全域镜像边界保证常值场完全不变
        e.add_border_condition(CubicBorderCondition {
            area: Area::Everywhere,
            values: Vec::new(),
        });
        for _ in 0..3 {
            e.step().unwrap();
        }
        let sxx = e.sample(PhysicalQuantity::Sxx);
        for (i, v) in sxx.iter().enumerate() {
            assert!((v - 1.5).abs() < 1e-9, "节点 {} 常值场漂移: {}", i, v);
        }
    }

    #[test]
    fn test_cfl_bound() {
        let mut e = engine(1);
        e.step().unwrap();
        let lambda = e.store.max_eigenvalue();
        let ratio = e.tau() * lambda / e.grid.min_step();
        assert!(ratio <= 1.0 + 1e-12, "CFL 超界: {}", ratio);
    }

    #[test]
    fn test_wave_seeding_scales_quantity() {
        let mut e = engine(1);
        e.seed_wave(
            WaveKind::PForward,
            0,
            PhysicalQuantity::Vx,
            -2.0,
            &Area::Slab {
                axis: 0,
                from: 0.3,
                to: 0.7,
            },
        )
        .unwrap();
        // 区域内 Vx = -2，区域外为零
        let vx = e.sample(PhysicalQuantity::Vx);
        let positions = e.positions();
        for (p, v) in positions.iter().zip(vx.iter()) {
            if p[0] >= 0.3 && p[0] <= 0.7 {
                assert!((v + 2.0).abs() < 1e-12, "播种幅值错误: {}", v);
            } else {
                assert_eq!(*v, 0.0);
            }
        }
    }
}
