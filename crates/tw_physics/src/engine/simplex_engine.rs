// crates/tw_physics/src/engine/simplex_engine.rs

//! 单纯形网格驱动
//!
//! 多物体共享一个全局剖分，每个物体一套网格视图、状态与
//! 矩阵表。每个阶段：梯度重建 → 接触/边界顶点特征步（外行
//! 不变量记录）→ 接触与边界修正 → 体内顶点特征步（可用时空
//! 插值）→ 层交换或累加。
//!
//! 接触对与边界节点列表在构建时由剖分顶点的网格归属集合
//! 一次性推导：挨着空域的顶点成为相邻各网格的边界节点，
//! 恰好两个物体共享且不挨空域的顶点成为接触对，三个以上
//! 物体的归并为各自的边界节点（公共法线）。

use super::cubic_engine::{NodeCorrector, OdeUpdate};
use super::timestep::max_abs_component;
use super::{stage_schedule, CflCalculator, Simulation};
use crate::corrector::border::{self, BorderNode};
use crate::corrector::contact::{self, ContactPair};
use crate::error::PhysicsError;
use crate::gcm::simplex::{stage_on_group, SimplexGcmScratch};
use crate::grid::SimplexGrid;
use crate::rheology::gcm_matrix::MatrixStore;
use crate::rheology::materials::Material;
use crate::rheology::models::WaveModel;
use crate::state::PdeStorage;
use crate::types::{
    Area, BorderKind, ContactKind, GcmMode, PhysicalQuantity, SplittingKind, TimeDependency,
    WaveKind,
};
use nalgebra::{SMatrix, SVector};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{info, warn};
use tw_foundation::{ensure, TwError, TwResult};
use tw_mesh::{GridId, Triangulation, EMPTY_SPACE};

/// 边界条件补丁描述
#[derive(Debug, Clone)]
pub struct BorderPatchSpec {
    /// 条件类型
    pub kind: BorderKind,
    /// 作用区域
    pub area: Area,
    /// 条件右端的时间函数（长度为模型外行特征数，缺省补零）
    pub values: Vec<TimeDependency>,
    /// 是否作用于多体接触节点
    pub use_for_multicontact: bool,
}

/// 构建后的边界补丁
#[derive(Debug, Clone)]
struct BorderPatch<const D: usize> {
    spec: BorderPatchSpec,
    nodes: Vec<BorderNode<D>>,
}

/// 单个物体
pub struct SimplexBody<const D: usize, const M: usize> {
    /// 网格视图
    pub grid: SimplexGrid<D>,
    /// PDE 状态
    pub storage: PdeStorage<M>,
    /// 特征矩阵表
    pub store: MatrixStore<D, M>,
    /// 材料
    pub material: Material,
    borders: Vec<BorderPatch<D>>,
    scratch: SimplexGcmScratch<D, M>,
}

/// 一对物体间的接触组
struct ContactGroup<const D: usize> {
    body_a: usize,
    body_b: usize,
    kind: ContactKind,
    pairs: Vec<ContactPair<D>>,
}

/// 单纯形网格引擎
pub struct SimplexEngine<Mdl, const D: usize, const M: usize, const K: usize> {
    tri: Arc<Triangulation<D>>,
    bodies: Vec<SimplexBody<D, M>>,
    body_of_grid: Vec<(GridId, usize)>,
    contacts: Vec<ContactGroup<D>>,
    basis: SMatrix<f64, D, D>,
    cfl: CflCalculator,
    splitting: SplittingKind,
    splitting_order: usize,
    gcm_mode: GcmMode,
    ode_update: Option<OdeUpdate<M>>,
    correctors: Vec<NodeCorrector<M>>,
    time: f64,
    last_tau: f64,
    step_index: usize,
    _model: PhantomData<Mdl>,
}

impl<Mdl, const D: usize, const M: usize, const K: usize> SimplexEngine<Mdl, D, M, K>
where
    Mdl: WaveModel<D, M, K>,
{
    /// 创建引擎
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tri: Arc<Triangulation<D>>,
        bodies: &[(GridId, Material)],
        borders: &[(GridId, BorderPatchSpec)],
        default_contact: ContactKind,
        contact_overrides: &[((GridId, GridId), ContactKind)],
        courant: f64,
        splitting: SplittingKind,
        splitting_order: usize,
        gcm_mode: GcmMode,
    ) -> TwResult<Self> {
        ensure!(
            !bodies.is_empty(),
            TwError::bad_config("至少需要一个物体".to_string())
        );
        ensure!(
            !(splitting == SplittingKind::Sum && splitting_order == 2),
            TwError::bad_config("sum 分裂只支持一阶调度".to_string())
        );
        stage_schedule(D, splitting_order, 1.0)?;

        let basis = SMatrix::<f64, D, D>::identity();
        let n_layers = match splitting {
            SplittingKind::Sum => D,
            SplittingKind::Product => 1,
        };

        // 物体构建
        let mut built = Vec::with_capacity(bodies.len());
        let mut body_of_grid = Vec::new();
        let mut min_h = f64::MAX;
        for (slot, &(grid_id, material)) in bodies.iter().enumerate() {
            let grid = SimplexGrid::<D>::new(grid_id, tri.clone())?;
            min_h = min_h.min(grid.min_height());
            let mut store = MatrixStore::<D, M>::new();
            let matrix_idx = store.intern(0, &basis, || {
                Mdl::construct_gcm_matrices(&material, &basis)
            })?;
            let mut storage = PdeStorage::<M>::new(grid.n_vertices(), n_layers, false);
            for i in 0..grid.n_vertices() {
                storage.set_matrix_idx(i, matrix_idx);
            }
            body_of_grid.push((grid_id, slot));
            built.push(SimplexBody {
                grid,
                storage,
                store,
                material,
                borders: borders
                    .iter()
                    .filter(|(id, _)| *id == grid_id)
                    .map(|(_, spec)| BorderPatch {
                        spec: spec.clone(),
                        nodes: Vec::new(),
                    })
                    .collect(),
                scratch: SimplexGcmScratch::new(),
            });
        }

        let cfl = CflCalculator::new(courant, min_h)?;

        let mut engine = Self {
            tri,
            bodies: built,
            body_of_grid,
            contacts: Vec::new(),
            basis,
            cfl,
            splitting,
            splitting_order,
            gcm_mode,
            ode_update: None,
            correctors: Vec::new(),
            time: 0.0,
            last_tau: 0.0,
            step_index: 0,
            _model: PhantomData,
        };

        engine.create_contacts(default_contact, contact_overrides)?;
        engine.classify_shared_vertices()?;
        if gcm_mode == GcmMode::LocalBasis {
            engine.install_local_basis_matrices()?;
        }

        for contact_group in &engine.contacts {
            info!(
                body_a = engine.bodies[contact_group.body_a].grid.id(),
                body_b = engine.bodies[contact_group.body_b].grid.id(),
                pairs = contact_group.pairs.len(),
                "接触对已建立"
            );
        }
        for body in &engine.bodies {
            for patch in &body.borders {
                info!(
                    grid = body.grid.id(),
                    kind = ?patch.spec.kind,
                    nodes = patch.nodes.len(),
                    "边界补丁已建立"
                );
            }
        }

        Ok(engine)
    }

    /// 按网格 id 找物体槽位
    fn body_slot(&self, grid_id: GridId) -> Option<usize> {
        self.body_of_grid
            .iter()
            .find(|(id, _)| *id == grid_id)
            .map(|(_, slot)| *slot)
    }

    /// 物体只读访问
    pub fn body(&self, slot: usize) -> &SimplexBody<D, M> {
        &self.bodies[slot]
    }

    /// 物体数量
    pub fn n_bodies(&self) -> usize {
        self.bodies.len()
    }

    /// 建立接触组
    fn create_contacts(
        &mut self,
        default_contact: ContactKind,
        overrides: &[((GridId, GridId), ContactKind)],
    ) -> TwResult<()> {
        for a in 0..self.bodies.len() {
            for b in (a + 1)..self.bodies.len() {
                let id_a = self.bodies[a].grid.id();
                let id_b = self.bodies[b].grid.id();
                let kind = overrides
                    .iter()
                    .find(|((x, y), _)| {
                        (*x == id_a && *y == id_b) || (*x == id_b && *y == id_a)
                    })
                    .map(|(_, k)| *k)
                    .unwrap_or(default_contact);
                if !Mdl::supports_contact(kind) {
                    return Err(PhysicsError::NotImplemented {
                        feature: format!(
                            "模型 {} 与接触条件 {:?} 的组合",
                            Mdl::NAME,
                            kind
                        ),
                    }
                    .into());
                }
                self.contacts.push(ContactGroup {
                    body_a: a,
                    body_b: b,
                    kind,
                    pairs: Vec::new(),
                });
            }
        }
        Ok(())
    }

    /// 遍历剖分顶点，推导边界节点与接触对
    fn classify_shared_vertices(&mut self) -> TwResult<()> {
        let tri = self.tri.clone();
        for v in 0..tri.n_vertices() as u32 {
            let grids = tri.grids_around_vertex(v);
            if grids.len() == 1 {
                continue;
            }
            let has_empty = grids.contains(&EMPTY_SPACE);
            let non_empty: Vec<GridId> =
                grids.iter().copied().filter(|&g| g != EMPTY_SPACE).collect();

            if !has_empty && non_empty.len() == 2 {
                self.add_contact_vertex(v, non_empty[0], non_empty[1])?;
            } else {
                for &grid_id in &non_empty {
                    self.add_border_vertex(v, grid_id)?;
                }
            }
        }
        Ok(())
    }

    /// 把共享顶点登记为接触对
    fn add_contact_vertex(&mut self, v: u32, id_a: GridId, id_b: GridId) -> TwResult<()> {
        let (slot_a, slot_b) = match (self.body_slot(id_a), self.body_slot(id_b)) {
            (Some(a), Some(b)) => (a, b),
            // 只对配置声明过的物体建接触
            _ => return Ok(()),
        };
        let local_a = self.bodies[slot_a].grid.local_vertex(v).ok_or_else(|| {
            TwError::bad_mesh(format!("顶点 {} 不在网格 {} 的归属表里", v, id_a))
        })?;
        let local_b = self.bodies[slot_b].grid.local_vertex(v).ok_or_else(|| {
            TwError::bad_mesh(format!("顶点 {} 不在网格 {} 的归属表里", v, id_b))
        })?;
        let normal = self.bodies[slot_a].grid.contact_normal(local_a, id_b);
        if normal.norm() == 0.0 {
            return Ok(());
        }
        let group = self
            .contacts
            .iter_mut()
            .find(|g| {
                (g.body_a == slot_a && g.body_b == slot_b)
                    || (g.body_a == slot_b && g.body_b == slot_a)
            })
            .ok_or_else(|| TwError::internal("接触组未提前建立".to_string()))?;
        if group.body_a == slot_a {
            group.pairs.push(ContactPair {
                first: local_a,
                second: local_b,
                normal,
            });
        } else {
            group.pairs.push(ContactPair {
                first: local_b,
                second: local_a,
                normal: -normal,
            });
        }
        Ok(())
    }

    /// 把挨着空域（或多体归并）的顶点登记到边界补丁
    fn add_border_vertex(&mut self, v: u32, grid_id: GridId) -> TwResult<()> {
        let slot = match self.body_slot(grid_id) {
            Some(s) => s,
            None => return Ok(()),
        };
        let body = &mut self.bodies[slot];
        let local = body.grid.local_vertex(v).ok_or_else(|| {
            TwError::bad_mesh(format!("顶点 {} 不在网格 {} 的归属表里", v, grid_id))
        })?;
        let is_multicontact = body.grid.border_normal(local).norm() == 0.0;
        let coords = body.grid.coords(local);

        // 一个节点最多挂一个补丁，后配置者优先
        let mut chosen: Option<usize> = None;
        for (i, patch) in body.borders.iter().enumerate() {
            if patch.spec.area.contains(coords.as_slice())
                && (!is_multicontact || patch.spec.use_for_multicontact)
            {
                chosen = Some(i);
            }
        }
        let Some(patch_idx) = chosen else {
            return Ok(());
        };
        let normal = body.grid.common_normal(local);
        if normal.norm() == 0.0 {
            return Err(TwError::bad_mesh(format!(
                "边界顶点 {} 无法估计外法线",
                v
            )));
        }
        body.borders[patch_idx].nodes.push(BorderNode {
            vertex: local,
            normal,
        });
        Ok(())
    }

    /// 局部基模式：边界/接触节点换装法线对齐的矩阵
    fn install_local_basis_matrices(&mut self) -> TwResult<()> {
        for slot in 0..self.bodies.len() {
            // 接触法线优先于边界法线
            let mut normals: Vec<(u32, SVector<f64, D>)> = Vec::new();
            for group in &self.contacts {
                if group.body_a == slot {
                    normals.extend(group.pairs.iter().map(|p| (p.first, p.normal)));
                }
                if group.body_b == slot {
                    normals.extend(group.pairs.iter().map(|p| (p.second, -p.normal)));
                }
            }
            let body = &mut self.bodies[slot];
            for patch in &body.borders {
                normals.extend(patch.nodes.iter().map(|n| (n.vertex, n.normal)));
            }

            let material = body.material;
            for (local, normal) in normals {
                let node_basis = border_basis(&normal);
                let matrix_idx = body.store.intern(0, &node_basis, || {
                    Mdl::construct_gcm_matrices(&material, &node_basis)
                })?;
                body.storage.set_matrix_idx(local as usize, matrix_idx);
            }
        }
        Ok(())
    }

    /// 区域内均匀填充物理量（叠加语义）
    pub fn fill_quantity(
        &mut self,
        grid_id: GridId,
        q: PhysicalQuantity,
        value: f64,
        area: &Area,
    ) -> TwResult<()> {
        let slot = self
            .body_slot(grid_id)
            .ok_or_else(|| TwError::bad_config(format!("未知物体 {}", grid_id)))?;
        let mut increment = SVector::<f64, M>::zeros();
        ensure!(
            Mdl::set_quantity(q, value, &mut increment),
            TwError::bad_config(format!("模型 {} 不暴露物理量 {:?}", Mdl::NAME, q))
        );
        let body = &mut self.bodies[slot];
        for local in 0..body.grid.n_vertices() as u32 {
            if area.contains(body.grid.coords(local).as_slice()) {
                *body.storage.pde_mut(local as usize) += increment;
            }
        }
        Ok(())
    }

    /// 区域内播种命名特征波
    pub fn seed_wave(
        &mut self,
        grid_id: GridId,
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
        let slot = self
            .body_slot(grid_id)
            .ok_or_else(|| TwError::bad_config(format!("未知物体 {}", grid_id)))?;
        let body = &mut self.bodies[slot];
        let column = Mdl::wave_column(&body.material, wave).ok_or_else(|| {
            TwError::bad_config(format!("模型/材料组合不支持波型 {:?}", wave))
        })?;
        for local in 0..body.grid.n_vertices() as u32 {
            if !area.contains(body.grid.coords(local).as_slice()) {
                continue;
            }
            let gm = body
                .store
                .get(body.storage.matrix_idx(local as usize))
                .stage(axis);
            let shape: SVector<f64, M> = gm.u1.column(column).clone_owned();
            let current = Mdl::get_quantity(q, &shape).ok_or_else(|| {
                TwError::bad_config(format!("模型 {} 不暴露物理量 {:?}", Mdl::NAME, q))
            })?;
            ensure!(
                current != 0.0,
                TwError::bad_config(format!(
                    "波型 {:?} 在量 {:?} 上分量为零，无法定标",
                    wave, q
                ))
            );
            *body.storage.pde_mut(local as usize) += shape * (amplitude / current);
        }
        Ok(())
    }

    /// 安装 ODE 推进回调并启用全部物体的 ODE 槽位
    pub fn set_ode_update(&mut self, update: OdeUpdate<M>) {
        for body in &mut self.bodies {
            if !body.storage.has_ode() {
                let n_layers = body.storage.n_layers();
                let mut with_ode =
                    PdeStorage::<M>::new(body.storage.len(), n_layers, true);
                for i in 0..body.storage.len() {
                    *with_ode.pde_mut(i) = *body.storage.pde(i);
                    with_ode.set_matrix_idx(i, body.storage.matrix_idx(i));
                    with_ode.set_material_idx(i, body.storage.material_idx(i));
                }
                body.storage = with_ode;
            }
        }
        self.ode_update = Some(update);
    }

    /// 追加用户修正器
    pub fn add_corrector(&mut self, corrector: NodeCorrector<M>) {
        self.correctors.push(corrector);
    }

    /// 取两个物体的可变引用
    fn two_bodies_mut(
        &mut self,
        a: usize,
        b: usize,
    ) -> (&mut SimplexBody<D, M>, &mut SimplexBody<D, M>) {
        debug_assert_ne!(a, b);
        if a < b {
            let (lo, hi) = self.bodies.split_at_mut(b);
            (&mut lo[a], &mut hi[0])
        } else {
            let (lo, hi) = self.bodies.split_at_mut(a);
            (&mut hi[0], &mut lo[b])
        }
    }

    /// 把边界右端时间函数求值为向量
    fn eval_border_values(values: &[TimeDependency], t: f64) -> SVector<f64, K> {
        let mut b = SVector::<f64, K>::zeros();
        for k in 0..K.min(values.len()) {
            b[k] = values[k].at(t);
        }
        b
    }

    /// 步进前的平面相容化：接触在前，边界在后
    fn apply_plain_corrections(&mut self, t: f64) {
        for gi in 0..self.contacts.len() {
            let (body_a, body_b, kind) = {
                let g = &self.contacts[gi];
                (g.body_a, g.body_b, g.kind)
            };
            let pairs = std::mem::take(&mut self.contacts[gi].pairs);
            {
                let (a, b) = self.two_bodies_mut(body_a, body_b);
                contact::apply_plain::<Mdl, D, M, K>(
                    kind,
                    &pairs,
                    &mut a.storage,
                    &mut b.storage,
                );
            }
            self.contacts[gi].pairs = pairs;
        }
        for body in &mut self.bodies {
            for patch in &body.borders {
                if patch.spec.kind == BorderKind::NonReflection {
                    continue;
                }
                let b_value = Self::eval_border_values(&patch.spec.values, t);
                border::apply_plain::<Mdl, D, M, K>(
                    patch.spec.kind,
                    &b_value,
                    &patch.nodes,
                    &mut body.storage,
                );
            }
        }
    }

    /// 阶段间修正：接触在前，边界在后
    fn correct_contacts_and_borders(&mut self, stage_axis: usize, layer: usize, t: f64) {
        if self.gcm_mode == GcmMode::LocalBasis && stage_axis != 0 {
            // 其余方向先验退化，不做修正
            return;
        }

        for gi in 0..self.contacts.len() {
            let (body_a, body_b, kind) = {
                let g = &self.contacts[gi];
                (g.body_a, g.body_b, g.kind)
            };
            let pairs = std::mem::take(&mut self.contacts[gi].pairs);
            {
                let gcm_mode = self.gcm_mode;
                let (a, b) = self.two_bodies_mut(body_a, body_b);
                let fallbacks = match gcm_mode {
                    GcmMode::GlobalBasis => contact::apply_in_global_basis::<Mdl, D, M, K>(
                        kind,
                        &pairs,
                        &a.store,
                        &mut a.storage,
                        &b.store,
                        &mut b.storage,
                        layer,
                        stage_axis,
                    ),
                    GcmMode::LocalBasis => contact::apply_in_local_basis::<Mdl, D, M, K>(
                        kind,
                        &pairs,
                        &a.store,
                        &mut a.storage,
                        &b.store,
                        &mut b.storage,
                        layer,
                    ),
                };
                if fallbacks > 0 {
                    warn!(fallbacks, "接触修正出现平面回退");
                }
            }
            self.contacts[gi].pairs = pairs;
        }

        for body in &mut self.bodies {
            for patch in &body.borders.clone() {
                let b_value = Self::eval_border_values(&patch.spec.values, t);
                let fallbacks = match self.gcm_mode {
                    GcmMode::GlobalBasis => border::apply_in_global_basis::<Mdl, D, M, K>(
                        patch.spec.kind,
                        &b_value,
                        &patch.nodes,
                        &body.store,
                        &mut body.storage,
                        layer,
                        stage_axis,
                    ),
                    GcmMode::LocalBasis => border::apply_in_local_basis::<Mdl, D, M, K>(
                        patch.spec.kind,
                        &b_value,
                        &patch.nodes,
                        &body.store,
                        &mut body.storage,
                        layer,
                    ),
                };
                if fallbacks > 0 {
                    warn!(grid = body.grid.id(), fallbacks, "边界修正出现平面回退");
                }
            }
        }
    }

    /// 以给定 Δt 尝试一个完整时间步
    fn try_step(&mut self, tau: f64) -> TwResult<bool> {
        let schedule = stage_schedule(D, self.splitting_order, tau)?;
        let t_next = self.time + tau;

        for (s, sub_tau) in schedule {
            let layer = match self.splitting {
                SplittingKind::Sum => s,
                SplittingKind::Product => 0,
            };
            let direction: SVector<f64, D> = self.basis.column(s).clone_owned();

            // 梯度 + 接触/边界顶点
            for body in &mut self.bodies {
                let SimplexBody {
                    grid,
                    storage,
                    store,
                    scratch,
                    ..
                } = body;
                scratch.before_stage(grid, storage);
                storage.clear_outer_invariants();

                let mut first_group: Vec<u32> = grid.contact_vertices().to_vec();
                first_group.extend_from_slice(grid.border_vertices());
                stage_on_group(
                    &first_group,
                    true,
                    false,
                    s,
                    sub_tau,
                    &direction,
                    grid,
                    store,
                    storage,
                    layer,
                    &scratch.gradients,
                );
            }

            self.correct_contacts_and_borders(s, layer, t_next);

            // 体内顶点：可读取已修正的边界新层值
            for body in &mut self.bodies {
                let SimplexBody {
                    grid,
                    storage,
                    store,
                    scratch,
                    ..
                } = body;
                let inner: Vec<u32> = grid.inner_vertices().to_vec();
                stage_on_group(
                    &inner,
                    false,
                    true,
                    s,
                    sub_tau,
                    &direction,
                    grid,
                    store,
                    storage,
                    layer,
                    &scratch.gradients,
                );
            }

            if self.splitting == SplittingKind::Product {
                for body in &mut self.bodies {
                    body.storage.swap_layer(0);
                }
            }
        }

        if self.splitting == SplittingKind::Sum {
            for body in &mut self.bodies {
                body.storage.average_next_into_current();
            }
        }

        // ODE 与用户修正器
        if let Some(update) = &self.ode_update {
            for body in &mut self.bodies {
                for i in 0..body.storage.len() {
                    let mut ode = body.storage.ode(i).unwrap_or(0.0);
                    let mut u = *body.storage.pde(i);
                    update(&mut ode, &mut u, tau);
                    *body.storage.pde_mut(i) = u;
                    body.storage.set_ode(i, ode)?;
                }
            }
        }
        for corrector in &self.correctors {
            for body in &mut self.bodies {
                for i in 0..body.storage.len() {
                    corrector(body.storage.pde_mut(i));
                }
            }
        }

        // 幅值爆炸与非有限值都按 CFL 违例处理
        Ok(self.bodies.iter().all(|b| {
            b.storage.current_is_finite()
                && max_abs_component(b.storage.pde_all()) < super::cubic_engine::BLOWUP_LIMIT
        }))
    }
}

/// 法线放在第一列的正交基（局部基模式的阶段 0 方向）
fn border_basis<const D: usize>(normal: &SVector<f64, D>) -> SMatrix<f64, D, D> {
    let lb = crate::rheology::models::local_basis(normal);
    let mut out = SMatrix::<f64, D, D>::zeros();
    // 最后一列挪到第一列，其余顺延
    out.set_column(0, &lb.column(D - 1).clone_owned());
    for c in 1..D {
        out.set_column(c, &lb.column(c - 1).clone_owned());
    }
    out
}

impl<Mdl, const D: usize, const M: usize, const K: usize> Simulation
    for SimplexEngine<Mdl, D, M, K>
where
    Mdl: WaveModel<D, M, K>,
{
    fn step(&mut self) -> TwResult<()> {
        let lambda = self
            .bodies
            .iter()
            .fold(0.0_f64, |acc, b| acc.max(b.store.max_eigenvalue()));
        let mut tau = self.cfl.compute_tau(lambda)?;

        self.apply_plain_corrections(self.time + tau);
        let backups: Vec<_> = self
            .bodies
            .iter()
            .map(|b| b.storage.snapshot_current())
            .collect();

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
                for (body, backup) in self.bodies.iter_mut().zip(&backups) {
                    body.storage.restore_current(backup);
                }
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
        self.bodies.iter().map(|b| b.grid.n_vertices()).sum()
    }

    fn positions(&self) -> Vec<[f64; 3]> {
        let mut out = Vec::with_capacity(self.n_nodes());
        for body in &self.bodies {
            for local in 0..body.grid.n_vertices() as u32 {
                let p = body.grid.coords(local);
                let mut p3 = [0.0; 3];
                for a in 0..D {
                    p3[a] = p[a];
                }
                out.push(p3);
            }
        }
        out
    }

    fn sample(&self, q: PhysicalQuantity) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.n_nodes());
        for body in &self.bodies {
            for local in 0..body.grid.n_vertices() {
                out.push(Mdl::get_quantity(q, body.storage.pde(local)).unwrap_or(f64::NAN));
            }
        }
        out
    }
}

// ============================================================
// 测试
// ============================================================
