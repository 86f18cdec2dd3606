//! 蒙皮权重计算
//!
//! 三种策略只在“骨骼到顶点的距离”上不同，其余流程共用：
//! 线性衰减打分 -> 归一化 -> 取前 4 名 -> 排名衰减。

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geodesic::{GeodesicField, GeodesicTable, WalkScratch};
use super::{BoneWeight, MAX_INFLUENCES};
use crate::mesh::Mesh;
use crate::{RigError, Result};

/// 权重计算策略
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightStrategy {
    /// 骨骼 A-pose 位置到顶点的直线距离，不使用网格拓扑
    NaiveRadial,
    /// 沿网格边的近似测地线距离，每个顶点/骨骼对单独遍历
    GeodesicRadial,
    /// 与 GeodesicRadial 结果一致，但整张距离表只计算一次
    #[default]
    CachedGeodesicRadial,
}

/// 蒙皮权重配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinningConfig {
    /// 骨骼影响半径
    pub influence_radius: f32,
    /// 距离策略
    pub strategy: WeightStrategy,
    /// NaiveRadial 是否也应用排名衰减
    pub dampen_naive: bool,
    /// 距离表按骨骼并行构建
    pub parallel_cache: bool,
}

impl Default for SkinningConfig {
    fn default() -> Self {
        Self {
            influence_radius: 1.15,
            strategy: WeightStrategy::default(),
            dampen_naive: false,
            parallel_cache: true,
        }
    }
}

impl SkinningConfig {
    pub fn validate(&self) -> Result<()> {
        let r = self.influence_radius;
        if !r.is_finite() || r <= 0.0 {
            return Err(RigError::Config(format!(
                "influence radius must be positive and finite, got {r}"
            )));
        }
        Ok(())
    }

    fn dampens(&self) -> bool {
        self.strategy != WeightStrategy::NaiveRadial || self.dampen_naive
    }
}

/// 骨骼到顶点的距离来源
trait BoneDistance {
    fn distance(&mut self, bone: usize, vertex: usize) -> f32;
}

struct EuclideanDistance<'a> {
    vertices: &'a [Vec2],
    bones: &'a [Vec2],
}

impl BoneDistance for EuclideanDistance<'_> {
    fn distance(&mut self, bone: usize, vertex: usize) -> f32 {
        self.bones[bone].distance(self.vertices[vertex])
    }
}

/// 每次查询都重新遍历（到达目标顶点即停止）
struct WalkedDistance<'a> {
    field: GeodesicField<'a>,
    bones: &'a [Vec2],
    scratch: WalkScratch,
}

impl BoneDistance for WalkedDistance<'_> {
    fn distance(&mut self, bone: usize, vertex: usize) -> f32 {
        self.field.walk(self.bones[bone], Some(vertex), &mut self.scratch)
    }
}

impl BoneDistance for &GeodesicTable {
    fn distance(&mut self, bone: usize, vertex: usize) -> f32 {
        GeodesicTable::distance(*self, bone, vertex)
    }
}

/// 距离表缓存，网格、骨骼或半径变化时失效
#[derive(Debug)]
struct WeightCache {
    vertices: Vec<Vec2>,
    triangles: Vec<[u32; 3]>,
    bones: Vec<Vec2>,
    table: GeodesicTable,
}

impl WeightCache {
    fn matches(&self, mesh: &Mesh, bones: &[Vec2], radius: f32) -> bool {
        self.table.radius() == radius
            && self.bones == bones
            && self.vertices == mesh.vertices
            && self.triangles == mesh.triangles
    }
}

/// 蒙皮权重引擎（持有自己的距离表缓存）
#[derive(Debug, Default)]
pub struct SkinningEngine {
    config: SkinningConfig,
    cache: Option<WeightCache>,
}

impl SkinningEngine {
    pub fn new(config: SkinningConfig) -> Self {
        Self { config, cache: None }
    }

    pub fn config(&self) -> &SkinningConfig {
        &self.config
    }

    /// 当前缓存的距离表（仅 CachedGeodesicRadial 会构建）
    pub fn cached_table(&self) -> Option<&GeodesicTable> {
        self.cache.as_ref().map(|c| &c.table)
    }

    /// 丢弃距离表缓存
    pub fn invalidate(&mut self) {
        self.cache = None;
    }

    /// 为每个顶点计算骨骼权重
    pub fn compute(&mut self, mesh: &Mesh, bones: &[Vec2]) -> Result<Vec<BoneWeight>> {
        self.config.validate()?;
        if mesh.vertices.is_empty() {
            return Err(RigError::Config("mesh has no vertices".to_string()));
        }
        if bones.is_empty() {
            return Err(RigError::Config("bone list is empty".to_string()));
        }
        mesh.validate()?;

        let radius = self.config.influence_radius;
        let dampen = self.config.dampens();
        let vertex_count = mesh.vertex_count();

        let weights = match self.config.strategy {
            WeightStrategy::NaiveRadial => {
                let source = EuclideanDistance {
                    vertices: &mesh.vertices,
                    bones,
                };
                assign(vertex_count, bones.len(), radius, dampen, source)
            }
            WeightStrategy::GeodesicRadial => {
                let graph = mesh.adjacency()?;
                let source = WalkedDistance {
                    field: GeodesicField::new(&graph, &mesh.vertices, radius),
                    bones,
                    scratch: WalkScratch::default(),
                };
                assign(vertex_count, bones.len(), radius, dampen, source)
            }
            WeightStrategy::CachedGeodesicRadial => {
                let table = self.table_for(mesh, bones)?;
                assign(vertex_count, bones.len(), radius, dampen, table)
            }
        };

        log::info!(
            "蒙皮权重计算完成: 策略 {:?}, {} 个顶点, {} 根骨骼, 半径 {}",
            self.config.strategy,
            vertex_count,
            bones.len(),
            radius
        );
        Ok(weights)
    }

    fn table_for(&mut self, mesh: &Mesh, bones: &[Vec2]) -> Result<&GeodesicTable> {
        let radius = self.config.influence_radius;
        let stale = !self
            .cache
            .as_ref()
            .is_some_and(|c| c.matches(mesh, bones, radius));

        if stale {
            let graph = mesh.adjacency()?;
            let table = GeodesicTable::build(
                &graph,
                &mesh.vertices,
                bones,
                radius,
                self.config.parallel_cache,
            );
            log::debug!(
                "测地线距离表已构建: {} x {}",
                table.bone_count(),
                table.vertex_count()
            );
            self.cache = Some(WeightCache {
                vertices: mesh.vertices.clone(),
                triangles: mesh.triangles.clone(),
                bones: bones.to_vec(),
                table,
            });
        }

        match &self.cache {
            Some(cache) => Ok(&cache.table),
            None => Err(RigError::Config("geodesic cache unavailable".to_string())),
        }
    }
}

/// 计算蒙皮权重（一次性，不保留缓存）
pub fn compute_weights(
    mesh: &Mesh,
    bone_positions: &[Vec2],
    config: &SkinningConfig,
) -> Result<Vec<BoneWeight>> {
    SkinningEngine::new(config.clone()).compute(mesh, bone_positions)
}

/// 线性衰减：半径内 1 - d/r，半径外 0
fn radial_falloff(distance: f32, radius: f32) -> f32 {
    if distance < radius {
        1.0 - distance / radius
    } else {
        0.0
    }
}

fn assign<D: BoneDistance>(
    vertex_count: usize,
    bone_count: usize,
    radius: f32,
    dampen: bool,
    mut source: D,
) -> Vec<BoneWeight> {
    let mut scores = vec![0.0f32; bone_count];

    (0..vertex_count)
        .map(|vertex| {
            for (bone, score) in scores.iter_mut().enumerate() {
                *score = radial_falloff(source.distance(bone, vertex), radius);
            }
            let mut weight = select_top(&scores);
            if dampen {
                weight.apply_rank_dampening();
            }
            weight
        })
        .collect()
}

/// 取得分最高的 min(4, 骨骼数) 根骨骼并按总分归一化
///
/// 同分时索引较小的骨骼排在前面。总分为 0 时权重保持 0。
fn select_top(scores: &[f32]) -> BoneWeight {
    let count = scores.len().min(MAX_INFLUENCES);
    let mut top = BoneWeight {
        count,
        ..Default::default()
    };

    let mut filled = 0;
    for (bone, &score) in scores.iter().enumerate() {
        let mut slot = filled;
        while slot > 0 && score > top.weights[slot - 1] {
            slot -= 1;
        }
        if slot >= count {
            continue;
        }

        let end = filled.min(count - 1);
        top.bones.copy_within(slot..end, slot + 1);
        top.weights.copy_within(slot..end, slot + 1);
        top.bones[slot] = bone as u32;
        top.weights[slot] = score;
        filled = (filled + 1).min(count);
    }

    let total: f32 = scores.iter().sum();
    if total > 0.0 {
        for w in &mut top.weights[..count] {
            *w /= total;
        }
    }
    top
}
