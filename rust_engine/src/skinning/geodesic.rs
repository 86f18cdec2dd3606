//! 近似测地线距离
//!
//! 从锚点顶点（距骨骼 A-pose 位置最近的顶点）出发，沿网格边做 FIFO 松弛遍历。
//! 顶点在首次被发现时入队，出队即定值：定值之后到达的更短路径不会再回写。
//! 因此结果与队列顺序有关，不保证是真正的最短路径。

use std::collections::VecDeque;

use glam::Vec2;
use rayon::prelude::*;

use crate::mesh::AdjacencyGraph;

const UNSEEN: u8 = 0;
const QUEUED: u8 = 1;
const SETTLED: u8 = 2;

/// 遍历用的可复用缓冲区
#[derive(Debug, Default)]
pub(crate) struct WalkScratch {
    distances: Vec<f32>,
    state: Vec<u8>,
    queue: VecDeque<usize>,
}

/// 网格上的测地线距离场
#[derive(Clone, Copy)]
pub(crate) struct GeodesicField<'a> {
    graph: &'a AdjacencyGraph,
    vertices: &'a [Vec2],
    radius: f32,
}

impl<'a> GeodesicField<'a> {
    pub fn new(graph: &'a AdjacencyGraph, vertices: &'a [Vec2], radius: f32) -> Self {
        Self {
            graph,
            vertices,
            radius,
        }
    }

    /// 距骨骼最近的顶点及其欧氏距离（相同距离取较小索引）
    pub fn anchor(&self, bone: Vec2) -> (usize, f32) {
        let mut best = (0, f32::INFINITY);
        for (i, v) in self.vertices.iter().enumerate() {
            let d = v.distance(bone);
            if d < best.1 {
                best = (i, d);
            }
        }
        best
    }

    /// 从骨骼出发遍历；target 出队时提前结束并返回其距离
    ///
    /// 锚点的初始距离为骨骼到锚点的欧氏距离，只有落在影响半径内的跳转才继续扩展。
    /// 提前结束不改变结果：顶点出队后距离不再变化。
    pub fn walk(&self, bone: Vec2, target: Option<usize>, scratch: &mut WalkScratch) -> f32 {
        let n = self.vertices.len();
        let WalkScratch {
            distances,
            state,
            queue,
        } = scratch;

        distances.clear();
        distances.resize(n, f32::INFINITY);
        state.clear();
        state.resize(n, UNSEEN);
        queue.clear();

        if n == 0 {
            return f32::INFINITY;
        }

        let (anchor, seed) = self.anchor(bone);
        distances[anchor] = seed;
        if seed < self.radius {
            state[anchor] = QUEUED;
            queue.push_back(anchor);
        }

        while let Some(u) = queue.pop_front() {
            state[u] = SETTLED;
            if target == Some(u) {
                return distances[u];
            }

            let from = self.vertices[u];
            for &w in self.graph.neighbors(u) {
                let w = w as usize;
                if state[w] == SETTLED {
                    continue;
                }
                let d = distances[u] + from.distance(self.vertices[w]);
                if d < self.radius && d < distances[w] {
                    distances[w] = d;
                    if state[w] == UNSEEN {
                        state[w] = QUEUED;
                        queue.push_back(w);
                    }
                }
            }
        }

        target.map_or(f32::INFINITY, |t| distances[t])
    }

    /// 单根骨骼到所有顶点的距离
    pub fn row(&self, bone: Vec2, out: &mut [f32]) {
        let mut scratch = WalkScratch::default();
        self.walk(bone, None, &mut scratch);
        out.copy_from_slice(&scratch.distances);
    }
}

/// 骨骼 -> 顶点测地线距离缓存表（每对网格/骨架计算一次）
#[derive(Clone, Debug)]
pub struct GeodesicTable {
    vertex_count: usize,
    bone_count: usize,
    radius: f32,
    /// 按骨骼分行：distances[bone * vertex_count + vertex]
    distances: Vec<f32>,
}

impl GeodesicTable {
    /// 构建距离表，parallel 为 true 时按骨骼并行
    pub fn build(
        graph: &AdjacencyGraph,
        vertices: &[Vec2],
        bones: &[Vec2],
        radius: f32,
        parallel: bool,
    ) -> Self {
        let vertex_count = vertices.len();
        let field = GeodesicField::new(graph, vertices, radius);
        let mut distances = vec![f32::INFINITY; vertex_count * bones.len()];

        if vertex_count > 0 {
            if parallel {
                distances
                    .par_chunks_mut(vertex_count)
                    .zip(bones.par_iter())
                    .for_each(|(row, &bone)| field.row(bone, row));
            } else {
                for (row, &bone) in distances.chunks_mut(vertex_count).zip(bones) {
                    field.row(bone, row);
                }
            }
        }

        Self {
            vertex_count,
            bone_count: bones.len(),
            radius,
            distances,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn bone_count(&self) -> usize {
        self.bone_count
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// 查询距离，越界返回无穷大
    pub fn distance(&self, bone: usize, vertex: usize) -> f32 {
        if bone >= self.bone_count || vertex >= self.vertex_count {
            return f32::INFINITY;
        }
        self.distances[bone * self.vertex_count + vertex]
    }

    /// 单根骨骼的整行距离
    pub fn bone_row(&self, bone: usize) -> Option<&[f32]> {
        (bone < self.bone_count)
            .then(|| &self.distances[bone * self.vertex_count..(bone + 1) * self.vertex_count])
    }
}
