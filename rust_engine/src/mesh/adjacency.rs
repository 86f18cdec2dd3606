//! 顶点邻接图

use crate::{RigError, Result};

/// 无向顶点邻接表（由三角形边构建，构建后只读）
///
/// 邻居按首次出现的顺序存储。同一三角形列表总是得到相同的邻接集合，
/// 但调用方不应依赖邻居顺序。
#[derive(Clone, Debug, Default)]
pub struct AdjacencyGraph {
    neighbors: Vec<Vec<u32>>,
}

impl AdjacencyGraph {
    /// 从三角形列表构建邻接图，每个三角形贡献 3 条无向边（去重）
    pub fn build(vertex_count: usize, triangles: &[[u32; 3]]) -> Result<Self> {
        let mut neighbors: Vec<Vec<u32>> = vec![Vec::new(); vertex_count];

        for (triangle, &[a, b, c]) in triangles.iter().enumerate() {
            for vertex in [a, b, c] {
                if vertex as usize >= vertex_count {
                    return Err(RigError::MalformedMesh {
                        triangle,
                        vertex,
                        vertex_count,
                    });
                }
            }

            for (u, v) in [(a, b), (b, c), (c, a)] {
                Self::link(&mut neighbors, u, v);
                Self::link(&mut neighbors, v, u);
            }
        }

        Ok(Self { neighbors })
    }

    fn link(neighbors: &mut [Vec<u32>], from: u32, to: u32) {
        // 退化三角形可能给出自环
        if from == to {
            return;
        }
        let list = &mut neighbors[from as usize];
        if !list.contains(&to) {
            list.push(to);
        }
    }

    /// 获取顶点数量
    pub fn vertex_count(&self) -> usize {
        self.neighbors.len()
    }

    /// 获取顶点的邻居
    pub fn neighbors(&self, vertex: usize) -> &[u32] {
        self.neighbors.get(vertex).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 两个顶点是否相邻
    pub fn are_adjacent(&self, u: usize, v: usize) -> bool {
        self.neighbors(u).contains(&(v as u32))
    }

    /// 无向边数量
    pub fn edge_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum::<usize>() / 2
    }
}
