//! 网格拓扑

mod adjacency;

pub use adjacency::AdjacencyGraph;

use glam::Vec2;

use crate::{RigError, Result};

/// 2D 三角网格（只保留蒙皮需要的拓扑与位置）
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    /// 顶点位置（XY 平面）
    pub vertices: Vec<Vec2>,
    /// 三角形顶点索引
    pub triangles: Vec<[u32; 3]>,
    /// 纹理坐标（仅透传给渲染层，核心不读取）
    pub uvs: Vec<Vec2>,
}

impl Mesh {
    /// 创建网格并校验三角形索引
    pub fn new(vertices: Vec<Vec2>, triangles: Vec<[u32; 3]>) -> Result<Self> {
        let mesh = Self {
            vertices,
            triangles,
            uvs: Vec::new(),
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// 附加 UV
    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = uvs;
        self
    }

    /// 获取顶点数量
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// 获取三角形数量
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// 所有三角形索引必须小于顶点数量
    pub fn validate(&self) -> Result<()> {
        let vertex_count = self.vertices.len();
        for (triangle, corners) in self.triangles.iter().enumerate() {
            if let Some(&vertex) = corners.iter().find(|&&v| v as usize >= vertex_count) {
                return Err(RigError::MalformedMesh {
                    triangle,
                    vertex,
                    vertex_count,
                });
            }
        }
        Ok(())
    }

    /// 构建顶点邻接图
    pub fn adjacency(&self) -> Result<AdjacencyGraph> {
        AdjacencyGraph::build(self.vertices.len(), &self.triangles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range_index() {
        let err = Mesh::new(vec![Vec2::ZERO, Vec2::X, Vec2::Y], vec![[0, 1, 3]]).unwrap_err();
        match err {
            RigError::MalformedMesh { triangle, vertex, vertex_count } => {
                assert_eq!(triangle, 0);
                assert_eq!(vertex, 3);
                assert_eq!(vertex_count, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_accepts_valid_mesh() {
        let mesh = Mesh::new(vec![Vec2::ZERO, Vec2::X, Vec2::Y], vec![[0, 1, 2]]).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(mesh.uvs.is_empty());
    }
}
