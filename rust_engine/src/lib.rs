//! Rig2D Engine - 2D 网格骨骼绑定运行时
//!
//! 把逐帧采样的 2D 关节动画数据转换为可变形的蒙皮角色：
//! - 网格顶点邻接图
//! - 蒙皮权重计算（径向 / 测地线 / 缓存测地线）
//! - 骨架层级构建与绑定姿态
//! - 逐帧姿态重定向（平滑、阻尼、限幅）
//! - 数据集导入与 CPU 蒙皮

pub mod animation;
pub mod config;
pub mod dataset;
pub mod mesh;
pub mod model;
pub mod skeleton;
pub mod skinning;

pub use animation::{
    AnimationClock, AnimationFrames, Playback, PoseRetargeter, PoseState, RetargetConfig,
    RotationMode, RotationPolicy, Smoothing,
};
pub use config::RigConfig;
pub use dataset::{load_dataset, parse_dataset, AnimDataset, CoordinateCorrection, DatasetCorrections};
pub use mesh::{AdjacencyGraph, Mesh};
pub use model::RiggedCharacter;
pub use skeleton::{compute_bind_pose, Joint, Skeleton, SkeletonBuilder, SkeletonError};
pub use skinning::{
    compute_skinning, compute_weights, BoneWeight, GeodesicTable, SkinningConfig, SkinningEngine,
    SkinningInput, WeightStrategy, MAX_INFLUENCES,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dataset parse error: {0}")]
    DatasetParse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed mesh: triangle {triangle} references vertex {vertex}, but the mesh has {vertex_count} vertices")]
    MalformedMesh {
        triangle: usize,
        vertex: u32,
        vertex_count: usize,
    },

    #[error("Skeleton error: {0}")]
    Skeleton(#[from] SkeletonError),
}

pub type Result<T> = std::result::Result<T, RigError>;
