//! 绑定角色运行时

use glam::{Mat4, Quat, Vec2};
use rayon::prelude::*;

use crate::animation::{AnimationFrames, Playback, PoseRetargeter};
use crate::config::RigConfig;
use crate::dataset::{AnimDataset, DatasetCorrections};
use crate::mesh::Mesh;
use crate::skeleton::{compute_bind_pose, Skeleton};
use crate::skinning::{skin_vertex, BoneWeight, SkinningEngine};
use crate::Result;

/// 绑定好的 2D 角色：网格 + 骨架 + 静态权重 + 姿态重定向
pub struct RiggedCharacter {
    // 静态数据
    mesh: Mesh,
    skeleton: Skeleton,
    weights: Vec<BoneWeight>,
    bind_pose: Vec<Mat4>,
    mesh_to_world: Mat4,
    config: RigConfig,

    // 子系统
    retargeter: PoseRetargeter,

    // 运行时数据
    skinning_matrices: Vec<Mat4>,
    update_positions: Vec<Vec2>,
    /// 渲染用平铺缓冲区（x, y 交替）
    update_positions_raw: Vec<f32>,
    debug_logged: bool,
}

impl RiggedCharacter {
    /// 计算权重和绑定姿态（只做一次），并创建重定向器
    pub fn new(
        mesh: Mesh,
        skeleton: Skeleton,
        frames: AnimationFrames,
        mesh_to_world: Mat4,
        config: RigConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mut engine = SkinningEngine::new(config.skinning());
        let weights = engine.compute(&mesh, &skeleton.rest_positions())?;
        let bind_pose = compute_bind_pose(&skeleton, mesh_to_world);
        let retargeter = PoseRetargeter::new(&skeleton, frames, config.retarget())?;
        let skinning_matrices = retargeter.skinning_matrices(&bind_pose);

        let update_positions = mesh.vertices.clone();
        let update_positions_raw = update_positions.iter().flat_map(|p| [p.x, p.y]).collect();

        log::info!(
            "角色组装完成: {} 个顶点, {} 个关节, {} 帧, 策略 {:?}",
            mesh.vertex_count(),
            skeleton.joint_count(),
            retargeter.frames().len(),
            config.weight_strategy
        );

        Ok(Self {
            mesh,
            skeleton,
            weights,
            bind_pose,
            mesh_to_world,
            config,
            retargeter,
            skinning_matrices,
            update_positions,
            update_positions_raw,
            debug_logged: false,
        })
    }

    /// 从数据集创建（mesh_to_world 为单位矩阵）
    pub fn from_dataset(
        dataset: &AnimDataset,
        corrections: &DatasetCorrections,
        config: RigConfig,
    ) -> Result<Self> {
        let mesh = dataset.mesh(corrections)?;
        let skeleton = dataset.skeleton(&corrections.rest_pose)?;
        let frames = dataset.frames(&corrections.frames)?;
        Self::new(mesh, skeleton, frames, Mat4::IDENTITY, config)
    }

    /// 推进姿态并刷新蒙皮矩阵
    pub fn tick(&mut self, elapsed: f32) {
        self.retargeter.step(elapsed);
        self.skinning_matrices = self.retargeter.skinning_matrices(&self.bind_pose);
    }

    /// 更新顶点（蒙皮计算）- 使用 rayon 并行加速
    pub fn update(&mut self) {
        let matrices = &self.skinning_matrices;
        let vertex_count = self.mesh.vertex_count();

        if self.update_positions_raw.len() != vertex_count * 2 {
            self.update_positions_raw.resize(vertex_count * 2, 0.0);
        }
        if self.update_positions.len() != vertex_count {
            self.update_positions.resize(vertex_count, Vec2::ZERO);
        }

        self.update_positions
            .par_iter_mut()
            .zip(self.update_positions_raw.par_chunks_mut(2))
            .zip(self.mesh.vertices.par_iter())
            .zip(self.weights.par_iter())
            .for_each(|(((out, raw), &vertex), weight)| {
                let p = skin_vertex(vertex, weight, matrices);
                *out = p;
                raw[0] = p.x;
                raw[1] = p.y;
            });

        // 调试日志（只在首次执行）
        if !self.debug_logged {
            self.debug_logged = true;
            log::info!(
                "首次蒙皮: vertex_count={}, raw_len={}, matrices={} (rayon并行蒙皮)",
                vertex_count,
                self.update_positions_raw.len(),
                matrices.len()
            );
        }
    }

    /// 切换播放模式
    pub fn set_playback(&mut self, playback: Playback) -> Result<()> {
        self.retargeter.set_playback(playback)
    }

    /// 回到 A-pose 和第 0 帧
    pub fn reset(&mut self) {
        self.retargeter.reset();
        self.skinning_matrices = self.retargeter.skinning_matrices(&self.bind_pose);
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    pub fn config(&self) -> &RigConfig {
        &self.config
    }

    pub fn weights(&self) -> &[BoneWeight] {
        &self.weights
    }

    pub fn bind_pose(&self) -> &[Mat4] {
        &self.bind_pose
    }

    pub fn mesh_to_world(&self) -> Mat4 {
        self.mesh_to_world
    }

    pub fn retargeter(&self) -> &PoseRetargeter {
        &self.retargeter
    }

    /// 当前帧索引
    pub fn frame(&self) -> usize {
        self.retargeter.frame()
    }

    pub fn local_rotations(&self) -> &[Quat] {
        self.retargeter.local_rotations()
    }

    pub fn local_positions(&self) -> Vec<Vec2> {
        self.retargeter.local_positions()
    }

    /// 关节当前世界位置
    pub fn joint_positions(&self) -> &[Vec2] {
        self.retargeter.positions()
    }

    pub fn skinning_matrices(&self) -> &[Mat4] {
        &self.skinning_matrices
    }

    /// 上一次 update() 的结果
    pub fn deformed_positions(&self) -> &[Vec2] {
        &self.update_positions
    }

    pub fn positions_raw(&self) -> &[f32] {
        &self.update_positions_raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Smoothing;
    use crate::dataset::parse_dataset;
    use crate::skeleton::SkeletonBuilder;
    use crate::skinning::{compute_skinning, SkinningInput, WeightStrategy};
    use crate::RigError;

    const ALL_STRATEGIES: [WeightStrategy; 3] = [
        WeightStrategy::NaiveRadial,
        WeightStrategy::GeodesicRadial,
        WeightStrategy::CachedGeodesicRadial,
    ];

    fn quad() -> Mesh {
        Mesh::new(
            vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(2.0, 0.0),
                Vec2::new(2.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    fn rest() -> Vec<Vec2> {
        vec![Vec2::new(0.0, 0.0), Vec2::new(2.0, 1.0)]
    }

    fn skeleton() -> Skeleton {
        SkeletonBuilder::build(&["hip", "hand"], &[-1, 0], &rest()).unwrap()
    }

    fn config(strategy: WeightStrategy) -> RigConfig {
        RigConfig {
            influence_radius: 4.0,
            weight_strategy: strategy,
            frame_interval: 0.1,
            smoothing: Smoothing::Snap,
            ..Default::default()
        }
    }

    fn character(strategy: WeightStrategy, frames: Vec<Vec<Vec2>>) -> RiggedCharacter {
        let frames = AnimationFrames::new(frames).unwrap();
        RiggedCharacter::new(quad(), skeleton(), frames, Mat4::IDENTITY, config(strategy)).unwrap()
    }

    #[test]
    fn test_quad_nearest_bone_dominates() {
        for strategy in ALL_STRATEGIES {
            let c = character(strategy, vec![rest()]);
            for (vertex, bone) in [(0, 0), (3, 0), (1, 1), (2, 1)] {
                let (dominant, w) = c.weights()[vertex].dominant().unwrap();
                assert_eq!(dominant, bone, "{strategy:?}: vertex {vertex}");
                assert!(w >= 0.5, "{strategy:?}: vertex {vertex} weight {w}");
            }
        }
    }

    #[test]
    fn test_rest_animation_keeps_mesh() {
        // 归一化的 NaiveRadial 权重和为 1，A-pose 下顶点不动
        let mut c = character(WeightStrategy::NaiveRadial, vec![rest()]);
        c.tick(0.05);
        c.update();

        for (deformed, original) in c.deformed_positions().iter().zip(&c.mesh().vertices) {
            assert!((*deformed - *original).length() < 1e-5);
        }
        for m in c.skinning_matrices() {
            assert!(m.abs_diff_eq(Mat4::IDENTITY, 1e-5));
        }
        assert_eq!(c.positions_raw().len(), 8);
        assert!((c.positions_raw()[2] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_parallel_update_matches_serial() {
        let moved = vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 2.0)];
        let mut c = character(WeightStrategy::CachedGeodesicRadial, vec![moved]);
        c.tick(0.05);
        c.update();

        let serial = compute_skinning(&SkinningInput {
            positions: &c.mesh().vertices,
            weights: c.weights(),
            bone_matrices: c.skinning_matrices(),
        });
        assert_eq!(serial.len(), c.deformed_positions().len());
        for (a, b) in serial.iter().zip(c.deformed_positions()) {
            assert!((*a - *b).length() < 1e-6);
        }

        // 手部关节跟随目标并带旋转
        assert!((c.joint_positions()[1] - Vec2::new(1.0, 2.0)).length() < 1e-5);
        assert!(!c.local_rotations()[1].abs_diff_eq(Quat::IDENTITY, 1e-3));
    }

    #[test]
    fn test_from_dataset_plays_frames() {
        let json = r#"{
            "vertices_uv": [[0.0, 0.0], [2.0, 0.0], [2.0, 1.0], [0.0, 1.0]],
            "triangles": [[0, 1, 2], [0, 2, 3]],
            "joints_names": ["hip", "hand"],
            "joints_parents": [-1, 0],
            "a_pose_joints": [[0.0, 0.0], [2.0, 1.0]],
            "joints": [
                [[0.0, 0.0], [2.0, 1.0]],
                [[0.0, 0.0], [1.0, 2.0]],
                [[0.0, 0.0]]
            ]
        }"#;
        let dataset = parse_dataset(json).unwrap();
        let mut c = RiggedCharacter::from_dataset(
            &dataset,
            &DatasetCorrections::default(),
            config(WeightStrategy::CachedGeodesicRadial),
        )
        .unwrap();

        let mut frames = Vec::new();
        for _ in 0..4 {
            c.tick(0.1);
            c.update();
            frames.push(c.frame());
        }
        assert_eq!(frames, vec![0, 1, 2, 0]);
        assert_eq!(c.retargeter().skipped_frames(), 1);
        assert_eq!(c.local_positions().len(), 2);
        assert_eq!(c.bind_pose().len(), 2);
    }

    #[test]
    fn test_rest_pose_playback_and_reset() {
        let moved = vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 2.0)];
        let mut c = character(WeightStrategy::NaiveRadial, vec![moved]);
        c.tick(0.05);
        assert!(!c.local_rotations()[1].abs_diff_eq(Quat::IDENTITY, 1e-3));

        c.set_playback(Playback::RestPose).unwrap();
        c.tick(0.05);
        c.update();
        for (deformed, original) in c.deformed_positions().iter().zip(&c.mesh().vertices) {
            assert!((*deformed - *original).length() < 1e-5);
        }

        c.set_playback(Playback::Advance).unwrap();
        c.tick(0.05);
        c.reset();
        assert_eq!(c.frame(), 0);
        assert_eq!(c.joint_positions(), rest().as_slice());
    }

    #[test]
    fn test_setup_errors() {
        let frames = || AnimationFrames::new(vec![rest()]).unwrap();

        let bad_radius = RigConfig {
            influence_radius: -1.0,
            ..Default::default()
        };
        let err = RiggedCharacter::new(quad(), skeleton(), frames(), Mat4::IDENTITY, bad_radius).err();
        assert!(matches!(err, Some(RigError::Config(_))));

        let locked = RigConfig {
            playback: Playback::Locked(5),
            ..Default::default()
        };
        let err = RiggedCharacter::new(quad(), skeleton(), frames(), Mat4::IDENTITY, locked).err();
        assert!(matches!(err, Some(RigError::Config(_))));
    }
}
