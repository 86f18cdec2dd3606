//! 骨架构建与绑定姿态

use glam::{Mat4, Vec2};
use thiserror::Error;

use super::{Joint, Skeleton};

/// 骨架结构错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkeletonError {
    #[error("skeleton has no joints")]
    Empty,

    #[error("joint arrays differ in length: {names} names, {parents} parents, {rest_positions} rest positions")]
    LengthMismatch {
        names: usize,
        parents: usize,
        rest_positions: usize,
    },

    #[error("joints {first} and {second} are both roots")]
    MultipleRoots { first: usize, second: usize },

    #[error("joint {joint} is its own parent")]
    SelfParent { joint: usize },

    #[error("joint {joint} has out-of-range parent {parent}")]
    ParentOutOfRange { joint: usize, parent: i32 },

    #[error("joint {joint} is its own ancestor")]
    Cycle { joint: usize },

    #[error("joint {joint} has parent {parent}, parents must precede their children")]
    ParentAfterChild { joint: usize, parent: usize },
}

/// 骨架构建器
pub struct SkeletonBuilder;

impl SkeletonBuilder {
    /// 从关节名称、父索引和 A-pose 位置构建骨架
    ///
    /// 要求：恰好一个根（父索引 -1），其余关节的父索引小于自身索引。
    /// 后者保证根位于索引 0，且按索引递增顺序处理时父关节总是先于子关节。
    pub fn build(
        names: &[impl AsRef<str>],
        parents: &[i32],
        rest_positions: &[Vec2],
    ) -> Result<Skeleton, SkeletonError> {
        let count = names.len();
        if parents.len() != count || rest_positions.len() != count {
            return Err(SkeletonError::LengthMismatch {
                names: count,
                parents: parents.len(),
                rest_positions: rest_positions.len(),
            });
        }
        if count == 0 {
            return Err(SkeletonError::Empty);
        }

        let mut root: Option<usize> = None;
        for (joint, &parent) in parents.iter().enumerate() {
            match parent {
                -1 => {
                    if let Some(first) = root {
                        return Err(SkeletonError::MultipleRoots { first, second: joint });
                    }
                    root = Some(joint);
                }
                p if p as i64 == joint as i64 => return Err(SkeletonError::SelfParent { joint }),
                p if p < 0 || p as usize >= count => {
                    return Err(SkeletonError::ParentOutOfRange { joint, parent: p })
                }
                p if p as usize > joint => {
                    return Err(if Self::leads_back_to(parents, p as usize, joint) {
                        SkeletonError::Cycle { joint }
                    } else {
                        SkeletonError::ParentAfterChild { joint, parent: p as usize }
                    });
                }
                _ => {}
            }
        }

        // 父索引均小于自身索引，因此关节 0 必然是唯一的根
        debug_assert_eq!(root, Some(0));

        let mut joints: Vec<Joint> = names
            .iter()
            .zip(rest_positions)
            .map(|(name, &pos)| Joint::new(name.as_ref(), pos))
            .collect();

        // 计算相对于父关节的偏移
        for i in 0..count {
            let parent = (parents[i] >= 0).then(|| parents[i] as usize);
            joints[i].parent = parent;
            joints[i].rest_offset = match parent {
                Some(p) => joints[i].rest_position - joints[p].rest_position,
                None => joints[i].rest_position,
            };
        }

        let skeleton = Skeleton::from_joints(joints);
        log::info!(
            "骨架构建完成: {} 个关节, 最大深度 {}",
            skeleton.joint_count(),
            skeleton.max_depth()
        );
        Ok(skeleton)
    }

    /// 沿父链从 start 向上查找，是否回到 joint
    fn leads_back_to(parents: &[i32], start: usize, joint: usize) -> bool {
        let mut current = start;
        for _ in 0..parents.len() {
            if current == joint {
                return true;
            }
            match parents[current] {
                p if p < 0 || p as usize >= parents.len() => return false,
                p => current = p as usize,
            }
        }
        false
    }
}

/// 计算绑定姿态矩阵
///
/// 每个关节：bind = inverse(关节 A-pose 全局变换) * mesh_to_world，
/// 即把网格空间顶点变换到该关节的局部空间。
pub fn compute_bind_pose(skeleton: &Skeleton, mesh_to_world: Mat4) -> Vec<Mat4> {
    skeleton
        .joints()
        .iter()
        .map(|joint| joint.rest_world_transform().inverse() * mesh_to_world)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn positions(n: usize) -> Vec<Vec2> {
        (0..n).map(|i| Vec2::new(i as f32, 0.0)).collect()
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("joint_{i}")).collect()
    }

    #[test]
    fn test_build_valid_tree() {
        let skeleton = SkeletonBuilder::build(&names(5), &[-1, 0, 1, 0, 3], &positions(5)).unwrap();
        assert_eq!(skeleton.joint_count(), 5);
        assert_eq!(skeleton.root(), 0);
        assert_eq!(skeleton.children(0), &[1, 3]);
        assert_eq!(skeleton.children(3), &[4]);
        assert_eq!(skeleton.parent(2), Some(1));
        assert_eq!(skeleton.parent(0), None);
        assert_eq!(skeleton.max_depth(), 2);

        let offset = skeleton.joint(4).unwrap().rest_offset;
        assert!((offset.x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_single_joint() {
        let skeleton = SkeletonBuilder::build(&["root"], &[-1], &[Vec2::ZERO]).unwrap();
        assert_eq!(skeleton.joint_count(), 1);
        assert!(skeleton.children(0).is_empty());
    }

    #[test]
    fn test_reject_self_parent() {
        let err = SkeletonBuilder::build(&names(3), &[-1, 1, 0], &positions(3)).unwrap_err();
        assert_eq!(err, SkeletonError::SelfParent { joint: 1 });
    }

    #[test]
    fn test_reject_two_roots() {
        let err = SkeletonBuilder::build(&names(3), &[-1, 0, -1], &positions(3)).unwrap_err();
        assert_eq!(err, SkeletonError::MultipleRoots { first: 0, second: 2 });
    }

    #[test]
    fn test_reject_cycle() {
        // 0 -> 1 -> 0 构成环
        let err = SkeletonBuilder::build(&names(2), &[1, 0], &positions(2)).unwrap_err();
        assert_eq!(err, SkeletonError::Cycle { joint: 0 });
    }

    #[test]
    fn test_reject_out_of_range_parent() {
        let err = SkeletonBuilder::build(&names(3), &[-1, 0, 7], &positions(3)).unwrap_err();
        assert_eq!(err, SkeletonError::ParentOutOfRange { joint: 2, parent: 7 });

        let err = SkeletonBuilder::build(&names(3), &[-1, -4, 0], &positions(3)).unwrap_err();
        assert_eq!(err, SkeletonError::ParentOutOfRange { joint: 1, parent: -4 });
    }

    #[test]
    fn test_reject_forward_parent() {
        let err = SkeletonBuilder::build(&names(4), &[-1, 3, 0, 0], &positions(4)).unwrap_err();
        assert_eq!(err, SkeletonError::ParentAfterChild { joint: 1, parent: 3 });
    }

    #[test]
    fn test_reject_root_not_at_zero() {
        let err = SkeletonBuilder::build(&names(2), &[1, -1], &positions(2)).unwrap_err();
        assert_eq!(err, SkeletonError::ParentAfterChild { joint: 0, parent: 1 });
    }

    #[test]
    fn test_reject_length_mismatch() {
        let err = SkeletonBuilder::build(&names(3), &[-1, 0], &positions(3)).unwrap_err();
        assert!(matches!(err, SkeletonError::LengthMismatch { .. }));

        let empty: [&str; 0] = [];
        assert_eq!(SkeletonBuilder::build(&empty, &[], &[]).unwrap_err(), SkeletonError::Empty);
    }

    #[test]
    fn test_bind_pose_maps_rest_joint_to_origin() {
        let rest = vec![Vec2::new(0.0, 0.0), Vec2::new(2.0, 1.0)];
        let skeleton = SkeletonBuilder::build(&names(2), &[-1, 0], &rest).unwrap();

        let mesh_to_world = Mat4::from_translation(Vec3::new(0.5, 0.0, 0.0));
        let bind = compute_bind_pose(&skeleton, mesh_to_world);
        assert_eq!(bind.len(), 2);

        // 网格空间中位于 (1.5, 1) 的点在世界空间位于 (2, 1)，正好是关节 1
        let local = bind[1].transform_point3(Vec3::new(1.5, 1.0, 0.0));
        assert!(local.length() < 1e-5);

        // 关节 A-pose 全局变换 * 绑定矩阵 = mesh_to_world
        let roundtrip = skeleton.joint(1).unwrap().rest_world_transform() * bind[1];
        assert!(roundtrip.abs_diff_eq(mesh_to_world, 1e-5));
    }
}
