//! JSON 数据集加载器

use std::fs;
use std::path::Path;

use crate::{RigError, Result};

use super::AnimDataset;

/// 从 JSON 文件加载数据集
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<AnimDataset> {
    let json = fs::read_to_string(path.as_ref())?;
    parse_dataset(&json)
}

/// 从 JSON 文本解析数据集
pub fn parse_dataset(json: &str) -> Result<AnimDataset> {
    let dataset: AnimDataset =
        serde_json::from_str(json).map_err(|e| RigError::DatasetParse(e.to_string()))?;

    log::info!(
        "数据集解析完成: {} 个顶点, {} 个三角形, {} 个关节, {} 帧",
        dataset.vertices_uv.len(),
        dataset.triangles.len(),
        dataset.joints_names.len(),
        dataset.joints.len()
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let json = r#"{
            "vertices_uv": [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
            "triangles": [[0, 1, 2]],
            "joints_names": ["root"],
            "joints_parents": [-1],
            "a_pose_joints": [[0.5, 0.5]],
            "joints": [[[0.5, 0.5]]]
        }"#;
        let dataset = parse_dataset(json).unwrap();
        assert_eq!(dataset.vertices_uv.len(), 3);
        assert_eq!(dataset.triangles, vec![[0, 1, 2]]);
        assert!(dataset.joints_order.is_none());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = parse_dataset("{ \"vertices_uv\": [").unwrap_err();
        assert!(matches!(err, RigError::DatasetParse(_)));

        let err = parse_dataset(r#"{ "triangles": [[0, 1]] }"#).unwrap_err();
        assert!(matches!(err, RigError::DatasetParse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_dataset("/nonexistent/rig2d/anim.json").unwrap_err();
        assert!(matches!(err, RigError::Io(_)));
    }
}
