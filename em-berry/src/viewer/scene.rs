//! 偏移合并场景.
//!
//! 读取神经元网格目录与囊泡网格目录, 将每个网格按其神经元的体素
//! 偏移平移后合并为单个网格. 囊泡网格按文件名首个 `_` 之前的
//! 前缀归属到神经元.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::dataset::OffsetTable;
use crate::mesh::{LoadError, TriMesh};

/// 场景装配错误.
#[derive(Debug)]
pub enum SceneError {
    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// 网格文件加载错误 (文件与原因).
    Load(PathBuf, LoadError),

    /// 两个目录下都没有任何 OBJ 网格.
    NoMeshes,
}

impl From<std::io::Error> for SceneError {
    fn from(e: std::io::Error) -> Self {
        SceneError::Io(e)
    }
}

/// 场景装配结果摘要.
#[derive(Debug)]
pub struct SceneReport {
    /// 合并的神经元网格个数.
    pub neurons: usize,

    /// 合并的囊泡网格个数.
    pub vesicle_meshes: usize,
}

/// 目录下所有 OBJ 文件, 按文件名升序.
fn obj_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("obj"))
        .collect();
    files.sort();
    Ok(files)
}

/// 文件主干名.
fn stem_of(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_owned()
}

/// 神经元的偏移, 以浮点向量表示. 未登记时为零并打印警告.
fn offset_of(offsets: &OffsetTable, neuron: &str) -> [f64; 3] {
    if !offsets.contains(neuron) {
        warn!("神经元 {neuron} 没有偏移记录, 按零偏移处理");
    }
    offsets.get(neuron).map(|v| v as f64)
}

/// 装配合并场景.
///
/// `neuron_mesh_dir` 下每个 OBJ 以其主干名作为神经元名;
/// `vesicle_mesh_dir` 下每个 OBJ 以主干名首个 `_` 之前的前缀归属
/// 神经元. 所有网格平移各自神经元的偏移后合并.
pub fn assemble_scene(
    neuron_mesh_dir: &Path,
    vesicle_mesh_dir: &Path,
    offsets: &OffsetTable,
) -> Result<(TriMesh, SceneReport), SceneError> {
    let mut scene = TriMesh::new();
    let mut report = SceneReport {
        neurons: 0,
        vesicle_meshes: 0,
    };

    for path in obj_files(neuron_mesh_dir)? {
        let name = stem_of(&path);
        let mut mesh =
            TriMesh::load_obj(&path).map_err(|e| SceneError::Load(path.clone(), e))?;
        mesh.translate(offset_of(offsets, &name));
        scene.append(&mesh);
        report.neurons += 1;
        info!("神经元网格已合并: {name}");
    }

    // 按神经元分组, 保证合并顺序稳定.
    let mut grouped: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for path in obj_files(vesicle_mesh_dir)? {
        let stem = stem_of(&path);
        let neuron = stem.split('_').next().unwrap_or(&stem).to_owned();
        grouped.entry(neuron).or_default().push(path);
    }
    for (neuron, paths) in grouped {
        let offset = offset_of(offsets, &neuron);
        for path in paths {
            let mut mesh =
                TriMesh::load_obj(&path).map_err(|e| SceneError::Load(path.clone(), e))?;
            mesh.translate(offset);
            scene.append(&mesh);
            report.vesicle_meshes += 1;
        }
        info!("神经元 {neuron} 的囊泡网格已合并");
    }

    if scene.is_empty() {
        return Err(SceneError::NoMeshes);
    }
    Ok((scene, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const TRI_OBJ: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    #[test]
    fn test_assemble_scene() {
        let root = std::env::temp_dir().join("em_berry_scene_test");
        let _ = fs::remove_dir_all(&root);
        let ndir = root.join("neurons");
        let vdir = root.join("vesicles");
        fs::create_dir_all(&ndir).unwrap();
        fs::create_dir_all(&vdir).unwrap();

        fs::write(ndir.join("KC19.obj"), TRI_OBJ).unwrap();
        fs::write(vdir.join("KC19_sv.obj"), TRI_OBJ).unwrap();
        fs::write(vdir.join("KC19_lv.obj"), TRI_OBJ).unwrap();
        fs::write(vdir.join("orphan_sv.obj"), TRI_OBJ).unwrap();

        let csv = root.join("offsets.csv");
        fs::write(&csv, "name,x,y,z\nKC19,10,20,30\n").unwrap();
        let offsets = OffsetTable::from_csv(&csv).unwrap();

        let (scene, report) = assemble_scene(&ndir, &vdir, &offsets).unwrap();
        assert_eq!(report.neurons, 1);
        assert_eq!(report.vesicle_meshes, 3);
        assert_eq!(scene.face_count(), 4);
        assert_eq!(scene.vertex_count(), 12);

        // KC19 的网格被平移, orphan 保持零偏移.
        assert_eq!(scene.vertices[0], [10.0, 20.0, 30.0]);
        let (lo, _) = scene.bounding_box().unwrap();
        assert_eq!(lo, [0.0, 0.0, 0.0]);

        fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_assemble_scene_empty() {
        let root = std::env::temp_dir().join("em_berry_scene_empty_test");
        let _ = fs::remove_dir_all(&root);
        let ndir = root.join("neurons");
        let vdir = root.join("vesicles");
        fs::create_dir_all(&ndir).unwrap();
        fs::create_dir_all(&vdir).unwrap();

        let err = assemble_scene(&ndir, &vdir, &OffsetTable::default()).unwrap_err();
        assert!(matches!(err, SceneError::NoMeshes));
        fs::remove_dir_all(&root).unwrap();
    }
}
