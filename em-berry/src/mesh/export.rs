//! 网格的持久化存储与加载.
//!
//! 导出格式按扩展名分派. OBJ 顶点行允许携带颜色扩展
//! (`v x y z r g b`), PLY 以 ASCII 编码并在有颜色时写出
//! `uchar` RGBA 属性, STL 为 ASCII 实体, OFF 为纯几何.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use super::TriMesh;

/// 支持的网格格式.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MeshFormat {
    /// Wavefront OBJ.
    Obj,

    /// ASCII PLY.
    Ply,

    /// ASCII STL.
    Stl,

    /// Object File Format.
    Off,
}

/// 全部支持的格式, 用于错误提示.
pub const SUPPORTED_FORMATS: [MeshFormat; 4] =
    [MeshFormat::Obj, MeshFormat::Ply, MeshFormat::Stl, MeshFormat::Off];

impl MeshFormat {
    /// 由格式名 (或扩展名) 识别格式, 大小写不敏感.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "obj" => Some(MeshFormat::Obj),
            "ply" => Some(MeshFormat::Ply),
            "stl" => Some(MeshFormat::Stl),
            "off" => Some(MeshFormat::Off),
            _ => None,
        }
    }

    /// 由输出路径的扩展名识别格式.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_name)
    }

    /// 格式短名.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MeshFormat::Obj => "obj",
            MeshFormat::Ply => "ply",
            MeshFormat::Stl => "stl",
            MeshFormat::Off => "off",
        }
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 导出运行时错误.
#[derive(Debug)]
pub enum ExportError {
    /// 无法识别的格式名. 支持集见 [`SUPPORTED_FORMATS`].
    UnsupportedFormat(String),

    /// 底层 I/O 错误.
    Io(std::io::Error),
}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

/// 加载运行时错误.
#[derive(Debug)]
pub enum LoadError {
    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// 文件内容不符合格式 (行号与说明).
    Malformed(usize, &'static str),
}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

/// 面片法向 (未归一化时返回归一化结果, 退化面片返回零向量).
fn face_normal(mesh: &TriMesh, f: &[usize; 3]) -> [f64; 3] {
    let (a, b, c) = (mesh.vertices[f[0]], mesh.vertices[f[1]], mesh.vertices[f[2]]);
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len < 1e-12 {
        [0.0, 0.0, 0.0]
    } else {
        [n[0] / len, n[1] / len, n[2] / len]
    }
}

/// 导出实现块
impl TriMesh {
    /// 按 `format` 将网格写到 `path`. `format` 为 `None`
    /// 时按扩展名分派; 两者都无法识别时返回
    /// [`ExportError::UnsupportedFormat`].
    pub fn export<P: AsRef<Path>>(
        &self,
        path: P,
        format: Option<MeshFormat>,
    ) -> Result<(), ExportError> {
        let path = path.as_ref();
        let format = match format.or_else(|| MeshFormat::from_path(path)) {
            Some(f) => f,
            None => {
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("")
                    .to_owned();
                return Err(ExportError::UnsupportedFormat(ext));
            }
        };
        debug_assert!(self.faces.iter().flatten().all(|&i| i < self.vertices.len()));

        let mut w = BufWriter::new(File::create(path)?);
        match format {
            MeshFormat::Obj => self.write_obj(&mut w)?,
            MeshFormat::Ply => self.write_ply(&mut w)?,
            MeshFormat::Stl => self.write_stl(&mut w)?,
            MeshFormat::Off => self.write_off(&mut w)?,
        }
        Ok(())
    }

    /// 写出 Wavefront OBJ. 有颜色时顶点行追加 `r g b` (0..1).
    fn write_obj<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        for (i, v) in self.vertices.iter().enumerate() {
            match &self.colors {
                Some(colors) => {
                    let [r, g, b, _] = colors[i];
                    writeln!(
                        w,
                        "v {} {} {} {:.6} {:.6} {:.6}",
                        v[0],
                        v[1],
                        v[2],
                        r as f64 / 255.0,
                        g as f64 / 255.0,
                        b as f64 / 255.0
                    )?;
                }
                None => writeln!(w, "v {} {} {}", v[0], v[1], v[2])?,
            }
        }
        for f in self.faces.iter() {
            writeln!(w, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1)?;
        }
        Ok(())
    }

    /// 写出 ASCII PLY.
    fn write_ply<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(w, "ply")?;
        writeln!(w, "format ascii 1.0")?;
        writeln!(w, "element vertex {}", self.vertices.len())?;
        writeln!(w, "property double x")?;
        writeln!(w, "property double y")?;
        writeln!(w, "property double z")?;
        if self.colors.is_some() {
            writeln!(w, "property uchar red")?;
            writeln!(w, "property uchar green")?;
            writeln!(w, "property uchar blue")?;
            writeln!(w, "property uchar alpha")?;
        }
        writeln!(w, "element face {}", self.faces.len())?;
        writeln!(w, "property list uchar int vertex_indices")?;
        writeln!(w, "end_header")?;

        for (i, v) in self.vertices.iter().enumerate() {
            match &self.colors {
                Some(colors) => {
                    let [r, g, b, a] = colors[i];
                    writeln!(w, "{} {} {} {r} {g} {b} {a}", v[0], v[1], v[2])?;
                }
                None => writeln!(w, "{} {} {}", v[0], v[1], v[2])?,
            }
        }
        for f in self.faces.iter() {
            writeln!(w, "3 {} {} {}", f[0], f[1], f[2])?;
        }
        Ok(())
    }

    /// 写出 ASCII STL. 颜色信息被丢弃 (格式不支持).
    fn write_stl<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(w, "solid mesh")?;
        for f in self.faces.iter() {
            let n = face_normal(self, f);
            writeln!(w, "facet normal {} {} {}", n[0], n[1], n[2])?;
            writeln!(w, "  outer loop")?;
            for &i in f.iter() {
                let v = self.vertices[i];
                writeln!(w, "    vertex {} {} {}", v[0], v[1], v[2])?;
            }
            writeln!(w, "  endloop")?;
            writeln!(w, "endfacet")?;
        }
        writeln!(w, "endsolid mesh")?;
        Ok(())
    }

    /// 写出 OFF. 颜色信息被丢弃.
    fn write_off<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        writeln!(w, "OFF")?;
        writeln!(w, "{} {} 0", self.vertices.len(), self.faces.len())?;
        for v in self.vertices.iter() {
            writeln!(w, "{} {} {}", v[0], v[1], v[2])?;
        }
        for f in self.faces.iter() {
            writeln!(w, "3 {} {} {}", f[0], f[1], f[2])?;
        }
        Ok(())
    }

    /// 加载 Wavefront OBJ 的几何部分 (顶点与三角面片).
    ///
    /// `f` 行允许 `v/vt/vn` 复合索引 (只取顶点索引), 多边形面片按
    /// 扇形拆成三角形; 颜色/法向/纹理等其余行被忽略.
    pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let mut mesh = TriMesh::new();

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let mut tokens = line.split_whitespace();
            match tokens.next() {
                Some("v") => {
                    let mut coord = [0.0f64; 3];
                    for c in coord.iter_mut() {
                        *c = tokens
                            .next()
                            .and_then(|t| t.parse().ok())
                            .ok_or(LoadError::Malformed(lineno + 1, "顶点行坐标不足"))?;
                    }
                    mesh.vertices.push(coord);
                }
                Some("f") => {
                    let idx: Vec<usize> = tokens
                        .map(|t| {
                            let first = t.split('/').next().unwrap_or(t);
                            first
                                .parse::<usize>()
                                .ok()
                                .and_then(|i| i.checked_sub(1))
                                .ok_or(LoadError::Malformed(lineno + 1, "面片索引非法"))
                        })
                        .collect::<Result<_, _>>()?;
                    if idx.len() < 3 {
                        return Err(LoadError::Malformed(lineno + 1, "面片顶点不足 3 个"));
                    }
                    for k in 1..idx.len() - 1 {
                        mesh.faces.push([idx[0], idx[k], idx[k + 1]]);
                    }
                }
                _ => {}
            }
        }

        if mesh
            .faces
            .iter()
            .flatten()
            .any(|&i| i >= mesh.vertices.len())
        {
            return Err(LoadError::Malformed(0, "面片索引越界"));
        }
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::icosphere;

    fn workdir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(MeshFormat::from_name("OBJ"), Some(MeshFormat::Obj));
        assert_eq!(MeshFormat::from_name("gltf"), None);
        assert_eq!(MeshFormat::from_path("a/b.ply"), Some(MeshFormat::Ply));
        assert_eq!(MeshFormat::from_path("a/b"), None);
    }

    #[test]
    fn test_export_unknown_extension() {
        let mesh = icosphere(0, 1.0);
        let err = mesh
            .export(workdir("em_berry_export_test").join("m.gltf"), None)
            .unwrap_err();
        match err {
            ExportError::UnsupportedFormat(ext) => assert_eq!(ext, "gltf"),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn test_obj_roundtrip() {
        let dir = workdir("em_berry_obj_test");
        let mut mesh = icosphere(1, 2.0);
        mesh.set_uniform_color([10, 20, 30, 255]);

        let p = dir.join("sphere.obj");
        mesh.export(&p, None).unwrap();
        let back = TriMesh::load_obj(&p).unwrap();

        assert_eq!(back.vertex_count(), mesh.vertex_count());
        assert_eq!(back.faces, mesh.faces);
        // OBJ 颜色扩展不参与加载.
        assert!(back.colors.is_none());
        for (a, b) in back.vertices.iter().zip(mesh.vertices.iter()) {
            for k in 0..3 {
                assert!((a[k] - b[k]).abs() < 1e-9);
            }
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_obj_compound_indices_and_polygons() {
        let dir = workdir("em_berry_obj_parse_test");
        let p = dir.join("quad.obj");
        std::fs::write(
            &p,
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvn 0 0 1\nf 1/1/1 2/2/1 3/3/1 4/4/1\n",
        )
        .unwrap();
        let mesh = TriMesh::load_obj(&p).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_ply_structure() {
        let dir = workdir("em_berry_ply_test");
        let mut mesh = icosphere(0, 1.0);
        mesh.set_uniform_color([1, 2, 3, 4]);
        let p = dir.join("m.ply");
        mesh.export(&p, Some(MeshFormat::Ply)).unwrap();

        let text = std::fs::read_to_string(&p).unwrap();
        assert!(text.starts_with("ply\nformat ascii 1.0\n"));
        assert!(text.contains("element vertex 12\n"));
        assert!(text.contains("element face 20\n"));
        assert!(text.contains("property uchar alpha\n"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_stl_and_off_structure() {
        let dir = workdir("em_berry_stl_off_test");
        let mesh = icosphere(0, 1.0);

        let p = dir.join("m.stl");
        mesh.export(&p, None).unwrap();
        let text = std::fs::read_to_string(&p).unwrap();
        assert!(text.starts_with("solid mesh\n"));
        assert_eq!(text.matches("facet normal").count(), 20);
        assert!(text.trim_end().ends_with("endsolid mesh"));

        let p = dir.join("m.off");
        mesh.export(&p, None).unwrap();
        let text = std::fs::read_to_string(&p).unwrap();
        assert!(text.starts_with("OFF\n12 20 0\n"));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
