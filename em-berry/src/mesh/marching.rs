//! marching cubes 等值面提取.

use std::collections::HashMap;

use ndarray::ArrayView3;

use super::tables::{CORNER_OFFSETS, EDGE_CORNERS, TRI_TABLE};
use super::TriMesh;
use crate::Idx3d;

/// 全局棱标识: 两个端点的网格点坐标, 按字典序排列.
type EdgeKey = (Idx3d, Idx3d);

/// 在 `a`, `b` 两个网格点之间按场值线性插值等值点.
fn interpolate(a: Idx3d, b: Idx3d, va: f32, vb: f32, level: f32) -> [f64; 3] {
    let t = if (vb - va).abs() < 1e-12 {
        0.5
    } else {
        ((level - va) / (vb - va)) as f64
    };
    let pa = [a.0 as f64, a.1 as f64, a.2 as f64];
    let pb = [b.0 as f64, b.1 as f64, b.2 as f64];
    [
        pa[0] + t * (pb[0] - pa[0]),
        pa[1] + t * (pb[1] - pa[1]),
        pa[2] + t * (pb[2] - pa[2]),
    ]
}

/// 对 3D 标量场做 marching cubes, 提取 `level` 等值面.
///
/// 顶点坐标以体素 (网格点) 为单位. 相邻立方体共享的棱上只生成一个顶点.
/// 场中不存在等值穿越时返回空网格.
pub fn marching_cubes(field: ArrayView3<'_, f32>, level: f32) -> TriMesh {
    let shape = field.shape();
    let (nx, ny, nz) = (shape[0], shape[1], shape[2]);
    let mut mesh = TriMesh::new();
    if nx < 2 || ny < 2 || nz < 2 {
        return mesh;
    }

    let mut edge_cache: HashMap<EdgeKey, usize> = HashMap::new();

    for x in 0..nx - 1 {
        for y in 0..ny - 1 {
            for z in 0..nz - 1 {
                let corners: [Idx3d; 8] =
                    CORNER_OFFSETS.map(|(dx, dy, dz)| (x + dx, y + dy, z + dz));
                let values: [f32; 8] = corners.map(|c| field[c]);

                let mut cube_index = 0usize;
                for (i, &v) in values.iter().enumerate() {
                    if v < level {
                        cube_index |= 1 << i;
                    }
                }
                let row = TRI_TABLE[cube_index];
                if row.is_empty() {
                    continue;
                }

                let vertex_on_edge = |mesh: &mut TriMesh,
                                      cache: &mut HashMap<EdgeKey, usize>,
                                      e: u8|
                 -> usize {
                    let (ca, cb) = EDGE_CORNERS[e as usize];
                    let (a, b) = (corners[ca], corners[cb]);
                    let key = if a <= b { (a, b) } else { (b, a) };
                    *cache.entry(key).or_insert_with(|| {
                        let p = interpolate(a, b, values[ca], values[cb], level);
                        mesh.vertices.push(p);
                        mesh.vertices.len() - 1
                    })
                };

                for t in row.chunks_exact(3) {
                    let i0 = vertex_on_edge(&mut mesh, &mut edge_cache, t[0]);
                    let i1 = vertex_on_edge(&mut mesh, &mut edge_cache, t[1]);
                    let i2 = vertex_on_edge(&mut mesh, &mut edge_cache, t[2]);
                    mesh.faces.push([i0, i1, i2]);
                }
            }
        }
    }
    mesh
}
