//! 网格孔洞填充.
//!
//! 边界棱 (只被一个面片引用的棱) 串接成边界环, 每个环用扇形剖分封闭.
//! 新面片的绕向与既有表面一致, 因此封闭后的网格仍是一致定向的.

use std::collections::{HashMap, HashSet};

use super::TriMesh;

/// 孔洞填充实现块
impl TriMesh {
    /// 收集所有边界有向棱: 自身出现一次且反向棱不存在.
    fn boundary_edges(&self) -> Vec<(usize, usize)> {
        let mut count: HashMap<(usize, usize), usize> = HashMap::new();
        for f in self.faces.iter() {
            for (a, b) in [(f[0], f[1]), (f[1], f[2]), (f[2], f[0])] {
                *count.entry((a, b)).or_insert(0) += 1;
            }
        }
        count
            .iter()
            .filter(|(&(a, b), &c)| c == 1 && !count.contains_key(&(b, a)))
            .map(|(&e, _)| e)
            .collect()
    }

    /// 封闭所有孔洞, 返回填充的边界环个数.
    ///
    /// 每个边界环以环上首个顶点为扇心做扇形剖分. 非环状边界
    /// (顶点出度不为 1 的退化情形) 会被跳过.
    pub fn fill_holes(&mut self) -> usize {
        let boundary = self.boundary_edges();
        if boundary.is_empty() {
            return 0;
        }

        // 边界有向棱的后继表. 正常孔洞中每个边界顶点恰有一条出棱.
        let mut next: HashMap<usize, usize> = HashMap::new();
        let mut degenerate: HashSet<usize> = HashSet::new();
        for &(a, b) in boundary.iter() {
            if next.insert(a, b).is_some() {
                degenerate.insert(a);
            }
        }

        let mut visited: HashSet<usize> = HashSet::new();
        let mut filled = 0usize;

        for &(start, _) in boundary.iter() {
            if visited.contains(&start) || degenerate.contains(&start) {
                continue;
            }

            // 沿后继表走出一个环.
            let mut ring = vec![start];
            let mut cur = next[&start];
            let mut closed = false;
            while ring.len() <= boundary.len() {
                if degenerate.contains(&cur) {
                    break;
                }
                if cur == start {
                    closed = true;
                    break;
                }
                ring.push(cur);
                match next.get(&cur) {
                    Some(&n) => cur = n,
                    None => break,
                }
            }
            visited.extend(ring.iter().copied());
            if !closed || ring.len() < 3 {
                continue;
            }

            // 扇形剖分. 边界棱方向为 a -> b, 新面片须以 b -> a
            // 方向引用该棱才能与原表面配对.
            let apex = ring[0];
            for w in ring[1..].windows(2) {
                self.faces.push([apex, w[1], w[0]]);
            }
            filled += 1;
        }
        filled
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::super::TriMesh;

    /// 缺一个面的立方体 (10 个三角形, 孔为四边形).
    fn open_box() -> TriMesh {
        let vertices = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
            [0.0, 1.0, 1.0],
        ];
        // 外向定向; 顶面 (z = 1) 缺失.
        let faces = vec![
            [0, 2, 1],
            [0, 3, 2], // 底
            [0, 1, 5],
            [0, 5, 4], // 前
            [1, 2, 6],
            [1, 6, 5], // 右
            [2, 3, 7],
            [2, 7, 6], // 后
            [3, 0, 4],
            [3, 4, 7], // 左
        ];
        TriMesh {
            vertices,
            faces,
            colors: None,
        }
    }

    fn directed_counts(mesh: &TriMesh) -> HashMap<(usize, usize), usize> {
        let mut m = HashMap::new();
        for f in mesh.faces.iter() {
            for (a, b) in [(f[0], f[1]), (f[1], f[2]), (f[2], f[0])] {
                *m.entry((a, b)).or_insert(0) += 1;
            }
        }
        m
    }

    #[test]
    fn test_fill_open_box() {
        let mut mesh = open_box();
        assert_eq!(mesh.fill_holes(), 1);
        assert_eq!(mesh.face_count(), 12);

        // 填充后为闭流形: 每条有向棱恰好一次, 且有反向配对.
        let m = directed_counts(&mesh);
        for (&(a, b), &c) in m.iter() {
            assert_eq!(c, 1);
            assert_eq!(m.get(&(b, a)), Some(&1), "({a}, {b})");
        }
    }

    #[test]
    fn test_closed_mesh_untouched() {
        let mut mesh = open_box();
        mesh.fill_holes();
        let before = mesh.face_count();
        assert_eq!(mesh.fill_holes(), 0);
        assert_eq!(mesh.face_count(), before);
    }

    #[test]
    fn test_empty_mesh() {
        let mut mesh = TriMesh::new();
        assert_eq!(mesh.fill_holes(), 0);
    }
}
