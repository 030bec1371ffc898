use markerpose_image::Image;

/// A disjoint-set (union-find) data structure.
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    /// Creates a new UnionFind structure with length `len`.
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            size: vec![1; len],
        }
    }

    /// Returns the representative (root) of the set containing `id`, with path compression.
    pub fn get_representative(&mut self, mut id: usize) -> usize {
        let mut root = id;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        while self.parent[id] != root {
            let tmp = self.parent[id];
            self.parent[id] = root;
            id = tmp;
        }

        root
    }

    /// Unites the sets containing `aid` and `bid`, returning the representative of the resulting set.
    pub fn connect(&mut self, aid: usize, bid: usize) -> usize {
        let aroot = self.get_representative(aid);
        let broot = self.get_representative(bid);

        if aroot == broot {
            return aroot;
        }

        let (big, small) = if self.size[aroot] >= self.size[broot] {
            (aroot, broot)
        } else {
            (broot, aroot)
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];
        big
    }
}

/// Find the 8-connected components of the non-zero pixels of a binary image.
///
/// Each component is returned as the list of its boundary pixels, i.e. the
/// foreground pixels touching the background (4-neighbourhood) or the image
/// border. Components are ordered by their first pixel in raster order.
pub fn find_components(src: &Image<u8, 1>) -> Vec<Vec<(i64, i64)>> {
    let (rows, cols) = (src.height(), src.width());
    let data = src.as_slice();
    let is_fg = |x: usize, y: usize| data[y * cols + x] != 0;

    let mut uf = UnionFind::new(rows * cols);
    for y in 0..rows {
        for x in 0..cols {
            if !is_fg(x, y) {
                continue;
            }
            let id = y * cols + x;
            if x > 0 && is_fg(x - 1, y) {
                uf.connect(id, id - 1);
            }
            if y > 0 {
                if is_fg(x, y - 1) {
                    uf.connect(id, id - cols);
                }
                if x > 0 && is_fg(x - 1, y - 1) {
                    uf.connect(id, id - cols - 1);
                }
                if x + 1 < cols && is_fg(x + 1, y - 1) {
                    uf.connect(id, id - cols + 1);
                }
            }
        }
    }

    let mut slots = std::collections::HashMap::new();
    let mut components: Vec<Vec<(i64, i64)>> = Vec::new();
    for y in 0..rows {
        for x in 0..cols {
            if !is_fg(x, y) {
                continue;
            }
            let boundary = x == 0
                || y == 0
                || x + 1 == cols
                || y + 1 == rows
                || !is_fg(x - 1, y)
                || !is_fg(x + 1, y)
                || !is_fg(x, y - 1)
                || !is_fg(x, y + 1);
            if !boundary {
                continue;
            }
            let root = uf.get_representative(y * cols + x);
            let slot = *slots.entry(root).or_insert_with(|| {
                components.push(Vec::new());
                components.len() - 1
            });
            components[slot].push((x as i64, y as i64));
        }
    }

    components
}

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Compute the convex hull of a point set with the monotone chain algorithm.
///
/// The hull is returned without repeated endpoint, in counter-clockwise
/// order for a y-up frame (clockwise when drawn in image coordinates).
/// Collinear points are dropped.
pub fn convex_hull(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    pts.dedup();

    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<(f64, f64)> = Vec::with_capacity(2 * pts.len());
    for &p in pts.iter() {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();

    hull
}

/// Perimeter of a closed polygon.
pub fn polygon_perimeter(points: &[(f64, f64)]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let (a, b) = (points[i], points[(i + 1) % n]);
            ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt()
        })
        .sum()
}

fn distance_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return ((p.0 - a.0).powi(2) + (p.1 - a.1).powi(2)).sqrt();
    }
    cross(a, b, p).abs() / len2.sqrt()
}

fn simplify(points: &[(f64, f64)], epsilon: f64, out: &mut Vec<(f64, f64)>) {
    let (first, last) = (points[0], points[points.len() - 1]);
    let mut max_dist = 0.0;
    let mut index = 0;
    for (i, &p) in points.iter().enumerate().take(points.len() - 1).skip(1) {
        let d = distance_to_segment(p, first, last);
        if d > max_dist {
            max_dist = d;
            index = i;
        }
    }

    if max_dist > epsilon {
        simplify(&points[..=index], epsilon, out);
        simplify(&points[index..], epsilon, out);
    } else {
        out.push(first);
    }
}

/// Approximate a closed polygon with fewer vertices (Douglas-Peucker).
///
/// The curve is split at two far apart vertices which are always kept, and
/// each half is simplified so that no dropped vertex lies further than
/// `epsilon` from the approximation.
pub fn approx_poly_dp(points: &[(f64, f64)], epsilon: f64) -> Vec<(f64, f64)> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let dist2 = |a: (f64, f64), b: (f64, f64)| (a.0 - b.0).powi(2) + (a.1 - b.1).powi(2);
    let farthest_from = |p: (f64, f64)| {
        (0..n)
            .max_by(|&i, &j| dist2(points[i], p).total_cmp(&dist2(points[j], p)))
            .unwrap_or(0)
    };
    let a = farthest_from(points[0]);
    let b = farthest_from(points[a]);
    if a == b {
        return vec![points[a]];
    }

    // rotate so that the curve starts at `a`, then split at `b`
    let rotated = (0..=n).map(|i| points[(a + i) % n]).collect::<Vec<_>>();
    let split = (b + n - a) % n;

    let mut out = Vec::new();
    simplify(&rotated[..=split], epsilon, &mut out);
    simplify(&rotated[split..], epsilon, &mut out);

    out
}
