//! Small geometric helpers shared by the resolver and the board mapper.

/// Euclidean distance between two points.
pub(crate) fn distance(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = ax - bx;
    let dy = ay - by;
    (dx * dx + dy * dy).sqrt()
}

/// Area of the intersection of two axis-aligned boxes given as `(x, y, w, h)`.
pub(crate) fn intersection_area(
    a: (usize, usize, usize, usize),
    b: (usize, usize, usize, usize),
) -> usize {
    let x0 = a.0.max(b.0);
    let y0 = a.1.max(b.1);
    let x1 = (a.0 + a.2).min(b.0 + b.2);
    let y1 = (a.1 + a.3).min(b.1 + b.3);
    if x1 <= x0 || y1 <= y0 {
        return 0;
    }
    (x1 - x0) * (y1 - y0)
}

/// Linearly spaced samples over `[start, end]`, both ends included.
pub(crate) fn linspace(start: f32, end: f32, steps: usize) -> Vec<f32> {
    match steps {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (steps - 1) as f32;
            (0..steps).map(|i| start + step * i as f32).collect()
        }
    }
}
