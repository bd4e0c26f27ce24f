use crate::geometry::Point;

/// Degree of the smoothing spline; clamped down for short control chains.
const SPLINE_DEGREE: usize = 3;

/// Fit a clamped uniform B-spline through `control` and sample it at
/// `resolution` evenly spaced parameters. The exact start and end points
/// are preserved; interior control points shape the curve without being
/// interpolated.
pub fn smooth_path(control: &[Point], resolution: usize) -> Vec<Point> {
    if control.len() < 2 || resolution < 2 {
        return control.to_vec();
    }
    let degree = SPLINE_DEGREE.min(control.len() - 1);
    let knots = clamped_knots(control.len(), degree);
    (0..resolution)
        .map(|i| {
            let u = i as f32 / (resolution - 1) as f32;
            de_boor(control, degree, &knots, u)
        })
        .collect()
}

/// Clamped knot vector on [0, 1]: `degree + 1` repeats at both ends,
/// evenly spaced interior knots.
fn clamped_knots(total_control: usize, degree: usize) -> Vec<f32> {
    let interior_spans = total_control - degree;
    let mut knots = Vec::with_capacity(total_control + degree + 1);
    for _ in 0..=degree {
        knots.push(0.0);
    }
    for i in 1..interior_spans {
        knots.push(i as f32 / interior_spans as f32);
    }
    for _ in 0..=degree {
        knots.push(1.0);
    }
    knots
}

fn de_boor(control: &[Point], degree: usize, knots: &[f32], u: f32) -> Point {
    let total = control.len();
    // Knot span containing u; u == 1 falls into the last non-empty span.
    let mut span = degree;
    while span + 1 < total && knots[span + 1] <= u {
        span += 1;
    }

    let mut buffer: Vec<Point> = (0..=degree)
        .map(|j| control[j + span - degree])
        .collect();
    for r in 1..=degree {
        for j in (r..=degree).rev() {
            let left = knots[j + span - degree];
            let right = knots[j + 1 + span - r];
            let alpha = if right > left { (u - left) / (right - left) } else { 0.0 };
            buffer[j] = buffer[j - 1] * (1.0 - alpha) + buffer[j] * alpha;
        }
    }
    buffer[degree]
}

/// Resample a polyline to `total` points spaced evenly along its arc
/// length. Used to turn resolved paths into obstacle samples.
pub fn resample_path(path: &[Point], total: usize) -> Vec<Point> {
    if path.len() < 2 || total < 2 {
        return path.to_vec();
    }
    let mut cumulative = Vec::with_capacity(path.len());
    cumulative.push(0.0f32);
    for pair in path.windows(2) {
        cumulative.push(cumulative.last().unwrap() + pair[0].distance(pair[1]));
    }
    let length = *cumulative.last().unwrap();
    if length <= 0.0 {
        return vec![path[0]; total];
    }

    let mut resampled = Vec::with_capacity(total);
    let mut segment = 0;
    for i in 0..total {
        let target = length * i as f32 / (total - 1) as f32;
        while segment + 2 < path.len() && cumulative[segment + 1] < target {
            segment += 1;
        }
        let span = cumulative[segment + 1] - cumulative[segment];
        let fraction = if span > 0.0 {
            (target - cumulative[segment]) / span
        } else {
            0.0
        };
        resampled.push(path[segment].lerp(path[segment + 1], fraction.clamp(0.0, 1.0)));
    }
    resampled
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothing_preserves_endpoints() {
        let control = vec![
            Point::new(0.0, 0.0),
            Point::new(0.3, 0.8),
            Point::new(0.7, -0.2),
            Point::new(1.0, 0.5),
        ];
        let path = smooth_path(&control, 100);
        assert_eq!(path.len(), 100);
        assert!(path[0].distance(control[0]) < 1e-5);
        assert!(path[99].distance(control[3]) < 1e-5);
    }

    #[test]
    fn collinear_control_points_stay_on_the_line() {
        let control = vec![
            Point::new(0.0, 0.0),
            Point::new(0.25, 0.0),
            Point::new(0.5, 0.0),
            Point::new(0.75, 0.0),
            Point::new(1.0, 0.0),
        ];
        for point in smooth_path(&control, 50) {
            assert!(point.y.abs() < 1e-6);
            assert!((0.0..=1.0).contains(&point.x));
        }
    }

    #[test]
    fn two_control_points_give_the_straight_line() {
        let path = smooth_path(&[Point::new(0.0, 0.0), Point::new(2.0, 2.0)], 5);
        assert_eq!(path.len(), 5);
        assert!(path[2].distance(Point::new(1.0, 1.0)) < 1e-5);
    }

    #[test]
    fn resampling_spaces_points_evenly() {
        let path = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)];
        let resampled = resample_path(&path, 5);
        assert_eq!(resampled.len(), 5);
        assert!(resampled[0].distance(path[0]) < 1e-6);
        assert!(resampled[4].distance(path[2]) < 1e-6);
        // Halfway along a 2-long polyline is the corner.
        assert!(resampled[2].distance(Point::new(1.0, 0.0)) < 1e-6);
    }

    #[test]
    fn degenerate_input_passes_through() {
        let single = vec![Point::new(0.5, 0.5)];
        assert_eq!(smooth_path(&single, 10), single);
        assert_eq!(resample_path(&[], 10), Vec::<Point>::new());
    }
}
