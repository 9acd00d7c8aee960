// SPDX: CC0-1.0

use crate::{expr::Expr, Number, Point, Viewport};

/// Connected run of canvas points with strictly increasing x.
pub type Polyline = Vec<Point<Number>>;

/// Sample spacing limits, in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleOptions {
    /// Intervals this narrow are never split.
    pub min_sample: Number,
    /// Intervals wider than this are always split.
    pub max_sample: Number,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            min_sample: 0.001,
            max_sample: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Visibility {
    Visible,
    /// Finite, but above or below the canvas.
    OffScreen,
    Absent,
}

#[derive(Debug, Default)]
struct Figures {
    current: Polyline,
    done: Vec<Polyline>,
}

impl Figures {
    fn push(&mut self, p: Point<Number>) {
        if self.current.last().is_some_and(|last| p.x <= last.x) {
            return;
        }
        self.current.push(p);
    }

    fn end(&mut self) {
        if self.current.len() >= 2 {
            self.done.push(core::mem::take(&mut self.current));
        } else {
            self.current.clear();
        }
    }
}

/// Walks the canvas from left to right, bisecting where the curve needs more
/// detail.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurveSampler {
    pub viewport: Viewport,
    pub options: SampleOptions,
}

impl CurveSampler {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            options: SampleOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SampleOptions) -> Self {
        self.options = options;
        self
    }

    /// Samples `y = f(x)`, where `f` maps logical x to logical y.
    pub fn sample<F: Fn(Number) -> Number>(&self, f: F) -> Vec<Polyline> {
        let width = self.viewport.width;
        if !(width > 0.0) {
            return Vec::new();
        }
        let mut figures = Figures::default();
        let left = self.point(&f, 0.0);
        let right = self.point(&f, width);
        self.subdivide(&f, left, right, &mut figures);
        figures.end();
        figures.done
    }

    fn point<F: Fn(Number) -> Number>(&self, f: &F, x: Number) -> Point<Number> {
        let Viewport { scale, origin, .. } = self.viewport;
        Point {
            x,
            y: f((x - origin.x) / scale) * -scale + origin.y,
        }
    }

    fn subdivide<F: Fn(Number) -> Number>(
        &self,
        f: &F,
        left: Point<Number>,
        right: Point<Number>,
        figures: &mut Figures,
    ) {
        if self.should_split(left, right) {
            let mid = self.point(f, (left.x + right.x) * 0.5);
            self.subdivide(f, left, mid, figures);
            self.subdivide(f, mid, right, figures);
        } else {
            self.emit(left, right, figures);
        }
    }

    fn should_split(&self, left: Point<Number>, right: Point<Number>) -> bool {
        let SampleOptions {
            min_sample,
            max_sample,
        } = self.options;
        let dx = right.x - left.x;
        if dx <= min_sample {
            return false;
        }
        if dx > max_sample {
            return true;
        }
        match (left.y.is_finite(), right.y.is_finite()) {
            (true, true) => {
                let slope = ((right.y - left.y) / dx).abs();
                let spacing = if slope < 1.0 {
                    max_sample
                } else {
                    (max_sample / slope).max(min_sample)
                };
                dx > spacing
            }
            // straddles the edge of the curve's domain
            (true, false) | (false, true) => true,
            (false, false) => false,
        }
    }

    fn visibility(&self, p: Point<Number>) -> Visibility {
        if !p.y.is_finite() {
            Visibility::Absent
        } else if (0.0..=self.viewport.height).contains(&p.y) {
            Visibility::Visible
        } else {
            Visibility::OffScreen
        }
    }

    fn emit(&self, left: Point<Number>, right: Point<Number>, figures: &mut Figures) {
        use Visibility::*;
        match (self.visibility(left), self.visibility(right)) {
            (Visible, Visible) | (Visible, OffScreen) | (OffScreen, Visible) => {
                figures.push(left);
                figures.push(right);
            }
            (Visible, Absent) => {
                figures.push(left);
                figures.end();
            }
            (Absent, Visible) => {
                figures.end();
                figures.push(right);
            }
            _ => figures.end(),
        }
    }
}

/// Samples a formula of one variable across the viewport.
#[tracing::instrument(skip_all, fields(viewport = %viewport))]
pub fn sample(expr: &Expr, viewport: &Viewport) -> Vec<Polyline> {
    let lines = CurveSampler::new(*viewport).sample(|x| expr.eval(&[x]));
    tracing::debug!(
        polylines = lines.len(),
        points = lines.iter().map(Vec::len).sum::<usize>(),
        "sampled curve"
    );
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(scale: Number, origin: (Number, Number), size: (Number, Number)) -> Viewport {
        Viewport {
            scale,
            origin: Point {
                x: origin.0,
                y: origin.1,
            },
            width: size.0,
            height: size.1,
        }
    }

    fn assert_increasing(lines: &[Polyline]) {
        for line in lines {
            assert!(line.len() >= 2);
            for pair in line.windows(2) {
                assert!(pair[0].x < pair[1].x, "{pair:?}");
            }
        }
        for pair in lines.windows(2) {
            let (Some(end), Some(start)) = (pair[0].last(), pair[1].first()) else {
                unreachable!()
            };
            assert!(end.x < start.x);
        }
    }

    #[test]
    fn reciprocal_breaks_at_asymptote() {
        let vp = view(50.0, (100.0, 100.0), (200.0, 200.0));
        let lines = CurveSampler::new(vp).sample(|x| 1.0 / x);
        assert!(lines.len() >= 2, "{} polylines", lines.len());
        assert_increasing(&lines);

        let visible = |p: &Point<Number>| (0.0..=vp.height).contains(&p.y);
        for line in &lines {
            assert!(line.iter().all(|p| p.y.is_finite()));
            for (idx, p) in line.iter().enumerate() {
                if visible(p) {
                    continue;
                }
                let prev = idx.checked_sub(1).and_then(|i| line.get(i));
                let next = line.get(idx + 1);
                assert!(
                    prev.is_some_and(visible) || next.is_some_and(visible),
                    "off-screen point {p:?} has no visible neighbor"
                );
            }
        }

        // no polyline crosses the asymptote at canvas x = 100
        for line in &lines {
            let (Some(first), Some(last)) = (line.first(), line.last()) else {
                unreachable!()
            };
            assert!(last.x <= 100.0 || first.x >= 100.0);
        }
    }

    #[test]
    fn identity_is_one_coarse_polyline() {
        // power of two scale keeps the canvas slope exactly 1
        let vp = view(64.0, (64.0, 100.0), (128.0, 200.0));
        let lines = CurveSampler::new(vp).sample(|x| x);
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert_eq!(line.len(), 129);
        assert_eq!(line.first().map(|p| p.x), Some(0.0));
        assert_eq!(line.last().map(|p| p.x), Some(128.0));
        for pair in line.windows(2) {
            assert!(pair[1].x - pair[0].x >= 1.0);
        }
    }

    #[test]
    fn shallow_curve_is_sampled_at_max_spacing() {
        let vp = view(50.0, (50.0, 50.0), (100.0, 100.0));
        let options = SampleOptions {
            min_sample: 0.001,
            max_sample: 4.0,
        };
        let lines = CurveSampler::new(vp)
            .with_options(options)
            .sample(|x| x * 0.25);
        assert_eq!(lines.len(), 1);
        for pair in lines[0].windows(2) {
            assert!(pair[1].x - pair[0].x >= 2.0);
        }
    }

    #[test]
    fn tangent_has_a_polyline_per_branch() {
        let vp = view(50.0, (200.0, 100.0), (400.0, 200.0));
        let lines = CurveSampler::new(vp).sample(Number::tan);
        // asymptotes at -pi/2 and pi/2
        assert!(lines.len() >= 3, "{} polylines", lines.len());
        assert_increasing(&lines);
    }

    #[test]
    fn domain_edge_is_localized() {
        let vp = view(50.0, (100.0, 100.0), (200.0, 200.0));
        let lines = CurveSampler::new(vp).sample(Number::sqrt);
        assert_eq!(lines.len(), 1);
        let Some(first) = lines[0].first() else {
            unreachable!()
        };
        assert!((100.0..100.01).contains(&first.x), "{first:?}");
        assert_eq!(lines[0].last().map(|p| p.x), Some(200.0));
    }

    #[test]
    fn steep_dip_between_off_screen_samples_is_found() {
        let vp = Viewport::centered(50.0, 200.0, 200.0);
        // both coarse samples around the vertex lie above the canvas
        let lines = CurveSampler::new(vp).sample(|x| 2000.0 * (x - 0.0039).abs());
        assert_eq!(lines.len(), 1);
        let visible: Vec<_> = lines[0]
            .iter()
            .filter(|p| (0.0..=vp.height).contains(&p.y))
            .collect();
        assert!(!visible.is_empty());
        let vertex_x = vp.to_canvas(Point { x: 0.0039, y: 0.0 }).x;
        assert!(visible.iter().all(|p| (p.x - vertex_x).abs() < 0.1));
        assert_increasing(&lines);
    }

    #[test]
    fn absent_curve_yields_nothing() {
        let vp = view(50.0, (100.0, 100.0), (200.0, 200.0));
        assert!(CurveSampler::new(vp).sample(|_| Number::NAN).is_empty());
        // entirely above the canvas
        assert!(CurveSampler::new(vp).sample(|_| 100.0).is_empty());
    }

    #[test]
    fn empty_canvas_yields_nothing() {
        let vp = view(50.0, (0.0, 0.0), (0.0, 100.0));
        assert!(CurveSampler::new(vp).sample(|x| x).is_empty());
        let vp = view(50.0, (0.0, 0.0), (-5.0, 100.0));
        assert!(CurveSampler::new(vp).sample(|x| x).is_empty());
    }

    #[test]
    fn expression_entry_point() {
        let vp = Viewport::centered(50.0, 200.0, 200.0);
        let expr = Expr::var(0);
        let lines = sample(&expr, &vp);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].first().map(|p| p.x), Some(0.0));
    }
}
