use egui::{Color32, Pos2, Rect};
use serde::{Deserialize, Serialize};

/// Paint applied when a path is committed. Caps and joins are always round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: Color32,
    pub width: f32,
}

impl StrokeStyle {
    pub fn new(color: Color32, width: f32) -> Self {
        Self { color, width }
    }
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: Color32::BLACK,
            width: 18.0,
        }
    }
}

/// One element of a [`SmoothedPath`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathSegment {
    /// Starts a new sub-path without drawing
    MoveTo(Pos2),
    /// Quadratic curve from the current point through `ctrl` to `to`
    QuadTo { ctrl: Pos2, to: Pos2 },
    /// Straight line from the current point
    LineTo(Pos2),
}

impl PathSegment {
    pub fn end_point(&self) -> Pos2 {
        match *self {
            Self::MoveTo(p) | Self::LineTo(p) => p,
            Self::QuadTo { to, .. } => to,
        }
    }
}

/// Ordered path segments built during a single gesture
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmoothedPath {
    segments: Vec<PathSegment>,
}

impl SmoothedPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every segment
    pub fn reset(&mut self) {
        self.segments.clear();
    }

    pub fn move_to(&mut self, p: Pos2) {
        self.segments.push(PathSegment::MoveTo(p));
    }

    pub fn quad_to(&mut self, ctrl: Pos2, to: Pos2) {
        self.segments.push(PathSegment::QuadTo { ctrl, to });
    }

    pub fn line_to(&mut self, p: Pos2) {
        self.segments.push(PathSegment::LineTo(p));
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of segments that actually draw (everything but `MoveTo`)
    pub fn drawing_segments(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| !matches!(segment, PathSegment::MoveTo(_)))
            .count()
    }

    /// Flattens the path into polylines, one per sub-path.
    ///
    /// Curves are subdivided proportionally to their control polygon length
    /// so that consecutive points stay roughly a pixel or two apart.
    pub fn flatten(&self) -> Vec<Vec<Pos2>> {
        let mut polylines: Vec<Vec<Pos2>> = Vec::new();
        let mut current: Option<Pos2> = None;

        for segment in &self.segments {
            match *segment {
                PathSegment::MoveTo(p) => {
                    polylines.push(vec![p]);
                    current = Some(p);
                }
                PathSegment::LineTo(p) => {
                    let from = current.unwrap_or(p);
                    open_polyline(&mut polylines, from).push(p);
                    current = Some(p);
                }
                PathSegment::QuadTo { ctrl, to } => {
                    let from = current.unwrap_or(ctrl);
                    let polyline = open_polyline(&mut polylines, from);
                    let steps = quad_steps(from, ctrl, to);
                    for i in 1..=steps {
                        let t = i as f32 / steps as f32;
                        polyline.push(quad_point(from, ctrl, to, t));
                    }
                    current = Some(to);
                }
            }
        }

        polylines
    }

    /// Bounding box of the flattened path, padded by `padding`
    pub fn bounds(&self, padding: f32) -> Rect {
        let points: Vec<Pos2> = self.flatten().into_iter().flatten().collect();
        calculate_bounds(&points, padding)
    }
}

fn open_polyline(polylines: &mut Vec<Vec<Pos2>>, from: Pos2) -> &mut Vec<Pos2> {
    if polylines.is_empty() {
        polylines.push(vec![from]);
    }
    let last = polylines.len() - 1;
    &mut polylines[last]
}

fn quad_steps(from: Pos2, ctrl: Pos2, to: Pos2) -> usize {
    let polygon_len = (ctrl - from).length() + (to - ctrl).length();
    ((polygon_len / 2.0).ceil() as usize).clamp(1, 64)
}

fn quad_point(from: Pos2, ctrl: Pos2, to: Pos2, t: f32) -> Pos2 {
    let u = 1.0 - t;
    let x = u * u * from.x + 2.0 * u * t * ctrl.x + t * t * to.x;
    let y = u * u * from.y + 2.0 * u * t * ctrl.y + t * t * to.y;
    Pos2::new(x, y)
}

/// Distance from a point to a line segment
pub(crate) fn distance_to_line_segment(point: Pos2, line_start: Pos2, line_end: Pos2) -> f32 {
    let line_vec = line_end - line_start;
    let point_vec = point - line_start;

    let line_len = line_vec.length();
    if line_len == 0.0 {
        return point_vec.length();
    }

    let t = ((point_vec.x * line_vec.x + point_vec.y * line_vec.y) / line_len).clamp(0.0, line_len);
    let projection = line_start + (line_vec * t / line_len);
    (point - projection).length()
}

/// Bounding box for a set of points
pub(crate) fn calculate_bounds(points: &[Pos2], padding: f32) -> Rect {
    if points.is_empty() {
        return Rect::NOTHING;
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for point in points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }

    Rect::from_min_max(
        Pos2::new(min_x - padding, min_y - padding),
        Pos2::new(max_x + padding, max_y + padding),
    )
}
