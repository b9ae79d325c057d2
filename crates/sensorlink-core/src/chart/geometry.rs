// Chart geometry
//
// Points live in a 100x100 box with y growing downwards, so larger values
// plot higher. Paths are SVG path data.

use std::fmt::Write as _;

use serde::Serialize;

use super::AxisBounds;

pub const CHART_WIDTH: f64 = 100.0;
pub const CHART_HEIGHT: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: f64,
    pub y: f64,
}

/// Map an oldest-first series onto the chart box. Values outside `bounds`
/// are clamped; a single value sits at `x = 0`.
pub fn chart_points(values: &[f64], bounds: AxisBounds) -> Vec<ChartPoint> {
    if values.is_empty() {
        return Vec::new();
    }

    let span = bounds.span();
    let last = values.len() - 1;

    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let x = if last == 0 {
                0.0
            } else {
                index_to_f64(i) / index_to_f64(last) * CHART_WIDTH
            };
            let clamped = value.clamp(bounds.min, bounds.max);
            let y = CHART_HEIGHT - ((clamped - bounds.min) / span) * CHART_HEIGHT;
            ChartPoint { x, y }
        })
        .collect()
}

/// Catmull-Rom style cubic path through `points`. Empty below two points.
pub fn smooth_path(points: &[ChartPoint]) -> String {
    let Some(first) = points.first() else {
        return String::new();
    };
    if points.len() < 2 {
        return String::new();
    }

    let mut d = format!("M {},{}", first.x, first.y);
    for (i, pair) in points.windows(2).enumerate() {
        let (p1, p2) = (pair[0], pair[1]);
        let p0 = i.checked_sub(1).and_then(|j| points.get(j)).copied().unwrap_or(p1);
        let p3 = points.get(i + 2).copied().unwrap_or(p2);

        let cp1x = p1.x + (p2.x - p0.x) / 6.0;
        let cp1y = p1.y + (p2.y - p0.y) / 6.0;
        let cp2x = p2.x - (p3.x - p1.x) / 6.0;
        let cp2y = p2.y - (p3.y - p1.y) / 6.0;
        let _ = write!(d, " C {cp1x},{cp1y} {cp2x},{cp2y} {},{}", p2.x, p2.y);
    }
    d
}

/// `smooth_path` closed down to the chart floor, for area fills.
pub fn smooth_area_path(points: &[ChartPoint]) -> String {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return String::new();
    };
    if points.len() < 2 {
        return String::new();
    }
    format!(
        "{} L {},{CHART_HEIGHT} L {},{CHART_HEIGHT} Z",
        smooth_path(points),
        last.x,
        first.x
    )
}

fn index_to_f64(i: usize) -> f64 {
    f64::from(u32::try_from(i).unwrap_or(u32::MAX))
}
