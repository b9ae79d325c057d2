// ── Presentation adapter ──
//
// Turns a newest-first reading history into a chartable series: pick the
// field to show, pull it out oldest-first, pad the axis, and lay the
// points out for rendering.

mod geometry;

use sensorlink_api::{SensorField, SensorReading};
use serde::Serialize;

pub use geometry::{CHART_HEIGHT, CHART_WIDTH, ChartPoint, chart_points, smooth_area_path, smooth_path};

/// Fields considered for charting, most preferred first.
pub const FIELD_PRIORITY: [SensorField; 5] = [
    SensorField::Distance,
    SensorField::Temperature,
    SensorField::Humidity,
    SensorField::Light,
    SensorField::Pressure,
];

/// Axis used when there is nothing to plot.
pub const EMPTY_BOUNDS: AxisBounds = AxisBounds { min: 0.0, max: 50.0 };

const AXIS_PADDING: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

impl AxisBounds {
    /// Width of the range, never zero.
    pub fn span(self) -> f64 {
        let span = self.max - self.min;
        if span.abs() < f64::EPSILON { 1.0 } else { span }
    }
}

/// The smallest or largest value of a series and where it is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extreme {
    pub value: f64,
    pub index: usize,
    pub point: ChartPoint,
}

/// Field chosen for display: the first priority field set on the most
/// recent reading that has any of them.
pub fn select_field<'a>(readings: impl IntoIterator<Item = &'a SensorReading>) -> Option<SensorField> {
    readings.into_iter().find_map(|reading| {
        FIELD_PRIORITY
            .iter()
            .copied()
            .find(|&field| reading.value(field).is_some())
    })
}

/// Values of `field` across newest-first `readings`, returned oldest-first.
/// Readings without the field are skipped, not zeroed.
pub fn extract_series<'a>(
    readings: impl IntoIterator<Item = &'a SensorReading>,
    field: SensorField,
) -> Vec<f64> {
    let mut values: Vec<f64> = readings
        .into_iter()
        .filter_map(|reading| reading.value(field))
        .collect();
    values.reverse();
    values
}

/// `floor(min) - 2 ..= ceil(max) + 2`, or [`EMPTY_BOUNDS`].
pub fn axis_bounds(values: &[f64]) -> AxisBounds {
    let Some(&first) = values.first() else {
        return EMPTY_BOUNDS;
    };
    let (lo, hi) = values
        .iter()
        .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    AxisBounds {
        min: lo.floor() - AXIS_PADDING,
        max: hi.ceil() + AXIS_PADDING,
    }
}

/// Display unit for a field.
pub fn unit(field: SensorField) -> &'static str {
    match field {
        SensorField::Distance => "cm",
        SensorField::Temperature => "°C",
        SensorField::Humidity => "%",
        SensorField::Light => "lx",
        SensorField::Pressure => "hPa",
        SensorField::Motion | SensorField::CustomData => "",
    }
}

/// Human label for a field.
pub fn label(field: SensorField) -> &'static str {
    match field {
        SensorField::Distance => "Distance",
        SensorField::Temperature => "Temperature",
        SensorField::Humidity => "Humidity",
        SensorField::Light => "Light",
        SensorField::Pressure => "Pressure",
        SensorField::Motion => "Motion",
        SensorField::CustomData => "Custom data",
    }
}

/// A render-ready chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    /// `None` when no reading carries a chartable field.
    pub field: Option<SensorField>,
    /// Oldest first.
    pub values: Vec<f64>,
    pub bounds: AxisBounds,
    pub points: Vec<ChartPoint>,
}

impl Default for ChartSeries {
    fn default() -> Self {
        Self {
            field: None,
            values: Vec::new(),
            bounds: EMPTY_BOUNDS,
            points: Vec::new(),
        }
    }
}

impl ChartSeries {
    /// Build from newest-first readings.
    pub fn from_readings<'a, I>(readings: I) -> Self
    where
        I: IntoIterator<Item = &'a SensorReading>,
        I::IntoIter: Clone,
    {
        let readings = readings.into_iter();
        let Some(field) = select_field(readings.clone()) else {
            return Self::default();
        };
        let values = extract_series(readings, field);
        let bounds = axis_bounds(&values);
        let points = chart_points(&values, bounds);
        Self {
            field: Some(field),
            values,
            bounds,
            points,
        }
    }

    /// True when there is nothing to plot ("no data").
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn unit(&self) -> &'static str {
        self.field.map_or("", unit)
    }

    pub fn label(&self) -> &'static str {
        self.field.map_or("No data", label)
    }

    pub fn line_path(&self) -> String {
        smooth_path(&self.points)
    }

    pub fn area_path(&self) -> String {
        smooth_area_path(&self.points)
    }

    /// Most recent value (the right-hand end of the chart).
    pub fn latest(&self) -> Option<f64> {
        self.values.last().copied()
    }

    /// Lowest and highest values, first occurrence of each.
    pub fn extremes(&self) -> Option<(Extreme, Extreme)> {
        let first = *self.values.first()?;
        let (mut min_at, mut max_at) = (0, 0);
        let (mut min, mut max) = (first, first);
        for (i, &v) in self.values.iter().enumerate().skip(1) {
            if v < min {
                min = v;
                min_at = i;
            }
            if v > max {
                max = v;
                max_at = i;
            }
        }
        let point = |i: usize| self.points.get(i).copied();
        Some((
            Extreme {
                value: min,
                index: min_at,
                point: point(min_at)?,
            },
            Extreme {
                value: max,
                index: max_at,
                point: point(max_at)?,
            },
        ))
    }
}
