//! Reading history and chart summary handlers.

use serde::Serialize;
use tabled::Tabled;

use sensorlink_core::{
    AxisBounds, ChartPoint, ChartSeries, Dashboard, DeviceId, SensorField, SensorReading,
};

use crate::cli::{GlobalOpts, ReadingsArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ReadingRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Time (UTC)")]
    time: String,
    #[tabled(rename = "Temp")]
    temperature: String,
    #[tabled(rename = "Humidity")]
    humidity: String,
    #[tabled(rename = "Pressure")]
    pressure: String,
    #[tabled(rename = "Light")]
    light: String,
    #[tabled(rename = "Motion")]
    motion: String,
    #[tabled(rename = "Distance")]
    distance: String,
}

impl From<&SensorReading> for ReadingRow {
    fn from(r: &SensorReading) -> Self {
        let cell = |field| r.raw(field).unwrap_or_default().to_owned();
        Self {
            id: r.id,
            time: util::format_timestamp(&r.timestamp),
            temperature: cell(SensorField::Temperature),
            humidity: cell(SensorField::Humidity),
            pressure: cell(SensorField::Pressure),
            light: cell(SensorField::Light),
            motion: cell(SensorField::Motion),
            distance: cell(SensorField::Distance),
        }
    }
}

/// `readings <device>`: newest first.
pub async fn list(
    dashboard: &Dashboard,
    args: &ReadingsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let readings = dashboard.readings(DeviceId(args.device), args.limit).await?;
    let out = output::render_list(
        global.output,
        &readings,
        |r| ReadingRow::from(r),
        |r| r.id.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Chart ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ChartView<'a> {
    device_id: DeviceId,
    field: Option<SensorField>,
    label: &'static str,
    unit: &'static str,
    latest: Option<f64>,
    bounds: AxisBounds,
    values: &'a [f64],
    points: &'a [ChartPoint],
    line_path: String,
    area_path: String,
}

impl<'a> ChartView<'a> {
    fn new(device_id: DeviceId, series: &'a ChartSeries) -> Self {
        Self {
            device_id,
            field: series.field,
            label: series.label(),
            unit: series.unit(),
            latest: series.latest(),
            bounds: series.bounds,
            values: &series.values,
            points: &series.points,
            line_path: series.line_path(),
            area_path: series.area_path(),
        }
    }
}

fn chart_detail(view: &ChartView<'_>) -> String {
    let Some(field) = view.field else {
        return format!("Device {}: No data", view.device_id);
    };
    let mut lines = vec![
        format!("Device:  {}", view.device_id),
        format!("Field:   {} ({field})", view.label),
        format!("Points:  {}", view.values.len()),
        format!(
            "Y axis:  {} .. {} {}",
            view.bounds.min, view.bounds.max, view.unit
        ),
    ];
    if let Some(latest) = view.latest {
        lines.push(format!("Latest:  {latest} {}", view.unit));
    }
    if let (Some(min), Some(max)) = (
        view.values.iter().copied().reduce(f64::min),
        view.values.iter().copied().reduce(f64::max),
    ) {
        lines.push(format!("Range:   {min} .. {max} {}", view.unit));
    }
    lines.push(format!("Line:    {}", view.line_path));
    lines.push(format!("Area:    {}", view.area_path));
    lines.join("\n")
}

/// `chart <device>`: chart geometry for the recent history.
pub async fn chart(
    dashboard: &Dashboard,
    args: &ReadingsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let id = DeviceId(args.device);
    let readings = dashboard.readings(id, args.limit).await?;
    let series = ChartSeries::from_readings(&readings);
    let view = ChartView::new(id, &series);

    let out = output::render_single(global.output, &view, chart_detail, |v| v.line_path.clone());
    output::print_output(&out, global.quiet);
    Ok(())
}
