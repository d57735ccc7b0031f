use std::{collections::HashSet, path::Path};

use plotters::{
    prelude::*,
    style::{register_font, FontStyle},
};

use crate::{
    error::{Error, Result},
    series::BenchmarkSeries,
};

const LINE_COLOR: RGBColor = RGBColor(52, 152, 219);
const FAILED_COLOR: RGBColor = RGBColor(231, 76, 60);
const SKIPPED_COLOR: RGBColor = RGBColor(230, 160, 0);

pub const CHART_EXTENSION: &str = "jpg";

lazy_static! {
    // Bitmap charts rasterize their own text, so they cannot rely on system fonts.
    static ref FONT_REGISTERED: bool = register_font(
        "sans-serif",
        FontStyle::Normal,
        include_bytes!("../assets/DejaVuSans.ttf"),
    )
    .is_ok();
}

/// Chart file names for `benchmarks`, in the same order and never shared between two names.
///
/// Characters that are unsafe in a path or a relative link become `_`. A name that collides
/// with an earlier one gets a numeric suffix.
pub fn chart_file_names<'a, I>(benchmarks: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut taken = HashSet::new();
    benchmarks
        .into_iter()
        .map(|benchmark| {
            let stem = link_safe(benchmark);
            let mut file_name = format!("{}.{}", stem, CHART_EXTENSION);
            let mut suffix = 2;
            while !taken.insert(file_name.clone()) {
                file_name = format!("{}_{}.{}", stem, suffix, CHART_EXTENSION);
                suffix += 1;
            }
            file_name
        })
        .collect()
}

/// `name` with every character that needs escaping in a path, a URL or HTML replaced by `_`.
pub fn link_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' | ':' => c,
            _ => '_',
        })
        .collect()
}

/// Draws the run-by-run line chart of `series` into `output`, shading failed and skipped runs.
pub fn draw_series_chart(series: &BenchmarkSeries, output: &Path) -> Result<()> {
    draw(series, output).map_err(|e| Error::Plot {
        path: output.to_path_buf(),
        message: e.to_string(),
    })
}

fn draw(
    series: &BenchmarkSeries,
    output: &Path,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    if !*FONT_REGISTERED {
        return Err("the embedded chart font could not be loaded".into());
    }
    let runs = series.values.len().max(1) as f64;
    let (y_lo, y_hi) = y_bounds(&series.values);

    let root = BitMapBackend::new(output, (900, 480)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(&series.name, ("sans-serif", 18))
        .margin(14)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5f64..runs - 0.5, y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("Run")
        .y_desc("Duration (s)")
        .x_label_formatter(&|x| format!("{}", x.round() as i64))
        .draw()?;

    let bands = series
        .failed
        .iter()
        .map(|range| (range, FAILED_COLOR.mix(0.2)))
        .chain(series.skipped.iter().map(|range| (range, SKIPPED_COLOR.mix(0.3))));
    for (&(start, end), color) in bands {
        chart.draw_series(std::iter::once(Rectangle::new(
            [(start as f64 - 0.5, y_lo), (end as f64 + 0.5, y_hi)],
            color.filled(),
        )))?;
    }

    for segment in segments(&series.values) {
        chart.draw_series(LineSeries::new(segment.clone(), LINE_COLOR.stroke_width(2)))?;
        chart.draw_series(
            segment
                .into_iter()
                .map(|point| Circle::new(point, 3, LINE_COLOR.filled())),
        )?;
    }

    root.present()?;
    Ok(())
}

/// Splits the numeric values into runs of consecutive points so gaps break the line.
fn segments(values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut out: Vec<Vec<(f64, f64)>> = vec![];
    let mut current = vec![];
    for (i, value) in values.iter().enumerate() {
        match value {
            Some(v) => current.push((i as f64, *v)),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn y_bounds(values: &[Option<f64>]) -> (f64, f64) {
    let numbers = values.iter().flatten().copied();
    let (lo, hi) = numbers.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !lo.is_finite() || !hi.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if hi > lo {
        (hi - lo) * 0.1
    } else {
        (hi.abs() * 0.1).max(1e-3)
    };
    (lo - pad, hi + pad)
}
