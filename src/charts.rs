use std::path::{Path, PathBuf};

use plotters::{element::Pie, prelude::*};
use tracing::debug;

use crate::{
    error::AppResult,
    report::{ChartKind, Series},
};

const PALETTE: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
];

const PURPLE: RGBColor = RGBColor(128, 0, 128);

/// Renders `<dir>/<slug>.svg`. Returns `None` for series with nothing to draw.
pub fn render(dir: &Path, series: &Series) -> AppResult<Option<PathBuf>> {
    if series.is_empty() || series.values.iter().all(|v| *v <= 0.0) {
        debug!(chart = series.slug, "nothing to chart");
        return Ok(None);
    }

    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.svg", series.slug));

    match series.kind {
        ChartKind::Bar => draw_bars(&path, series, bar_color(series.slug), 5)?,
        ChartKind::Histogram => draw_bars(&path, series, PALETTE[0], 0)?,
        ChartKind::Pie => draw_pie(&path, series)?,
    }

    debug!(path = %path.display(), "rendered chart");
    Ok(Some(path))
}

fn bar_color(slug: &str) -> RGBColor {
    match slug {
        "omdb_movies_per_year" => BLUE,
        "tmdb_movies_per_language" => GREEN,
        "tmdb_movies_per_genre" => PURPLE,
        _ => PALETTE[1],
    }
}

fn draw_bars(path: &Path, series: &Series, color: RGBColor, gap: u32) -> anyhow::Result<()> {
    let root = SVGBackend::new(path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let n = series.labels.len() as u32;
    let values = series.chart_values();
    let max = values.iter().copied().fold(0.0_f64, f64::max);

    let mut chart = ChartBuilder::on(&root)
        .caption(&series.title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(140)
        .y_label_area_size(70)
        .build_cartesian_2d((0u32..n).into_segmented(), 0f64..max * 1.1)?;

    let labels = &series.labels;
    let label_for = |v: &SegmentValue<u32>| match v {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
            labels.get(*i as usize).cloned().unwrap_or_default()
        },
        SegmentValue::Last => String::new(),
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(series.x_label.as_str())
        .y_desc(series.y_label.as_str())
        .x_labels(labels.len())
        .x_label_formatter(&label_for)
        .x_label_style(("sans-serif", 12).into_font().transform(FontTransform::Rotate90))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(color.filled())
            .margin(gap)
            .data(values.iter().enumerate().map(|(i, v)| (i as u32, *v))),
    )?;

    root.present()?;
    Ok(())
}

fn draw_pie(path: &Path, series: &Series) -> anyhow::Result<()> {
    let root = SVGBackend::new(path, (800, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let area = root.titled(&series.title, ("sans-serif", 24))?;

    let (width, height) = area.dim_in_pixel();
    let center = (width as i32 / 2, height as i32 / 2);
    let radius = f64::from(width.min(height)) * 0.35;
    let colors: Vec<RGBColor> =
        (0..series.values.len()).map(|i| PALETTE[i % PALETTE.len()]).collect();

    let pie = Pie::new(&center, &radius, &series.values, &colors, &series.labels);
    area.draw(&pie)?;

    root.present()?;
    Ok(())
}
