//! Full-run figure: every recorded sample, angle above and duty cycle below, written as SVG.

use std::path::Path;

use color_eyre::{Result, eyre::eyre};
use el_messages::Sample;
use plotters::{coord::Shift, prelude::*};

pub const SIZE: (u32, u32) = (1360, 768);

/// Draws `samples` into an SVG file at `path`, replacing it.
///
/// # Errors
/// Returns an error if there are no samples or the file cannot be written.
pub fn render_run(samples: &[Sample], path: &Path) -> Result<()> {
    let last = samples.last().ok_or_else(|| eyre!("Nothing to plot yet"))?;
    let time_end = f64::from(last.time_ms.max(1));

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let (upper, lower) = root.split_vertically(SIZE.1 / 2);

    let angles: Vec<(f64, f64)> = samples
        .iter()
        .map(|sample| (f64::from(sample.time_ms), f64::from(sample.angle_deg)))
        .collect();
    draw_panel(&upper, "angle [°]", angles, &BLUE, time_end)?;

    let duties: Vec<(f64, f64)> = samples
        .iter()
        .map(|sample| (f64::from(sample.time_ms), f64::from(sample.duty_percent)))
        .collect();
    draw_panel(&lower, "duty cycle [%]", duties, &BLACK, time_end)?;

    root.present()?;
    Ok(())
}

fn draw_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    y_desc: &str,
    points: Vec<(f64, f64)>,
    color: &RGBColor,
    time_end: f64,
) -> Result<()> {
    let [low, high] = y_range(&points);
    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..time_end, low..high)?;

    chart
        .configure_mesh()
        .x_desc("time [ms]")
        .y_desc(y_desc)
        .draw()?;
    chart.draw_series(LineSeries::new(points, color))?;
    Ok(())
}

/// The vertical range of a panel, padded when every point has the same value.
fn y_range(points: &[(f64, f64)]) -> [f64; 2] {
    let [low, high] = points
        .iter()
        .fold([f64::INFINITY, f64::NEG_INFINITY], |[low, high], &(_, y)| {
            [low.min(y), high.max(y)]
        });
    if low < high {
        [low, high]
    } else {
        [low - 1.0, low + 1.0]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_y_range() {
        assert_eq!(y_range(&[(0.0, -3.0), (1.0, 12.0)]), [-3.0, 12.0]);
        assert_eq!(y_range(&[(0.0, 30.0), (1.0, 30.0)]), [29.0, 31.0]);
    }

    #[test]
    fn test_render_run() {
        let path = std::env::temp_dir().join(format!("el_figure_{}.svg", std::process::id()));
        let samples: Vec<Sample> = (0..100)
            .map(|time_ms| Sample {
                angle_deg: -0.036 * time_ms as f32,
                duty_percent: 30.0,
                time_ms,
            })
            .collect();
        render_run(&samples, &path).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("polyline"));
        assert!(svg.contains("time [ms]"));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_render_nothing() {
        let path = std::env::temp_dir().join("el_figure_empty.svg");
        assert!(render_run(&[], &path).is_err());
        assert!(!path.exists());
    }
}
