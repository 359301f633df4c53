//! SVG outlier charts.
//!
//! IQR reports render as a horizontal boxplot with the fences drawn dashed;
//! z-score reports render as a histogram of absolute z-scores with the
//! threshold marked. All geometry is computed here; templates only place it.

use askama::Template;
use async_trait::async_trait;
use std::path::Path;

use super::{ChartSink, format_number, write_text};
use crate::Result;
use crate::error::DbQualityError;
use crate::quality::{IqrBounds, OutlierBounds, OutlierReport, ZScoreBounds, quantile};

/// Number of histogram bins for z-score charts.
pub const HISTOGRAM_BINS: usize = 30;

const TICK_COUNT: usize = 5;

/// Canvas size and inner margin, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartDimensions {
    /// Canvas width
    pub width: u32,
    /// Canvas height
    pub height: u32,
    /// Space kept free on every side for axes and labels
    pub margin: u32,
}

impl Default for ChartDimensions {
    fn default() -> Self {
        Self {
            width: 720,
            height: 320,
            margin: 48,
        }
    }
}

/// Renders outlier charts as standalone SVG documents.
#[derive(Debug, Clone, Default)]
pub struct SvgChartRenderer {
    dimensions: ChartDimensions,
}

impl SvgChartRenderer {
    /// Creates a renderer with the default canvas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the canvas size.
    pub fn with_dimensions(mut self, dimensions: ChartDimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Renders the chart matching the report's method.
    pub fn render(&self, report: &OutlierReport, values: &[f64]) -> Result<String> {
        let rendered = match &report.bounds {
            OutlierBounds::Iqr(bounds) => self.boxplot(report, bounds, values).render(),
            OutlierBounds::ZScore(bounds) => self.histogram(report, bounds).render(),
        };
        rendered.map_err(|e| DbQualityError::render(format!("chart for '{}'", report.column), e))
    }

    fn frame(&self) -> Frame {
        let d = self.dimensions;
        Frame {
            left: f64::from(d.margin),
            right: f64::from(d.width.saturating_sub(d.margin)),
            top: f64::from(d.margin),
            bottom: f64::from(d.height.saturating_sub(d.margin)),
        }
    }

    fn boxplot(&self, report: &OutlierReport, bounds: &IqrBounds, values: &[f64]) -> BoxplotTemplate {
        let frame = self.frame();
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);

        let (lo, hi) = match (sorted.first(), sorted.last()) {
            (Some(first), Some(last)) => (first.min(bounds.lower), last.max(bounds.upper)),
            _ => (bounds.lower, bounds.upper),
        };
        let scale = Scale::new(lo, hi, frame.left, frame.right);
        let mid_y = (frame.top + frame.bottom) / 2.0;
        let box_half = (frame.bottom - frame.top) / 4.0;

        // Whiskers reach the most extreme values still inside the fences
        let whisker_low = sorted
            .iter()
            .copied()
            .find(|v| *v >= bounds.lower)
            .unwrap_or(bounds.q1);
        let whisker_high = sorted
            .iter()
            .rev()
            .copied()
            .find(|v| *v <= bounds.upper)
            .unwrap_or(bounds.q3);

        BoxplotTemplate {
            title: format!("Boxplot: {}", report.column),
            width: self.dimensions.width,
            height: self.dimensions.height,
            title_x: px(f64::from(self.dimensions.width) / 2.0),
            axis: axis(&frame),
            ticks: ticks(&scale, &frame),
            has_data: !sorted.is_empty(),
            box_x: px(scale.map(bounds.q1)),
            box_y: px(mid_y - box_half),
            box_width: px((scale.map(bounds.q3) - scale.map(bounds.q1)).max(1.0)),
            box_height: px(box_half * 2.0),
            box_top: px(mid_y - box_half),
            box_bottom: px(mid_y + box_half),
            median_x: px(scale.map(quantile(&sorted, 0.5))),
            q1_x: px(scale.map(bounds.q1)),
            q3_x: px(scale.map(bounds.q3)),
            whisker_low_x: px(scale.map(whisker_low)),
            whisker_high_x: px(scale.map(whisker_high)),
            mid_y: px(mid_y),
            fence_lower_x: px(scale.map(bounds.lower)),
            fence_upper_x: px(scale.map(bounds.upper)),
            fence_top: px(frame.top),
            fence_bottom: px(frame.bottom),
            outliers: report
                .outliers
                .iter()
                .map(|o| Point {
                    x: px(scale.map(o.value)),
                    y: px(mid_y),
                })
                .collect(),
            summary: format!(
                "Q1 {}, Q3 {}, IQR {}, fences [{}, {}], {} outliers",
                format_number(bounds.q1),
                format_number(bounds.q3),
                format_number(bounds.iqr),
                format_number(bounds.lower),
                format_number(bounds.upper),
                report.outlier_count()
            ),
            summary_y: px(f64::from(self.dimensions.height) - 12.0),
        }
    }

    fn histogram(&self, report: &OutlierReport, bounds: &ZScoreBounds) -> HistogramTemplate {
        let frame = self.frame();
        let max_z = report
            .z_scores
            .iter()
            .copied()
            .filter(|z| z.is_finite())
            .fold(0.0_f64, f64::max);
        let upper = match max_z.max(bounds.threshold) * 1.05 {
            u if u > 0.0 => u,
            _ => 1.0,
        };

        let bin_width = upper / HISTOGRAM_BINS as f64;
        let mut counts = [0usize; HISTOGRAM_BINS];
        for z in report.z_scores.iter().filter(|z| z.is_finite()) {
            let bin = ((z / bin_width) as usize).min(HISTOGRAM_BINS - 1);
            counts[bin] += 1;
        }

        let scale = Scale::new(0.0, upper, frame.left, frame.right);
        let max_count = counts.iter().copied().max().unwrap_or(0).max(1) as f64;
        let plot_height = frame.bottom - frame.top;
        let bars = counts
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(bin, count)| {
                let x0 = scale.map(bin as f64 * bin_width);
                let x1 = scale.map((bin + 1) as f64 * bin_width);
                let height = plot_height * (*count as f64 / max_count);
                Bar {
                    x: px(x0),
                    y: px(frame.bottom - height),
                    width: px((x1 - x0 - 1.0).max(1.0)),
                    height: px(height),
                    count: *count,
                }
            })
            .collect();

        HistogramTemplate {
            title: format!("Z-score distribution: {}", report.column),
            width: self.dimensions.width,
            height: self.dimensions.height,
            title_x: px(f64::from(self.dimensions.width) / 2.0),
            axis: axis(&frame),
            ticks: ticks(&scale, &frame),
            bars,
            threshold_x: px(scale.map(bounds.threshold)),
            threshold_label: format!("threshold {}", format_number(bounds.threshold)),
            threshold_top: px(frame.top),
            threshold_bottom: px(frame.bottom),
            summary: format!(
                "mean {}, std {}, {} outliers",
                format_number(bounds.mean),
                format_number(bounds.std),
                report.outlier_count()
            ),
            summary_y: px(f64::from(self.dimensions.height) - 12.0),
        }
    }
}

#[async_trait]
impl ChartSink for SvgChartRenderer {
    async fn write_outlier_chart(
        &self,
        report: &OutlierReport,
        values: &[f64],
        path: &Path,
    ) -> Result<()> {
        let svg = self.render(report, values)?;
        write_text(path, &svg).await?;
        tracing::debug!("Wrote {} chart {}", report.method, path.display());
        Ok(())
    }
}

struct Frame {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

/// Linear map from data values to x pixels.
struct Scale {
    lo: f64,
    hi: f64,
    start: f64,
    end: f64,
}

impl Scale {
    fn new(lo: f64, hi: f64, start: f64, end: f64) -> Self {
        Self { lo, hi, start, end }
    }

    fn map(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return self.start;
        }
        if self.hi <= self.lo {
            return (self.start + self.end) / 2.0;
        }
        self.start + (value - self.lo) / (self.hi - self.lo) * (self.end - self.start)
    }
}

struct Axis {
    x1: String,
    x2: String,
    y: String,
}

struct Tick {
    x: String,
    y1: String,
    y2: String,
    label_y: String,
    label: String,
}

struct Point {
    x: String,
    y: String,
}

struct Bar {
    x: String,
    y: String,
    width: String,
    height: String,
    count: usize,
}

fn axis(frame: &Frame) -> Axis {
    Axis {
        x1: px(frame.left),
        x2: px(frame.right),
        y: px(frame.bottom),
    }
}

fn ticks(scale: &Scale, frame: &Frame) -> Vec<Tick> {
    let points = if scale.hi > scale.lo { TICK_COUNT } else { 1 };
    (0..points)
        .map(|i| {
            let value = if points == 1 {
                scale.lo
            } else {
                scale.lo + (scale.hi - scale.lo) * i as f64 / (points - 1) as f64
            };
            Tick {
                x: px(scale.map(value)),
                y1: px(frame.bottom),
                y2: px(frame.bottom + 5.0),
                label_y: px(frame.bottom + 18.0),
                label: format_number(value),
            }
        })
        .collect()
}

fn px(value: f64) -> String {
    format!("{:.1}", value)
}

#[derive(Template)]
#[template(path = "boxplot.svg")]
struct BoxplotTemplate {
    title: String,
    width: u32,
    height: u32,
    title_x: String,
    axis: Axis,
    ticks: Vec<Tick>,
    has_data: bool,
    box_x: String,
    box_y: String,
    box_width: String,
    box_height: String,
    box_top: String,
    box_bottom: String,
    median_x: String,
    q1_x: String,
    q3_x: String,
    whisker_low_x: String,
    whisker_high_x: String,
    mid_y: String,
    fence_lower_x: String,
    fence_upper_x: String,
    fence_top: String,
    fence_bottom: String,
    outliers: Vec<Point>,
    summary: String,
    summary_y: String,
}

#[derive(Template)]
#[template(path = "histogram.svg")]
struct HistogramTemplate {
    title: String,
    width: u32,
    height: u32,
    title_x: String,
    axis: Axis,
    ticks: Vec<Tick>,
    bars: Vec<Bar>,
    threshold_x: String,
    threshold_label: String,
    threshold_top: String,
    threshold_bottom: String,
    summary: String,
    summary_y: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellValue, Column};
    use crate::quality::{OutlierMethod, detect_outliers};

    fn column(values: &[i64]) -> Column {
        Column::new("age", values.iter().map(|v| CellValue::Integer(*v)).collect())
    }

    fn values(values: &[i64]) -> Vec<f64> {
        values.iter().map(|v| *v as f64).collect()
    }

    #[test]
    fn test_boxplot_marks_outliers() {
        let data = [20, 21, 22, 23, 1000];
        let report = detect_outliers(&column(&data), OutlierMethod::Iqr, 1.5).unwrap();
        let svg = SvgChartRenderer::new().render(&report, &values(&data)).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Boxplot: age"));
        assert_eq!(svg.matches("class=\"outlier\"").count(), 1);
        assert!(svg.contains("1 outliers"));
    }

    #[test]
    fn test_histogram_has_threshold_line() {
        let data = [1, 2, 2, 3, 3, 3, 4, 4, 5, 40];
        let report = detect_outliers(&column(&data), OutlierMethod::ZScore, 2.0).unwrap();
        let svg = SvgChartRenderer::new().render(&report, &values(&data)).unwrap();

        assert!(svg.contains("Z-score distribution: age"));
        assert!(svg.contains("class=\"threshold\""));
        assert!(svg.contains("threshold 2"));
        let bars = svg.matches("class=\"bar\"").count();
        assert!((2..=HISTOGRAM_BINS).contains(&bars));
    }

    #[test]
    fn test_empty_column_renders() {
        let empty = Column::with_kind("age", crate::models::DataKind::Numeric, vec![CellValue::Null]);
        for method in [OutlierMethod::Iqr, OutlierMethod::ZScore] {
            let report = detect_outliers(&empty, method, 1.5).unwrap();
            let svg = SvgChartRenderer::new().render(&report, &[]).unwrap();
            assert!(svg.contains("</svg>"), "{}", method);
        }
    }

    #[test]
    fn test_scale_degenerate_range() {
        let scale = Scale::new(5.0, 5.0, 0.0, 100.0);
        assert_eq!(scale.map(5.0), 50.0);
        let scale = Scale::new(0.0, 10.0, 0.0, 100.0);
        assert_eq!(scale.map(2.5), 25.0);
    }

    #[tokio::test]
    async fn test_write_outlier_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.svg");
        let data = [1, 2, 3];
        let report = detect_outliers(&column(&data), OutlierMethod::Iqr, 1.5).unwrap();
        SvgChartRenderer::new()
            .write_outlier_chart(&report, &values(&data), &path)
            .await
            .unwrap();
        assert!(path.exists());
    }
}
