use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};

use study_lens::data::aggregate::{BinStat, GroupStat, HistogramBin};
use study_lens::report::Scatter;

use crate::color::ColorMap;

const CHART_HEIGHT: f32 = 240.0;
const SCORE_BLUE: Color32 = Color32::from_rgb(0x1f, 0x77, 0xb4);
const ATTENDANCE_GREEN: Color32 = Color32::from_rgb(0x2c, 0xa0, 0x2c);

// ---------------------------------------------------------------------------
// Score distribution
// ---------------------------------------------------------------------------

pub fn score_histogram(ui: &mut Ui, bins: &[HistogramBin]) {
    let bars: Vec<Bar> = bins
        .iter()
        .map(|b| {
            let width = if b.upper > b.lower { b.upper - b.lower } else { 1.0 };
            Bar::new((b.lower + b.upper) / 2.0, b.count as f64)
                .width(width)
                .name(format!("{:.1} – {:.1}", b.lower, b.upper))
        })
        .collect();

    Plot::new("score_histogram")
        .height(CHART_HEIGHT)
        .x_axis_label("Exam score")
        .y_axis_label("Students")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(SCORE_BLUE));
        });
}

// ---------------------------------------------------------------------------
// Study hours vs score
// ---------------------------------------------------------------------------

pub fn study_scatter(ui: &mut Ui, scatter: &Scatter) {
    let points: PlotPoints = scatter.points.iter().copied().collect();

    let trend = scatter.trend.and_then(|fit| {
        let xs = scatter.points.iter().map(|p| p[0]);
        let lo = xs.clone().reduce(f64::min)?;
        let hi = xs.reduce(f64::max)?;
        Some(PlotPoints::from(vec![[lo, fit.at(lo)], [hi, fit.at(hi)]]))
    });

    Plot::new("study_vs_score")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_label("Study hours")
        .y_axis_label("Exam score")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.points(
                Points::new(points)
                    .name("students")
                    .radius(2.0)
                    .color(SCORE_BLUE),
            );
            if let Some(line) = trend {
                plot_ui.line(Line::new(line).name("trend (OLS)").color(Color32::RED).width(2.0));
            }
        });
}

// ---------------------------------------------------------------------------
// Mean score per gender
// ---------------------------------------------------------------------------

pub fn gender_bars(ui: &mut Ui, groups: &[GroupStat], colors: Option<&ColorMap>) {
    Plot::new("score_by_gender")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .y_axis_label("Mean score")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            for (i, group) in groups.iter().enumerate() {
                let color = colors.map_or(SCORE_BLUE, |c| c.color_for(&group.key));
                let label = format!("{} (n={})", group.key, group.count);
                let bar = Bar::new(i as f64, group.mean.unwrap_or(0.0))
                    .width(0.6)
                    .name(&label);
                plot_ui.bar_chart(BarChart::new(vec![bar]).name(label).color(color));
            }
        });
}

// ---------------------------------------------------------------------------
// Mean score per attendance bin
// ---------------------------------------------------------------------------

pub fn attendance_bars(ui: &mut Ui, bins: &[BinStat]) {
    let bars: Vec<Bar> = bins
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let name = match b.mean {
                Some(mean) => format!("{}%: {mean:.2} (n={})", b.label, b.count),
                None => format!("{}%: no data", b.label),
            };
            Bar::new(i as f64, b.mean.unwrap_or(0.0))
                .width(0.7)
                .name(name)
        })
        .collect();

    Plot::new("score_by_attendance")
        .height(CHART_HEIGHT)
        .x_axis_label("Attendance bin (ascending)")
        .y_axis_label("Mean score")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(ATTENDANCE_GREEN));
        });

    // Bin labels in axis order, including the empty ones.
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for b in bins {
            let text = match b.mean {
                Some(mean) => format!("{}%: {mean:.2}", b.label),
                None => format!("{}%: no data", b.label),
            };
            ui.small(text);
        }
    });
}
