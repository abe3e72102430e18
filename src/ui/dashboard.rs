use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use study_lens::data::aggregate::{CorrelationStrength, Metric};
use study_lens::data::ranking::Selection;
use study_lens::report::Correlation;
use study_lens::Session;

use crate::state::AppState;
use crate::ui::plot;

/// Render a metric with `decimals` places, or the reason it has no value.
fn fmt_metric(metric: Metric, decimals: usize, suffix: &str) -> String {
    match metric {
        Metric::Value(v) => format!("{v:.decimals$}{suffix}"),
        Metric::NoData => "no data".to_string(),
        Metric::Unavailable => "n/a".to_string(),
    }
}

fn kpi_card(ui: &mut Ui, title: &str, value: String, note: Option<String>) {
    ui.group(|ui: &mut Ui| {
        ui.set_min_width(170.0);
        ui.vertical(|ui: &mut Ui| {
            ui.label(title);
            ui.label(RichText::new(value).size(22.0).strong());
            if let Some(note) = note {
                ui.small(note);
            }
        });
    });
}

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

pub fn dashboard(ui: &mut Ui, state: &AppState) {
    let Some(overview) = &state.overview else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a student CSV to begin  (File → Open…)");
        });
        return;
    };

    // ---- Whole-table overview ----
    ui.horizontal_wrapped(|ui: &mut Ui| {
        kpi_card(ui, "Rows", overview.rows.to_string(), None);
        kpi_card(ui, "Columns", overview.columns.to_string(), None);
        kpi_card(ui, "Mean score", fmt_metric(overview.mean_score, 2, ""), None);
        kpi_card(ui, "Max score", fmt_metric(overview.max_score, 2, ""), None);
    });
    ui.separator();

    let Some(report) = &state.report else {
        ui.label("No results for this dataset.");
        return;
    };

    // ---- KPIs ----
    ui.heading("Key performance indicators");
    if report.is_empty() {
        ui.colored_label(
            egui::Color32::YELLOW,
            "No student matches the current filters.",
        );
    }
    // The session keeps the config it was resolved with.
    let config = state.session.as_ref().map_or(&state.config, Session::config);
    let threshold = config.success_threshold;
    ui.horizontal_wrapped(|ui: &mut Ui| {
        let kpis = &report.kpis;
        kpi_card(
            ui,
            "Mean exam score",
            fmt_metric(kpis.mean_score, 2, ""),
            kpis.score_delta_vs_global
                .value()
                .map(|d| format!("{d:+.2} vs global")),
        );
        kpi_card(
            ui,
            "Success rate",
            fmt_metric(kpis.success_rate, 1, "%"),
            Some(format!("score >= {threshold}")),
        );
        kpi_card(
            ui,
            "Mean study hours",
            fmt_metric(kpis.mean_study_hours, 2, "h"),
            None,
        );
        kpi_card(
            ui,
            "Mean attendance",
            fmt_metric(kpis.mean_attendance, 1, "%"),
            None,
        );
    });
    ui.separator();

    // ---- Charts ----
    ui.heading("Score distribution");
    plot::score_histogram(ui, &report.score_histogram);

    ui.columns(2, |cols| {
        cols[0].heading("Study hours vs score");
        plot::study_scatter(&mut cols[0], &report.study_vs_score);

        cols[1].heading("Mean score by gender");
        plot::gender_bars(&mut cols[1], &report.by_gender, state.gender_colors.as_ref());
    });

    if let Some(bins) = &report.by_attendance {
        ui.heading("Attendance vs score");
        plot::attendance_bars(ui, bins);
    }
    ui.separator();

    // ---- Insights ----
    ui.columns(2, |cols| {
        cols[0].heading(format!("Top {} students", config.top_n));
        selection_grid(&mut cols[0], "top_performers", &report.top_performers);

        cols[1].heading("Correlation: study hours and score");
        correlation_panel(&mut cols[1], &report.correlation);
    });
    ui.separator();

    // ---- Full filtered table ----
    egui::CollapsingHeader::new(format!("Filtered rows ({})", state.extract.len()))
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            filtered_table(ui, &state.extract);
        });
}

fn correlation_panel(ui: &mut Ui, correlation: &Correlation) {
    match correlation {
        Correlation::Coefficient { r, strength } => {
            ui.label(RichText::new(format!("r = {r:.3}")).size(22.0).strong());
            let (color, text) = match strength {
                CorrelationStrength::StrongPositive => (
                    egui::Color32::GREEN,
                    "Strong positive correlation: more study, better scores",
                ),
                CorrelationStrength::ModeratePositive => {
                    (egui::Color32::LIGHT_BLUE, "Moderate positive correlation")
                }
                CorrelationStrength::Weak => (egui::Color32::YELLOW, "Weak correlation"),
            };
            ui.colored_label(color, text);
        }
        Correlation::InsufficientData { pairs } => {
            ui.label(format!(
                "Not enough data for a correlation ({pairs} matching row(s))."
            ));
        }
    }
}

fn selection_grid(ui: &mut Ui, id: &str, selection: &Selection) {
    if selection.is_empty() {
        ui.label("no data");
        return;
    }
    egui::Grid::new(id).striped(true).show(ui, |ui: &mut Ui| {
        ui.strong("#");
        for col in &selection.columns {
            ui.strong(col);
        }
        ui.end_row();

        for (rank, row) in selection.rows.iter().enumerate() {
            ui.label((rank + 1).to_string());
            for value in row {
                ui.label(value.to_string());
            }
            ui.end_row();
        }
    });
}

fn filtered_table(ui: &mut Ui, selection: &Selection) {
    if selection.is_empty() {
        ui.label("no data");
        return;
    }
    ui.push_id("filtered_rows", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .max_scroll_height(360.0)
            .columns(Column::auto().at_least(60.0), selection.columns.len())
            .header(20.0, |mut header| {
                for col in &selection.columns {
                    header.col(|ui| {
                        ui.strong(col);
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, selection.rows.len(), |mut row| {
                    let cells = &selection.rows[row.index()];
                    for value in cells {
                        row.col(|ui| {
                            ui.label(value.to_string());
                        });
                    }
                });
            });
    });
}
