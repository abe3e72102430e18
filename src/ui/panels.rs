use std::collections::BTreeSet;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use study_lens::data::export::export_csv;
use study_lens::data::filter::{FilterCriterion, CATEGORICAL_ROLES, RANGE_ROLES};
use study_lens::data::model::Value;
use study_lens::data::schema::Role;

use crate::state::AppState;

/// A filter edit collected while rendering, applied once the widgets are done.
enum FilterAction {
    Toggle(Role, Value),
    SelectAll(Role),
    SelectNone(Role),
    Range(Role, f64, f64),
    Reset,
}

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::Score => "Exam score",
        Role::Gender => "Gender",
        Role::StudyHours => "Study hours",
        Role::Attendance => "Attendance (%)",
        Role::SleepHours => "Sleep hours",
        Role::ParentEducation => "Parental education",
    }
}

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(session) = &state.session else {
        ui.label("No dataset loaded.");
        return;
    };

    // Snapshot what we render so we can mutate state afterwards.
    let filters = session.filters().clone();
    let categorical: Vec<(Role, BTreeSet<Value>)> = CATEGORICAL_ROLES
        .into_iter()
        .filter(|r| session.mapping().has(*r))
        .map(|r| (r, session.options(r)))
        .collect();
    let ranges: Vec<(Role, (f64, f64))> = RANGE_ROLES
        .into_iter()
        .filter_map(|r| session.bounds(r).map(|b| (r, b)))
        .collect();

    if let Some(report) = &state.report {
        ui.label(format!(
            "Filtered students: {} / {}",
            report.matched_rows, report.total_rows
        ));
    }
    ui.separator();

    let mut actions = Vec::new();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Categorical filters (collapsible) ----
            for (role, all_values) in &categorical {
                let selected = match filters.get(role) {
                    Some(FilterCriterion::CategoricalSet { allowed }) => allowed.clone(),
                    _ => all_values.clone(),
                };

                let header_text = format!(
                    "{}  ({}/{})",
                    role_label(*role),
                    selected.len(),
                    all_values.len()
                );

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(role.as_str())
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                actions.push(FilterAction::SelectAll(*role));
                            }
                            if ui.small_button("None").clicked() {
                                actions.push(FilterAction::SelectNone(*role));
                            }
                        });
                        if selected.is_empty() {
                            ui.weak("Nothing selected: showing all");
                        }
                        for val in all_values {
                            let mut checked = selected.contains(val);
                            if ui.checkbox(&mut checked, val.to_string()).changed() {
                                actions.push(FilterAction::Toggle(*role, val.clone()));
                            }
                        }
                    });
            }

            ui.separator();

            // ---- Numeric range filters ----
            for (role, (min, max)) in &ranges {
                let (mut lo, mut hi) = match filters.get(role) {
                    Some(FilterCriterion::NumericRange { lower, upper }) => (*lower, *upper),
                    _ => (*min, *max),
                };

                ui.strong(role_label(*role));
                let lo_changed = ui
                    .add(egui::Slider::new(&mut lo, *min..=*max).text("from"))
                    .changed();
                let hi_changed = ui
                    .add(egui::Slider::new(&mut hi, *min..=*max).text("to"))
                    .changed();
                if lo_changed || hi_changed {
                    if lo > hi {
                        std::mem::swap(&mut lo, &mut hi);
                    }
                    actions.push(FilterAction::Range(*role, lo, hi));
                }
                ui.add_space(6.0);
            }

            ui.separator();
            if ui.button("Reset filters").clicked() {
                actions.push(FilterAction::Reset);
            }
        });

    if actions.is_empty() {
        return;
    }
    state.update_session(|session| {
        for action in actions {
            match action {
                FilterAction::Toggle(role, value) => session.toggle_value(role, &value),
                FilterAction::SelectAll(role) => session.select_all(role),
                FilterAction::SelectNone(role) => session.select_none(role),
                FilterAction::Range(role, lo, hi) => session.set_range(role, lo, hi),
                FilterAction::Reset => session.reset_filters(),
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            let can_export = state.session.is_some();
            if ui
                .add_enabled(can_export, egui::Button::new("Export filtered CSV…"))
                .clicked()
            {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(name), Some(overview)) = (&state.source_name, &state.overview) {
            ui.label(format!(
                "{name}: {} ({} rows, {} columns)",
                overview.variant.label(),
                overview.rows,
                overview.columns
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open student data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.load_path(&path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export filtered rows")
        .add_filter("CSV", &["csv"])
        .set_file_name("student_data_filtered.csv")
        .save_file();

    if let Some(path) = file {
        if let Err(e) = export_csv(&state.extract, &path) {
            log::error!("Export failed: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
