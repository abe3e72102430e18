use std::path::Path;

use study_lens::data::loader::load_file;
use study_lens::data::model::Dataset;
use study_lens::data::ranking::Selection;
use study_lens::data::schema::Role;
use study_lens::{EngineConfig, Overview, Report, Session};

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: EngineConfig,

    /// Loaded dataset and filters (None until user loads a file).
    pub session: Option<Session>,

    /// File name of the loaded dataset.
    pub source_name: Option<String>,

    /// Whole-table figures, fixed per dataset.
    pub overview: Option<Overview>,

    /// KPIs and chart tables for the current filters (cached).
    pub report: Option<Report>,

    /// Matching rows for the data table and export (cached).
    pub extract: Selection,

    /// Stable colours per gender value, independent of filtering.
    pub gender_colors: Option<ColorMap>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            session: None,
            source_name: None,
            overview: None,
            report: None,
            extract: Selection::default(),
            gender_colors: None,
            status_message: None,
        }
    }

    /// Load a file and make it the active dataset. Errors end up in
    /// `status_message`; the previous dataset is dropped either way.
    pub fn load_path(&mut self, path: &Path) {
        self.clear();
        match load_file(path) {
            Ok(dataset) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                self.set_dataset(dataset, name);
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Resolve the schema of a loaded dataset and compute the first report.
    pub fn set_dataset(&mut self, dataset: Dataset, name: String) {
        match Session::new(dataset, self.config.clone()) {
            Ok(session) => {
                self.overview = Some(session.overview());
                self.gender_colors = Some(ColorMap::new(&session.options(Role::Gender)));
                self.session = Some(session);
                self.source_name = Some(name);
                self.status_message = None;
                self.refresh();
            }
            Err(e) => {
                log::error!("Rejected {name}: {e}");
                self.status_message = Some(format!("⚠ {e}"));
            }
        }
    }

    /// Recompute `report` and `extract` after a filter change.
    pub fn refresh(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        match session.report() {
            Ok(report) => {
                self.report = Some(report);
                self.extract = session.filtered_extract();
            }
            Err(e) => {
                log::error!("Recomputation failed: {e}");
                self.report = None;
                self.extract = Selection::default();
                self.status_message = Some(format!("⚠ {e}"));
            }
        }
    }

    /// Apply `f` to the session (if any) and recompute.
    pub fn update_session(&mut self, f: impl FnOnce(&mut Session)) {
        if let Some(session) = self.session.as_mut() {
            f(session);
            self.refresh();
        }
    }

    fn clear(&mut self) {
        self.session = None;
        self.source_name = None;
        self.overview = None;
        self.report = None;
        self.extract = Selection::default();
        self.gender_colors = None;
        self.status_message = None;
    }
}
