//! `SegmentRunner` backed by a real AtChem2 checkout.

use crate::error::{SimResult, Step};
use crate::process::run_logged;
use crate::runner::{SegmentJob, SegmentRunner};
use crate::workspace::SegmentWorkspace;
use cf_config::{ModelDef, species_from_mechanism, write_model_config, write_model_parameters};
use cf_results::OutputTables;
use cf_results::read::{
    ENVIRONMENT_FILE, LOSS_RATES_FILE, PRODUCTION_RATES_FILE, SPECIES_FILE, read_output_tables,
};
use std::fs;
use std::process::Command;

pub const BUILD_LOG: &str = "build.log";
pub const RUN_LOG: &str = "run.log";

/// Copies the template for every segment, writes its configuration, builds the
/// mechanism, runs the model and reads back the four output tables.
pub struct AtChem2Runner {
    model: ModelDef,
    species: Option<Vec<String>>,
}

impl AtChem2Runner {
    pub fn new(model: ModelDef) -> Self {
        Self {
            model,
            species: None,
        }
    }

    pub fn model(&self) -> &ModelDef {
        &self.model
    }
}

impl SegmentRunner for AtChem2Runner {
    fn mechanism_species(&mut self) -> SimResult<Vec<String>> {
        if let Some(species) = &self.species {
            return Ok(species.clone());
        }
        let species = species_from_mechanism(&self.model.mechanism_path)?;
        self.species = Some(species.clone());
        Ok(species)
    }

    fn run_segment(&mut self, job: &SegmentJob<'_>) -> SimResult<OutputTables> {
        let ws = SegmentWorkspace::create(
            &self.model.atchem2_path,
            &self.model.mechanism_path,
            &format!("seg{}", job.index),
        )?;
        let paths = ws.paths();
        write_model_config(&paths, &job.config)?;
        write_model_parameters(&paths, &job.parameters)?;

        // Outputs shipped with the template would hide a run that wrote nothing.
        let output_dir = paths.output_dir();
        for name in [SPECIES_FILE, LOSS_RATES_FILE, PRODUCTION_RATES_FILE, ENVIRONMENT_FILE] {
            let stale = output_dir.join(name);
            if stale.exists() {
                fs::remove_file(stale)?;
            }
        }
        fs::create_dir_all(&output_dir)?;

        let root = ws.root();
        let mut build = Command::new(root.join(&self.model.build_script));
        build.arg(ws.mechanism()).current_dir(root);
        run_logged(Step::Build, &mut build, &root.join(BUILD_LOG), self.model.timeout_s)?;

        let mut run = Command::new(root.join(&self.model.executable));
        run.current_dir(root);
        run_logged(Step::Run, &mut run, &root.join(RUN_LOG), self.model.timeout_s)?;

        let tables = read_output_tables(&output_dir)?;
        tracing::debug!(
            segment = job.index,
            rows = tables.species.len(),
            "read segment output"
        );
        Ok(tables)
    }
}
