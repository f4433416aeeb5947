use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use config::{Config, File};
use kdam::{Bar, BarExt};
use serde::Serialize;
use velopark_core::model::artifact::{CorrelationArtifact, SaturationArtifact};
use velopark_core::model::distance::GeoDistanceIndex;
use velopark_core::model::history::HistoryStore;
use velopark_core::model::{saturation, window, AnalysisConfig, EngineError, EntityClass};

use crate::app::IoArgs;

/// loads the engine configuration from a TOML file, or falls back to the
/// built-in defaults. validation runs in both cases, before any data is
/// touched.
pub fn load_config(config_file: Option<&str>) -> Result<AnalysisConfig, EngineError> {
    let config = match config_file {
        None => AnalysisConfig::default(),
        Some(path) => {
            let settings = Config::builder()
                .add_source(File::from(Path::new(path)))
                .build()
                .map_err(|e| {
                    EngineError::ConfigInvalid(format!("file '{path}' produced error: {e}"))
                })?;
            settings.try_deserialize::<AnalysisConfig>().map_err(|e| {
                EngineError::ConfigInvalid(format!("error reading configuration '{path}': {e}"))
            })?
        }
    };
    config.validate()?;
    Ok(config)
}

/// everything one invocation needs, loaded and validated up front. the
/// `all` operation shares a single history snapshot between the
/// correlation and saturation passes.
pub struct RunContext {
    config: AnalysisConfig,
    store: HistoryStore,
    output_directory: PathBuf,
    budget: Option<Duration>,
    started: Instant,
}

impl RunContext {
    pub fn prepare(io: &IoArgs) -> Result<RunContext, EngineError> {
        let started = Instant::now();
        let config = load_config(io.config_file.as_deref())?;
        let budget = config.runtime_budget()?;
        let store = HistoryStore::load(Path::new(&io.history_file), Path::new(&io.metadata_file))?;
        Ok(RunContext {
            config,
            store,
            output_directory: PathBuf::from(&io.output_directory),
            budget,
            started,
        })
    }

    pub fn run_correlations(&self) -> Result<(), EngineError> {
        let artifacts = self.compute_correlations()?;
        self.write_correlations(&artifacts)
    }

    pub fn run_saturation(&self) -> Result<(), EngineError> {
        let artifact = self.compute_saturation()?;
        self.write_saturation(&artifact)
    }

    /// both analyses over one snapshot. every artifact is materialized
    /// before the first file is written, so a failing pass leaves the
    /// previous artifact set untouched.
    pub fn run_all(&self) -> Result<(), EngineError> {
        let correlations = self.compute_correlations()?;
        let saturation = self.compute_saturation()?;
        self.write_correlations(&correlations)?;
        self.write_saturation(&saturation)
    }

    /// one artifact per configured lookback window. windows share the
    /// store and the distance index but no intermediate state.
    fn compute_correlations(&self) -> Result<Vec<CorrelationArtifact>, EngineError> {
        let distances = GeoDistanceIndex::build(
            self.store.entities(EntityClass::Car),
            self.store.entities(EntityClass::Bike),
        );
        let mut bar = Bar::builder()
            .total(self.config.lookback_windows.len())
            .desc("lookback windows")
            .build()
            .map_err(EngineError::Internal)?;
        let mut artifacts = Vec::with_capacity(self.config.lookback_windows.len());
        for days in &self.config.lookback_windows {
            artifacts.push(window::run_window(
                &self.store,
                &distances,
                &self.config,
                *days,
            )?);
            self.check_budget()?;
            let _ = bar.update(1);
        }
        Ok(artifacts)
    }

    fn compute_saturation(&self) -> Result<SaturationArtifact, EngineError> {
        let artifact = saturation::run_saturation(&self.store, &self.config)?;
        self.check_budget()?;
        Ok(artifact)
    }

    fn write_correlations(&self, artifacts: &[CorrelationArtifact]) -> Result<(), EngineError> {
        for artifact in artifacts {
            let filename = format!("correlations_{}.json", artifact.lookback_days);
            write_artifact(&self.output_directory, &filename, artifact)?;
        }
        log::info!(
            "wrote {} correlation artifacts to '{}'",
            artifacts.len(),
            self.output_directory.display()
        );
        Ok(())
    }

    fn write_saturation(&self, artifact: &SaturationArtifact) -> Result<(), EngineError> {
        let filename = format!("saturation_{}d.json", artifact.lookback_days);
        write_artifact(&self.output_directory, &filename, artifact)?;
        log::info!(
            "wrote saturation artifact to '{}'",
            self.output_directory.display()
        );
        Ok(())
    }

    /// loud failure once the wall-clock budget is spent. checked between
    /// passes; a budgeted run never silently truncates its output.
    fn check_budget(&self) -> Result<(), EngineError> {
        match self.budget {
            Some(budget) if self.started.elapsed() > budget => Err(EngineError::BudgetExceeded {
                budget: humantime::format_duration(budget).to_string(),
                elapsed: format!("{:.1?}", self.started.elapsed()),
            }),
            _ => Ok(()),
        }
    }
}

/// writes JSON through a sibling temp file and an atomic rename, so the
/// rendering boundary never observes a partially written artifact
fn write_artifact<T: Serialize>(
    directory: &Path,
    filename: &str,
    value: &T,
) -> Result<(), EngineError> {
    let write_error = |message: String| EngineError::ArtifactWrite {
        path: directory.join(filename),
        message,
    };
    std::fs::create_dir_all(directory).map_err(|e| write_error(e.to_string()))?;
    let json = serde_json::to_string_pretty(value).map_err(|e| write_error(e.to_string()))?;
    let temp_path = directory.join(format!("{filename}.tmp"));
    std::fs::write(&temp_path, json).map_err(|e| write_error(e.to_string()))?;
    std::fs::rename(&temp_path, directory.join(filename)).map_err(|e| write_error(e.to_string()))
}
