mod run;
mod velopark_app;

pub use run::{load_config, RunContext};
pub use velopark_app::{AnalysisOperation, IoArgs, VeloparkApp};
