use clap::Parser;
use velopark::app::VeloparkApp;
use velopark_core::model::EngineError;

fn main() -> Result<(), EngineError> {
    env_logger::init();
    let args = VeloparkApp::parse();
    args.op.run()
}
