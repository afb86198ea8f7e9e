use spacetime_grid::config::{SimConfig, DEFAULT_CONFIG_PATH};
use spacetime_grid::engine::Engine;
use spacetime_grid::logging;

fn main() {
    let verbose = std::env::args().skip(1).any(|arg| arg == "-v" || arg == "--verbose");
    logging::init(verbose);

    log::info!("starting spacetime-grid");
    let config = SimConfig::load_or_default(DEFAULT_CONFIG_PATH);

    if let Err(e) = Engine::new(&config).and_then(Engine::run) {
        log::error!("{e:#}");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
