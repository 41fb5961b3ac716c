use log::LevelFilter;

/// Environment variable holding an `env_logger` filter string.
pub const LOG_ENV: &str = "TENSIM_LOG";

pub fn init() {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Warn)
        .parse_env(env_logger::Env::default().filter_or(LOG_ENV, "warn,tensim=info"))
        .init();
}
