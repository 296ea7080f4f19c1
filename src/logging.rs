//! Logger setup for binaries and tests.

/// Installs `env_logger` with an `info` default filter. `RUST_LOG`
/// overrides it. Calling this more than once is harmless.
pub fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(cfg!(test))
        .try_init();
}
