//! Logging bootstrap.

/// Installs `env_logger` as the `log` backend.
///
/// The filter comes from `RUST_LOG`. Calling this more than once, or after
/// another logger was installed, does nothing.
pub fn init_logging() {
    let _ = env_logger::try_init();
}
