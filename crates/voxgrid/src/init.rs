//! Logging setup for applications using voxgrid-rs.

/// Installs an `env_logger` logger controlled by `RUST_LOG`.
///
/// Library code only emits through the `log` facade; call this once from an
/// application or test to see the output. Repeated calls are ignored.
///
/// # Example
///
/// ```no_run
/// voxgrid::init_logging();
/// ```
pub fn init_logging() {
    if env_logger::try_init().is_ok() {
        log::info!("voxgrid-rs logging initialized");
    }
}
