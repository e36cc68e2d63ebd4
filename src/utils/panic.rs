use color_backtrace::{BacktracePrinter, Verbosity};

pub fn setup() {
    // Full traces when debugging, a short one otherwise.
    let verbosity = if cfg!(debug_assertions) {
        Verbosity::Full
    } else {
        Verbosity::Minimal
    };

    BacktracePrinter::new()
        .verbosity(verbosity)
        .lib_verbosity(Verbosity::Minimal)
        .install(color_backtrace::default_output_stream());
}
