use raytracing_lib::run;

/// Entry point for the application.
///
/// The optional first argument is the config file. Startup failures are logged and end the
/// process with a non-zero exit code.
fn main() {
    if let Err(error) = pollster::block_on(run(std::env::args().nth(1))) {
        log::error!("{:#}", error);
        std::process::exit(1);
    }
}
