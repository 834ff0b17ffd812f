//! Renders one synthesized tone through a loopback device and prints the
//! source samples and the rendered stereo frames. Errors the session steps
//! over are printed to stderr as they happen.
//!
//! Environment:
//! - `LOOPBACK_RENDER_CONFIG`: JSON configuration file (defaults otherwise)
//! - `LOOPBACK_RENDER_BACKEND`: `software` (default) or `openal`
//! - `LOOPBACK_RENDER_WAV`: also write the rendered frames to this WAV file
//! - `RUST_LOG`: log verbosity

use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use parking_lot::Mutex;

use loopback_render_core::{
    render_with_observer, RenderConfiguration, RenderError, RenderObserver, RenderReport, SoftwarePlatform,
};
use loopback_render_openal::OpenAlPlatform;

const CONFIG_VAR: &str = "LOOPBACK_RENDER_CONFIG";
const BACKEND_VAR: &str = "LOOPBACK_RENDER_BACKEND";
const WAV_VAR: &str = "LOOPBACK_RENDER_WAV";

fn main() -> ExitCode {
    env_logger::init();

    let console = ConsoleObserver::new(io::stdout(), io::stderr());
    match run(&console) {
        Ok(report) => {
            console.report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("render session aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(console: &dyn RenderObserver) -> Result<RenderReport, RenderError> {
    let config = load_configuration()?;
    let backend = env::var(BACKEND_VAR).unwrap_or_else(|_| "software".to_string());
    log::info!("backend: {}, format: {}", backend, config.format);

    match backend.as_str() {
        "software" => render_with_observer(&SoftwarePlatform::new(), &config, console),
        "openal" => render_with_observer(&OpenAlPlatform::load()?, &config, console),
        other => Err(RenderError::InvalidConfiguration(format!(
            "unknown backend '{}' (expected software or openal)",
            other
        ))),
    }
}

fn load_configuration() -> Result<RenderConfiguration, RenderError> {
    let mut config = match env::var_os(CONFIG_VAR) {
        Some(path) => {
            let json = std::fs::read_to_string(&path).map_err(|e| {
                RenderError::InvalidConfiguration(format!("{}: {}", PathBuf::from(&path).display(), e))
            })?;
            RenderConfiguration::from_json(&json)?
        }
        None => RenderConfiguration::default(),
    };
    if let Some(wav) = env::var_os(WAV_VAR) {
        config.wav_output = Some(PathBuf::from(wav));
    }
    Ok(config)
}

/// Writes the `source:` line as soon as the tone exists, each stepped-over
/// error to `err` as it happens, and the `rendered:` line at the end.
struct ConsoleObserver<O, E> {
    out: Mutex<O>,
    err: Mutex<E>,
}

impl<O: Write + Send, E: Write + Send> ConsoleObserver<O, E> {
    fn new(out: O, err: E) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
        }
    }

    fn report(&self, report: &RenderReport) {
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "rendered: {}", report.frames).and_then(|_| out.flush()) {
            log::error!("could not write rendered frames: {}", e);
        }
        log::info!(
            "{} frames rendered on {} with {} diagnostic(s)",
            report.frames.frame_count(),
            report.backend,
            report.diagnostics.len()
        );
    }
}

impl<O: Write + Send, E: Write + Send> RenderObserver for ConsoleObserver<O, E> {
    fn on_source_synthesized(&self, samples: &[i16]) {
        let source: Vec<String> = samples.iter().map(i16::to_string).collect();
        let mut out = self.out.lock();
        if let Err(e) = writeln!(out, "source: {}", source.join(" ")).and_then(|_| out.flush()) {
            log::error!("could not write source samples: {}", e);
        }
    }

    fn on_diagnostic(&self, error: &RenderError) {
        let mut err = self.err.lock();
        // nowhere left to report a failing stderr
        let _ = writeln!(err, "warning: {}", error);
    }
}
