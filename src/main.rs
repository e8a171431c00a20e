use flexi_logger::{
    colored_default_format, detailed_format, Duplicate, FileSpec, FlexiLoggerError, Logger,
    LoggerHandle,
};
use gdiet::cinfo;
use gdiet::experiment;
use gdiet::param::{self, General};
use gdiet::pool::WorkerPool;
use gdiet::run;
use log::{error, info, warn};
use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn start_logger(general: &General) -> Result<LoggerHandle, FlexiLoggerError> {
    let logger = Logger::try_with_str(&general.log_level)?;
    if general.log_base.is_empty() {
        logger.format(colored_default_format).start()
    } else {
        logger
            .log_to_file(
                FileSpec::default()
                    .basename(&general.log_base)
                    .suffix(&general.log_suffix),
            )
            .format_for_files(detailed_format)
            .duplicate_to_stderr(Duplicate::Info)
            .start()
    }
}

/// Clear `running` on SIGINT, SIGTERM or SIGHUP so the search stops after the current generation.
fn watch_signals(running: Arc<AtomicBool>) {
    match Signals::new([SIGINT, SIGTERM, SIGHUP]) {
        Ok(mut signals) => {
            thread::spawn(move || {
                for signal in signals.forever() {
                    warn!(
                        "Signal {} received: finishing the current generation...",
                        signal
                    );
                    running.store(false, Ordering::Relaxed);
                }
            });
        }
        Err(e) => warn!("Signal handlers not installed: {}", e),
    }
}

fn main() {
    let param_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "param.yaml".to_string());

    let mut param = match param::read(&param_path) {
        Ok(param) => param,
        Err(e) => {
            eprintln!("Cannot read parameters from {}: {}", param_path, e);
            process::exit(1);
        }
    };

    let _logger = match start_logger(&param.general) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Cannot start logging: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = param::validate(&mut param) {
        error!("{}", e);
        process::exit(1);
    }

    info!("gdiet {} with parameters {}", experiment::version(), param_path);

    let running = Arc::new(AtomicBool::new(true));
    watch_signals(Arc::clone(&running));

    let pool = WorkerPool::new(param.general.thread_number);
    let status = match run(&param, &pool, running) {
        Ok(exp) => {
            cinfo!(param.general.display_colorful, "{}", exp.display());
            if let Some(plan) = exp.outcome.plan() {
                match plan.to_json() {
                    Ok(json) => println!("{}", json),
                    Err(e) => error!("{}", e),
                }
            }
            0
        }
        Err(e) => {
            error!("{}", e);
            1
        }
    };

    pool.shutdown();
    process::exit(status);
}
