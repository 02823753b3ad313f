//! q6voiced: routes modem voice calls to the audio codec.
//!
//! Listens for ModemManager call signals on the system bus. When a call
//! becomes active the hook script is told `voice-start`, the codec streams
//! are opened in voice-call mode and two pw-loopback helpers keep them
//! running; when the call ends everything is undone and the hook is told
//! `voice-stop`. New calls additionally trigger `call-added`.
//!
//! Any failure is fatal: the runtime is released, the error logged and the
//! process exits non-zero for the supervisor to restart.

mod bus;
mod config;
mod dispatch;
mod error;
mod hook;
mod logging;
mod pcm;
mod process;
mod runtime;
mod session;

use clap::error::ErrorKind;
use clap::Parser;
use config::{Cli, USAGE};
use hook::ScriptRunner;
use runtime::{AudioBackend, HardwareBackend};
use session::Session;
use tracing::{error, info};

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                let _ = err.print();
                return 0;
            }
            println!("{}", USAGE);
            eprint!("{}", err.render());
            return 1;
        }
    };

    let config_path = config::resolve_config_path(cli.config.as_deref());
    let config = match config::load_config(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("q6voiced: {}", err);
            return 1;
        }
    };

    let _logging_guard = logging::init(config.logging.log_dir.as_deref());

    info!(
        card = cli.card,
        device = cli.device,
        script = %cli.script.display(),
        loopback = %config.loopback.program.display(),
        "q6voiced starting"
    );

    let mut session = Session::new(
        cli.card,
        cli.device,
        ScriptRunner::new(&cli.script),
        HardwareBackend::new(&config.loopback.program),
    );

    let result = serve(&mut session);
    let shutdown = session.shutdown();

    match (result, shutdown) {
        (Ok(()), Ok(())) => 0,
        (result, shutdown) => {
            if let Err(err) = result {
                error!(error = %err, "q6voiced failed");
            }
            if let Err(err) = shutdown {
                error!(error = %err, "Failed to release voice runtime");
            }
            1
        }
    }
}

fn serve<B: AudioBackend>(session: &mut Session<ScriptRunner, B>) -> error::Result<()> {
    let subscription = bus::subscribe()?;
    info!("Listening for ModemManager call signals");
    bus::run(subscription, session)
}
