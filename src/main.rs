/*!
 * SigilVM Tools - Main Entry Point
 *
 * Brings the virtual machine up, optionally attaches the debug console to
 * stdin, and tears everything down on `exit` or Ctrl+C.
 */

use clap::Parser;
use miette::IntoDiagnostic;
use sigil_vm::{console, init_tracing, VirtualMachine, VmConfig, VmError};
use tracing::{info, warn};

/// SigilVM command line tools
#[derive(Parser, Debug)]
#[command(name = "sigil-tools")]
#[command(about = "SigilVM runtime launcher and debug console", long_about = None)]
#[command(version)]
struct Cli {
    /// Attach the debug console to stdin
    #[arg(long)]
    console: bool,

    /// Enable debug mode (also settable through SIGIL_DEBUG)
    #[arg(long)]
    debug: bool,

    /// Launch the graphical shell
    #[arg(long)]
    gui: bool,

    /// Launch the desktop window manager
    #[arg(long)]
    dwm: bool,

    /// Flush the persisted virtual machine image
    #[arg(long)]
    flushvm: bool,

    /// `-tag=value` launch parameters and the launch command
    #[arg(allow_hyphen_values = true, trailing_var_arg = true)]
    params: Vec<String>,
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    if cli.gui || cli.dwm {
        return Err(VmError::NotSupported("graphical shells are not part of this build".into()).into());
    }
    if cli.flushvm {
        return Err(VmError::NotImplemented("flushvm".into()).into());
    }

    let config = VmConfig::from_env();
    let debug = cli.debug || config.debug_mode;
    let vm = VirtualMachine::builder()
        .with_config(config)
        .with_debug(debug)
        .build();

    info!(session = %vm.session_id(), "SigilVM starting");
    vm.initialize(&cli.params)?;

    if vm.debug_mode() {
        info!("registry tree:\n{}", vm.dump_tree()?);
    }

    if cli.console {
        // Blocking stdin reads cannot be interrupted, so the console is not a
        // tracked worker; it dies with the process.
        let console_vm = vm.clone();
        std::thread::Builder::new()
            .name("sigil-console".into())
            .spawn(move || {
                if console_vm.wait_for_vm().is_err() {
                    return;
                }
                let stdin = std::io::stdin();
                if let Err(e) = console::run(&console_vm, stdin.lock(), std::io::stdout()) {
                    warn!(error = %e, "console stopped");
                }
                if console_vm.is_active() {
                    if let Err(e) = console_vm.request_shutdown() {
                        warn!(error = %e, "shutdown request not accepted");
                    }
                }
            })
            .into_diagnostic()?;
    } else {
        info!("Press Ctrl+C to exit");
    }

    let waiter = vm.clone();
    let mut handler = tokio::task::spawn_blocking(move || waiter.wait_for_shutdown());

    let interrupted = tokio::select! {
        result = &mut handler => {
            result.into_diagnostic()??;
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };

    if interrupted {
        info!("interrupt received");
        let requester = vm.clone();
        let requested = tokio::task::spawn_blocking(move || {
            requester.wait_for_vm()?;
            requester.request_shutdown()
        })
        .await
        .into_diagnostic()?;
        if let Err(e) = requested {
            warn!(error = %e, "shutdown request not accepted");
        }
        handler.await.into_diagnostic()??;
    }

    info!("SigilVM stopped");
    Ok(())
}
