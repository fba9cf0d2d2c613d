use notify_queue_cli::run_cli;
use tracing::error;

#[tokio::main]
async fn main() {
    let exit_code = match run_cli().await {
        Ok(()) => 0,
        Err(e) => {
            error!("CLI error: {}", e);
            eprintln!("notify-queue: {}", e);
            e.exit_code()
        }
    };

    // Exit here so an abandoned blocking receive does not hold up runtime shutdown.
    std::process::exit(exit_code);
}
