use anyhow::Result;
use clap::Parser;
use polypi_dash::cli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_headless = args.is_headless();

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success, especially for headless modes
            if is_headless {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            if is_headless {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
            Err(e)
        }
    }
}
