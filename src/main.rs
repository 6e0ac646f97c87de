use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use csvi::controller::Controller;
use csvi::domain::{Config, CsviError};
use csvi::model::{Model, Status};
use csvi::ui::TableUi;

#[derive(Parser)]
#[command(version, about = "A tui based CSV table inspector.")]
struct Cli {
    /// CSV file to open
    path: Option<String>,

    /// Write a debug log to this file, filtered by RUST_LOG
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(()) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn run() -> Result<(), CsviError> {
    let cli = Cli::parse();

    if let Some(log_file) = &cli.log_file {
        let file = File::create(log_file)?;
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(file)
            .with_ansi(false)
            .init();
    }
    info!("Starting csvi!");

    let cfg = Config::default().with_event_poll_time(100);
    let controller = Controller::new(&cfg);
    let ui = TableUi::new(&cfg);

    let mut terminal = ratatui::init();
    let size = terminal.size()?;
    let mut model = Model::init(&cfg, size.width as usize, size.height as usize);

    if let Some(path) = &cli.path {
        // Expand ~ and environment variables; on failure keep the raw path
        // and let the open report what went wrong.
        let expanded = shellexpand::full(path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| path.clone());
        model.open(Path::new(&expanded));
    }

    while model.status != Status::Quitting {
        terminal.draw(|f| ui.draw(&model, f))?;
        if let Some(message) = controller.handle_event(&model)? {
            model.update(message);
        }
    }

    Ok(())
}
