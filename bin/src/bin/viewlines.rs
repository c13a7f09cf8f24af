use clap::Parser;
use viewlines_bin::{
    cli::{Cli, Command},
    commands,
};
use viewlines_log::LogConfig;

fn main() {
    let cli = Cli::parse();

    let guard = match viewlines_log::init(LogConfig {
        log_file: cli.log_file.clone(),
    }) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            None
        },
    };

    let result = match cli.command {
        Command::Render(args) => commands::render::run(args),
        Command::Locate(args) => commands::locate::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        drop(guard);
        std::process::exit(1);
    }
}
