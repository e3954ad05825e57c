use clap::{Arg, ArgAction, Command as ClapCommand};
use log::error;
use std::path::Path;
use std::process;

use dflmark::commands::{CommandFactory, DflmarkCommandFactory};
use dflmark::utils::logger::init_logging;

fn main() {
    let matches = match ClapCommand::new("dflmark")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Burn file names into DFL face images without disturbing the face")
        .arg(
            Arg::new("input")
                .help("Directory containing the images to watermark")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("mode")
                .help("Pass 'debug' to process only the first image")
                .required(false)
                .index(2),
        )
        .arg(
            Arg::new("workers")
                .short('w')
                .long("workers")
                .help("Number of worker threads (defaults to the CPU count)")
                .value_name("N")
                .required(false),
        )
        .arg(
            Arg::new("font")
                .long("font")
                .help("TrueType font for the watermark text")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Output directory (defaults to '<input>/watermarked images')")
                .value_name("DIR")
                .required(false),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("TOML configuration file")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Write log records to this file")
                .value_name("FILE")
                .required(false),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
        .try_get_matches()
    {
        Ok(matches) => matches,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() { 1 } else { 0 };
            process::exit(code);
        }
    };

    let log_file = matches.get_one::<String>("log-file").map(Path::new);
    if let Err(e) = init_logging(log_file, matches.get_flag("verbose")) {
        eprintln!("Error setting up logging: {}", e);
        process::exit(1);
    }

    let factory = DflmarkCommandFactory::new();
    match factory.create_command(&matches) {
        Ok(command) => {
            if let Err(e) = command.execute() {
                error!("Command execution error: {}", e);
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Failed to create command: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
