use std::path::PathBuf;

use thoth::app::RunOptions;

enum Cli {
    Exit(i32),
    Run(RunOptions),
}

fn main() {
    let options = match parse_cli_flags() {
        Cli::Exit(code) => std::process::exit(code),
        Cli::Run(options) => options,
    };

    if let Err(err) = thoth::app::run_with(options) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn parse_cli_flags() -> Cli {
    let mut options = RunOptions::default();
    let mut print_config = false;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Thoth {}", thoth::VERSION);
                return Cli::Exit(0);
            }
            "--help" | "-h" => {
                println!(
                    "Thoth - social feed and AI labs in the terminal.\n\n  --config <path>      Read configuration from <path>\n  --print-config       Print the effective configuration and exit\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n\nSet GEMINI_API_KEY (or THOTH_LAB__API_KEY) to enable the labs."
                );
                return Cli::Exit(0);
            }
            "--config" | "-c" => match args.next() {
                Some(path) => options.config_file = Some(PathBuf::from(path)),
                None => {
                    eprintln!("error: --config needs a path");
                    return Cli::Exit(2);
                }
            },
            "--print-config" => print_config = true,
            other => {
                eprintln!("error: unknown argument {other:?} (see --help)");
                return Cli::Exit(2);
            }
        }
    }

    if print_config {
        let printed =
            thoth::app::load_config(&options).and_then(|cfg| thoth::config::to_yaml(&cfg));
        return match printed {
            Ok(yaml) => {
                print!("{yaml}");
                Cli::Exit(0)
            }
            Err(err) => {
                eprintln!("error: {err:?}");
                Cli::Exit(1)
            }
        };
    }

    Cli::Run(options)
}
