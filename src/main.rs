use std::path::Path;

use ncsh::config::{Config, ConfigLoader};
use ncsh::repl;

fn load_config() -> Config {
    if let Ok(home) = std::env::var("HOME") {
        let path = Path::new(&home).join(".ncshrc");
        if path.exists() {
            match ConfigLoader::load_from_file(&path) {
                Ok(config) => return config,
                Err(e) => eprintln!("ncsh: Could not load config file: {}", e),
            }
        }
    }
    ConfigLoader::default_config()
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let status = if args.is_empty() {
        repl::run(&load_config())
    } else {
        repl::run_once(&args.join(" "))
    };
    std::process::exit(status);
}
