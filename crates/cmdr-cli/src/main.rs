//! cmdr binary: the CLI over the built-in commands

use cmdr_engine::Registry;

fn main() {
    dotenvy::dotenv().ok();
    let code = cmdr_cli::run(Registry::with_builtins(), std::env::args_os());
    std::process::exit(code);
}
