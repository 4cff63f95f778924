use clap::Parser;
use compound_fund::api::{Cli, failure_message, run};
use compound_fund::logging::init_logger;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{}", failure_message(&e));
        std::process::exit(1);
    }
}
