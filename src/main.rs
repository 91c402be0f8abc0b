use std::process::exit;

use colored::Colorize;

#[tokio::main]
async fn main() {
    if let Err(e) = credbuster::app::run().await {
        eprintln!("{} {}", "error:".bold().red(), e);
        exit(1);
    }
}
