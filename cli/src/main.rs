//! Binary entrypoint for fontbrowse-cli

#[tokio::main]
async fn main() {
    if let Err(err) = fontbrowse_cli::run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
