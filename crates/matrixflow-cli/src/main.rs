//! Binary entrypoint for the `matrixflow` administrative CLI.

use std::process;

#[tokio::main]
async fn main() {
    let exit_code = matrixflow_cli::run().await;
    if exit_code != 0 {
        process::exit(exit_code);
    }
}
