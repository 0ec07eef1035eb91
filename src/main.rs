use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match barkeep::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("barkeep: {e}");
            ExitCode::FAILURE
        }
    }
}
