#[tokio::main]
async fn main() -> std::process::ExitCode {
    blight_scan_lib::run().await
}
