#[tokio::main]
async fn main() {
    hospital_admin_lib::init_tracing();

    if let Err(e) = hospital_admin_lib::run().await {
        tracing::error!("Startup failed: {e}");
        std::process::exit(1);
    }
}
