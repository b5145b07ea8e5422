#[tokio::main]
async fn main() {
    if let Err(e) = prontuario_lib::run().await {
        eprintln!("prontuario: {e}");
        std::process::exit(1);
    }
}
