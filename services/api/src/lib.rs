mod cli;
mod demo;
mod infra;
mod routes;
mod server;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    cli::run().await
}
