use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    hubtest::cli::run().await
}
