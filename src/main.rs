use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    earthnight::run().await
}
