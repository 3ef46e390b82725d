use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    folio_cli::main_entry().await
}
