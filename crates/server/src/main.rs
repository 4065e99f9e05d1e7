#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ragbase_server::start().await
}
