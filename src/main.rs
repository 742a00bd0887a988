#[tokio::main]
async fn main() -> anyhow::Result<()> {
    decision_wheel::run().await
}
