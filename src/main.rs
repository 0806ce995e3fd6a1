#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    repair_booking::run().await;
}
