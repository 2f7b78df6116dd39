use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let api_key = std::env::var("EXOTEL_API_KEY").unwrap_or_else(|_| "key".to_string());
    let api_secret = std::env::var("EXOTEL_API_SECRET").unwrap_or_else(|_| "secret".to_string());
    let sid = std::env::var("EXOTEL_SID").unwrap_or_else(|_| "acme1".to_string());

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, %sid, "mock exotel listening");
    mock_exotel::run(listener, mock_exotel::AppState::new(&api_key, &api_secret, &sid)).await
}
