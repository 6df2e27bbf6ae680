use e6_cache::app;

#[tokio::main]
async fn main() {
    app::enable_tracing();
    let state = match app::initialize().await {
        Ok(state) => state,
        Err(err) => {
            tracing::error!("An error occurred during initialization. Details:\n{err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = app::run(state).await {
        tracing::error!("Server stopped unexpectedly: {err}");
        std::process::exit(1);
    }
}
