use anyhow::Context;
use chatroom::backend::memory::MemoryDatabase;
use log::{info, LevelFilter};
use server::{config::Config, logging};
use tokio::{
    net::TcpListener,
    signal::unix::{signal, SignalKind},
    sync::broadcast,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logger(LevelFilter::Info)?;

    let config = Config::from_env()?;
    let mut interrupt =
        signal(SignalKind::interrupt()).context("failed to create interrupt signal stream")?;
    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("could not bind to port {}", config.port))?;
    let (quit_tx, quit_rx) = broadcast::channel::<()>(1);

    info!("Listening on port {}", config.port);
    let serving = tokio::spawn(server::serve(listener, MemoryDatabase::new(), quit_rx));

    interrupt.recv().await;
    info!("Server interrupted");
    quit_tx.send(()).context("failed to send quit signal")?;

    serving.await??;
    info!("Server shut down");

    Ok(())
}
