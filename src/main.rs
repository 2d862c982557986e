use anyhow::Result;
use helion::FelicityDriver;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let mut driver =
        FelicityDriver::new().map_err(|e| anyhow::anyhow!("Failed to create driver: {}", e))?;

    info!("Helion Felicity inverter monitor starting up");

    // Ctrl-C requests a clean shutdown of the poll loop
    let shutdown = driver.shutdown_sender();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown.send(());
        }
    });

    match driver.run().await {
        Ok(()) => {
            info!("Driver shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("Driver failed with error: {}", e);
            Err(anyhow::anyhow!("Driver error: {}", e))
        }
    }
}
