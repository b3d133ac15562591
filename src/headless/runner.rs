//! Headless runner - wires the engine to the NDJSON bridge

use tokio::sync::mpsc;

use hfpgw_app::{Engine, Settings};
use hfpgw_core::prelude::*;

use super::{forward_lines, write_frames};

/// Capacity of the outbound frame channel
const FRAME_CHANNEL_CAPACITY: usize = 256;

/// Run the gateway until the bridge closes stdin or a quit is requested
pub async fn run_headless(settings: Settings) -> Result<()> {
    let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
    let writer = tokio::spawn(write_frames(frame_rx, tokio::io::stdout()));

    // Create engine (owns all gateway state)
    let mut engine = Engine::new(settings, frame_tx);
    engine.start()?;

    // Blocking stdin reader on its own thread
    let stdin_tx = engine.msg_sender();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        forward_lines(stdin.lock(), stdin_tx);
    });

    engine.run().await;
    engine.shutdown();

    // Dropping the engine closes the frame channel so the writer drains and exits
    drop(engine);
    match writer.await {
        Ok(result) => result?,
        Err(e) => warn!("Bridge writer task failed: {}", e),
    }

    info!("hfpgw exiting");
    Ok(())
}
