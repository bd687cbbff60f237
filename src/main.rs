use olos::console::dispatch;
use olos::{
    engine_config, init_logging, resolve_config_path, spawn_engine, Config, EngineHandle,
    SystemPortDriver, BUILD_DATE, VERSION,
};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

/// How often the event forwarder checks for shutdown while idle
const EVENT_POLL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;
    tracing::info!("OLOS {} (built {})", VERSION, BUILD_DATE);

    let explicit_path = std::env::args().nth(1);
    let config_path = resolve_config_path(explicit_path.as_deref());
    let config = Config::load_or_default(&config_path)?;

    let (handle, engine_thread) =
        spawn_engine(engine_config(&config), Box::new(SystemPortDriver))?;

    let events = handle.clone();
    let forwarder = tokio::task::spawn_blocking(move || forward_events(&events));

    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            result = &mut interrupted => {
                result?;
                tracing::info!("Interrupted, shutting down");
                break;
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    if !dispatch(&handle, &line)? {
                        break;
                    }
                }
                None => {
                    tracing::debug!("stdin closed, running until interrupted");
                    stdin_open = false;
                }
            },
        }
    }

    handle.shutdown();
    forwarder.await?;
    engine_thread
        .join()
        .map_err(|_| anyhow::anyhow!("protocol engine thread panicked"))?;

    Ok(())
}

/// Print every inbound event to stdout as one JSON object per line
fn forward_events(handle: &EngineHandle) {
    while !handle.is_shutdown() {
        let Some(message) = handle.next_event_timeout(EVENT_POLL) else {
            continue;
        };
        match message.payload.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::warn!("Failed to serialize event: {}", e),
        }
    }
}
