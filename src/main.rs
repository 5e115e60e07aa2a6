use anyhow::Result;
use demo_signal_bot::config::Config;
use demo_signal_bot::dispatcher::CommandDispatcher;
use demo_signal_bot::health;
use demo_signal_bot::pipeline::SignalPipeline;
use demo_signal_bot::scheduler::Scheduler;
use demo_signal_bot::signal_generator::{RandomStrategy, SignalGenerator};
use demo_signal_bot::state::BotState;
use demo_signal_bot::telegram::{TelegramClient, UpdatePoller};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv().ok();

    // Invalid configuration stops the process before anything is served
    let config = Config::from_env()?;

    info!("Starting demo signal bot");
    info!("Instruments: {}", config.registry.symbols().join(", "));
    info!("Check interval: {} seconds", config.check_interval_secs);
    info!("Destination chat: {}", config.destination.chat_id);
    info!("Bot token: {}", config.destination.masked_token());
    info!("Liveness port: {}", config.port);

    let state = Arc::new(BotState::new(
        config.check_interval(),
        config.registry.instruments().to_vec(),
    ));

    let client = TelegramClient::new(&config.telegram_api_url, config.request_timeout())?;
    let generator = SignalGenerator::new(config.registry.clone(), Arc::new(RandomStrategy::new()));
    info!("Signal strategy: {}", generator.strategy_name());

    let pipeline = SignalPipeline::new(
        generator,
        Arc::new(client.clone()),
        config.destination.clone(),
        state.clone(),
        config.delivery_max_attempts,
    );

    let scheduler = Scheduler::new(pipeline.clone(), config.check_interval());
    let dispatcher = Arc::new(CommandDispatcher::new(pipeline));
    let poller = UpdatePoller::new(
        client,
        config.destination.clone(),
        dispatcher,
        config.poll_timeout_secs,
    );

    let health_task = tokio::spawn(health::serve(config.port, state));
    let scheduler_task = tokio::spawn(scheduler.run());
    let poller_task = tokio::spawn(poller.run());

    info!("Demo signal bot running");

    tokio::select! {
        result = health_task => match result {
            Ok(Ok(())) => error!("Liveness endpoint stopped"),
            Ok(Err(e)) => {
                error!("Liveness endpoint failed: {}", e);
                return Err(e.into());
            }
            Err(e) => error!("Liveness task panicked: {}", e),
        },
        _ = scheduler_task => error!("Scheduler task exited"),
        _ = poller_task => error!("Polling task exited"),
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
    }

    Ok(())
}
