mod bot;
mod config;
mod error;
mod gateway;
mod llm;
mod pomodoro;
mod quiz;
mod render;
mod server;
mod store;
mod timer;

use std::{error::Error, net::SocketAddr, sync::Arc};

use dotenv::dotenv;
use log::{error, info};
use teloxide::{
    dispatching::dialogue::{serializer::Json, SqliteStorage, Storage},
    prelude::*,
};

use crate::{
    bot::{App, DialogueStorage},
    config::Config,
    gateway::PersistenceGateway,
    llm::generator_from_config,
    quiz::ai_helper::QuizHelper,
    server::ApiState,
};

#[tokio::main]
async fn main() {
    // A missing .env is fine, the variables may come from the environment.
    let _ = dotenv();
    pretty_env_logger::init();

    if let Err(e) = run().await {
        error!("Fatal: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = Config::from_env()?;
    info!("Starting studymate with model {}...", config.model);

    let helper = Arc::new(QuizHelper::new(
        generator_from_config(&config)?,
        config.shuffle_options,
    ));

    info!("Opening the record store...");
    let gateway = PersistenceGateway::new(store::open(&config.records_db).await?);

    info!("Opening dialogue storage at {}...", config.dialogue_db);
    let storage: DialogueStorage = SqliteStorage::open(&config.dialogue_db, Json)
        .await?
        .erase();

    let api = ApiState {
        helper: helper.clone(),
        gateway: gateway.clone(),
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tokio::spawn(async move {
        if let Err(e) = server::serve(api, addr).await {
            error!("HTTP API stopped: {e}");
        }
    });

    let app = Arc::new(App::new(helper, gateway, storage.clone()));
    let bot = Bot::from_env();

    info!("Starting dialogue bot...");
    Dispatcher::builder(bot, bot::schema())
        .dependencies(dptree::deps![storage, app])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    Ok(())
}
