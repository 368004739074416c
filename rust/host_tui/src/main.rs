use crate::{
    app::App,
    config::Config,
    event::{EventHandler, open_serial},
};

pub mod app;
pub mod config;
pub mod event;
pub mod plot;
pub mod recording;
pub mod ui;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let config = Config::from_env()?;
    eprintln!(
        "Connecting to the MCU on {} at {} baud. Set {} to use another port.",
        config.port,
        config.baud_rate,
        config::PORT_VAR
    );
    let stream = open_serial(&config.port, config.baud_rate).await;
    let terminal = ratatui::init();
    let result = App::new(EventHandler::new(stream), config)
        .run(terminal)
        .await;
    ratatui::restore();
    result
}
