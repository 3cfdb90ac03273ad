use anyhow::Result;

mod app;
mod assistant;
mod catalog;
mod chat;
mod config;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[tokio::main]
async fn main() -> Result<()> {
    let app = App::new()?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, mut app: App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(&mut app, event).await?;
        }
    }

    Ok(())
}
