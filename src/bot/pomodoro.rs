use std::sync::Arc;

use teloxide::prelude::*;

use super::{input, keyboards, menu, App, BotDialogue, HandlerResult, State};
use crate::render;

pub async fn receive_plan(
    bot: Bot,
    dialogue: BotDialogue,
    msg: Message,
    app: Arc<App>,
) -> HandlerResult {
    if msg.text() == Some(keyboards::MENU) {
        return menu::show_menu(&bot, &dialogue, &msg).await;
    }
    let plan = match input::parse_pomodoro_plan(msg.text().unwrap_or_default()) {
        Ok(plan) => plan,
        Err(reason) => {
            bot.send_message(msg.chat.id, reason)
                .reply_markup(keyboards::pomodoro_plans())
                .await?;
            return Ok(());
        }
    };

    bot.send_message(msg.chat.id, render::pomodoro_plan(&plan))
        .reply_markup(keyboards::pomodoro_running())
        .await?;
    app.pomodoros
        .start(bot.clone(), app.storage.clone(), msg.chat.id, plan);
    dialogue.update(State::Pomodoro).await?;
    Ok(())
}

pub async fn running(
    bot: Bot,
    dialogue: BotDialogue,
    msg: Message,
    app: Arc<App>,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    match msg.text() {
        Some(keyboards::PAUSE) | Some(keyboards::RESUME) => {
            let paused = msg.text() == Some(keyboards::PAUSE);
            let reply = match (app.pomodoros.set_paused(chat_id, paused), paused) {
                (false, _) => "The timer isn't running anymore.",
                (true, true) => "Paused.",
                (true, false) => "Resumed.",
            };
            bot.send_message(chat_id, reply).await?;
        }
        Some(keyboards::STOP) => {
            app.pomodoros.stop(chat_id);
            bot.send_message(chat_id, "Timer stopped.").await?;
            menu::show_menu(&bot, &dialogue, &msg).await?;
        }
        _ => {
            bot.send_message(chat_id, "Please pick one of the options")
                .reply_markup(keyboards::pomodoro_running())
                .await?;
        }
    }
    Ok(())
}
