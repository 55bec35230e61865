use std::sync::Arc;

use log::warn;
use teloxide::{prelude::*, types::ChatAction};

use super::{keyboards, menu, user_of, App, BotDialogue, HandlerResult, State};
use crate::{
    error::ApiError,
    quiz::roadmap::{Level, RoadmapGraph, RoadmapRequest},
    render,
    store::SaveRoadmap,
};

pub async fn receive_subject(bot: Bot, dialogue: BotDialogue, msg: Message) -> HandlerResult {
    let subject = msg.text().map(str::trim).unwrap_or_default();
    if subject.is_empty() {
        bot.send_message(msg.chat.id, "Please enter a subject").await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, "What's your current level?")
        .reply_markup(keyboards::levels())
        .await?;
    dialogue
        .update(State::ReceiveLevel {
            subject: subject.to_string(),
        })
        .await?;
    Ok(())
}

pub async fn receive_level(
    bot: Bot,
    dialogue: BotDialogue,
    subject: String,
    msg: Message,
    app: Arc<App>,
) -> HandlerResult {
    let level: Level = match msg.text().unwrap_or_default().parse() {
        Ok(level) => level,
        Err(e) => {
            bot.send_message(msg.chat.id, e.user_message("roadmap"))
                .reply_markup(keyboards::levels())
                .await?;
            return Ok(());
        }
    };

    let _ = bot.send_chat_action(msg.chat.id, ChatAction::Typing).await;
    let request = RoadmapRequest::new(subject, level);
    let graph = match app.helper.generate_roadmap(request.clone()).await {
        Ok(graph) => graph,
        Err(e) => {
            warn!("Roadmap generation for chat {} failed: {e}", msg.chat.id);
            bot.send_message(msg.chat.id, e.user_message("roadmap"))
                .reply_markup(keyboards::levels())
                .await?;
            return Ok(());
        }
    };

    let title = format!("{} ({})", request.subject, request.level);
    bot.send_message(msg.chat.id, render::roadmap(&title, &graph))
        .reply_markup(keyboards::roadmap_result())
        .await?;
    dialogue
        .update(State::RoadmapResult { request, graph })
        .await?;
    Ok(())
}

pub async fn result(
    bot: Bot,
    dialogue: BotDialogue,
    (request, graph): (RoadmapRequest, RoadmapGraph),
    msg: Message,
    app: Arc<App>,
) -> HandlerResult {
    match msg.text() {
        Some(keyboards::SAVE) => {
            let roadmap = SaveRoadmap::from_graph(&request, &graph)?;
            let user = user_of(&msg);
            let reply = match app.gateway.save_roadmap(user.as_ref(), roadmap).await {
                Ok(_) => "Saved! Find it under 📚 My history.".to_string(),
                Err(e) => ApiError::saving(e, "roadmap").to_string(),
            };
            bot.send_message(msg.chat.id, reply)
                .reply_markup(keyboards::roadmap_result())
                .await?;
        }
        Some(keyboards::MENU) => menu::show_menu(&bot, &dialogue, &msg).await?,
        _ => {
            bot.send_message(msg.chat.id, "Please pick one of the options")
                .reply_markup(keyboards::roadmap_result())
                .await?;
        }
    }
    Ok(())
}
