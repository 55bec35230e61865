use std::sync::Arc;

use log::{error, info};
use teloxide::{prelude::*, utils::command::BotCommands};

use super::{keyboards, user_of, App, BotDialogue, Command, HandlerResult, State};
use crate::render;

const GREETING_TEXT: &str = "Hi! I'm your study buddy. I can write quizzes on any topic, \
sketch a study roadmap for a subject, and keep time for focused study sessions.";

const HISTORY_LIMIT: usize = 5;

pub async fn command(
    bot: Bot,
    dialogue: BotDialogue,
    msg: Message,
    cmd: Command,
    app: Arc<App>,
) -> HandlerResult {
    match cmd {
        Command::Start => start(bot, dialogue, msg, app).await,
        Command::Menu => {
            let lock = app.timers.quiz_lock(msg.chat.id);
            let _guard = lock.lock().await;
            app.release_timers(msg.chat.id);
            show_menu(&bot, &dialogue, &msg).await
        }
        Command::Login => login(bot, msg, app).await,
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
            Ok(())
        }
    }
}

pub async fn start(
    bot: Bot,
    dialogue: BotDialogue,
    msg: Message,
    app: Arc<App>,
) -> HandlerResult {
    let lock = app.timers.quiz_lock(msg.chat.id);
    let _guard = lock.lock().await;
    app.release_timers(msg.chat.id);
    bot.send_message(msg.chat.id, GREETING_TEXT).await?;
    show_menu(&bot, &dialogue, &msg).await
}

pub async fn show_menu(bot: &Bot, dialogue: &BotDialogue, msg: &Message) -> HandlerResult {
    bot.send_message(msg.chat.id, "What would you like to do?")
        .reply_markup(keyboards::menu())
        .await?;
    dialogue.update(State::Menu).await?;
    Ok(())
}

pub async fn menu(
    bot: Bot,
    dialogue: BotDialogue,
    msg: Message,
    app: Arc<App>,
) -> HandlerResult {
    match msg.text() {
        Some(keyboards::NEW_QUIZ) => {
            bot.send_message(msg.chat.id, "What topic should the quiz cover?")
                .reply_markup(teloxide::types::KeyboardRemove::new())
                .await?;
            dialogue.update(State::ReceiveTopic).await?;
        }
        Some(keyboards::NEW_ROADMAP) => {
            bot.send_message(msg.chat.id, "Which subject do you want a roadmap for?")
                .reply_markup(teloxide::types::KeyboardRemove::new())
                .await?;
            dialogue.update(State::ReceiveSubject).await?;
        }
        Some(keyboards::POMODORO) => {
            bot.send_message(
                msg.chat.id,
                "Send focus minutes, break minutes and cycles, e.g. \"25 5 4\".",
            )
            .reply_markup(keyboards::pomodoro_plans())
            .await?;
            dialogue.update(State::ReceivePomodoroPlan).await?;
        }
        Some(keyboards::HISTORY) => history(&bot, &msg, &app).await?,
        _ => {
            bot.send_message(msg.chat.id, "Please pick one of the options")
                .reply_markup(keyboards::menu())
                .await?;
        }
    }
    Ok(())
}

async fn history(bot: &Bot, msg: &Message, app: &App) -> HandlerResult {
    let user = user_of(msg);
    let quizzes = app.gateway.list_quizzes(user.as_ref()).await;
    let roadmaps = app.gateway.list_roadmaps(user.as_ref()).await;
    let (quizzes, roadmaps) = match (quizzes, roadmaps) {
        (Ok(quizzes), Ok(roadmaps)) => (quizzes, roadmaps),
        (Err(e), _) | (_, Err(e)) => {
            error!("Error loading history for chat {}: {e}", msg.chat.id);
            bot.send_message(msg.chat.id, "Couldn't load your history. Please try again.")
                .await?;
            return Ok(());
        }
    };

    if quizzes.is_empty() && roadmaps.is_empty() {
        bot.send_message(
            msg.chat.id,
            "Nothing saved yet. Finish a quiz or a roadmap and press Save.",
        )
        .await?;
        return Ok(());
    }

    let mut text = String::from("📚 Your saved work\n");
    if !quizzes.is_empty() {
        text.push_str("\nQuizzes:\n");
        for record in quizzes.iter().take(HISTORY_LIMIT) {
            let total = record.quiz.questions.as_array().map_or(0, Vec::len);
            text.push_str(&format!(
                "• {} ({}), {}/{} in {}, {}\n",
                record.quiz.title,
                record.quiz.difficulty,
                record.quiz.score,
                total,
                render::clock(record.quiz.time_taken),
                record.created_at.format("%Y-%m-%d")
            ));
        }
    }
    if !roadmaps.is_empty() {
        text.push_str("\nRoadmaps:\n");
        for record in roadmaps.iter().take(HISTORY_LIMIT) {
            text.push_str(&format!(
                "• {} ({}), {}\n",
                record.roadmap.title,
                record.roadmap.level,
                record.created_at.format("%Y-%m-%d")
            ));
        }
    }
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn login(bot: Bot, msg: Message, app: Arc<App>) -> HandlerResult {
    let Some(user) = user_of(&msg) else {
        bot.send_message(msg.chat.id, "I can only log in real users.")
            .await?;
        return Ok(());
    };

    match app.gateway.store().create_login(&user).await {
        Ok(session) => {
            info!("Issued web session for {user}");
            let text = format!(
                "Your API token:\n{}\n\nSend it as \"Authorization: Bearer <token>\" \
                 or as the \"session\" cookie.",
                session.token
            );
            bot.send_message(msg.chat.id, text).await?;
        }
        Err(e) => {
            error!("Error issuing web session for {user}: {e}");
            bot.send_message(msg.chat.id, "Couldn't log you in. Please try again.")
                .await?;
        }
    }
    Ok(())
}
