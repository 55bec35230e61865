use std::sync::Arc;

use log::{debug, info, warn};
use teloxide::{
    prelude::*,
    types::{ChatAction, KeyboardMarkup},
};

use super::{input, keyboards, menu, user_of, App, BotDialogue, HandlerResult, State};
use crate::{
    error::ApiError,
    quiz::{
        session::{QuizConfig, QuizSession, SessionAction, SessionError, Transition},
        QuizRequest,
    },
    render,
    store::SaveQuiz,
};

pub async fn receive_topic(bot: Bot, dialogue: BotDialogue, msg: Message) -> HandlerResult {
    let topic = msg.text().map(str::trim).unwrap_or_default();
    if topic.is_empty() {
        bot.send_message(msg.chat.id, "Please enter a quiz topic")
            .await?;
        return Ok(());
    }

    bot.send_message(msg.chat.id, "How many questions?")
        .reply_markup(keyboards::question_counts())
        .await?;
    dialogue
        .update(State::ReceiveQuestionCount {
            topic: topic.to_string(),
        })
        .await?;
    Ok(())
}

pub async fn receive_count(
    bot: Bot,
    dialogue: BotDialogue,
    topic: String,
    msg: Message,
) -> HandlerResult {
    let count = match input::parse_count(msg.text().unwrap_or_default()) {
        Ok(count) => count,
        Err(reason) => {
            bot.send_message(msg.chat.id, reason).await?;
            return Ok(());
        }
    };

    bot.send_message(msg.chat.id, "Pick a difficulty")
        .reply_markup(keyboards::difficulties())
        .await?;
    dialogue
        .update(State::ReceiveDifficulty { topic, count })
        .await?;
    Ok(())
}

pub async fn receive_difficulty(
    bot: Bot,
    dialogue: BotDialogue,
    (topic, count): (String, usize),
    msg: Message,
) -> HandlerResult {
    let difficulty = match input::parse_difficulty(msg.text().unwrap_or_default()) {
        Ok(difficulty) => difficulty,
        Err(reason) => {
            bot.send_message(msg.chat.id, reason).await?;
            return Ok(());
        }
    };

    bot.send_message(msg.chat.id, "How much time do you want?")
        .reply_markup(keyboards::time_limits())
        .await?;
    dialogue
        .update(State::ReceiveTimeLimit {
            request: QuizRequest::new(topic, count, difficulty),
        })
        .await?;
    Ok(())
}

pub async fn receive_time_limit(
    bot: Bot,
    dialogue: BotDialogue,
    request: QuizRequest,
    msg: Message,
    app: Arc<App>,
) -> HandlerResult {
    let limit = match input::parse_time_limit(msg.text().unwrap_or_default()) {
        Ok(limit) => limit,
        Err(reason) => {
            bot.send_message(msg.chat.id, reason).await?;
            return Ok(());
        }
    };

    let session = QuizSession::new(QuizConfig::new(request, limit));
    launch(&bot, &dialogue, &msg, session, &app, keyboards::time_limits()).await
}

/// Generates questions for a session still in setup and starts it. On failure
/// the dialogue is left where it was so the user can try again.
async fn launch(
    bot: &Bot,
    dialogue: &BotDialogue,
    msg: &Message,
    mut session: QuizSession,
    app: &App,
    retry: KeyboardMarkup,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;

    let request = session.config().request.clone();
    let questions = match app.helper.generate_questions(request).await {
        Ok(questions) => questions,
        Err(e) => {
            warn!("Quiz generation for chat {chat_id} failed: {e}");
            bot.send_message(chat_id, e.user_message("questions"))
                .reply_markup(retry)
                .await?;
            return Ok(());
        }
    };
    session.apply(SessionAction::Begin(questions))?;

    let limit = session.config().time_limit_secs;
    app.timers
        .start(bot.clone(), app.storage.clone(), chat_id, session.id(), limit);
    info!("Started quiz {} in chat {chat_id}", session.id());

    bot.send_message(
        chat_id,
        format!("Let's go! You have {}.", render::clock(limit)),
    )
    .await?;
    show_question(bot, dialogue, msg, session).await
}

async fn show_question(
    bot: &Bot,
    dialogue: &BotDialogue,
    msg: &Message,
    session: QuizSession,
) -> HandlerResult {
    let options = session
        .current_question()
        .map(|q| q.options.clone())
        .unwrap_or_default();
    bot.send_message(msg.chat.id, render::question(&session))
        .reply_markup(keyboards::question(&options, session.is_last()))
        .await?;
    dialogue.update(State::Quiz { session }).await?;
    Ok(())
}

async fn finish(
    bot: &Bot,
    dialogue: &BotDialogue,
    msg: &Message,
    session: QuizSession,
    app: &App,
) -> HandlerResult {
    app.timers.stop(msg.chat.id);
    if let Some(score) = session.score() {
        bot.send_message(msg.chat.id, render::results(&session, score))
            .reply_markup(keyboards::results())
            .await?;
    }
    dialogue.update(State::QuizResults { session }).await?;
    Ok(())
}

/// Buttons navigate, `#N` jumps to question N and anything else is taken as
/// an answer to the current question.
fn action_for(session: &QuizSession, text: &str) -> SessionAction {
    let is_option = session
        .current_question()
        .is_some_and(|q| q.options.iter().any(|o| o == text));
    match text {
        keyboards::PREVIOUS => SessionAction::Previous,
        keyboards::NEXT => SessionAction::Next,
        keyboards::SUBMIT => SessionAction::Submit,
        _ if is_option => SessionAction::Select(text.to_string()),
        _ => match input::parse_question_number(text) {
            Some(number) => SessionAction::GoTo(number - 1),
            None => SessionAction::Select(text.to_string()),
        },
    }
}

pub async fn answer(
    bot: Bot,
    dialogue: BotDialogue,
    msg: Message,
    app: Arc<App>,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let lock = app.timers.quiz_lock(chat_id);
    let _guard = lock.lock().await;
    // The countdown may have finished the quiz while this update waited.
    let Some(State::Quiz { mut session }) = dialogue.get().await? else {
        debug!("Quiz in chat {chat_id} is already over");
        return Ok(());
    };

    let remaining = match app.timers.remaining(chat_id, session.id()) {
        Some(remaining) => remaining,
        None => {
            // Countdown lost, e.g. after a restart: resume it from the last known time.
            let left = session
                .config()
                .time_limit_secs
                .saturating_sub(session.elapsed_seconds());
            app.timers
                .start(bot.clone(), app.storage.clone(), chat_id, session.id(), left);
            left
        }
    };

    let action = if remaining == 0 {
        SessionAction::Expire
    } else {
        session.apply(SessionAction::Tick { remaining })?;
        match msg.text() {
            Some(text) => action_for(&session, text),
            None => {
                bot.send_message(chat_id, "Please pick one of the options")
                    .await?;
                return Ok(());
            }
        }
    };

    match session.apply(action) {
        Ok(Transition::Completed(_)) => {
            return finish(&bot, &dialogue, &msg, session, &app).await;
        }
        Ok(Transition::Selected { .. }) if !session.is_last() => {
            session.apply(SessionAction::Next)?;
        }
        Ok(_) => {}
        Err(SessionError::UnknownOption(_)) => {
            bot.send_message(chat_id, "Please pick one of the options")
                .await?;
        }
        Err(e) => {
            bot.send_message(chat_id, e.to_string()).await?;
        }
    }
    show_question(&bot, &dialogue, &msg, session).await
}

pub async fn results(
    bot: Bot,
    dialogue: BotDialogue,
    session: QuizSession,
    msg: Message,
    app: Arc<App>,
) -> HandlerResult {
    match msg.text() {
        Some(keyboards::SAVE) => {
            let Some(quiz) = SaveQuiz::from_session(&session)? else {
                return Ok(());
            };
            let user = user_of(&msg);
            let reply = match app.gateway.save_quiz(user.as_ref(), quiz).await {
                Ok(_) => "Saved! Find it under 📚 My history.".to_string(),
                Err(e) => ApiError::saving(e, "quiz").to_string(),
            };
            bot.send_message(msg.chat.id, reply)
                .reply_markup(keyboards::results())
                .await?;
        }
        Some(keyboards::RESTART) => {
            let fresh = session.clone().restart();
            launch(&bot, &dialogue, &msg, fresh, &app, keyboards::results()).await?;
        }
        Some(keyboards::MENU) => menu::show_menu(&bot, &dialogue, &msg).await?,
        _ => {
            bot.send_message(msg.chat.id, "Please pick one of the options")
                .reply_markup(keyboards::results())
                .await?;
        }
    }
    Ok(())
}
