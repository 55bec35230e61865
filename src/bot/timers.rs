use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use log::{debug, warn};
use teloxide::{prelude::*, types::MessageId};
use tokio::time::Instant;
use uuid::Uuid;

use super::{input::MAX_TIME_LIMIT_SECS, keyboards, BotDialogue, DialogueStorage, State};
use crate::{
    pomodoro::{self, PomodoroEvent, PomodoroHandle, PomodoroPlan},
    quiz::session::{Phase, QuizSession, SessionAction, Transition},
    render,
    timer::{Countdown, CountdownEvent, CountdownHandle},
};

/// A quiz tick with this much time or less left sends a warning.
const QUIZ_TICK: Duration = Duration::from_secs(30);
const POMODORO_TICK: Duration = Duration::from_secs(60);

/// Held while a chat's quiz state is read, changed and written back.
pub type QuizLock = Arc<tokio::sync::Mutex<()>>;

struct QuizTimer {
    session: Uuid,
    deadline: Instant,
    handle: CountdownHandle,
}

type QuizTimers = Arc<Mutex<HashMap<ChatId, QuizTimer>>>;

/// One quiz countdown per chat. Replacing or removing an entry drops its
/// handle, which stops the countdown.
///
/// Expiry and the answer handler both complete quizzes, so both take the
/// chat's [`QuizLock`] and re-read the dialogue under it.
#[derive(Default)]
pub struct TimerRegistry {
    timers: QuizTimers,
    locks: Mutex<HashMap<ChatId, QuizLock>>,
}

impl TimerRegistry {
    pub fn start(
        &self,
        bot: Bot,
        storage: DialogueStorage,
        chat_id: ChatId,
        session: Uuid,
        limit_secs: u64,
    ) {
        let total = Duration::from_secs(limit_secs.min(MAX_TIME_LIMIT_SECS));
        let Some(deadline) = Instant::now().checked_add(total) else {
            warn!("Quiz timer for chat {chat_id} is out of range, not starting it");
            return;
        };
        let (handle, events) = Countdown::start(total, QUIZ_TICK);
        tokio::spawn(watch_quiz(
            bot,
            storage,
            chat_id,
            session,
            events,
            self.quiz_lock(chat_id),
            Arc::clone(&self.timers),
        ));

        let timer = QuizTimer {
            session,
            deadline,
            handle,
        };
        self.timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(chat_id, timer);
    }

    /// Seconds left on the chat's countdown for `session`, if it is running.
    pub fn remaining(&self, chat_id: ChatId, session: Uuid) -> Option<u64> {
        let timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        let timer = timers.get(&chat_id).filter(|t| t.session == session)?;
        Some(timer.deadline.saturating_duration_since(Instant::now()).as_secs())
    }

    pub fn stop(&self, chat_id: ChatId) {
        let removed = self
            .timers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&chat_id);
        if let Some(timer) = removed {
            timer.handle.cancel();
        }
    }

    pub fn quiz_lock(&self, chat_id: ChatId) -> QuizLock {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(chat_id)
            .or_default()
            .clone()
    }
}

/// Drops the chat's timer entry if it still belongs to `session`.
fn forget(timers: &QuizTimers, chat_id: ChatId, session: Uuid) {
    let mut timers = timers.lock().unwrap_or_else(PoisonError::into_inner);
    if timers.get(&chat_id).is_some_and(|t| t.session == session) {
        timers.remove(&chat_id);
    }
}

async fn watch_quiz(
    bot: Bot,
    storage: DialogueStorage,
    chat_id: ChatId,
    session_id: Uuid,
    mut events: tokio::sync::mpsc::Receiver<CountdownEvent>,
    lock: QuizLock,
    timers: QuizTimers,
) {
    while let Some(event) = events.recv().await {
        let result: super::HandlerResult = match event {
            CountdownEvent::Tick { remaining } if remaining <= QUIZ_TICK.as_secs() => bot
                .send_message(chat_id, format!("⏰ {} left!", render::clock(remaining)))
                .await
                .map(|_| ())
                .map_err(Into::into),
            CountdownEvent::Tick { .. } => Ok(()),
            CountdownEvent::Expired => {
                let _guard = lock.lock().await;
                let result = expire_quiz(&bot, storage.clone(), chat_id, session_id).await;
                forget(&timers, chat_id, session_id);
                result
            }
        };
        if let Err(e) = result {
            warn!("Quiz timer for chat {chat_id} failed: {e}");
        }
    }
}

/// Completes the chat's quiz if `session_id` is still the one being played.
/// Returns the finished session, or `None` when there was nothing to expire.
async fn expire_in_dialogue(
    dialogue: &BotDialogue,
    session_id: Uuid,
) -> Result<Option<QuizSession>, Box<dyn std::error::Error + Send + Sync>> {
    let Some(State::Quiz { mut session }) = dialogue.get().await? else {
        debug!("Quiz in chat {} already left, nothing to expire", dialogue.chat_id());
        return Ok(None);
    };
    if session.id() != session_id || session.phase() != Phase::Active {
        return Ok(None);
    }

    let Transition::Completed(_) = session.apply(SessionAction::Expire)? else {
        return Ok(None);
    };
    dialogue
        .update(State::QuizResults {
            session: session.clone(),
        })
        .await?;
    Ok(Some(session))
}

async fn expire_quiz(
    bot: &Bot,
    storage: DialogueStorage,
    chat_id: ChatId,
    session_id: Uuid,
) -> super::HandlerResult {
    let dialogue = BotDialogue::new(storage, chat_id);
    let Some(session) = expire_in_dialogue(&dialogue, session_id).await? else {
        return Ok(());
    };
    if let Some(score) = session.score() {
        let text = format!("⌛ Time's up!\n\n{}", render::results(&session, score));
        bot.send_message(chat_id, text)
            .reply_markup(keyboards::results())
            .await?;
    }
    Ok(())
}

/// One pomodoro per chat.
#[derive(Default)]
pub struct PomodoroRegistry {
    runs: Mutex<HashMap<ChatId, PomodoroHandle>>,
}

impl PomodoroRegistry {
    pub fn start(
        &self,
        bot: Bot,
        storage: DialogueStorage,
        chat_id: ChatId,
        plan: PomodoroPlan,
    ) {
        let (handle, events) = pomodoro::start(plan, POMODORO_TICK);
        tokio::spawn(watch_pomodoro(bot, storage, chat_id, events));
        if let Ok(mut runs) = self.runs.lock() {
            runs.insert(chat_id, handle);
        }
    }

    /// Returns false when the chat has no pomodoro running.
    pub fn set_paused(&self, chat_id: ChatId, paused: bool) -> bool {
        let Ok(runs) = self.runs.lock() else {
            return false;
        };
        match runs.get(&chat_id) {
            Some(handle) if paused => handle.pause(),
            Some(handle) => handle.resume(),
            None => return false,
        }
        true
    }

    pub fn stop(&self, chat_id: ChatId) {
        if let Ok(mut runs) = self.runs.lock() {
            if let Some(handle) = runs.remove(&chat_id) {
                handle.stop();
            }
        }
    }
}

async fn watch_pomodoro(
    bot: Bot,
    storage: DialogueStorage,
    chat_id: ChatId,
    mut events: tokio::sync::mpsc::Receiver<PomodoroEvent>,
) {
    let mut status: Option<MessageId> = None;
    while let Some(event) = events.recv().await {
        let result: super::HandlerResult = match event {
            PomodoroEvent::PhaseStarted(phase) => {
                let text = format!("{phase} started");
                match bot.send_message(chat_id, text).await {
                    Ok(sent) => {
                        status = Some(sent.id);
                        Ok(())
                    }
                    Err(e) => Err(e.into()),
                }
            }
            PomodoroEvent::Tick { phase, remaining } => match status {
                Some(id) => bot
                    .edit_message_text(chat_id, id, render::pomodoro_phase(phase, remaining))
                    .await
                    .map(|_| ())
                    .map_err(Into::into),
                None => Ok(()),
            },
            PomodoroEvent::Finished => finish_pomodoro(&bot, storage.clone(), chat_id).await,
        };
        if let Err(e) = result {
            warn!("Pomodoro for chat {chat_id} failed: {e}");
        }
    }
}

async fn finish_pomodoro(
    bot: &Bot,
    storage: DialogueStorage,
    chat_id: ChatId,
) -> super::HandlerResult {
    bot.send_message(chat_id, "🎉 All cycles done. Great focus!")
        .reply_markup(keyboards::menu())
        .await?;
    let dialogue = BotDialogue::new(storage, chat_id);
    if matches!(dialogue.get().await?, Some(State::Pomodoro)) {
        dialogue.update(State::Menu).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use teloxide::dispatching::dialogue::{InMemStorage, Storage};

    use super::*;
    use crate::quiz::{fixtures, session::QuizConfig, Difficulty, QuizRequest};

    const CHAT: ChatId = ChatId(42);

    fn active_session() -> QuizSession {
        let request = QuizRequest::new("Math", 2, Difficulty::Medium);
        let mut session = QuizSession::new(QuizConfig::new(request, 120));
        session
            .apply(SessionAction::Begin(fixtures::questions(2)))
            .unwrap();
        session
    }

    async fn dialogue_with(state: State) -> BotDialogue {
        let storage: DialogueStorage = InMemStorage::<State>::new().erase();
        let dialogue = BotDialogue::new(storage, CHAT);
        dialogue.update(state).await.unwrap();
        dialogue
    }

    #[tokio::test]
    async fn expiry_completes_the_quiz_once() {
        let session = active_session();
        let id = session.id();
        let dialogue = dialogue_with(State::Quiz { session }).await;

        let finished = expire_in_dialogue(&dialogue, id).await.unwrap().unwrap();
        assert_eq!(finished.phase(), Phase::Completed);
        assert_eq!(finished.elapsed_seconds(), 120);
        assert!(matches!(
            dialogue.get().await.unwrap(),
            Some(State::QuizResults { .. })
        ));

        assert!(expire_in_dialogue(&dialogue, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expiry_scores_the_answers_already_written() {
        let mut session = active_session();
        session
            .apply(SessionAction::Select("Q1 option 2".into()))
            .unwrap();
        let id = session.id();
        let dialogue = dialogue_with(State::Quiz { session }).await;

        let finished = expire_in_dialogue(&dialogue, id).await.unwrap().unwrap();
        assert_eq!(finished.score().unwrap().correct, 1);
    }

    #[tokio::test]
    async fn expiry_leaves_a_newer_quiz_alone() {
        let stale = active_session().id();
        let dialogue = dialogue_with(State::Quiz {
            session: active_session(),
        })
        .await;

        assert!(expire_in_dialogue(&dialogue, stale).await.unwrap().is_none());
        assert!(matches!(
            dialogue.get().await.unwrap(),
            Some(State::Quiz { .. })
        ));
    }

    #[tokio::test]
    async fn quiz_lock_is_shared_per_chat() {
        let registry = TimerRegistry::default();
        let lock = registry.quiz_lock(CHAT);
        assert!(Arc::ptr_eq(&lock, &registry.quiz_lock(CHAT)));
        assert!(!Arc::ptr_eq(&lock, &registry.quiz_lock(ChatId(7))));

        let _guard = lock.lock().await;
        assert!(registry.quiz_lock(CHAT).try_lock().is_err());
        assert!(registry.quiz_lock(ChatId(7)).try_lock().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn forgetting_only_drops_the_matching_session() {
        let timers = QuizTimers::default();
        let session = Uuid::new_v4();
        let (handle, _events) = Countdown::start(Duration::from_secs(60), QUIZ_TICK);
        let timer = QuizTimer {
            session,
            deadline: Instant::now(),
            handle,
        };
        timers.lock().unwrap().insert(CHAT, timer);

        forget(&timers, CHAT, Uuid::new_v4());
        assert!(timers.lock().unwrap().contains_key(&CHAT));
        forget(&timers, CHAT, session);
        assert!(!timers.lock().unwrap().contains_key(&CHAT));
    }
}
