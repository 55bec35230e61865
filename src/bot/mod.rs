//! Telegram front end. Each chat walks a dialogue whose state is persisted
//! in SQLite, so a quiz in progress survives a bot restart.

mod input;
mod keyboards;
mod menu;
mod pomodoro;
mod quiz;
mod roadmap;
mod timers;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use teloxide::{
    dispatching::{dialogue::ErasedStorage, UpdateHandler},
    prelude::*,
    utils::command::BotCommands,
};

pub use timers::{PomodoroRegistry, TimerRegistry};

use crate::{
    gateway::PersistenceGateway,
    quiz::{
        ai_helper::QuizHelper,
        roadmap::{RoadmapGraph, RoadmapRequest},
        session::QuizSession,
        QuizRequest,
    },
    store::UserId,
};

pub type BotDialogue = Dialogue<State, ErasedStorage<State>>;
pub type DialogueStorage = Arc<ErasedStorage<State>>;
pub type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Clone, Default, Serialize, Deserialize)]
pub enum State {
    #[default]
    Start,
    Menu,
    ReceiveTopic,
    ReceiveQuestionCount {
        topic: String,
    },
    ReceiveDifficulty {
        topic: String,
        count: usize,
    },
    ReceiveTimeLimit {
        request: QuizRequest,
    },
    Quiz {
        session: QuizSession,
    },
    QuizResults {
        session: QuizSession,
    },
    ReceiveSubject,
    ReceiveLevel {
        subject: String,
    },
    RoadmapResult {
        request: RoadmapRequest,
        graph: RoadmapGraph,
    },
    ReceivePomodoroPlan,
    Pomodoro,
}

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "start over")]
    Start,
    #[command(description = "show the main menu")]
    Menu,
    #[command(description = "get a token for the web API")]
    Login,
    #[command(description = "show this text")]
    Help,
}

/// Everything the handlers share.
pub struct App {
    pub helper: Arc<QuizHelper>,
    pub gateway: PersistenceGateway,
    pub storage: DialogueStorage,
    pub timers: TimerRegistry,
    pub pomodoros: PomodoroRegistry,
}

impl App {
    pub fn new(
        helper: Arc<QuizHelper>,
        gateway: PersistenceGateway,
        storage: DialogueStorage,
    ) -> Self {
        Self {
            helper,
            gateway,
            storage,
            timers: TimerRegistry::default(),
            pomodoros: PomodoroRegistry::default(),
        }
    }

    /// Drops whatever timers the chat had running.
    pub fn release_timers(&self, chat_id: ChatId) {
        self.timers.stop(chat_id);
        self.pomodoros.stop(chat_id);
    }
}

/// Telegram users are identified by their numeric id.
pub fn user_of(msg: &Message) -> Option<UserId> {
    msg.from().map(|user| UserId::telegram(user.id.0))
}

pub fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    let commands = dptree::entry()
        .filter_command::<Command>()
        .endpoint(menu::command);

    Update::filter_message()
        .enter_dialogue::<Message, ErasedStorage<State>, State>()
        .branch(commands)
        .branch(dptree::case![State::Start].endpoint(menu::start))
        .branch(dptree::case![State::Menu].endpoint(menu::menu))
        .branch(dptree::case![State::ReceiveTopic].endpoint(quiz::receive_topic))
        .branch(dptree::case![State::ReceiveQuestionCount { topic }].endpoint(quiz::receive_count))
        .branch(
            dptree::case![State::ReceiveDifficulty { topic, count }]
                .endpoint(quiz::receive_difficulty),
        )
        .branch(
            dptree::case![State::ReceiveTimeLimit { request }]
                .endpoint(quiz::receive_time_limit),
        )
        .branch(dptree::case![State::Quiz { session }].endpoint(quiz::answer))
        .branch(dptree::case![State::QuizResults { session }].endpoint(quiz::results))
        .branch(dptree::case![State::ReceiveSubject].endpoint(roadmap::receive_subject))
        .branch(dptree::case![State::ReceiveLevel { subject }].endpoint(roadmap::receive_level))
        .branch(
            dptree::case![State::RoadmapResult { request, graph }].endpoint(roadmap::result),
        )
        .branch(dptree::case![State::ReceivePomodoroPlan].endpoint(pomodoro::receive_plan))
        .branch(dptree::case![State::Pomodoro].endpoint(pomodoro::running))
}
