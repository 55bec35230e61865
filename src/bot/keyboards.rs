use teloxide::types::{KeyboardButton, KeyboardMarkup};

use super::input;

pub const NEW_QUIZ: &str = "📝 New quiz";
pub const NEW_ROADMAP: &str = "🗺 New roadmap";
pub const POMODORO: &str = "🍅 Pomodoro";
pub const HISTORY: &str = "📚 My history";

pub const PREVIOUS: &str = "⬅️ Previous";
pub const NEXT: &str = "Next ➡️";
pub const SUBMIT: &str = "✅ Submit";

pub const SAVE: &str = "💾 Save";
pub const RESTART: &str = "🔁 Try again";
pub const MENU: &str = "🏠 Menu";

pub const CLASSIC_POMODORO: &str = "25 5 4";
pub const PAUSE: &str = "⏸ Pause";
pub const RESUME: &str = "▶️ Resume";
pub const STOP: &str = "⏹ Stop";

fn rows<I, R, S>(rows: I) -> KeyboardMarkup
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = S>,
    S: Into<String>,
{
    KeyboardMarkup::new(
        rows.into_iter()
            .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>()),
    )
    .resize_keyboard(true)
}

fn single_row(labels: Vec<String>) -> KeyboardMarkup {
    rows([labels])
}

pub fn menu() -> KeyboardMarkup {
    rows([[NEW_QUIZ, NEW_ROADMAP], [POMODORO, HISTORY]])
}

pub fn question_counts() -> KeyboardMarkup {
    single_row(input::count_labels())
}

pub fn difficulties() -> KeyboardMarkup {
    single_row(input::difficulty_labels())
}

pub fn time_limits() -> KeyboardMarkup {
    single_row(input::time_limit_labels())
}

pub fn levels() -> KeyboardMarkup {
    single_row(input::level_labels())
}

/// One option per row, then navigation.
pub fn question(options: &[String], is_last: bool) -> KeyboardMarkup {
    let mut keyboard: Vec<Vec<String>> = options.iter().map(|o| vec![o.clone()]).collect();
    keyboard.push(vec![PREVIOUS.to_string(), NEXT.to_string()]);
    if is_last {
        keyboard.push(vec![SUBMIT.to_string()]);
    }
    rows(keyboard)
}

pub fn results() -> KeyboardMarkup {
    rows([[SAVE, RESTART, MENU]])
}

pub fn roadmap_result() -> KeyboardMarkup {
    rows([[SAVE, MENU]])
}

pub fn pomodoro_plans() -> KeyboardMarkup {
    rows(vec![vec![CLASSIC_POMODORO, "50 10 2", "15 3 4"], vec![MENU]])
}

pub fn pomodoro_running() -> KeyboardMarkup {
    rows([[PAUSE, RESUME, STOP]])
}
