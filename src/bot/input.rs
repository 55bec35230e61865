//! Parsing of the free-text and button replies the bot receives.

use crate::{
    pomodoro::PomodoroPlan,
    quiz::{roadmap::Level, Difficulty, QUESTION_COUNT_CHOICES, TIME_LIMIT_CHOICES},
};

pub const MAX_QUESTIONS: usize = 20;
/// Longest quiz a user may ask for.
pub const MAX_TIME_LIMIT_SECS: u64 = 60 * 60;

pub fn count_label(count: usize) -> String {
    count.to_string()
}

pub fn time_limit_label(secs: u64) -> String {
    format!("{} min", secs / 60)
}

pub fn count_labels() -> Vec<String> {
    QUESTION_COUNT_CHOICES.iter().copied().map(count_label).collect()
}

pub fn time_limit_labels() -> Vec<String> {
    TIME_LIMIT_CHOICES.iter().copied().map(time_limit_label).collect()
}

pub fn difficulty_labels() -> Vec<String> {
    [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard]
        .iter()
        .map(ToString::to_string)
        .collect()
}

pub fn level_labels() -> Vec<String> {
    Level::ALL.iter().map(ToString::to_string).collect()
}

/// Question count typed or picked by the user.
pub fn parse_count(text: &str) -> Result<usize, &'static str> {
    let count: usize = text
        .trim()
        .parse()
        .map_err(|_| "Please send a number")?;
    match count {
        0 => Err("Number of questions can't be 0"),
        n if n > MAX_QUESTIONS => Err("At most 20 questions per quiz"),
        n => Ok(n),
    }
}

/// Accepts `3 min`, `3` (minutes) or `90s`.
pub fn parse_time_limit(text: &str) -> Result<u64, &'static str> {
    let text = text.trim().to_lowercase();
    let secs = if let Some(secs) = text.strip_suffix('s') {
        secs.trim().parse::<u64>().ok()
    } else {
        text.trim_end_matches("min")
            .trim()
            .parse::<u64>()
            .ok()
            .and_then(|minutes| minutes.checked_mul(60))
    };
    match secs {
        Some(0) => Err("The time limit can't be 0"),
        Some(secs) if secs <= MAX_TIME_LIMIT_SECS => Ok(secs),
        _ => Err("Please pick one of the time limits"),
    }
}

pub fn parse_difficulty(text: &str) -> Result<Difficulty, &'static str> {
    match Difficulty::from(text.to_string()) {
        Difficulty::Other(_) => Err("Please pick easy, medium or hard"),
        difficulty => Ok(difficulty),
    }
}

/// `#3` picks question 3.
pub fn parse_question_number(text: &str) -> Option<usize> {
    text.trim()
        .strip_prefix('#')?
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
}

/// `work break cycles` in minutes, e.g. `25 5 4`. Missing trailing values
/// fall back to the classic plan.
pub fn parse_pomodoro_plan(text: &str) -> Result<PomodoroPlan, String> {
    let defaults = PomodoroPlan::default();
    let numbers = text
        .split(|c: char| c.is_whitespace() || c == '/')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| "Send three numbers: focus minutes, break minutes, cycles".to_string())?;
    if numbers.len() > 3 {
        return Err("Send three numbers: focus minutes, break minutes, cycles".to_string());
    }

    let value = |i: usize, default: u32| numbers.get(i).copied().unwrap_or(default);
    PomodoroPlan::new(
        value(0, defaults.work_minutes),
        value(1, defaults.break_minutes),
        value(2, defaults.cycles),
    )
    .map_err(|e| e.user_message("timer"))
}
