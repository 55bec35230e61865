//! Plain-text views of quiz sessions and roadmaps for the chat.

use std::fmt::Write;

use crate::{
    pomodoro::{PomodoroPhase, PomodoroPlan},
    quiz::{
        roadmap::RoadmapGraph,
        session::{QuizSession, Score},
    },
};

const OPTION_LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

pub fn clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub fn question(session: &QuizSession) -> String {
    let Some(question) = session.current_question() else {
        return String::from("No question to show.");
    };
    let total = session.questions().len();
    let remaining = session
        .config()
        .time_limit_secs
        .saturating_sub(session.elapsed_seconds());

    let mut text = format!(
        "Question {} of {}  ⏱ {}\n\n{}\n",
        session.current_index() + 1,
        total,
        clock(remaining),
        question.question
    );
    for (letter, option) in OPTION_LETTERS.iter().zip(&question.options) {
        let mark = if session.current_answer() == Some(option.as_str()) {
            " ✓"
        } else {
            ""
        };
        let _ = write!(text, "\n{letter}) {option}{mark}");
    }

    let answered = session.selected().iter().filter(|a| a.is_some()).count();
    let _ = write!(text, "\n\nAnswered {answered}/{total}");
    if total > 1 {
        text.push_str("\nSend #N to jump to question N.");
    }
    text
}

pub fn results(session: &QuizSession, score: &Score) -> String {
    let mut text = format!(
        "{}\n\nYou got {} of {} right ({:.0}%) in {}.\n",
        score.feedback(),
        score.correct,
        score.total,
        score.percentage,
        score.time_string()
    );

    let reviewed = session.questions().iter().zip(session.selected());
    for (n, (question, answer)) in reviewed.enumerate() {
        let answer = answer.as_deref();
        let verdict = if question.is_correct(answer) { "✅" } else { "❌" };
        let _ = write!(
            text,
            "\n{verdict} {}. {}\n   Your answer: {}\n",
            n + 1,
            question.question,
            answer.unwrap_or("(no answer)")
        );
        if !question.is_correct(answer) {
            let _ = writeln!(text, "   Correct answer: {}", question.correct_answer);
        }
        if let Some(explanation) = &question.explanation {
            let _ = writeln!(text, "   {explanation}");
        }
    }
    text
}

pub fn roadmap(title: &str, graph: &RoadmapGraph) -> String {
    let mut text = format!("🗺 {title}\n");
    for (depth, label) in graph.outline() {
        let _ = write!(text, "\n{}• {label}", "   ".repeat(depth));
    }
    text
}

pub fn pomodoro_plan(plan: &PomodoroPlan) -> String {
    format!(
        "{} × {} min focus, {} min breaks. Total {}.",
        plan.cycles,
        plan.work_minutes,
        plan.break_minutes,
        clock(plan.total().as_secs())
    )
}

pub fn pomodoro_phase(phase: PomodoroPhase, remaining: u64) -> String {
    match phase {
        PomodoroPhase::Work { .. } => format!("🍅 {phase}: {} left", clock(remaining)),
        PomodoroPhase::Break { .. } => format!("☕ {phase}: {} left", clock(remaining)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::{
        fixtures,
        roadmap::fixtures::biology,
        session::{QuizConfig, SessionAction, Transition},
        Difficulty, QuizRequest,
    };

    fn active(count: usize) -> QuizSession {
        let config = QuizConfig::new(QuizRequest::new("Math", count, Difficulty::Medium), 120);
        let mut session = QuizSession::new(config);
        session
            .apply(SessionAction::Begin(fixtures::questions(count)))
            .unwrap();
        session
    }

    #[test]
    fn question_marks_the_selected_option() {
        let mut session = active(2);
        session
            .apply(SessionAction::Select("Q1 option 1".into()))
            .unwrap();
        session.apply(SessionAction::Tick { remaining: 95 }).unwrap();

        let text = question(&session);
        assert!(text.starts_with("Question 1 of 2  ⏱ 1:35"));
        assert!(text.contains("B) Q1 option 1 ✓"));
        assert!(text.contains("A) Q1 option 0\n"));
        assert!(text.contains("Answered 1/2"));
        assert!(text.ends_with("Send #N to jump to question N."));
    }

    #[test]
    fn results_review_every_question() {
        let mut session = active(2);
        session
            .apply(SessionAction::Select("Q1 option 2".into()))
            .unwrap();
        let Transition::Completed(score) = session.apply(SessionAction::Submit).unwrap() else {
            panic!("submit should complete");
        };

        let text = results(&session, &score);
        assert!(text.starts_with("Nice try!"));
        assert!(text.contains("You got 1 of 2 right (50%)"));
        assert!(text.contains("✅ 1. Question 1?"));
        assert!(text.contains("❌ 2. Question 2?\n   Your answer: (no answer)"));
        assert!(text.contains("Correct answer: Q2 option 2"));
    }

    #[test]
    fn roadmap_is_an_indented_outline() {
        let text = roadmap("Biology (beginner)", &biology());
        assert_eq!(
            text,
            "🗺 Biology (beginner)\n\n• Biology\n   • Cells\n   • Genetics\n      • DNA"
        );
    }

    #[test]
    fn clock_pads_seconds() {
        assert_eq!(clock(0), "0:00");
        assert_eq!(clock(65), "1:05");
        assert_eq!(clock(300), "5:00");
    }

    #[test]
    fn pomodoro_summary() {
        assert_eq!(
            pomodoro_plan(&PomodoroPlan::default()),
            "4 × 25 min focus, 5 min breaks. Total 115:00."
        );
        assert_eq!(
            pomodoro_phase(PomodoroPhase::Break { cycle: 2 }, 61),
            "☕ Break #2: 1:01 left"
        );
    }
}
