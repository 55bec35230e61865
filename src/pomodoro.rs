use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    error::GenerationError,
    timer::{Countdown, CountdownEvent},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PomodoroPlan {
    pub work_minutes: u32,
    pub break_minutes: u32,
    pub cycles: u32,
}

impl Default for PomodoroPlan {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            break_minutes: 5,
            cycles: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PomodoroPhase {
    Work { cycle: u32 },
    Break { cycle: u32 },
}

impl fmt::Display for PomodoroPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PomodoroPhase::Work { cycle } => write!(f, "Focus #{cycle}"),
            PomodoroPhase::Break { cycle } => write!(f, "Break #{cycle}"),
        }
    }
}

impl PomodoroPlan {
    pub fn new(
        work_minutes: u32,
        break_minutes: u32,
        cycles: u32,
    ) -> Result<Self, GenerationError> {
        if work_minutes == 0 || break_minutes == 0 || cycles == 0 {
            return Err(GenerationError::InvalidRequest(
                "Work time, break time and cycles must all be above zero".to_string(),
            ));
        }
        Ok(Self {
            work_minutes,
            break_minutes,
            cycles,
        })
    }

    /// Work, break, work, ... with no break after the last work phase.
    pub fn phases(&self) -> Vec<PomodoroPhase> {
        (1..=self.cycles)
            .flat_map(|cycle| {
                let rest = (cycle < self.cycles).then_some(PomodoroPhase::Break { cycle });
                std::iter::once(PomodoroPhase::Work { cycle }).chain(rest)
            })
            .collect()
    }

    pub fn duration_of(&self, phase: PomodoroPhase) -> Duration {
        let minutes = match phase {
            PomodoroPhase::Work { .. } => self.work_minutes,
            PomodoroPhase::Break { .. } => self.break_minutes,
        };
        Duration::from_secs(u64::from(minutes) * 60)
    }

    pub fn total(&self) -> Duration {
        self.phases().into_iter().map(|p| self.duration_of(p)).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PomodoroEvent {
    PhaseStarted(PomodoroPhase),
    Tick { phase: PomodoroPhase, remaining: u64 },
    Finished,
}

/// Owner's side of a running pomodoro. Dropping it stops the run.
#[derive(Debug)]
pub struct PomodoroHandle {
    paused: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PomodoroHandle {
    pub fn pause(&self) {
        let _ = self.paused.send(true);
    }

    pub fn resume(&self) {
        let _ = self.paused.send(false);
    }

    pub fn stop(self) {}
}

impl Drop for PomodoroHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub fn start(
    plan: PomodoroPlan,
    period: Duration,
) -> (PomodoroHandle, mpsc::Receiver<PomodoroEvent>) {
    let (paused_tx, paused_rx) = watch::channel(false);
    let (events_tx, events_rx) = mpsc::channel(16);
    let task = tokio::spawn(run(plan, period, paused_rx, events_tx));

    (
        PomodoroHandle {
            paused: paused_tx,
            task,
        },
        events_rx,
    )
}

async fn run(
    plan: PomodoroPlan,
    period: Duration,
    mut paused: watch::Receiver<bool>,
    events: mpsc::Sender<PomodoroEvent>,
) {
    for phase in plan.phases() {
        if events.send(PomodoroEvent::PhaseStarted(phase)).await.is_err() {
            return;
        }

        let (countdown, mut ticks) = Countdown::start(plan.duration_of(phase), period);
        if *paused.borrow_and_update() {
            countdown.pause();
        }

        loop {
            tokio::select! {
                event = ticks.recv() => match event {
                    Some(CountdownEvent::Tick { remaining }) => {
                        if events.send(PomodoroEvent::Tick { phase, remaining }).await.is_err() {
                            return;
                        }
                    }
                    Some(CountdownEvent::Expired) | None => break,
                },
                changed = paused.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    if *paused.borrow_and_update() {
                        countdown.pause();
                    } else {
                        countdown.resume();
                    }
                }
            }
        }
    }

    let _ = events.send(PomodoroEvent::Finished).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_is_classic() {
        let plan = PomodoroPlan::default();
        assert_eq!((plan.work_minutes, plan.break_minutes, plan.cycles), (25, 5, 4));
        assert_eq!(plan.phases().len(), 7);
        assert_eq!(plan.total(), Duration::from_secs((4 * 25 + 3 * 5) * 60));
    }

    #[test]
    fn two_cycles_alternate_without_trailing_break() {
        let plan = PomodoroPlan::new(25, 5, 2).unwrap();
        assert_eq!(
            plan.phases(),
            vec![
                PomodoroPhase::Work { cycle: 1 },
                PomodoroPhase::Break { cycle: 1 },
                PomodoroPhase::Work { cycle: 2 },
            ]
        );
    }

    #[test]
    fn zero_values_are_rejected() {
        assert!(PomodoroPlan::new(0, 5, 4).is_err());
        assert!(PomodoroPlan::new(25, 0, 4).is_err());
        assert!(PomodoroPlan::new(25, 5, 0).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn runs_every_phase_in_order() {
        let plan = PomodoroPlan::new(1, 1, 2).unwrap();
        let (_handle, mut rx) = start(plan, Duration::from_secs(30));

        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            seen.push(event);
        }

        let work1 = PomodoroPhase::Work { cycle: 1 };
        let rest1 = PomodoroPhase::Break { cycle: 1 };
        let work2 = PomodoroPhase::Work { cycle: 2 };
        assert_eq!(
            seen,
            vec![
                PomodoroEvent::PhaseStarted(work1),
                PomodoroEvent::Tick { phase: work1, remaining: 30 },
                PomodoroEvent::PhaseStarted(rest1),
                PomodoroEvent::Tick { phase: rest1, remaining: 30 },
                PomodoroEvent::PhaseStarted(work2),
                PomodoroEvent::Tick { phase: work2, remaining: 30 },
                PomodoroEvent::Finished,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stopping_ends_the_run() {
        let (handle, mut rx) = start(PomodoroPlan::default(), Duration::from_secs(60));
        assert_eq!(
            rx.recv().await,
            Some(PomodoroEvent::PhaseStarted(PomodoroPhase::Work { cycle: 1 }))
        );

        handle.stop();
        let mut rest = Vec::new();
        while let Some(event) = rx.recv().await {
            rest.push(event);
        }
        assert!(!rest.contains(&PomodoroEvent::Finished));
    }
}
