use std::time::Duration;

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{sleep, Instant},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    Tick { remaining: u64 },
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Running,
    Paused,
}

/// Owner's side of a running countdown.
///
/// Dropping the handle stops the countdown, so a countdown can never outlive
/// whatever is holding it.
#[derive(Debug)]
pub struct CountdownHandle {
    control: watch::Sender<Control>,
    task: JoinHandle<()>,
}

impl CountdownHandle {
    pub fn pause(&self) {
        let _ = self.control.send(Control::Paused);
    }

    pub fn resume(&self) {
        let _ = self.control.send(Control::Running);
    }

    pub fn cancel(self) {
        // Drop does the work.
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct Countdown;

impl Countdown {
    /// Starts counting `total` down, reporting every `period`.
    ///
    /// The receiver sees a `Tick` after every period that leaves time on the
    /// clock, then a single `Expired`, then the channel closes.
    pub fn start(
        total: Duration,
        period: Duration,
    ) -> (CountdownHandle, mpsc::Receiver<CountdownEvent>) {
        let (control_tx, control_rx) = watch::channel(Control::Running);
        let (events_tx, events_rx) = mpsc::channel(16);
        let task = tokio::spawn(run(total, period, control_rx, events_tx));

        (
            CountdownHandle {
                control: control_tx,
                task,
            },
            events_rx,
        )
    }
}

async fn run(
    mut remaining: Duration,
    period: Duration,
    mut control: watch::Receiver<Control>,
    events: mpsc::Sender<CountdownEvent>,
) {
    loop {
        if *control.borrow_and_update() == Control::Paused {
            if control.changed().await.is_err() {
                return;
            }
            continue;
        }

        if remaining.is_zero() {
            let _ = events.send(CountdownEvent::Expired).await;
            return;
        }

        let step = period.min(remaining);
        let started = Instant::now();
        tokio::select! {
            _ = sleep(step) => {
                remaining = remaining.saturating_sub(step);
                if !remaining.is_zero() {
                    let tick = CountdownEvent::Tick { remaining: remaining.as_secs() };
                    if events.send(tick).await.is_err() {
                        return;
                    }
                }
            }
            changed = control.changed() => {
                if changed.is_err() {
                    return;
                }
                remaining = remaining.saturating_sub(started.elapsed());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc::error::TryRecvError;

    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    async fn drain(rx: &mut mpsc::Receiver<CountdownEvent>) -> Vec<CountdownEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_then_expires_exactly_once() {
        let (_handle, mut rx) = Countdown::start(3 * SECOND, SECOND);
        assert_eq!(
            drain(&mut rx).await,
            vec![
                CountdownEvent::Tick { remaining: 2 },
                CountdownEvent::Tick { remaining: 1 },
                CountdownEvent::Expired,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_expires_immediately() {
        let (_handle, mut rx) = Countdown::start(Duration::ZERO, SECOND);
        assert_eq!(drain(&mut rx).await, vec![CountdownEvent::Expired]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_countdown_never_expires() {
        let (handle, mut rx) = Countdown::start(3 * SECOND, SECOND);
        assert_eq!(rx.recv().await, Some(CountdownEvent::Tick { remaining: 2 }));

        handle.cancel();
        assert_eq!(drain(&mut rx).await, Vec::new());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_ticking() {
        let (handle, mut rx) = Countdown::start(60 * SECOND, SECOND);
        drop(handle);
        sleep(120 * SECOND).await;
        assert!(!drain(&mut rx).await.contains(&CountdownEvent::Expired));
    }

    #[tokio::test(start_paused = true)]
    async fn paused_countdown_holds_its_time() {
        let (handle, mut rx) = Countdown::start(3 * SECOND, SECOND);
        assert_eq!(rx.recv().await, Some(CountdownEvent::Tick { remaining: 2 }));

        handle.pause();
        sleep(30 * SECOND).await;
        assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));

        handle.resume();
        assert_eq!(
            drain(&mut rx).await,
            vec![CountdownEvent::Tick { remaining: 1 }, CountdownEvent::Expired]
        );
    }
}
