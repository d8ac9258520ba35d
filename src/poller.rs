use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::live_feed::{FeedState, ShotEvent, merge_snapshot};
use crate::state::{Delta, WatchTarget};

/// Consecutive failed polls before the feed is reported as stale.
const STALE_AFTER_FAILURES: u32 = 3;

/// Anything that can answer "what is the latest shot?" once per tick.
/// `Ok(None)` is the no-content answer.
pub trait ShotSource {
    fn peek_shot(&mut self) -> Result<Option<ShotEvent>>;
}

impl<T: ShotSource + ?Sized> ShotSource for Box<T> {
    fn peek_shot(&mut self) -> Result<Option<ShotEvent>> {
        (**self).peek_shot()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        let mut cancelled = flag.lock().unwrap_or_else(|e| e.into_inner());
        *cancelled = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Blocks for up to `timeout`. Returns `true` if the token was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(|e| e.into_inner());
        *guard
    }
}

pub trait Clock {
    fn now(&self) -> Instant;

    /// Waits until `deadline` unless `token` is cancelled first.
    /// Returns `false` when the wait ended because of cancellation.
    fn wait_until(&self, deadline: Instant, token: &CancelToken) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wait_until(&self, deadline: Instant, token: &CancelToken) -> bool {
        let timeout = deadline.saturating_duration_since(Instant::now());
        if timeout.is_zero() {
            return !token.is_cancelled();
        }
        !token.wait_timeout(timeout)
    }
}

/// Manually driven clock. Waiting jumps straight to the deadline.
#[derive(Debug, Clone)]
pub struct FakeClock {
    now: Arc<Mutex<Instant>>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn wait_until(&self, deadline: Instant, token: &CancelToken) -> bool {
        if token.is_cancelled() {
            return false;
        }
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        if deadline > *now {
            *now = deadline;
        }
        true
    }
}

/// Lazy, infinite sequence of poll results: one item per tick, `None`
/// inside the item when the backend had nothing new or the poll failed.
/// Ends only when its token is cancelled; `restart` re-arms it.
pub struct ShotStream<S, C> {
    source: S,
    clock: C,
    interval: Duration,
    token: CancelToken,
    next_tick: Option<Instant>,
    polls: u64,
    consecutive_failures: u32,
    last_error: Option<String>,
}

impl<S: ShotSource, C: Clock> ShotStream<S, C> {
    pub fn new(source: S, clock: C, interval: Duration) -> Self {
        Self {
            source,
            clock,
            interval,
            token: CancelToken::new(),
            next_tick: None,
            polls: 0,
            consecutive_failures: 0,
            last_error: None,
        }
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Fresh token and schedule; the source and counters are kept.
    pub fn restart(&mut self) -> CancelToken {
        self.token = CancelToken::new();
        self.next_tick = None;
        self.consecutive_failures = 0;
        self.token.clone()
    }

    pub fn polls(&self) -> u64 {
        self.polls
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

impl<S: ShotSource, C: Clock> Iterator for ShotStream<S, C> {
    type Item = Option<ShotEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.token.is_cancelled() {
            return None;
        }
        let deadline = self.next_tick.unwrap_or_else(|| self.clock.now());
        if !self.clock.wait_until(deadline, &self.token) || self.token.is_cancelled() {
            return None;
        }

        self.polls += 1;
        let item = match self.source.peek_shot() {
            Ok(event) => {
                self.consecutive_failures = 0;
                event
            }
            Err(err) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                self.last_error = Some(format!("{err:#}"));
                None
            }
        };

        // A slow poll pushes the next tick back instead of queueing a burst.
        let mut next = deadline + self.interval;
        let now = self.clock.now();
        if next < now {
            next = now;
        }
        self.next_tick = Some(next);

        Some(item)
    }
}

/// One live watch session: a poll thread owning the session's `FeedState`.
pub struct WatchSession {
    token: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl WatchSession {
    pub fn spawn<S>(target: WatchTarget, source: S, interval: Duration, tx: Sender<Delta>) -> Self
    where
        S: ShotSource + Send + 'static,
    {
        Self::spawn_with_clock(target, source, SystemClock, interval, tx)
    }

    pub fn spawn_with_clock<S, C>(
        target: WatchTarget,
        source: S,
        clock: C,
        interval: Duration,
        tx: Sender<Delta>,
    ) -> Self
    where
        S: ShotSource + Send + 'static,
        C: Clock + Send + 'static,
    {
        let stream = ShotStream::new(source, clock, interval);
        let token = stream.token();
        let handle = thread::spawn(move || run_session(stream, target, tx));
        Self {
            token,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancels the poll thread and waits for it, so no poll can start after
    /// this returns.
    pub fn stop(&mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_session<S, C>(mut stream: ShotStream<S, C>, target: WatchTarget, tx: Sender<Delta>)
where
    S: ShotSource,
    C: Clock,
{
    let mut feed = FeedState::new();
    let mut paused = false;
    let mut stale = false;

    while let Some(event) = stream.next() {
        let mut changed = merge_snapshot(&mut feed, event.as_ref());

        if let Some(event) = event.as_ref() {
            if event.is_paused() != paused {
                paused = event.is_paused();
                changed = true;
            }
            if event.is_reset() {
                let _ = tx.send(Delta::Log(format!(
                    "[INFO] Feed reset by server for game {}",
                    target.game_id
                )));
            }
        } else if paused && stream.consecutive_failures() == 0 {
            // 204 after a paused answer: delivery resumed.
            paused = false;
            changed = true;
        }

        let failures = stream.consecutive_failures();
        if failures >= STALE_AFTER_FAILURES && !stale {
            stale = true;
            let reason = stream.last_error().unwrap_or("unknown error");
            let _ = tx.send(Delta::Log(format!(
                "[WARN] Live feed stale after {failures} failed polls: {reason}"
            )));
        } else if failures == 0 && stale {
            stale = false;
            let _ = tx.send(Delta::Log("[INFO] Live feed recovered".to_string()));
        }

        if changed {
            let sent = tx.send(Delta::FeedUpdated {
                game_id: target.game_id.clone(),
                feed: feed.clone(),
                paused,
            });
            if sent.is_err() {
                stream.cancel();
            }
        }
    }
}
