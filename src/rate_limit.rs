use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

const DEFAULT_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Default)]
struct WindowState {
    recent: VecDeque<Instant>,
    next_ticket: u64,
    now_serving: u64,
}

/// Blocking rolling-window throttle: at most `max_calls` grants per window.
///
/// Callers are served in ticket order. A caller arriving while the window is full
/// sleeps until the oldest grant ages out; nothing is rejected. State belongs to
/// the owning resolver and is dropped with it.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    window: Duration,
    state: Mutex<WindowState>,
    turn: Condvar,
}

impl RateLimiter {
    pub fn per_second(max_calls: usize) -> Self {
        Self::with_window(max_calls, DEFAULT_WINDOW)
    }

    pub fn with_window(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            window,
            state: Mutex::new(WindowState::default()),
            turn: Condvar::new(),
        }
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn acquire(&self) {
        let mut state = self.lock();
        let ticket = state.next_ticket;
        state.next_ticket += 1;

        loop {
            if state.now_serving != ticket {
                state = self
                    .turn
                    .wait(state)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                continue;
            }

            let now = Instant::now();
            while let Some(oldest) = state.recent.front() {
                if now.duration_since(*oldest) >= self.window {
                    state.recent.pop_front();
                } else {
                    break;
                }
            }

            if state.recent.len() < self.max_calls {
                state.recent.push_back(now);
                state.now_serving += 1;
                self.turn.notify_all();
                return;
            }

            let wait = state
                .recent
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or_default();
            state = self
                .turn
                .wait_timeout(state, wait)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    pub fn reset(&self) {
        self.lock().recent.clear();
    }

    fn lock(&self) -> MutexGuard<'_, WindowState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
