use exlink_core::config::RateLimitConfig;
use exlink_core::Channel;
use std::sync::{Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Fixed-window budget for a single channel.
///
/// Callers of [`acquire`](Self::acquire) queue on a tokio mutex, whose
/// waiters are served FIFO, and keep it while sleeping out an exhausted
/// window. The counters sit behind a separate lock that is never held across
/// an await, so introspection sees the real count even while callers wait.
#[derive(Debug)]
pub struct ChannelLimiter {
    permits_per_window: u32,
    window_duration: Duration,
    turnstile: Mutex<()>,
    window: StdMutex<Window>,
}

#[derive(Debug)]
struct Window {
    remaining: u32,
    started: Instant,
}

impl ChannelLimiter {
    pub fn new(permits_per_window: u32, window_duration: Duration) -> Self {
        let permits_per_window = permits_per_window.max(1);
        Self {
            permits_per_window,
            window_duration,
            turnstile: Mutex::new(()),
            window: StdMutex::new(Window {
                remaining: permits_per_window,
                started: Instant::now(),
            }),
        }
    }

    /// Waits for a token and consumes it. Dropping the future before it
    /// resolves consumes nothing.
    pub async fn acquire(&self) {
        let _turn = self.turnstile.lock().await;
        loop {
            let reset_at = {
                let mut window = self.window();
                self.maybe_reset_window(&mut window);

                if window.remaining > 0 {
                    window.remaining -= 1;
                    debug!("Rate limiter permit acquired, {} left", window.remaining);
                    return;
                }
                window.started + self.window_duration
            };

            debug!(
                "Rate limiter window exhausted, waiting {:?}",
                reset_at.saturating_duration_since(Instant::now())
            );
            sleep_until(reset_at).await;
        }
    }

    /// Takes a token without waiting. Returns `false` when the window is
    /// exhausted or when other callers are already queued in `acquire`,
    /// so it never jumps the queue.
    pub fn try_acquire(&self) -> bool {
        let Ok(_turn) = self.turnstile.try_lock() else {
            debug!("Rate limiter busy, callers queued");
            return false;
        };
        let mut window = self.window();
        self.maybe_reset_window(&mut window);

        if window.remaining > 0 {
            window.remaining -= 1;
            true
        } else {
            debug!("Rate limiter permit unavailable");
            false
        }
    }

    /// Tokens left in the current window, regardless of queued callers.
    pub fn available_permits(&self) -> u32 {
        let window = self.window();
        if window.started.elapsed() >= self.window_duration {
            self.permits_per_window
        } else {
            window.remaining
        }
    }

    // Poison is ignored: no holder leaves the window half-updated.
    fn window(&self) -> MutexGuard<'_, Window> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn maybe_reset_window(&self, window: &mut Window) {
        let now = Instant::now();
        if now.duration_since(window.started) >= self.window_duration {
            debug!(
                "Rate limiter window reset, {} permits restored",
                self.permits_per_window - window.remaining
            );
            window.remaining = self.permits_per_window;
            window.started = now;
        }
    }
}

/// Independent budgets for public and authenticated requests.
#[derive(Debug)]
pub struct RateLimiter {
    public: ChannelLimiter,
    authenticated: ChannelLimiter,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let window = Duration::from_millis(config.window_ms);
        Self {
            public: ChannelLimiter::new(config.public_requests, window),
            authenticated: ChannelLimiter::new(config.authenticated_requests, window),
        }
    }

    pub async fn acquire(&self, channel: Channel) {
        self.channel(channel).acquire().await
    }

    pub fn try_acquire(&self, channel: Channel) -> bool {
        self.channel(channel).try_acquire()
    }

    pub fn available_permits(&self, channel: Channel) -> u32 {
        self.channel(channel).available_permits()
    }

    fn channel(&self, channel: Channel) -> &ChannelLimiter {
        match channel {
            Channel::Public => &self.public,
            Channel::Authenticated => &self.authenticated,
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&RateLimitConfig::default())
    }
}
