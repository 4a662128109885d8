//! Interactive display session: feeds line commands to a [`StatusPoller`]
//! and renders whatever state it publishes.

use crate::error::{Error, Result};
use crate::metrics::MetricsSnapshot;
use crate::output::OutputHandler;
use crate::poller::{PollerMode, PollerState, StatusPoller};
use chrono::{DateTime, Utc};
use futures::stream::StreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_stream::wrappers::WatchStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Refresh,
    ToggleLive,
    LiveOn,
    LiveOff,
    Status,
    Quit,
}

impl FromStr for SessionCommand {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "r" | "refresh" => Ok(Self::Refresh),
            "l" | "live" => Ok(Self::ToggleLive),
            "on" => Ok(Self::LiveOn),
            "off" => Ok(Self::LiveOff),
            "s" | "status" => Ok(Self::Status),
            "q" | "quit" | "exit" => Ok(Self::Quit),
            other => Err(Error::Internal(format!(
                "Unknown command '{}' (r=refresh, l=live, on, off, s=status, q=quit)",
                other
            ))),
        }
    }
}

pub struct Session {
    poller: StatusPoller,
    output: Box<dyn OutputHandler>,
    multi: Option<Arc<MultiProgress>>,
    spinner: Option<ProgressBar>,
    last_written: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        poller: StatusPoller,
        output: Box<dyn OutputHandler>,
        multi: Option<Arc<MultiProgress>>,
    ) -> Self {
        Self {
            poller,
            output,
            multi,
            spinner: None,
            last_written: None,
        }
    }

    pub fn poller(&self) -> &StatusPoller {
        &self.poller
    }

    /// Runs until `quit` is read or `shutdown` resolves. End of input only
    /// stops command reading; the poller keeps going. The poller is torn
    /// down on every exit path.
    pub async fn run<R, F>(mut self, input: R, shutdown: F) -> Result<MetricsSnapshot>
    where
        R: AsyncBufRead + Unpin,
        F: Future<Output = ()>,
    {
        let mut states = WatchStream::new(self.poller.subscribe());
        let mut lines = input.lines();
        let mut input_open = true;
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutting down...");
                    break Ok(());
                }
                Some(state) = states.next() => {
                    if let Err(e) = self.render(&state).await {
                        break Err(e);
                    }
                }
                line = lines.next_line(), if input_open => match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match line.parse::<SessionCommand>() {
                        Ok(SessionCommand::Quit) => break Ok(()),
                        Ok(command) => self.apply(command),
                        Err(e) => log::warn!("{}", e),
                    },
                    Ok(None) => {
                        log::debug!("Input closed, polling continues until interrupted");
                        input_open = false;
                    }
                    Err(e) => break Err(Error::Io(e)),
                },
            }
        };

        self.poller.teardown();
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        self.output.close().await?;
        result?;

        Ok(self.poller.get_metrics())
    }

    pub fn apply(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Refresh => {
                if !self.poller.manual_refresh() {
                    log::info!("Refresh unavailable in {:?} mode", self.poller.mode());
                }
            }
            SessionCommand::ToggleLive => {
                let enabled = self.poller.state().live_view_enabled;
                self.poller.set_live_view(!enabled);
            }
            SessionCommand::LiveOn => self.poller.set_live_view(true),
            SessionCommand::LiveOff => self.poller.set_live_view(false),
            SessionCommand::Status => {
                let line = Self::status_line(&self.poller.state());
                self.say(line);
            }
            SessionCommand::Quit => {}
        }
    }

    pub fn status_line(state: &PollerState) -> String {
        let duration = match (state.duration_visible(), state.last_fetch_duration()) {
            (true, Some(ms)) => format!(" | last fetch {}ms", ms),
            _ => String::new(),
        };
        let availability = match &state.current_snapshot {
            None => "no data yet",
            Some(s) if s.is_available() => "online",
            Some(_) => "unavailable",
        };
        format!(
            "mode: {:?} | live view: {} | {}{}",
            state.mode(),
            if state.live_view_enabled { "on" } else { "off" },
            availability,
            duration
        )
    }

    async fn render(&mut self, state: &PollerState) -> Result<()> {
        self.update_spinner(state)?;

        if let Some(snapshot) = &state.current_snapshot {
            if self.last_written != Some(snapshot.timestamp) {
                self.last_written = Some(snapshot.timestamp);
                self.output.write(snapshot).await?;
            }
        }
        Ok(())
    }

    fn update_spinner(&mut self, state: &PollerState) -> Result<()> {
        let Some(multi) = &self.multi else {
            return Ok(());
        };
        let busy = match state.mode() {
            PollerMode::Loading => Some("Loading status..."),
            PollerMode::Refreshing => Some("Refreshing..."),
            PollerMode::Idle | PollerMode::LiveView => None,
        };

        match (busy, self.spinner.take()) {
            (Some(message), Some(pb)) => {
                pb.set_message(message);
                self.spinner = Some(pb);
            }
            (Some(message), None) => {
                let pb = multi.add(ProgressBar::new_spinner());
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("{spinner:.cyan} {msg}")
                        .map_err(|e| Error::Internal(e.to_string()))?,
                );
                pb.set_message(message);
                pb.enable_steady_tick(Duration::from_millis(100));
                self.spinner = Some(pb);
            }
            (None, Some(pb)) => pb.finish_and_clear(),
            (None, None) => {}
        }
        Ok(())
    }

    fn say(&self, line: String) {
        match &self.multi {
            Some(multi) => {
                if let Err(e) = multi.println(&line) {
                    log::warn!("Could not print status: {}", e);
                }
            }
            None => println!("{}", line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::StatusSnapshot;
    use crate::source::StatusSource;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Counting(AtomicUsize);

    #[async_trait]
    impl StatusSource for Counting {
        async fn fetch_status(&self) -> Result<Value> {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(json!({ "n": n }))
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<StatusSnapshot>>>);

    #[async_trait]
    impl OutputHandler for Recorder {
        async fn write(&mut self, snapshot: &StatusSnapshot) -> Result<()> {
            self.0.lock().unwrap().push(snapshot.clone());
            Ok(())
        }
    }

    fn session(seed: Option<StatusSnapshot>) -> (Session, Recorder, Arc<Counting>) {
        let source = Arc::new(Counting(AtomicUsize::new(0)));
        let recorder = Recorder::default();
        let poller = StatusPoller::initialize(source.clone(), seed, None);
        (Session::new(poller, Box::new(recorder.clone()), None), recorder, source)
    }

    #[test]
    fn parses_commands() {
        assert_eq!("r".parse::<SessionCommand>().unwrap(), SessionCommand::Refresh);
        assert_eq!(" Live ".parse::<SessionCommand>().unwrap(), SessionCommand::ToggleLive);
        assert_eq!("off".parse::<SessionCommand>().unwrap(), SessionCommand::LiveOff);
        assert_eq!("q".parse::<SessionCommand>().unwrap(), SessionCommand::Quit);
        assert!("reboot".parse::<SessionCommand>().is_err());
    }

    #[test]
    fn status_line_reflects_state() {
        assert_eq!(
            Session::status_line(&PollerState::default()),
            "mode: Idle | live view: off | no data yet"
        );

        let mut state = PollerState::default();
        state.current_snapshot = Some(StatusSnapshot::new(None, 30));
        state.live_view_enabled = true;
        assert_eq!(
            Session::status_line(&state),
            "mode: LiveView | live view: on | unavailable | last fetch 30ms"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_command_writes_new_snapshot() {
        let seed = StatusSnapshot::new(Some(json!({ "seed": true })), 5);
        let (session, recorder, source) = session(Some(seed));

        let metrics = session
            .run(&b"r\n"[..], tokio::time::sleep(Duration::from_secs(2)))
            .await
            .unwrap();

        assert_eq!(source.0.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.manual_refreshes, 1);
        let written = recorder.0.lock().unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[1].payload, Some(json!({ "n": 1 })));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_tears_down_live_view() {
        let (session, recorder, source) = session(None);

        let metrics = session
            .run(&b"bogus\non\n"[..], tokio::time::sleep(Duration::from_millis(2500)))
            .await
            .unwrap();

        // initial fetch plus ticks at 1s and 2s
        assert_eq!(source.0.load(Ordering::SeqCst), 3);
        assert_eq!(metrics.live_view_ticks, 2);
        assert_eq!(recorder.0.lock().unwrap().len(), 3);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(source.0.load(Ordering::SeqCst), 3);
    }
}
