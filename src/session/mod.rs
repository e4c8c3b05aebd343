//! Streaming forecast loop: poll the quote feed, refresh the window when a
//! new period starts, forecast it, and settle the previous forecast.

pub mod collaborators;
pub mod state;

use std::time::{Duration, Instant};

use anyhow::anyhow;

use crate::error::{FeedError, ModelError, SessionError};
use crate::model::bar::Quote;
use crate::predictor::ForecastModel;

pub use collaborators::{
    BarSource, ForecastLog, NoSummary, Pacer, QuoteFeed, SummarySink, TokioPacer,
};
pub use state::{
    issue_forecast, needs_update, settle_pending, settlement_price, window_advanced, LoopPhase,
    SessionState, SessionSummary,
};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub symbol: String,
    pub interval: String,
    /// Bars requested per refresh.
    pub refresh_count: usize,
    pub poll_interval: Duration,
    /// Pause between retries of a transient feed failure. Zero retries
    /// immediately.
    pub retry_delay: Duration,
    pub duration: Option<Duration>,
    /// Refit every N updates; 0 keeps the initial fit for the whole session.
    pub retrain_every: u64,
    pub max_window: usize,
    /// Consecutive skipped updates tolerated before giving up; 0 never gives up.
    pub max_consecutive_skips: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            symbol: "MSFT".to_string(),
            interval: "1min".to_string(),
            refresh_count: 5_000,
            poll_interval: DEFAULT_POLL_INTERVAL,
            retry_delay: Duration::ZERO,
            duration: None,
            retrain_every: 0,
            max_window: 5_000,
            max_consecutive_skips: 0,
        }
    }
}

pub struct Collaborators<B, Q, L, S, P> {
    pub bars: B,
    pub quotes: Q,
    pub log: L,
    pub summary: S,
    pub pacer: P,
}

enum UpdateOutcome {
    Updated,
    Waiting,
    Skipped(SessionError),
}

pub struct ForecastSession<B, Q, L, S, P> {
    cfg: SessionConfig,
    model: ForecastModel,
    bars: B,
    quotes: Q,
    log: L,
    summary: S,
    pacer: P,
    state: SessionState,
    deadline: Option<Instant>,
}

impl<B, Q, L, S, P> ForecastSession<B, Q, L, S, P>
where
    B: BarSource,
    Q: QuoteFeed,
    L: ForecastLog,
    S: SummarySink,
    P: Pacer,
{
    pub fn new(
        cfg: SessionConfig,
        model: ForecastModel,
        collaborators: Collaborators<B, Q, L, S, P>,
    ) -> Self {
        let capacity = cfg
            .max_window
            .max(model.min_fit_len() + 1)
            .max(model.input_len() + 1);
        Self {
            cfg,
            model,
            bars: collaborators.bars,
            quotes: collaborators.quotes,
            log: collaborators.log,
            summary: collaborators.summary,
            pacer: collaborators.pacer,
            state: SessionState::new(capacity),
            deadline: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn model(&self) -> &ForecastModel {
        &self.model
    }

    /// Run until the configured duration elapses or the feed reports the
    /// market closed. The summary carries the parameters of the final
    /// full-window fit.
    pub async fn run(mut self) -> Result<SessionSummary, SessionError> {
        self.initialize().await?;

        loop {
            if self.duration_elapsed() {
                tracing::info!(symbol = %self.cfg.symbol, "Session duration elapsed");
                break;
            }

            self.state.phase = LoopPhase::Polling;
            self.pacer.wait(self.cfg.poll_interval).await;
            let quote = self.poll_quote().await?;
            if !quote.is_market_open {
                tracing::info!(symbol = %quote.symbol, "Market is closed");
                break;
            }

            if needs_update(&self.state, &quote) {
                match self.update(&quote).await? {
                    UpdateOutcome::Updated => self.state.consecutive_skips = 0,
                    UpdateOutcome::Waiting => {}
                    UpdateOutcome::Skipped(err) => {
                        self.state.consecutive_skips += 1;
                        tracing::warn!(
                            error = %err,
                            skips = self.state.consecutive_skips,
                            "Skipping update cycle"
                        );
                        let limit = self.cfg.max_consecutive_skips;
                        if limit > 0 && self.state.consecutive_skips >= limit {
                            return Err(err);
                        }
                    }
                }
            }
            self.state.cycles += 1;
        }

        self.terminate().await
    }

    async fn initialize(&mut self) -> Result<(), SessionError> {
        self.state.phase = LoopPhase::Initializing;
        let bars = self
            .bars
            .fetch_recent_bars(&self.cfg.symbol, &self.cfg.interval, self.cfg.refresh_count)
            .await
            .map_err(|e| SessionError::Init(anyhow!(e).context("initial bar snapshot")))?;
        self.state.window.merge(bars);

        // The newest bar is held out as the in-progress period.
        let series = self.state.window.snapshot();
        self.model
            .fit(series.values_without_last(1))
            .map_err(|e| SessionError::Init(anyhow!(e).context("initial fit")))?;

        self.deadline = self.cfg.duration.map(|d| Instant::now() + d);
        tracing::info!(
            symbol = %self.cfg.symbol,
            interval = %self.cfg.interval,
            model = %self.model.label(),
            bars = self.state.window.len(),
            "Session initialized"
        );
        Ok(())
    }

    fn duration_elapsed(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    /// Retries connectivity failures forever; any other failure is fatal.
    async fn poll_quote(&mut self) -> Result<Quote, SessionError> {
        let mut attempt: u64 = 0;
        loop {
            match self
                .quotes
                .fetch_current_quote(&self.cfg.symbol, &self.cfg.interval)
                .await
            {
                Ok(quote) => return Ok(quote),
                Err(FeedError::TransientNetwork(msg)) => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %msg, "Connection error, retrying");
                    self.pacer.wait(self.cfg.retry_delay).await;
                }
                Err(e) => return Err(SessionError::Feed(e)),
            }
        }
    }

    async fn update(&mut self, quote: &Quote) -> Result<UpdateOutcome, SessionError> {
        self.state.phase = LoopPhase::Updating;
        match self
            .bars
            .fetch_recent_bars(&self.cfg.symbol, &self.cfg.interval, self.cfg.refresh_count)
            .await
        {
            Ok(bars) => {
                self.state.window.merge(bars);
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, "Window refresh failed, retrying next poll");
                return Ok(UpdateOutcome::Waiting);
            }
            Err(e) => return Err(SessionError::Feed(e)),
        }

        if !window_advanced(&self.state) {
            tracing::debug!(quote = %quote.timestamp, "Window has not closed a new bar yet");
            return Ok(UpdateOutcome::Waiting);
        }

        if self.cfg.retrain_every > 0
            && self.state.updates > 0
            && self.state.updates % self.cfg.retrain_every == 0
        {
            self.retrain(false);
        }

        let record = match issue_forecast(&self.model, &self.state.window, quote.timestamp) {
            Ok(record) => record,
            Err(e) => return Ok(UpdateOutcome::Skipped(SessionError::Predict(e))),
        };

        self.state.phase = LoopPhase::Settling;
        if let Some(previous_timestamp) = self.state.pending.as_ref().map(|p| p.previous_timestamp)
        {
            match settlement_price(&self.state.window, previous_timestamp) {
                Some(actual) => {
                    if let Some(settled) = settle_pending(&mut self.state, actual) {
                        tracing::info!(
                            at = %settled.record.forecast_timestamp,
                            forecast = settled.record.forecast_price,
                            actual,
                            accurate = settled.status.accurate_prediction,
                            correct = self.state.tally.correct,
                            incorrect = self.state.tally.incorrect,
                            "Forecast settled"
                        );
                        self.log.append(&settled).map_err(SessionError::Sink)?;
                    }
                }
                None => {
                    let dropped = self.state.pending.take();
                    tracing::warn!(
                        previous = %previous_timestamp,
                        forecast = ?dropped.map(|p| p.forecast_price),
                        "Settlement bar left the window; pending forecast dropped"
                    );
                }
            }
        }

        tracing::info!(
            previous = %record.previous_timestamp,
            previous_price = record.previous_price,
            at = %record.forecast_timestamp,
            forecast = record.forecast_price,
            "Forecast issued"
        );
        self.state.pending = Some(record);
        self.state.forecasts_issued += 1;
        self.state.updates += 1;
        Ok(UpdateOutcome::Updated)
    }

    /// Refit on the window; `use_all` includes the in-progress bar.
    /// Steady-state failures keep the previous parameters.
    fn retrain(&mut self, use_all: bool) -> Option<ModelError> {
        let series = self.state.window.snapshot();
        let training = if use_all {
            series.values()
        } else {
            series.values_without_last(1)
        };
        match self.model.fit(training) {
            Ok(()) => {
                tracing::info!(bars = training.len(), use_all, "Model retrained");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, use_all, "Retrain failed, keeping previous fit");
                Some(e)
            }
        }
    }

    /// Final refresh and full-window refit, then the summary. The summary
    /// is reported even when the final refit fails.
    async fn terminate(mut self) -> Result<SessionSummary, SessionError> {
        let mut final_fit_error = None;
        if self.state.updates > 0 {
            match self
                .bars
                .fetch_recent_bars(&self.cfg.symbol, &self.cfg.interval, self.cfg.refresh_count)
                .await
            {
                Ok(bars) => {
                    self.state.window.merge(bars);
                }
                Err(e) => tracing::warn!(error = %e, "Final window refresh failed"),
            }
            final_fit_error = self.retrain(true);
        }
        self.state.phase = LoopPhase::Terminated;

        if let Some(pending) = &self.state.pending {
            tracing::debug!(at = %pending.forecast_timestamp, "Unsettled forecast at shutdown");
        }

        let summary = SessionSummary::from_state(
            &self.state,
            &self.cfg.symbol,
            &self.cfg.interval,
            &self.model,
        );
        if let Err(e) = self.summary.report(&summary) {
            tracing::warn!(error = %e, "Summary sink failed");
        }
        tracing::info!(
            correct = summary.tally.correct,
            incorrect = summary.tally.incorrect,
            updates = summary.updates,
            "Session terminated"
        );
        match final_fit_error {
            Some(e) => Err(SessionError::Fit(e)),
            None => Ok(summary),
        }
    }
}
