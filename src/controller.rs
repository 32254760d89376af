//! Data source state machine: which producer feeds the trade list, and the
//! single owner of the trades, balance and mode the view reads.
//!
//! Every transition bumps a generation counter. An asynchronous fetch
//! records the generation it was issued under and may only commit while
//! that generation is still current, so a slow live fetch cannot overwrite
//! demo data after a toggle. Balance results are keyed to the wallet
//! session instead, since balance does not depend on the mode.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{DashboardConfig, Pubkey};
use crate::error::{DashboardError, Result};
use crate::generator::DemoGenerator;
use crate::history::HistoryFetcher;
use crate::rpc::LedgerClient;
use crate::stats::compute_stats;
use crate::types::{sort_by_timestamp, DashboardView, DataSourceMode, TradeRecord};

#[derive(Debug)]
struct ControllerState {
    mode: DataSourceMode,
    identity: Option<Pubkey>,
    trades: Vec<TradeRecord>,
    balance: f64,
    is_loading: bool,
    generation: u64,
    session: u64,
}

/// Ticket for an in-flight live fetch.
#[derive(Debug, Clone)]
struct FetchTicket {
    identity: Pubkey,
    generation: u64,
    session: u64,
}

pub struct DataSourceController<C> {
    fetcher: HistoryFetcher<C>,
    generator: DemoGenerator,
    fetch_timeout: Duration,
    state: Mutex<ControllerState>,
}

impl<C: LedgerClient> DataSourceController<C> {
    pub fn new(config: &DashboardConfig, client: Arc<C>, identity: Option<Pubkey>) -> Self {
        Self {
            fetcher: HistoryFetcher::new(client, config.program_id.clone(), config.history_limit),
            generator: DemoGenerator::new(),
            fetch_timeout: config.fetch_timeout,
            state: Mutex::new(ControllerState {
                mode: DataSourceMode::Live,
                identity,
                trades: Vec::new(),
                balance: 0.0,
                is_loading: false,
                generation: 0,
                session: 0,
            }),
        }
    }

    pub fn mode(&self) -> DataSourceMode {
        self.state.lock().mode
    }

    pub fn is_demo(&self) -> bool {
        self.mode() == DataSourceMode::Demo
    }

    pub fn identity(&self) -> Option<Pubkey> {
        self.state.lock().identity.clone()
    }

    /// Consistent copy of the committed state with stats derived from it.
    pub fn snapshot(&self) -> DashboardView {
        let state = self.state.lock();
        DashboardView {
            stats: compute_stats(&state.trades),
            trades: state.trades.clone(),
            balance: state.balance,
            is_demo: state.mode == DataSourceMode::Demo,
            is_loading: state.is_loading,
        }
    }

    /// Initial activation. Loads balance and history when live with a
    /// connected wallet; otherwise stays idle.
    pub async fn mount(&self) {
        let (mode, connected) = {
            let state = self.state.lock();
            (state.mode, state.identity.is_some())
        };
        match (mode, connected) {
            (DataSourceMode::Live, true) => self.refresh().await,
            (DataSourceMode::Live, false) => tracing::info!("no wallet connected, staying idle"),
            (DataSourceMode::Demo, _) => {}
        }
    }

    /// Flip between live and demo data and fetch when now live.
    pub async fn toggle_demo(&self) {
        if self.flip() {
            self.refresh().await;
        }
    }

    /// The synchronous half of [`toggle_demo`](Self::toggle_demo). Switching
    /// to demo replaces the trades; switching to live clears them. Returns
    /// true when the caller should follow up with [`refresh`](Self::refresh).
    pub fn flip(&self) -> bool {
        let mut state = self.state.lock();
        state.generation += 1;
        match state.mode {
            DataSourceMode::Live => {
                state.mode = DataSourceMode::Demo;
                state.trades = self.generator.generate_demo_trades();
                state.is_loading = false;
                tracing::info!(trades = state.trades.len(), "switched to demo data");
                false
            }
            DataSourceMode::Demo => {
                state.mode = DataSourceMode::Live;
                state.trades.clear();
                tracing::info!("switched to live data");
                true
            }
        }
    }

    /// Wallet connected, switched or disconnected. Invalidates every
    /// in-flight fetch and resets balance.
    pub async fn set_identity(&self, identity: Option<Pubkey>) {
        let live = {
            let mut state = self.state.lock();
            state.session += 1;
            state.generation += 1;
            state.identity = identity;
            state.balance = 0.0;
            state.is_loading = false;
            if state.mode == DataSourceMode::Live {
                state.trades.clear();
            }
            state.mode == DataSourceMode::Live
        };
        if live {
            self.refresh().await;
        }
    }

    /// Re-fetch balance and live history. Balance and history run
    /// concurrently and fail independently.
    pub async fn refresh(&self) {
        let Some(ticket) = self.issue_ticket() else {
            return;
        };
        tokio::join!(self.load_balance(&ticket), self.load_trades(&ticket));
    }

    fn issue_ticket(&self) -> Option<FetchTicket> {
        let mut state = self.state.lock();
        let identity = state.identity.clone()?;
        if state.mode != DataSourceMode::Live {
            return None;
        }
        state.generation += 1;
        state.is_loading = true;
        Some(FetchTicket {
            identity,
            generation: state.generation,
            session: state.session,
        })
    }

    async fn load_balance(&self, ticket: &FetchTicket) {
        let result = self.bounded(self.fetcher.fetch_balance(&ticket.identity)).await;

        let mut state = self.state.lock();
        if state.session != ticket.session {
            tracing::debug!(wallet = %ticket.identity, "discarding balance for previous wallet");
            return;
        }
        match result {
            Ok(balance) => state.balance = balance,
            Err(e) => tracing::error!(error = %e, wallet = %ticket.identity, "failed to fetch balance"),
        }
    }

    async fn load_trades(&self, ticket: &FetchTicket) {
        let result = self.bounded(self.fetcher.fetch_trades(&ticket.identity)).await;

        let mut state = self.state.lock();
        if state.generation != ticket.generation || state.mode != DataSourceMode::Live {
            tracing::debug!(
                issued = ticket.generation,
                current = state.generation,
                "discarding stale trade history"
            );
            return;
        }
        state.is_loading = false;
        match result {
            Ok(mut trades) => {
                sort_by_timestamp(&mut trades);
                state.trades = trades;
            }
            Err(e) => tracing::error!(error = %e, wallet = %ticket.identity, "failed to fetch trade history"),
        }
    }

    async fn bounded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.fetch_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DashboardError::Timeout(self.fetch_timeout.as_secs())),
        }
    }
}
