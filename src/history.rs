//! On-chain trade history for one wallet.

use std::sync::Arc;

use crate::classifier::classify_logs;
use crate::config::Pubkey;
use crate::error::Result;
use crate::rpc::{LedgerClient, SignatureRef, TransactionDetail, LAMPORTS_PER_SOL};
use crate::types::{sort_by_timestamp, OrderKind, TradeRecord, Valuation};

pub const LIVE_SYMBOL: &str = "SOL-PERP";

pub struct HistoryFetcher<C> {
    client: Arc<C>,
    program_id: Pubkey,
    limit: usize,
}

impl<C: LedgerClient> HistoryFetcher<C> {
    pub fn new(client: Arc<C>, program_id: Pubkey, limit: usize) -> Self {
        Self { client, program_id, limit }
    }

    /// Wallet balance in SOL.
    pub async fn fetch_balance(&self, identity: &Pubkey) -> Result<f64> {
        let lamports = self.client.get_balance(identity).await?;
        Ok(lamports as f64 / LAMPORTS_PER_SOL)
    }

    /// Fetch, filter and classify the wallet's recent program transactions.
    /// Any failure aborts the whole fetch; the result is ascending by time.
    pub async fn fetch_trades(&self, identity: &Pubkey) -> Result<Vec<TradeRecord>> {
        tracing::info!(wallet = %identity, program = %self.program_id, "fetching trade history");

        let signatures = self.client.get_recent_signatures(identity, self.limit).await?;
        let sig_strings: Vec<String> = signatures.iter().map(|s| s.signature.clone()).collect();
        let details = self.client.get_parsed_transactions(&sig_strings).await?;

        let mut trades: Vec<TradeRecord> = signatures
            .iter()
            .zip(details)
            .filter_map(|(sig, detail)| {
                let detail = detail?;
                detail.references(&self.program_id).then(|| to_record(sig, &detail))
            })
            .collect();

        sort_by_timestamp(&mut trades);
        tracing::info!(found = trades.len(), scanned = signatures.len(), "trade history fetched");
        Ok(trades)
    }
}

fn to_record(sig: &SignatureRef, detail: &TransactionDetail) -> TradeRecord {
    let class = classify_logs(&detail.log_messages);
    let block_time = detail.block_time.or(sig.block_time).unwrap_or(0);

    TradeRecord {
        id: sig.signature.clone(),
        symbol: LIVE_SYMBOL.to_string(),
        side: class.side,
        kind: OrderKind::Market,
        price: 0.0,
        size: 0.0,
        // Realized pnl is not decodable from logs; closed trades stay
        // out of win rate until a decoder reports it.
        pnl: None,
        timestamp: block_time.saturating_mul(1000),
        status: class.status,
        valuation: Valuation::Unavailable,
    }
}
