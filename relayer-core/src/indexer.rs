use crate::error::Result;
use crate::ledger::{IndexedTransaction, Ledger, TransactionQuery};
use crate::relayer::Relayer;
use crate::transaction::TransactionSigner;
use crate::types::Address;
use crate::utils::read_u64_be;
use tracing::debug;

pub const PUBLISH_MESSAGE: &[u8] = b"publishMessage";

/// Where the next message search starts. Owned by the caller and threaded
/// through each search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCursor {
    pub last_round: u64,
}

impl Default for ScanCursor {
    fn default() -> Self {
        Self { last_round: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub emitter: Address,
    pub sequence: u64,
    pub payload: Vec<u8>,
    pub confirmed_round: u64,
}

/// Walks every result page for `publishMessage` calls from `emitter` and
/// returns the one carrying `sequence`. A search that reaches the last page
/// moves the cursor past the ledger's current round.
pub async fn find_published_message<L: Ledger>(
    ledger: &L,
    core_app_id: u64,
    cursor: &mut ScanCursor,
    emitter: &Address,
    sequence: u64,
) -> Result<Option<PublishedMessage>> {
    let query = TransactionQuery {
        note_prefix: PUBLISH_MESSAGE.to_vec(),
        min_round: cursor.last_round,
    };

    let mut next_token: Option<String> = None;
    loop {
        let page = ledger.search_transactions(&query, next_token.as_deref()).await?;
        debug!(
            transactions = page.transactions.len(),
            min_round = query.min_round,
            "searched published messages"
        );

        for txn in &page.transactions {
            if let Some(message) = match_published(txn, core_app_id, emitter, sequence) {
                return Ok(Some(message));
            }
        }

        match page.next_token {
            Some(token) => next_token = Some(token),
            None => {
                cursor.last_round = page.current_round + 1;
                return Ok(None);
            }
        }
    }
}

fn match_published(
    txn: &IndexedTransaction,
    core_app_id: u64,
    emitter: &Address,
    sequence: u64,
) -> Option<PublishedMessage> {
    txn.inner_txns.iter().find_map(|inner| {
        let call = inner.app_call.as_ref()?;
        if call.app_id != core_app_id || call.args.len() < 2 {
            return None;
        }
        if call.args[0].as_slice() != PUBLISH_MESSAGE {
            return None;
        }
        let logged = read_u64_be(inner.logs.first()?)?;
        if logged != sequence || inner.sender != *emitter {
            return None;
        }

        Some(PublishedMessage {
            emitter: inner.sender,
            sequence: logged,
            payload: call.args[1].clone(),
            confirmed_round: txn.confirmed_round,
        })
    })
}

impl<L: Ledger, S: TransactionSigner> Relayer<L, S> {
    /// Finds the message the token bridge published with `sequence`.
    pub async fn find_published_message(
        &self,
        cursor: &mut ScanCursor,
        sequence: u64,
    ) -> Result<Option<PublishedMessage>> {
        find_published_message(
            self.ledger(),
            self.config().core_app_id,
            cursor,
            &self.token_bridge_app_address(),
            sequence,
        )
        .await
    }
}
