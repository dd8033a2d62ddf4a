use relayer_core::fetch::SignedMessageSource;
use relayer_core::indexer::{find_published_message, ScanCursor, PUBLISH_MESSAGE};
use relayer_core::{Address, IndexedAppCall, IndexedTransaction, MockLedger, TransactionPage};
use tokio::sync::Mutex;

use super::vaa_builder::VaaBuilder;

/// Devnet guardians: watch the ledger for published messages and sign them.
pub struct MockGuardians {
    ledger: MockLedger,
    core_app_id: u64,
    signer_count: usize,
    cursor: Mutex<ScanCursor>,
}

impl MockGuardians {
    pub fn new(ledger: MockLedger, core_app_id: u64, signer_count: usize) -> Self {
        Self {
            ledger,
            core_app_id,
            signer_count,
            cursor: Mutex::new(ScanCursor::default()),
        }
    }

    pub async fn cursor(&self) -> ScanCursor {
        *self.cursor.lock().await
    }
}

impl SignedMessageSource for MockGuardians {
    async fn fetch_signed_message(
        &self,
        chain: u16,
        emitter_hex: &str,
        sequence: u64,
    ) -> relayer_core::Result<Option<Vec<u8>>> {
        let mut emitter = [0u8; 32];
        emitter.copy_from_slice(&hex::decode(emitter_hex).unwrap());
        let emitter = Address(emitter);

        let mut cursor = self.cursor.lock().await;
        let found =
            find_published_message(&self.ledger, self.core_app_id, &mut cursor, &emitter, sequence).await?;

        Ok(found.map(|message| {
            VaaBuilder::new(message.payload)
                .with_emitter(chain, *message.emitter.as_bytes())
                .with_sequence(message.sequence)
                .signed_by(self.signer_count)
                .build_bytes()
        }))
    }
}

/// Indexer view of an outer call whose inner core call published `payload`.
pub fn published_message(
    core_app_id: u64,
    emitter: Address,
    sequence: u64,
    payload: Vec<u8>,
    round: u64,
) -> IndexedTransaction {
    IndexedTransaction {
        id: format!("outer-{}", sequence),
        sender: Address([0x11; 32]),
        confirmed_round: round,
        app_call: None,
        logs: Vec::new(),
        inner_txns: vec![IndexedTransaction {
            id: format!("inner-{}", sequence),
            sender: emitter,
            confirmed_round: round,
            app_call: Some(IndexedAppCall {
                app_id: core_app_id,
                args: vec![PUBLISH_MESSAGE.to_vec(), payload],
            }),
            logs: vec![sequence.to_be_bytes().to_vec()],
            inner_txns: Vec::new(),
        }],
    }
}

pub fn page(transactions: Vec<IndexedTransaction>, next_token: Option<&str>, current_round: u64) -> TransactionPage {
    TransactionPage {
        transactions,
        next_token: next_token.map(str::to_string),
        current_round,
    }
}
