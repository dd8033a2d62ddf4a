use crate::config::RelayerConfig;
use crate::error::{LedgerError, RelayError, Result};
use crate::funding::FundingPolicy;
use crate::ledger::{ConfirmedTransaction, Ledger};
use crate::template::{verifier_program, LogicProgram};
use crate::transaction::{assign_group_id, SignedTransaction, Transaction, TransactionSigner};
use crate::types::Address;
use tracing::{debug, info};

/// Builds, signs and submits relayer transactions against one destination ledger.
pub struct Relayer<L, S> {
    ledger: L,
    signer: S,
    config: RelayerConfig,
    verifier: LogicProgram,
}

impl<L: Ledger, S: TransactionSigner> Relayer<L, S> {
    pub fn new(ledger: L, signer: S, config: RelayerConfig) -> Self {
        Self {
            ledger,
            signer,
            config,
            verifier: verifier_program(),
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    pub fn config(&self) -> &RelayerConfig {
        &self.config
    }

    pub fn verifier(&self) -> &LogicProgram {
        &self.verifier
    }

    pub fn funding_policy(&self) -> FundingPolicy {
        self.config.funding.into()
    }

    pub fn core_app_address(&self) -> Address {
        Address::for_application(self.config.core_app_id)
    }

    pub fn token_bridge_app_address(&self) -> Address {
        Address::for_application(self.config.token_bridge_app_id)
    }

    /// Groups, signs and broadcasts `txns`, then waits for the last one to confirm.
    ///
    /// Transactions sent from the verifier account are authorized by the
    /// verifier program; everything else is signed by the relayer key.
    pub async fn sign_and_send(&self, mut txns: Vec<Transaction>, rounds: u64) -> Result<ConfirmedTransaction> {
        if txns.len() > self.config.max_group_size {
            return Err(RelayError::GroupTooLarge {
                size: txns.len(),
                max: self.config.max_group_size,
            });
        }

        if txns.len() > 1 {
            let group = assign_group_id(&mut txns);
            debug!(group = %hex::encode(group), size = txns.len(), "assigned group id");
        }

        let mut signed = Vec::with_capacity(txns.len());
        for txn in txns {
            if txn.sender == self.verifier.address {
                signed.push(SignedTransaction::with_program(txn, &self.verifier));
            } else {
                signed.push(self.signer.sign_transaction(txn)?);
            }
        }

        self.broadcast(&signed, rounds).await
    }

    /// Sends an already-signed group and waits for its last transaction.
    pub(crate) async fn broadcast(&self, signed: &[SignedTransaction], rounds: u64) -> Result<ConfirmedTransaction> {
        let last_id = signed
            .last()
            .map(|stxn| stxn.txn.id_hex())
            .ok_or_else(|| RelayError::Ledger(LedgerError::Rejected("empty group".to_string())))?;

        self.ledger
            .send_transactions(signed)
            .await
            .map_err(|err| self.translate(err))?;
        info!(tx_id = %last_id, size = signed.len(), "group broadcast");

        let confirmed = self
            .ledger
            .wait_for_confirmation(&last_id, rounds)
            .await
            .map_err(|err| self.translate(err))?;
        info!(tx_id = %last_id, round = confirmed.confirmed_round, "group confirmed");

        Ok(confirmed)
    }

    fn translate(&self, err: LedgerError) -> RelayError {
        match err {
            LedgerError::InsufficientFunds { address } if address == self.verifier.address.to_hex() => {
                RelayError::InsufficientVerifierFunds { address }
            }
            LedgerError::Timeout { tx_id, .. } => RelayError::SubmissionTimeout { tx_id },
            other => RelayError::Ledger(other),
        }
    }
}
