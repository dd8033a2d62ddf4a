//! Outbound token-bridge flows: attestations and transfers leaving the home chain.

use crate::error::{LedgerError, RelayError, Result};
use crate::fetch::{fetch_signed_vaa, SignedMessageSource};
use crate::ledger::{ConfirmedTransaction, Ledger, StateValue};
use crate::relayer::Relayer;
use crate::submit::{SubmissionOutcome, NOP};
use crate::transaction::{Transaction, TransactionSigner};
use crate::types::Address;
use crate::utils::{number_to_bytes, read_u64_be};
use tracing::{debug, info};

pub const ATTEST_TOKEN: &[u8] = b"attestToken";
pub const SEND_TRANSFER: &[u8] = b"sendTransfer";
pub const ASSET_OPTIN: &[u8] = b"optin";
pub const MESSAGE_FEE_KEY: &[u8] = b"MessageFee";

/// Sequence number the core app logged for the message published by
/// `confirmed`: first log of its last inner transaction.
pub fn parse_seq_from_log(confirmed: &ConfirmedTransaction) -> Result<u64> {
    confirmed
        .inner_txns
        .last()
        .and_then(|inner| inner.logs.first())
        .and_then(|log| read_u64_be(log))
        .ok_or_else(|| RelayError::SequenceLogMissing {
            tx_id: confirmed.tx_id.clone(),
        })
}

impl<L: Ledger, S: TransactionSigner> Relayer<L, S> {
    /// Fee the core app charges per published message; zero when unset.
    pub async fn get_message_fee(&self) -> Result<u64> {
        let global = self
            .ledger()
            .application_global_state(self.config().core_app_id)
            .await?;

        Ok(global
            .iter()
            .find(|kv| kv.key.as_slice() == MESSAGE_FEE_KEY)
            .and_then(|kv| match kv.value {
                StateValue::Uint(fee) => Some(fee),
                StateValue::Bytes(_) => None,
            })
            .unwrap_or(0))
    }

    /// Balance of `asset_id` held by `address`; asset 0 is the native unit.
    pub async fn get_balance(&self, address: &Address, asset_id: u64) -> Result<u64> {
        let info = self.ledger().account_information(address).await?;
        if asset_id == 0 {
            return Ok(info.amount);
        }

        Ok(info
            .assets
            .iter()
            .find(|holding| holding.asset_id == asset_id)
            .map(|holding| holding.amount)
            .unwrap_or(0))
    }

    pub async fn asset_optin_check(&self, asset_id: u64, receiver: &Address) -> Result<bool> {
        match self.ledger().account_information(receiver).await {
            Ok(info) => Ok(info.holds_asset(asset_id)),
            Err(LedgerError::NotFound) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Opens a holding of `asset_id` for `receiver` with a zero-amount
    /// transfer paid by the relayer. Returns once the holding is visible.
    pub async fn asset_optin(&self, asset_id: u64, receiver: &Address) -> Result<()> {
        if self.asset_optin_check(asset_id, receiver).await? {
            return Ok(());
        }

        let params = self.ledger().suggested_params().await?;
        let txn = Transaction::asset_transfer(self.signer().address(), *receiver, asset_id, 0, &params);
        self.sign_and_send(vec![txn], self.config().asset_optin_rounds).await?;

        if !self.asset_optin_check(asset_id, receiver).await? {
            return Err(RelayError::Ledger(LedgerError::Rejected(format!(
                "asset {} opt-in for {} not visible after confirmation",
                asset_id, receiver
            ))));
        }
        debug!(asset_id, %receiver, "asset opt-in confirmed");
        Ok(())
    }

    /// Emitter account the token bridge publishes through on the core app.
    pub async fn token_bridge_emitter(&self) -> Result<Address> {
        let emitter = self.token_bridge_app_address();
        self.optin(self.config().core_app_id, 0, emitter.as_bytes()).await
    }

    /// Publishes an attestation of `asset_id` so other chains can wrap it.
    pub async fn attest_asset(&self, asset_id: u64) -> Result<String> {
        let config = self.config();
        let sender = self.signer().address();
        let bridge = self.token_bridge_app_address();

        let emitter = self.token_bridge_emitter().await?;
        let creator = self.ledger().asset_information(asset_id).await?.creator;
        let creator_info = self.ledger().account_information(&creator).await?;

        let custody = if creator_info.auth_addr == Some(bridge) {
            creator
        } else {
            debug!(asset_id, "attesting a native asset");
            self.optin(config.token_bridge_app_id, asset_id, b"native").await?
        };

        let params = self.ledger().suggested_params().await?;
        let mut txns = vec![Transaction::app_call(sender, config.token_bridge_app_id, &params)
            .arg(NOP)
            .build()];

        let message_fee = self.get_message_fee().await?;
        if message_fee > 0 {
            txns.push(Transaction::payment(sender, bridge, message_fee, &params));
        }

        let mut attest = Transaction::app_call(sender, config.token_bridge_app_id, &params)
            .arg(ATTEST_TOKEN)
            .arg(number_to_bytes(asset_id))
            .accounts(&[emitter, custody, creator_info.address, self.core_app_address()])
            .foreign_apps(&[config.core_app_id])
            .foreign_assets(&[asset_id])
            .build();
        attest.fee *= if message_fee > 0 { 3 } else { 2 };
        txns.push(attest);

        let confirmed = self.sign_and_send(txns, config.confirmation_rounds).await?;
        info!(asset_id, tx_id = %confirmed.tx_id, "asset attested");
        Ok(confirmed.tx_id)
    }

    /// Locks or burns `amount` of `asset_id` and publishes a transfer to
    /// `receiver` on `chain`. Returns the message sequence number.
    pub async fn transfer_asset(
        &self,
        asset_id: u64,
        amount: u64,
        receiver: [u8; 32],
        chain: u16,
        fee: u64,
    ) -> Result<u64> {
        let config = self.config();
        let sender = self.signer().address();
        let bridge = self.token_bridge_app_address();

        let emitter = self.token_bridge_emitter().await?;

        let mut creator = None;
        let mut wrapped = false;
        if asset_id != 0 {
            let asset_creator = self.ledger().asset_information(asset_id).await?.creator;
            let creator_info = self.ledger().account_information(&asset_creator).await?;
            wrapped = creator_info.auth_addr == Some(bridge);
            creator = Some(asset_creator);
        }

        let custody = match creator {
            Some(creator) if wrapped => creator,
            _ => self.optin(config.token_bridge_app_id, asset_id, b"native").await?,
        };

        let params = self.ledger().suggested_params().await?;

        if asset_id != 0 && !self.asset_optin_check(asset_id, &custody).await? {
            info!(asset_id, %custody, "opting custody account in to asset");
            let mut optin = Transaction::app_call(sender, config.token_bridge_app_id, &params)
                .arg(ASSET_OPTIN)
                .arg(number_to_bytes(asset_id))
                .accounts(&[custody])
                .foreign_assets(&[asset_id])
                .build();
            optin.fee *= 2;
            let funding = Transaction::payment(sender, custody, config.asset_optin_funding, &params);
            self.sign_and_send(vec![funding, optin], config.asset_optin_rounds).await?;
        }

        let mut txns = Vec::with_capacity(4);
        let message_fee = self.get_message_fee().await?;
        if message_fee > 0 {
            txns.push(Transaction::payment(sender, bridge, message_fee, &params));
        }
        txns.push(
            Transaction::app_call(sender, config.token_bridge_app_id, &params)
                .arg(NOP)
                .build(),
        );

        let accounts = if asset_id == 0 {
            txns.push(Transaction::payment(sender, custody, amount, &params));
            [emitter, custody, custody]
        } else {
            txns.push(Transaction::asset_transfer(sender, custody, asset_id, amount, &params));
            [emitter, custody, creator.unwrap_or(custody)]
        };

        let mut send = Transaction::app_call(sender, config.token_bridge_app_id, &params)
            .arg(SEND_TRANSFER)
            .arg(number_to_bytes(asset_id))
            .arg(number_to_bytes(amount))
            .arg(receiver.to_vec())
            .arg(number_to_bytes(u64::from(chain)))
            .arg(number_to_bytes(fee))
            .accounts(&accounts)
            .foreign_apps(&[config.core_app_id])
            .foreign_assets(&[asset_id])
            .build();
        send.fee *= 2;
        txns.push(send);

        let confirmed = self.sign_and_send(txns, config.asset_optin_rounds).await?;
        let sequence = parse_seq_from_log(&confirmed)?;
        info!(asset_id, amount, chain, sequence, "transfer published");
        Ok(sequence)
    }

    /// Sends a transfer out, waits for its signed message and relays it.
    pub async fn transfer_from_home<M: SignedMessageSource>(
        &self,
        source: &M,
        asset_id: u64,
        amount: u64,
        receiver: [u8; 32],
        chain: u16,
        fee: u64,
    ) -> Result<SubmissionOutcome> {
        let sequence = self.transfer_asset(asset_id, amount, receiver, chain, fee).await?;
        let raw = fetch_signed_vaa(
            source,
            &self.config().fetch,
            self.config().home_chain,
            &self.token_bridge_app_address(),
            sequence,
        )
        .await?;
        self.submit_vaa(&raw, self.config().token_bridge_app_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seq_reads_last_inner_txn() {
        let confirmed = ConfirmedTransaction {
            tx_id: "abc".to_string(),
            inner_txns: vec![
                ConfirmedTransaction {
                    logs: vec![9u64.to_be_bytes().to_vec()],
                    ..Default::default()
                },
                ConfirmedTransaction {
                    logs: vec![42u64.to_be_bytes().to_vec(), vec![1]],
                    ..Default::default()
                },
            ],
            ..Default::default()
        };

        assert_eq!(parse_seq_from_log(&confirmed).unwrap(), 42);
    }

    #[test]
    fn test_parse_seq_without_inner_txns() {
        let confirmed = ConfirmedTransaction {
            tx_id: "abc".to_string(),
            ..Default::default()
        };
        assert_eq!(
            parse_seq_from_log(&confirmed),
            Err(RelayError::SequenceLogMissing {
                tx_id: "abc".to_string()
            })
        );
    }
}
