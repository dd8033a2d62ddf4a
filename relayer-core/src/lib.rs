pub mod types;
pub mod config;
pub mod error;
pub mod utils;
pub mod codec;
pub mod template;
pub mod transaction;
pub mod ledger;
pub mod mock_ledger;
pub mod signer;
pub mod funding;
pub mod batch;
pub mod relayer;
pub mod registry;
pub mod submit;
pub mod token_bridge;
pub mod indexer;
pub mod fetch;
pub mod report;

pub use types::*;
pub use config::*;
pub use error::*;
pub use codec::{classify_payload, decode_vaa};
pub use ledger::*;
pub use mock_ledger::*;
pub use relayer::*;
pub use signer::*;
pub use transaction::*;
