use std::fmt;

/// Failures reported by the ledger collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The ledger has no record of the entity (account, asset, transaction).
    NotFound,
    /// A transaction in the group was rejected because `address` cannot pay.
    InsufficientFunds { address: String },
    /// The group was rejected for any other reason (bad authorization, replay...).
    Rejected(String),
    /// Confirmation was not observed within the requested number of rounds.
    Timeout { tx_id: String, rounds: u64 },
    Transport(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::NotFound => write!(f, "entity not found"),
            LedgerError::InsufficientFunds { address } => {
                write!(f, "insufficient funds in {}", address)
            }
            LedgerError::Rejected(reason) => write!(f, "transaction rejected: {}", reason),
            LedgerError::Timeout { tx_id, rounds } => {
                write!(f, "{} not confirmed after {} rounds", tx_id, rounds)
            }
            LedgerError::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

impl std::error::Error for LedgerError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    MalformedVaa(String),
    /// No module identifier or payload shape matched, so no settlement can be built.
    UnknownPayload,
    /// A concurrent bootstrap of the same derived account won the rekey.
    AccountBootstrapRace { address: String },
    InsufficientVerifierFunds { address: String },
    SubmissionTimeout { tx_id: String },
    GuardianKeyMissing { guardian_index: u8 },
    InvalidSignature { guardian_index: u8 },
    GroupTooLarge { size: usize, max: usize },
    MessageUnavailable { chain: u16, emitter: String, sequence: u64 },
    /// The confirmed transfer carried no sequence log from the core app.
    SequenceLogMissing { tx_id: String },
    Ledger(LedgerError),
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::MalformedVaa(reason) => write!(f, "malformed VAA: {}", reason),
            RelayError::UnknownPayload => write!(f, "unknown VAA payload, refusing to settle"),
            RelayError::AccountBootstrapRace { address } => {
                write!(f, "lost bootstrap race for account {}", address)
            }
            RelayError::InsufficientVerifierFunds { address } => {
                write!(f, "verifier account {} is underfunded", address)
            }
            RelayError::SubmissionTimeout { tx_id } => {
                write!(f, "submission {} was not confirmed in time", tx_id)
            }
            RelayError::GuardianKeyMissing { guardian_index } => {
                write!(f, "no guardian key for index {}", guardian_index)
            }
            RelayError::InvalidSignature { guardian_index } => {
                write!(f, "signature from guardian {} does not verify", guardian_index)
            }
            RelayError::GroupTooLarge { size, max } => {
                write!(f, "transaction group of {} exceeds the limit of {}", size, max)
            }
            RelayError::MessageUnavailable { chain, emitter, sequence } => write!(
                f,
                "no signed message for chain={}, emitter={}, sequence={}",
                chain, emitter, sequence
            ),
            RelayError::SequenceLogMissing { tx_id } => {
                write!(f, "no sequence log in transaction {}", tx_id)
            }
            RelayError::Ledger(err) => write!(f, "ledger error: {}", err),
        }
    }
}

impl std::error::Error for RelayError {}

impl From<LedgerError> for RelayError {
    fn from(err: LedgerError) -> Self {
        RelayError::Ledger(err)
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
