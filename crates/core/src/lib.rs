pub mod account;
pub mod transaction;

pub use account::AccountId;
pub use transaction::{
    Fingerprint, Fingerprinted, KnownTransaction, ParseTransactionTypeError, TransactionCandidate,
    TransactionType,
};
