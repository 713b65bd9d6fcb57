use thiserror::Error;

/// Setup errors that abort a run before any transfer is attempted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransferError {
    #[error("Recipient list is empty")]
    NoRecipients,

    #[error("Invalid transfer amount '{amount}': {reason}")]
    InvalidAmount { amount: String, reason: String },

    #[error("Need at least {required} wallets, found {found}")]
    NotEnoughWallets { required: usize, found: usize },
}
