pub mod error;
pub mod gateway;

pub use error::FundsError;
pub use gateway::{FundTransferGateway, TransferDirection, TransferReceipt};
