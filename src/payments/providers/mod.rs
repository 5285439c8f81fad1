pub mod ledger;
pub mod voucher;

pub use ledger::LedgerAdapter;
pub use voucher::VoucherAdapter;
