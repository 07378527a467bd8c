pub mod import_service;
pub mod ledger;
pub mod ledger_store;
pub mod remote_rows;
pub mod snapshot;
pub mod stock_service;
pub mod sync;
