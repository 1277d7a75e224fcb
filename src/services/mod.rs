// Transfer workflow core
pub mod transfers;

// Stock movement leaves consumed by the transfer engine
pub mod serial_registry;
pub mod stock_ledger;
pub mod transfer_number;

// Policy and access resolution
pub mod locations;
pub mod sod_policy;

// Best-effort sidecars
pub mod audit;
pub mod notifications;
