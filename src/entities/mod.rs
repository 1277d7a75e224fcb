pub mod business_location;
pub mod product;
pub mod product_variation;
pub mod serial_movement;
pub mod serial_number;
pub mod sod_settings;
pub mod stock_ledger_entry;
pub mod stock_transfer;
pub mod stock_transfer_item;
pub mod transfer_item_serial;
pub mod transfer_sequence;
pub mod transfer_step_event;
pub mod user;
pub mod user_location;
