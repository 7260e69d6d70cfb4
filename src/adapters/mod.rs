// Adapters layer: concrete implementations for external systems (files, DoH, record exports)

pub mod doh;
pub mod records;
pub mod storage;
