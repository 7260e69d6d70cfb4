pub mod dns;
pub mod domain_config;
pub mod filter;
pub mod preferences;
pub mod sort;
pub mod state_store;
pub mod validator;

pub use crate::domain::model::{
    DomainValidationState, FieldFilter, FilterSet, Predicate, Record, SortDirection, SortSpec,
    ValidationStatus,
};
pub use crate::domain::ports::{ConfigProvider, DnsAnswer, DnsResolver, Storage};
pub use crate::utils::error::Result;
