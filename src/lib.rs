pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::Cli;
pub use crate::config::AppConfig;

pub use crate::adapters::{doh::DohResolver, storage::LocalStorage};
pub use crate::core::{
    domain_config::DomainConfigClient,
    filter::apply_filters,
    preferences::TablePreferences,
    sort::apply_sort,
    state_store::ValidationStateStore,
    validator::{DomainValidator, ValidatorSettings},
};
pub use crate::domain::model::{
    DomainValidationState, FilterSet, Predicate, Record, SortDirection, SortSpec,
    ValidationStatus,
};
pub use crate::utils::error::{CrmError, Result};
