//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `PriceProvider` trait that all providers implement
//! - Concrete provider implementations (Alpha Vantage, Yahoo)
//!
//! # Architecture
//!
//! The provider system is designed to be:
//! - **Provider-agnostic**: The registry holds `Arc<dyn PriceProvider>` and never
//!   looks at concrete types
//! - **Extensible**: New providers can be added by implementing `PriceProvider`
//! - **Self-normalizing**: Each provider translates symbols into its own format
//!   and maps responses into the shared models

mod traits;

pub mod alpha_vantage;
pub mod yahoo;

pub use traits::PriceProvider;
