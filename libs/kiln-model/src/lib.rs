//! Kiln Model Library
//!
//! Pure register algebra for the Delta DTB controller: which logical parameter
//! lives at which address, how raw words scale to engineering values, and how
//! pattern/step pairs map onto the pattern register blocks. No I/O.
//!
//! # Modules
//!
//! - `register`: the static register map and parameter lookup
//! - `scale`: raw <-> value scaling with domain checks
//! - `pattern`: pattern/step and per-pattern setting addressing
//! - `types`: composite read models
//!
//! # Example
//!
//! ```
//! use kiln_model::{scale, Parameter};
//!
//! let spec = "setpoint".parse::<Parameter>().unwrap().spec();
//! let raw = scale::to_raw(spec.name, 25.5, spec.decimals, spec.word_domain().unwrap()).unwrap();
//! assert_eq!(raw, 255);
//! ```

pub mod pattern;
pub mod register;
pub mod scale;
pub mod types;

// Re-exports for convenience
pub use pattern::{temp_address, time_address, validate_index, PatternSetting};
pub use register::{Access, Parameter, ParameterSpec, RegisterKind, WordRegister, REGISTER_MAP};
pub use scale::{to_raw, to_value, RawDomain};
pub use types::{
    AlarmLimits, KeyStatus, LedStatus, Pattern, PatternStep, ProgramStatus, SettingsSnapshot,
};
