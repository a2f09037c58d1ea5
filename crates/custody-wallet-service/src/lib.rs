//! Custody wallet service
//!
//! Wires the phrase primitives, vault, authentication gateway and quick-pay
//! policy into one explicit [`WalletContext`] per wallet.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod context;
pub mod error;
pub mod logging;
pub mod quickpay;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{WalletContext, WalletContextBuilder, WalletSetup};
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat};
pub use quickpay::{AuthSession, Decision, DenialReason, QuickPayEngine};

pub use custody_params::CoreConfig;
pub use custody_storage::{PolicyUpdate, QuickPayPolicy};
