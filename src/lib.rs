pub mod api;
pub mod config;
pub mod dex;
pub mod enums;
pub mod error;
pub mod executor;
pub mod limits;
pub mod notify;
pub mod orchestrator;
pub mod providers;
pub mod rules;
pub mod storage;
pub mod tokens;

pub use config::Config;
pub use enums::{ NotificationKind, SwapStatus };
pub use error::{ AppError, Result };
