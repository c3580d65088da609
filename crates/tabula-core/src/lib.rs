//! Table-agnostic building blocks shared by the Tabula crates.
//!
//! [`Signal`] carries change notifications from models to their observers,
//! [`CancellationToken`] lets a consumer stop a producer thread, and
//! [`logging::targets`] names the `tracing` targets every crate logs under.
//!
//! ```
//! use tabula_core::{CancellationToken, Signal};
//!
//! let token = CancellationToken::new();
//! let cancelled = Signal::<()>::new();
//! let observer = token.clone();
//! let _guard = cancelled.connect_scoped(move |_| observer.cancel());
//!
//! cancelled.emit(());
//! assert!(token.is_cancelled());
//! ```

pub mod cancel;
pub mod logging;
pub mod signal;

pub use cancel::CancellationToken;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
