//! Cooperative cancellation.
//!
//! Ctrl+C never interrupts an import mid-write. The interrupt listener only
//! raises a shared flag; the importer checks it before and after every prompt
//! and before every library commit, and aborts with
//! [`ImpartError::Cancelled`] when it is set. The control loop clears the flag
//! before starting the next import.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::kicad::{ImpartError, ImpartResult};

/// A shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clears a previous cancellation request.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Returns true if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Fails with [`ImpartError::Cancelled`] if cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`ImpartError::Cancelled`] when the token is cancelled.
    pub fn checkpoint(&self) -> ImpartResult<()> {
        if self.is_cancelled() {
            Err(ImpartError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Spawns a background listener that cancels `token` on every Ctrl+C.
///
/// # Errors
///
/// Returns an error if the listener runtime cannot be created.
pub fn install_interrupt_handler(token: CancelToken) -> std::io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    std::thread::Builder::new()
        .name("interrupt".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                loop {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::warn!(error = %e, "Interrupt listener stopped");
                        return;
                    }
                    acknowledge_interrupt(&token);
                }
            });
        })?;

    Ok(())
}

/// Cancels `token` and warns the operator, who may be blocked at a prompt.
fn acknowledge_interrupt(token: &CancelToken) {
    tracing::warn!("Interrupted: abandoning the current archive once the pending reply is entered");
    token.cancel();
}
