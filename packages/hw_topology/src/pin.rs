use thiserror::Error;

use crate::{ProcessorId, hardware};

/// Binds the calling thread to exactly one logical processor.
///
/// Takes effect immediately on the calling thread and remains in effect for the rest of the
/// thread's life (or until the affinity is changed again).
///
/// # Errors
///
/// Returns an error if the current process may not use the processor, either because it does not
/// exist or because it lies outside the process affinity mask. Callers typically log the failure and
/// continue unpinned.
///
/// # Panics
///
/// Panics if the operating system refuses to move the thread onto a processor that the process
/// is allowed to use.
pub fn pin_current_thread(processor_id: ProcessorId) -> Result<(), PinError> {
    let processor =
        hardware::available_processor(processor_id).ok_or(PinError::Unavailable { processor_id })?;

    processor.pin_current_thread_to();

    Ok(())
}

/// Reason why [`pin_current_thread()`] could not pin the thread.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum PinError {
    /// The processor is not one the current process may use.
    #[error("processor {processor_id} is not available to the current process")]
    Unavailable {
        /// The processor that was requested.
        processor_id: ProcessorId,
    },
}

