//! RAII transport for the out-of-band error message channel
//!
//! Fallible native calls take a trailing `char**`. The callee may store a
//! heap message there on failure; whoever lent the slot must free it
//! through the library's own `gt_free_error_msg`, never through the Rust
//! allocator. `ErrorSlot` owns that obligation so no early return or
//! panic path can leak the native allocation.

use crate::error::BridgeError;
use gantry_abi::FreeErrorMsgFn;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;

pub(crate) struct ErrorSlot {
    msg: *mut c_char,
    free: FreeErrorMsgFn,
}

impl ErrorSlot {
    pub(crate) fn new(free: FreeErrorMsgFn) -> Self {
        Self {
            msg: ptr::null_mut(),
            free,
        }
    }

    /// The `char**` to lend to exactly one native call.
    pub(crate) fn as_out(&mut self) -> *mut *mut c_char {
        &mut self.msg
    }

    /// Decodes the stored message, or the generic fallback when the call
    /// failed without storing one.
    fn message(&self, operation: &'static str) -> String {
        if self.msg.is_null() {
            format!("unknown error in {operation}")
        } else {
            unsafe { CStr::from_ptr(self.msg) }
                .to_string_lossy()
                .into_owned()
        }
    }

    /// Consumes the slot into an evaluation error for `operation`.
    pub(crate) fn failure(self, operation: &'static str) -> BridgeError {
        BridgeError::Evaluation {
            operation,
            message: self.message(operation),
        }
    }

    /// Consumes the slot into a construction error (null-handle returns).
    pub(crate) fn construct_failure(self, operation: &'static str) -> BridgeError {
        BridgeError::Construct(self.message(operation))
    }
}

impl Drop for ErrorSlot {
    fn drop(&mut self) {
        if !self.msg.is_null() {
            unsafe { (self.free)(self.msg) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::ffi::CString;

    // Slots are created and dropped on the test's own thread, so a
    // thread-local keeps parallel tests from seeing each other's frees.
    thread_local! {
        static FREED: Cell<usize> = Cell::new(0);
    }

    fn freed() -> usize {
        FREED.with(Cell::get)
    }

    unsafe extern "C" fn counting_free(msg: *mut c_char) {
        if !msg.is_null() {
            FREED.with(|count| count.set(count.get() + 1));
            drop(CString::from_raw(msg));
        }
    }

    fn store(slot: &mut ErrorSlot, text: &str) {
        let out = slot.as_out();
        unsafe {
            *out = CString::new(text).unwrap().into_raw();
        }
    }

    #[test]
    fn test_empty_slot_produces_generic_message() {
        let slot = ErrorSlot::new(counting_free);
        let err = slot.failure("log_density");
        assert_eq!(
            err.to_string(),
            "log_density failed: unknown error in log_density"
        );
    }

    #[test]
    fn test_stored_message_is_transported_verbatim() {
        let mut slot = ErrorSlot::new(counting_free);
        store(&mut slot, "theta must be positive");
        let err = slot.failure("param_unconstrain");
        assert_eq!(
            err.to_string(),
            "param_unconstrain failed: theta must be positive"
        );
    }

    #[test]
    fn test_drop_frees_through_the_library() {
        let before = freed();
        {
            let mut slot = ErrorSlot::new(counting_free);
            store(&mut slot, "leak check");
        }
        assert_eq!(freed(), before + 1);
    }

    #[test]
    fn test_untouched_slot_frees_nothing() {
        let before = freed();
        drop(ErrorSlot::new(counting_free));
        assert_eq!(freed(), before);
    }

    #[test]
    fn test_construct_failure_keeps_cause_only() {
        let mut slot = ErrorSlot::new(counting_free);
        store(&mut slot, "invalid data: y must not be empty");
        let err = slot.construct_failure("model_construct");
        assert_eq!(
            err.to_string(),
            "Construction failed: invalid data: y must not be empty"
        );
    }
}
