//! The library-wide print stream
//!
//! One registered callback per loaded image, never per model. When no
//! callback is registered, output goes to the process's stdout. `emit`
//! hands the callback a length-delimited byte chunk that is only valid for
//! the duration of the call.

use gantry_abi::PrintCallback;
use std::io::Write;
use std::os::raw::c_char;
use std::sync::RwLock;

static PRINT_CALLBACK: RwLock<Option<PrintCallback>> = RwLock::new(None);

/// Replace the registered callback. `None` restores stdout.
pub fn set_callback(cb: Option<PrintCallback>) {
    match PRINT_CALLBACK.write() {
        Ok(mut slot) => *slot = cb,
        Err(poisoned) => *poisoned.into_inner() = cb,
    }
}

/// Route one chunk of model output to the registered sink.
pub fn emit(text: &str) {
    let cb = match PRINT_CALLBACK.read() {
        Ok(slot) => *slot,
        Err(poisoned) => *poisoned.into_inner(),
    };
    match cb {
        Some(cb) => cb(text.as_ptr().cast::<c_char>(), text.len()),
        None => {
            let _ = std::io::stdout().lock().write_all(text.as_bytes());
        }
    }
}
