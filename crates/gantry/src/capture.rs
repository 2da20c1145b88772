//! Print stream capture
//!
//! Model code can print (progress lines, debug output). By default the
//! library writes to its own stdout; [`ModelLibrary::set_print_callback`]
//! redirects that per loaded image. The callback receives raw
//! length-delimited chunks, valid only for the duration of the call, and
//! because the ABI has no user-data parameter, sinks are necessarily
//! process-global statics on the host side.
//!
//! [`ModelLibrary::set_print_callback`]: crate::ModelLibrary::set_print_callback

use std::io::Write;
use std::os::raw::c_char;
use std::slice;

pub use gantry_abi::PrintCallback;

/// Ready-made callback that copies chunks to the host's stdout.
///
/// Useful after capture to restore visible output while keeping chunks
/// flowing through the host process rather than the library's own stream.
/// I/O errors are swallowed; the callback must never unwind into the
/// native caller.
pub extern "C" fn forward_to_stdout(data: *const c_char, len: usize) {
    if data.is_null() || len == 0 {
        return;
    }
    let bytes = unsafe { slice::from_raw_parts(data.cast::<u8>(), len) };
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(bytes);
    let _ = out.flush();
}
