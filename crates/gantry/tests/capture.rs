//! Print stream capture tests
//!
//! The print callback is a per-image global, so every test here runs
//! serialized and restores the default stream before returning.

mod common;

use common::{shared_zoo, zoo_model, zoo_path};
use gantry::ModelLibrary;
use gantry_models::models::print::PRINT_LINE;
use serial_test::serial;
use std::os::raw::c_char;
use std::slice;
use std::sync::{Arc, Mutex};
use std::thread;

static SINK: Mutex<Vec<u8>> = Mutex::new(Vec::new());

extern "C" fn capture_to_sink(data: *const c_char, len: usize) {
    if data.is_null() || len == 0 {
        return;
    }
    let chunk = unsafe { slice::from_raw_parts(data.cast::<u8>(), len) };
    SINK.lock().expect("sink").extend_from_slice(chunk);
}

fn drain_sink() -> String {
    let mut sink = SINK.lock().expect("sink");
    let text = String::from_utf8_lossy(&sink).into_owned();
    sink.clear();
    text
}

/// Registers the sink callback and restores stdout on drop, so a failing
/// assertion cannot leave the shared image redirected.
struct Registration(Arc<ModelLibrary>);

impl Registration {
    fn new(lib: &Arc<ModelLibrary>) -> Self {
        unsafe { lib.set_print_callback(Some(capture_to_sink)) }.expect("register");
        Registration(Arc::clone(lib))
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        let _ = unsafe { self.0.set_print_callback(None) };
    }
}

#[test]
#[serial]
fn test_callback_sees_handles_constructed_before_registration() {
    let model = zoo_model(r#"{"model": "print"}"#);
    drain_sink();

    let lib = shared_zoo();
    let _registration = Registration::new(&lib);
    model.log_density(&[0.25], true, false).expect("lp");
    assert!(drain_sink().contains(PRINT_LINE));
}

#[test]
#[serial]
fn test_clearing_the_callback_restores_stdout() {
    let lib = shared_zoo();
    let model = zoo_model(r#"{"model": "print"}"#);

    {
        let _registration = Registration::new(&lib);
        model.log_density(&[0.0], true, false).expect("lp");
        assert!(drain_sink().contains(PRINT_LINE));
    }

    // Output goes back to stdout, not to the sink.
    model.log_density(&[0.0], true, false).expect("lp");
    assert_eq!(drain_sink(), "");
}

#[test]
#[serial]
fn test_images_capture_independently() {
    let dir = tempfile::tempdir().expect("tempdir");
    let copy_path = dir.path().join("zoo_copy.so");
    // A real copy gets its own inode, so the loader maps a second image.
    std::fs::copy(zoo_path(), &copy_path).expect("copy");

    let original = shared_zoo();
    let copy = Arc::new(ModelLibrary::open(&copy_path).expect("open copy"));
    assert_ne!(original.id(), copy.id());

    let on_original = zoo_model(r#"{"model": "print"}"#);
    let on_copy = gantry::Model::new(
        &copy,
        gantry::ModelData::Inline(r#"{"model": "print"}"#.to_string()),
        42,
    )
    .expect("construct");

    let _registration = Registration::new(&copy);
    drain_sink();

    on_original.log_density(&[0.0], true, false).expect("lp");
    assert_eq!(drain_sink(), "", "original image must keep stdout");

    on_copy.log_density(&[0.0], true, false).expect("lp");
    assert!(drain_sink().contains(PRINT_LINE));
}

#[test]
#[serial]
fn test_concurrent_evaluations_share_one_callback() {
    const THREADS: usize = 4;
    const CALLS: usize = 8;

    let lib = shared_zoo();
    let model = Arc::new(zoo_model(r#"{"model": "print"}"#));
    let _registration = Registration::new(&lib);
    drain_sink();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let model = Arc::clone(&model);
            thread::spawn(move || {
                for _ in 0..CALLS {
                    model.log_density(&[0.5], true, false).expect("lp");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }

    // Chunks land atomically, one full line per evaluation.
    let text = drain_sink();
    assert_eq!(text.matches(PRINT_LINE).count(), THREADS * CALLS);
}
