use std::cell::RefCell;
use std::io::{Result as IoResult, Write};
use std::process::Stdio;
use std::rc::Rc;
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Memory-backed writer for capturing built-in output in tests.
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    /// Create a writer and return it together with a handle to the collected bytes.
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let buf = Rc::new(RefCell::new(Vec::new()));
        (Self { buf: buf.clone() }, buf)
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

impl crate::command::Stdout for MemWriter {
    /// A child process cannot write into this buffer, so it gets a null sink.
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::null()
    }
}

pub fn captured(handle: &Rc<RefCell<Vec<u8>>>) -> String {
    String::from_utf8_lossy(&handle.borrow()).into_owned()
}

/// Serializes tests that change the process working directory.
pub fn lock_current_dir() -> MutexGuard<'static, ()> {
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}
