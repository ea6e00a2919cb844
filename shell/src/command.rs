use std::io::Write;
use std::process::Stdio;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Processes killed by a signal report `128 + signal`, as POSIX shells do.
pub type ExitCode = i32;

pub const SUCCESS: ExitCode = 0;
pub const FAILURE: ExitCode = 1;

/// Abstraction over a writable output stream that can also be converted into
/// a [`Stdio`] handle for spawning external processes.
///
/// Built-ins write to it directly; `ps` hands it to its child instead.
/// A blanket implementation exists for any type that implements `Write` and
/// `Into<Stdio>` (e.g. `std::io::Stdout`, `std::io::Stderr` or `File`).
pub trait Stdout: Write {
    /// Convert this output into a [`Stdio`] handle suitable for `std::process::Command`.
    fn stdio(self: Box<Self>) -> Stdio;
}

impl<T: Write + Into<Stdio>> Stdout for T {
    fn stdio(self: Box<Self>) -> Stdio {
        (*self).into()
    }
}
