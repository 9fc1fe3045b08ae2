use std::{fmt::Display, process};

/// Startup-only escape hatch for settings that cannot be recovered from.
pub trait UnwrapOrExit<T> {
    fn unwrap_or_exit(self, msg: impl Display) -> T;
}

impl<T, E: Display> UnwrapOrExit<T> for Result<T, E> {
    fn unwrap_or_exit(self, msg: impl Display) -> T {
        match self {
            Ok(value) => value,
            Err(e) => exit_with(format_args!("{}: {}", msg, e)),
        }
    }
}

fn exit_with(msg: impl Display) -> ! {
    eprintln!("{} error: {}", env!("CARGO_PKG_NAME"), msg);
    process::exit(1);
}
