#[macro_export]
macro_rules! ok_or_break {
    ($expression:expr) => {
        match $expression {
            Ok(v) => v,
            Err(_) => break,
        }
    };
}

#[macro_export]
macro_rules! ok_or_continue {
    ($expression:expr) => {
        match $expression {
            Ok(v) => v,
            Err(_) => continue,
        }
    };
}

/// Formats and logs an error. Usable anywhere `tracing` is a dependency of the calling crate.
#[macro_export]
macro_rules! err {
    ($($t:tt)*) => {{
        let msg = format!($($t)*);
        tracing::error!("{}", &msg);
    }}
}
