//! A trivial tracing facility.

use bitmask_enum::bitmask;

#[bitmask]
pub enum Trace {
    All,
    Analyze,
    Approximate,
    Materialize,
    Ground,
}

impl Trace {
    /// Look up a trace level by (case-insensitive) name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "all" => Some(Self::all()),
            "none" => Some(Self::none()),
            "analyze" => Some(Self::Analyze),
            "approximate" => Some(Self::Approximate),
            "materialize" => Some(Self::Materialize),
            "ground" => Some(Self::Ground),
            _ => None,
        }
    }
}

#[macro_export]
macro_rules! trace {
    ($trace:expr, $level:ident, $fmt:literal $(,)? $($arg:expr),* $(,)?) => {
        if $trace.intersects(Trace::$level) {
            eprintln!($fmt, $($arg),*);
        }
    }
}
