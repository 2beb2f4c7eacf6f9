use std::{borrow::Cow, fmt, panic::Location};

/// Error context that remembers where it was raised.
///
/// Build one with [`DiagnosticMessage::new`] from a `#[track_caller]` constructor,
/// or with [`diag!`] when the message needs formatting. Display renders
/// `message (at file:line)` so log lines point back at the failing call.
#[derive(Clone, Debug)]
pub struct DiagnosticMessage {
    message: Cow<'static, str>,
    location: &'static Location<'static>,
}

impl DiagnosticMessage {
    #[track_caller]
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
            location: Location::caller(),
        }
    }

    pub fn message(&self) -> &str {
        self.message.as_ref()
    }

    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Prefix the message while keeping the original call-site.
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self {
            message: Cow::Owned(format!("{prefix}: {}", self.message)),
            location: self.location,
        }
    }
}

impl fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (at {}:{})",
            self.message,
            self.location.file(),
            self.location.line()
        )
    }
}

/// `format!`-style constructor for [`DiagnosticMessage`] that captures the call-site.
#[macro_export]
macro_rules! diag {
    ($msg:literal $(,)?) => {
        $crate::error::diagnostics::DiagnosticMessage::new($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::diagnostics::DiagnosticMessage::new(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_call_site() {
        let msg = DiagnosticMessage::new("boom");
        let rendered = msg.to_string();
        assert!(rendered.starts_with("boom (at "));
        assert!(rendered.contains("diagnostics.rs"));
    }

    #[test]
    fn diag_macro_formats_arguments() {
        let msg = crate::diag!("missing {}", "table");
        assert_eq!(msg.message(), "missing table");
    }

    #[test]
    fn prefixed_keeps_location() {
        let msg = DiagnosticMessage::new("timeout");
        let wrapped = msg.prefixed("connect");
        assert_eq!(wrapped.message(), "connect: timeout");
        assert_eq!(wrapped.location().line(), msg.location().line());
    }
}
