//! Panic payload inspection.
//!
//! [`RecoveryMiddleware`](crate::stages::RecoveryMiddleware) catches panics
//! with `catch_unwind`, which only yields the payload. Call
//! [`install_panic_hook`] once at startup so the recovery log also carries
//! the panic location and a backtrace.

use aegis_core::{AppError, Failure};
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::sync::Once;

/// Location and backtrace of the most recent panic on this thread.
#[derive(Debug, Clone)]
pub struct PanicRecord {
    /// `file:line:column` of the panic, when known.
    pub location: Option<String>,
    /// Rendered backtrace.
    pub backtrace: String,
}

thread_local! {
    static LAST_PANIC: RefCell<Option<PanicRecord>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

/// Installs a panic hook that records each panic's location and backtrace.
///
/// The previous hook still runs. Calling this more than once has no effect.
pub fn install_panic_hook() {
    INSTALL.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let record = PanicRecord {
                location: info.location().map(ToString::to_string),
                backtrace: Backtrace::force_capture().to_string(),
            };
            let _ = LAST_PANIC.try_with(|slot| {
                if let Ok(mut slot) = slot.try_borrow_mut() {
                    *slot = Some(record);
                }
            });
            previous(info);
        }));
    });
}

/// Takes the record left by the most recent panic on this thread.
///
/// Returns `None` if the hook is not installed or nothing panicked since the
/// last call.
pub fn take_panic_record() -> Option<PanicRecord> {
    LAST_PANIC
        .try_with(|slot| slot.try_borrow_mut().ok().and_then(|mut slot| slot.take()))
        .ok()
        .flatten()
}

/// A panic raised by the language runtime rather than by an explicit
/// `panic!` with a domain message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeFault {
    /// Indexing past the end of a slice or collection.
    IndexOutOfBounds,
    /// A slice range outside its bounds or inverted.
    SliceRange,
    /// `unwrap` or `expect` on `None`.
    NoneUnwrap,
    /// `unwrap` or `expect` on `Err`.
    ErrUnwrap,
    /// Integer division or remainder by zero.
    DivideByZero,
    /// Integer overflow with overflow checks on.
    Overflow,
}

impl RuntimeFault {
    /// Returns the fault name used in logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::IndexOutOfBounds => "index_out_of_bounds",
            Self::SliceRange => "slice_range",
            Self::NoneUnwrap => "none_unwrap",
            Self::ErrUnwrap => "err_unwrap",
            Self::DivideByZero => "divide_by_zero",
            Self::Overflow => "overflow",
        }
    }

    fn detect(message: &str) -> Option<Self> {
        if message.starts_with("index out of bounds") {
            Some(Self::IndexOutOfBounds)
        } else if message.starts_with("range start index")
            || message.starts_with("range end index")
            || message.starts_with("slice index starts at")
            || message.starts_with("byte index")
        {
            Some(Self::SliceRange)
        } else if message.contains("on a `None` value") {
            Some(Self::NoneUnwrap)
        } else if message.contains("on an `Err` value") {
            Some(Self::ErrUnwrap)
        } else if message == "attempt to divide by zero"
            || message == "attempt to calculate the remainder with a divisor of zero"
        {
            Some(Self::DivideByZero)
        } else if message.starts_with("attempt to") && message.ends_with("with overflow") {
            Some(Self::Overflow)
        } else {
            None
        }
    }
}

/// What a panic payload turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanicKind {
    /// `panic!` with a message.
    Message(String),
    /// A runtime fault, with the runtime's message.
    RuntimeFault {
        /// Which fault.
        fault: RuntimeFault,
        /// The runtime's message.
        message: String,
    },
    /// An error value passed to `std::panic::panic_any`.
    Structured(String),
    /// Anything else.
    Unknown,
}

impl PanicKind {
    /// Inspects a payload returned by `catch_unwind`.
    #[must_use]
    pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&'static str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned());

        if let Some(message) = message {
            return match RuntimeFault::detect(&message) {
                Some(fault) => Self::RuntimeFault { fault, message },
                None => Self::Message(message),
            };
        }

        if let Some(error) = payload.downcast_ref::<AppError>() {
            return Self::Structured(error.to_string());
        }
        if let Some(failure) = payload.downcast_ref::<Failure>() {
            return Self::Structured(failure.to_string());
        }

        Self::Unknown
    }

    /// Short name of the variant, used as a log field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::RuntimeFault { .. } => "runtime_fault",
            Self::Structured(_) => "structured",
            Self::Unknown => "unknown",
        }
    }

    /// The payload text, or `"unknown panic"`.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Message(message)
            | Self::RuntimeFault { message, .. }
            | Self::Structured(message) => message,
            Self::Unknown => "unknown panic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, panic_any};

    fn payload_of(f: impl FnOnce() + std::panic::UnwindSafe) -> PanicKind {
        let payload = catch_unwind(f).unwrap_err();
        PanicKind::from_payload(payload.as_ref())
    }

    #[test]
    fn test_static_message() {
        assert_eq!(payload_of(|| panic!("boom")), PanicKind::Message("boom".to_string()));
    }

    #[test]
    fn test_formatted_message() {
        let id = 7;
        assert_eq!(
            payload_of(move || panic!("order {id} vanished")),
            PanicKind::Message("order 7 vanished".to_string())
        );
    }

    #[test]
    fn test_none_unwrap() {
        let kind = payload_of(|| {
            let value: Option<u8> = None;
            let _ = value.unwrap();
        });
        assert!(matches!(
            kind,
            PanicKind::RuntimeFault {
                fault: RuntimeFault::NoneUnwrap,
                ..
            }
        ));
    }

    #[test]
    fn test_err_unwrap() {
        let kind = payload_of(|| {
            let value: Result<u8, &str> = Err("nope");
            let _ = value.unwrap();
        });
        assert!(matches!(
            kind,
            PanicKind::RuntimeFault {
                fault: RuntimeFault::ErrUnwrap,
                ..
            }
        ));
    }

    #[test]
    fn test_index_out_of_bounds() {
        let kind = payload_of(|| {
            let items = vec![1, 2, 3];
            let index = items.len();
            let _ = items[index];
        });
        assert!(matches!(
            kind,
            PanicKind::RuntimeFault {
                fault: RuntimeFault::IndexOutOfBounds,
                ..
            }
        ));
    }

    #[test]
    fn test_detect_other_faults() {
        assert_eq!(
            RuntimeFault::detect("attempt to divide by zero"),
            Some(RuntimeFault::DivideByZero)
        );
        assert_eq!(
            RuntimeFault::detect("attempt to add with overflow"),
            Some(RuntimeFault::Overflow)
        );
        assert_eq!(
            RuntimeFault::detect("range end index 9 out of range for slice of length 3"),
            Some(RuntimeFault::SliceRange)
        );
        assert_eq!(RuntimeFault::detect("something else"), None);
    }

    #[test]
    fn test_structured_payload() {
        let kind = payload_of(|| panic_any(AppError::conflict("double booking")));
        assert_eq!(kind, PanicKind::Structured("double booking".to_string()));
        assert_eq!(kind.kind(), "structured");
    }

    #[test]
    fn test_unknown_payload() {
        let kind = payload_of(|| panic_any(42_u32));
        assert_eq!(kind, PanicKind::Unknown);
        assert_eq!(kind.message(), "unknown panic");
    }

    #[test]
    fn test_hook_records_location() {
        install_panic_hook();
        let _ = take_panic_record();

        let _ = catch_unwind(|| panic!("recorded"));
        let record = take_panic_record().unwrap();
        assert!(record.location.unwrap().contains("panic.rs"));
        assert!(take_panic_record().is_none());
    }
}
