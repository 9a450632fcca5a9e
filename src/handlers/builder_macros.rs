//! Macros for generating shared builder methods.
//!
//! Both transport builders validate timeouts and expose optional settings the
//! same way; these macros keep the definitions in one place.

/// Validate that a value is greater than zero, returning an error otherwise.
macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err($crate::handlers::HandlerBuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

pub(crate) use ensure_positive;

/// Generate a consuming setter storing `Some(value)` in an optional field.
macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

pub(crate) use option_setter;

/// Convert an optional millisecond setting into a timeout.
///
/// `Some(0)` is rejected; `None` keeps `default`.
pub(crate) fn timeout_from_ms(
    value: Option<u64>,
    field: &str,
    default: Option<std::time::Duration>,
) -> Result<Option<std::time::Duration>, super::HandlerBuildError> {
    match value {
        Some(ms) => Ok(Some(std::time::Duration::from_millis(ensure_positive!(
            ms, field
        )?))),
        None => Ok(default),
    }
}
