//! Terminal output for the inspection commands
//!
//! Styled with `console` on a terminal, plain bracketed tags when piped or
//! running under CI so output stays grep-able.

mod context;
mod output;

pub use context::UiContext;
pub use output::{
    key_value, key_value_status, remark, section, step_error_detail, step_ok, step_ok_detail,
    step_warn_hint,
};
