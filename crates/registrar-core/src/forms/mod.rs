//! Form state, validation and submission.
//!
//! A [`Form`] holds the text of each field, checks it against per-field
//! [`Rule`]s and cross-field checks, and turns it into a JSON body. A form
//! with any failing rule never reaches the network.

pub mod form;
pub mod rules;
pub mod schemas;

pub use form::{
    CrossCheck, Derivation, FieldError, FieldKind, FieldSpec, Form, FormError, FormValues,
    SelectOption,
};
pub use rules::Rule;
pub use schemas::{form_for, option_sources};
