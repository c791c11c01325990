//! Weave handler calls into class definitions
//!
//! Directives say what to weave where. They are normally read from [`DirectiveRecord`]s into a
//! [`DirectiveRegistry`], which is then handed along with a [`HandlerProvider`] to a [`Weaver`].
//!
//! Every directive is planned in full against the current state of a method before anything is
//! edited, then applied, then checked. A directive that fails at any of these steps leaves the
//! class as it was before that directive.

mod args;
mod coerce;
mod constant;
mod directive;
mod edit;
mod errors;
mod handler;
mod inject;
mod locator;
mod overwrite;
mod record;
mod redirect;
mod registry;
mod settings;
mod slots;
mod variable;
mod weaver;

pub use coerce::{box_value, coerce, kind_type, push_boxed_default, push_default, unbox_value};
pub use directive::*;
pub use edit::*;
pub use errors::*;
pub use handler::*;
pub use locator::*;
pub use record::*;
pub use registry::*;
pub use settings::*;
pub use slots::*;
pub use weaver::*;
