use super::Error;
use crate::bytecode::{BinaryName, Name};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Priority of directives that do not specify one
    pub default_priority: i32,

    /// Tolerance when matching `float` and `double` constants
    pub float_epsilon: f64,

    /// Check every woven method by simulating its stack
    ///
    /// When the check fails, the directive is reported as failed and the method is restored to
    /// what it was before the directive. When it passes, `max_stack` is set to the simulated peak
    /// instead of the additive upper bound.
    pub verify_after_weave: bool,

    /// Token handed to cancellable handlers, written as `my/runtime/Token`
    ///
    /// Constructed with `(Ljava/lang/String;Z)V` (target method, cancellable) and queried with
    /// `isCancelled()Z`.
    pub cancellation_token: BinaryName,

    /// Token that also carries a return value
    ///
    /// Constructed with `(Ljava/lang/String;ZLjava/lang/Object;)V` (the last argument being the
    /// boxed default return value) and read with `getReturnValue()Ljava/lang/Object;`.
    pub returnable_token: BinaryName,

    /// Mutable view over call arguments, passed to batch argument handlers
    ///
    /// Constructed with `(I)V` (argument count), accessed with `get(I)Ljava/lang/Object;` and
    /// `set(ILjava/lang/Object;)V`.
    pub argument_view: BinaryName,
}

impl Settings {
    pub fn new() -> Settings {
        Settings {
            default_priority: 1000,
            float_epsilon: 1e-6,
            verify_after_weave: true,
            cancellation_token: BinaryName::CANCELLATION_TOKEN,
            returnable_token: BinaryName::RETURNABLE_TOKEN,
            argument_view: BinaryName::ARGUMENT_VIEW,
        }
    }

    /// Use different runtime support classes (eg. after relocating them into another package)
    pub fn with_runtime_package(package: &str) -> Result<Settings, Error> {
        fn make_name(package: &str, simple: &str) -> Result<BinaryName, Error> {
            BinaryName::from_string(format!("{}/{}", package, simple)).map_err(Error::MalformedName)
        }

        Ok(Settings {
            cancellation_token: make_name(package, "CancellationToken")?,
            returnable_token: make_name(package, "ReturnableToken")?,
            argument_view: make_name(package, "ArgumentView")?,
            ..Settings::new()
        })
    }

    /// Is this one of the two token types?
    pub fn is_token(&self, class: &BinaryName) -> bool {
        class == &self.cancellation_token || class == &self.returnable_token
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings::new()
    }
}
