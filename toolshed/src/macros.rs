/// Creates a [`ParameterSpec`](crate::ParameterSpec) from a type shorthand,
/// optionally with a description.
///
/// ```rust
/// use toolshed::{ParameterType, ts_param};
///
/// let spec = ts_param!(integer, "Page number, starting at 1");
/// assert_eq!(spec.kind, ParameterType::Integer);
/// assert_eq!(spec.description.as_deref(), Some("Page number, starting at 1"));
/// ```
#[macro_export]
macro_rules! ts_param {
    (string) => {
        $crate::ParameterSpec::string()
    };
    (number) => {
        $crate::ParameterSpec::number()
    };
    (integer) => {
        $crate::ParameterSpec::integer()
    };
    (boolean) => {
        $crate::ParameterSpec::boolean()
    };
    (object) => {
        $crate::ParameterSpec::object()
    };
    (array) => {
        $crate::ParameterSpec::array()
    };
    ($kind:ident, $description:expr $(,)?) => {
        $crate::ts_param!($kind).describe($description)
    };
    ($kind:ident) => {
        compile_error!(
            "unsupported parameter type: use string, number, integer, boolean, object, or array"
        );
    };
}

/// Builds a [`ToolSchema`](crate::ToolSchema) from required and optional
/// parameter lists.
///
/// ```rust
/// use toolshed::ts_schema;
///
/// let schema = ts_schema!(
///     "get_weather",
///     "Current weather for a city",
///     required { city: string },
///     optional { days: integer },
/// );
///
/// assert_eq!(schema.name, "get_weather");
/// assert_eq!(schema.parameters.required, vec!["city".to_string()]);
/// assert_eq!(schema.parameters.properties.len(), 2);
/// ```
#[macro_export]
macro_rules! ts_schema {
    ($name:expr, $description:expr $(,)?) => {
        $crate::ToolSchema::new($name, $description)
    };
    (
        $name:expr,
        $description:expr,
        required { $($required:ident : $required_kind:ident),* $(,)? }
        $(, optional { $($optional:ident : $optional_kind:ident),* $(,)? })?
        $(,)?
    ) => {
        $crate::ToolSchema::new($name, $description)
            $(.required(stringify!($required), $crate::ts_param!($required_kind)))*
            $($(.optional(stringify!($optional), $crate::ts_param!($optional_kind)))*)?
    };
    (
        $name:expr,
        $description:expr,
        optional { $($optional:ident : $optional_kind:ident),* $(,)? }
        $(,)?
    ) => {
        $crate::ToolSchema::new($name, $description)
            $(.optional(stringify!($optional), $crate::ts_param!($optional_kind)))*
    };
}
