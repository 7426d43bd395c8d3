/// Get the value of a variable, or a default
///
/// Only when:
/// - It is set
/// - It is not empty
pub fn var_or_else<L>(lookup: &L, var_name: &'static str, or_else: fn() -> String) -> String
where
    L: Fn(&str) -> Option<String>,
{
    non_empty_var(lookup, var_name).unwrap_or_else(or_else)
}

/// Get the value of a variable, `None` when unset or empty
pub fn non_empty_var<L>(lookup: &L, var_name: &'static str) -> Option<String>
where
    L: Fn(&str) -> Option<String>,
{
    lookup(var_name).filter(|value| !value.is_empty())
}
