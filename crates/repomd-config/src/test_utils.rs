/// Runs `f` with the given environment variables set (`Some`) or removed
/// (`None`), restoring the previous values afterwards.
///
/// Callers must be `#[serial]`; the environment is process-wide.
pub fn with_vars<F>(vars: Vec<(&str, Option<&str>)>, f: F)
where
    F: FnOnce(),
{
    let saved: Vec<_> = vars
        .iter()
        .map(|(key, _)| (*key, std::env::var(key).ok()))
        .collect();

    for (key, value) in &vars {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }

    f();

    for (key, value) in saved {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
}
