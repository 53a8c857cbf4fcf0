// src/launch/env.rs

use std::collections::BTreeMap;

/// The executable search-path variable.
pub const SEARCH_PATH_VAR: &str = "PATH";

/// Separator between search-path entries on this platform.
pub fn search_path_separator() -> char {
    if cfg!(windows) { ';' } else { ':' }
}

/// Build a child environment from `base_env` with `extra_path_entries`
/// appended to the search path.
///
/// - Existing value: `<original><sep><extra joined by sep>`.
/// - Missing variable: created holding only the extra entries.
/// - No extra entries: the environment is passed through untouched.
pub fn build_env<I>(base_env: I, extra_path_entries: &[String]) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut env: BTreeMap<String, String> = base_env.into_iter().collect();

    if extra_path_entries.is_empty() {
        return env;
    }

    let sep = search_path_separator().to_string();
    let extra = extra_path_entries.join(&sep);

    let key = search_path_key(&env).unwrap_or_else(|| SEARCH_PATH_VAR.to_string());
    let value = match env.get(&key) {
        Some(original) => format!("{original}{sep}{extra}"),
        None => extra,
    };
    env.insert(key, value);

    env
}

/// Key under which the search path lives in `env`.
///
/// Windows treats environment names case-insensitively (`Path` is common).
fn search_path_key(env: &BTreeMap<String, String>) -> Option<String> {
    if cfg!(windows) {
        env.keys()
            .find(|k| k.eq_ignore_ascii_case(SEARCH_PATH_VAR))
            .cloned()
    } else {
        env.contains_key(SEARCH_PATH_VAR)
            .then(|| SEARCH_PATH_VAR.to_string())
    }
}

/// The current process environment, skipping entries that are not valid
/// UTF-8.
pub fn current_env() -> Vec<(String, String)> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}
