//! `setoption`-tunable parameters and their UCI declarations.

use crate::search::SearchParams;

#[derive(Clone, Copy, Debug)]
pub struct UciOptions {
    pub hash_mb: usize,
    pub threads: usize,
    pub move_overhead_ms: u64,
    pub use_tt: bool,
    pub search_params: SearchParams,
}

impl Default for UciOptions {
    fn default() -> UciOptions {
        UciOptions {
            hash_mb: 16,
            threads: 1,
            move_overhead_ms: 50,
            use_tt: true,
            search_params: SearchParams::default(),
        }
    }
}

/// A side effect the caller must apply after `setoption` is parsed: these
/// touch shared state (the TT, the worker count) that the option struct
/// alone can't carry out.
pub enum UciOptionAction {
    ReinitHash(usize),
    SetThreads(usize),
}

pub fn print_options() {
    println!("option name Hash type spin default 16 min 1 max 2048");
    println!("option name Threads type spin default 1 min 1 max 8");
    println!("option name Move Overhead type spin default 50 min 0 max 5000");
    println!("option name UseTT type check default true");
    println!(
        "option name NullMoveReduction type spin default {} min 1 max 4",
        SearchParams::default().null_move_base_reduction
    );
    println!(
        "option name FutilityMargin type spin default {} min 0 max 400",
        SearchParams::default().futility_margin_base
    );
    println!(
        "option name LMRMinDepth type spin default {} min 1 max 8",
        SearchParams::default().lmr_min_depth
    );
}

/// Tokenizes `setoption name <...> value <...>` into `(name, value)`.
pub fn parse_setoption(rest: &str) -> Option<(String, Option<String>)> {
    let rest = rest.strip_prefix("name ")?;
    match rest.find(" value ") {
        Some(idx) => {
            let name = rest[..idx].trim().to_string();
            let value = rest[idx + " value ".len()..].trim().to_string();
            Some((name, Some(value)))
        }
        None => Some((rest.trim().to_string(), None)),
    }
}

pub fn apply_setoption(options: &mut UciOptions, name: &str, value: Option<&str>) -> Option<UciOptionAction> {
    match name.to_ascii_lowercase().as_str() {
        "hash" => {
            let mb: usize = value.and_then(|v| v.parse().ok())?;
            options.hash_mb = mb;
            Some(UciOptionAction::ReinitHash(mb))
        }
        "threads" => {
            let n: usize = value.and_then(|v| v.parse().ok())?;
            options.threads = n.max(1);
            Some(UciOptionAction::SetThreads(options.threads))
        }
        "move overhead" => {
            options.move_overhead_ms = value.and_then(|v| v.parse().ok())?;
            None
        }
        "usett" => {
            options.use_tt = value.map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(true);
            None
        }
        "nullmovereduction" => {
            options.search_params.null_move_base_reduction = value.and_then(|v| v.parse().ok())?;
            None
        }
        "futilitymargin" => {
            options.search_params.futility_margin_base = value.and_then(|v| v.parse().ok())?;
            None
        }
        "lmrmindepth" => {
            options.search_params.lmr_min_depth = value.and_then(|v| v.parse().ok())?;
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_and_value() {
        let (name, value) = parse_setoption("name Hash value 64").unwrap();
        assert_eq!(name, "Hash");
        assert_eq!(value.as_deref(), Some("64"));
    }

    #[test]
    fn hash_option_requests_reinit() {
        let mut options = UciOptions::default();
        let action = apply_setoption(&mut options, "Hash", Some("64"));
        assert_eq!(options.hash_mb, 64);
        assert!(matches!(action, Some(UciOptionAction::ReinitHash(64))));
    }
}
