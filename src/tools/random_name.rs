//! The `get_random_name` tool

use rand::Rng;
use schemars::JsonSchema;
use serde::Deserialize;

/// Tool name as exposed over MCP
pub const TOOL_NAME: &str = "get_random_name";

/// Human-readable tool title
pub const TOOL_TITLE: &str = "Random Name Generator";

/// Tool description
pub const TOOL_DESCRIPTION: &str = "Returns a random name from a predefined list";

/// The fixed label set the tool draws from
pub const RANDOM_NAMES: [&str; 5] = ["Alice", "Bob", "Charlie", "Diana", "Edward"];

/// Arguments for `get_random_name` (the tool takes none)
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GetRandomNameArgs {}

/// Draw one name uniformly, with replacement
pub fn pick_random_name<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    RANDOM_NAMES[rng.random_range(0..RANDOM_NAMES.len())]
}

/// Draw one name using the thread-local RNG
pub fn random_name() -> &'static str {
    pick_random_name(&mut rand::rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_pick_is_from_label_set() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(RANDOM_NAMES.contains(&pick_random_name(&mut rng)));
        }
    }

    #[test]
    fn test_seeded_draws_are_reproducible() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let first: Vec<_> = (0..20).map(|_| pick_random_name(&mut a)).collect();
        let second: Vec<_> = (0..20).map(|_| pick_random_name(&mut b)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_args_accept_extra_fields() {
        let args: Result<GetRandomNameArgs, _> =
            serde_json::from_value(serde_json::json!({"ignored": true}));
        assert!(args.is_ok());
    }
}
