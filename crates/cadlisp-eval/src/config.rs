use std::env;

use cadlisp_core::DEFAULT_MAX_EVAL_DEPTH;

/// Session settings for an [`Interpreter`](crate::Interpreter).
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Nesting limit for non-tail evaluation.
    pub max_eval_depth: usize,
    pub load_prelude: bool,
    /// Bound to `*ARGV*` as a list of strings.
    pub argv: Vec<String>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_eval_depth: DEFAULT_MAX_EVAL_DEPTH,
            load_prelude: true,
            argv: Vec::new(),
        }
    }
}

impl InterpreterConfig {
    /// Defaults, with `CADLISP_MAX_EVAL_DEPTH` applied when it parses.
    pub fn from_env() -> Self {
        Self {
            max_eval_depth: env::var("CADLISP_MAX_EVAL_DEPTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(DEFAULT_MAX_EVAL_DEPTH),
            ..Self::default()
        }
    }

    pub fn with_max_eval_depth(mut self, depth: usize) -> Self {
        self.max_eval_depth = depth;
        self
    }

    pub fn with_prelude(mut self, load: bool) -> Self {
        self.load_prelude = load;
        self
    }

    pub fn with_argv(mut self, argv: Vec<String>) -> Self {
        self.argv = argv;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = InterpreterConfig::default();
        assert_eq!(config.max_eval_depth, DEFAULT_MAX_EVAL_DEPTH);
        assert!(config.load_prelude);
        assert!(config.argv.is_empty());
    }

    #[test]
    fn builder_methods() {
        let config = InterpreterConfig::default()
            .with_max_eval_depth(50)
            .with_prelude(false)
            .with_argv(vec!["a".into()]);
        assert_eq!(config.max_eval_depth, 50);
        assert!(!config.load_prelude);
        assert_eq!(config.argv, vec!["a".to_string()]);
    }
}
