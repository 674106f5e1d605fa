/// Environment Overlay Management
///
/// The process baseline environment is captured once at startup and is never
/// mutated afterwards. Each tool call receives its own `InvocationContext`, a
/// layered view of the request's `env` overrides on top of that baseline, so
/// concurrent calls can never observe each other's overrides and there is
/// nothing to restore once a call finishes.

use std::collections::BTreeMap;
use std::sync::Arc;

/// Plain environment mapping.
pub type EnvMap = BTreeMap<String, String>;

/// Immutable process-baseline environment shared by all invocations.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: Arc<EnvMap>,
}

impl Environment {
    /// Snapshot the current process environment.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self::from_map(vars)
    }

    pub fn from_map(vars: EnvMap) -> Self {
        Self {
            vars: Arc::new(vars),
        }
    }

    /// Returns a new baseline with `overlay` merged on top of this one.
    ///
    /// Used at startup to fold the baked-in and runtime overlays into the baseline.
    pub fn layered(&self, overlay: &EnvMap) -> Self {
        if overlay.is_empty() {
            return self.clone();
        }
        let mut vars = (*self.vars).clone();
        vars.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self::from_map(vars)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Owned copy of the baseline.
    pub fn snapshot(&self) -> EnvMap {
        (*self.vars).clone()
    }

    /// Build the effective environment for one invocation.
    pub fn overlay(&self, overrides: EnvMap) -> InvocationContext {
        InvocationContext {
            baseline: Arc::clone(&self.vars),
            overrides,
        }
    }
}

/// Run `body` with the effective environment `baseline + overrides`.
///
/// The context is moved into `body`; the baseline itself is only ever read,
/// so it is identical before and after the call whatever `body` does.
pub fn with_overlay<T>(
    baseline: &Environment,
    overrides: EnvMap,
    body: impl FnOnce(InvocationContext) -> T,
) -> T {
    body(baseline.overlay(overrides))
}

/// Read-only environment view handed to a tool for exactly one call.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    baseline: Arc<EnvMap>,
    overrides: EnvMap,
}

impl InvocationContext {
    /// Context with no baseline, only the given variables. Handy for calling a
    /// tool directly.
    pub fn from_env(env: EnvMap) -> Self {
        Self {
            baseline: Arc::new(EnvMap::new()),
            overrides: env,
        }
    }

    /// Look up a variable; request overrides win over the baseline.
    pub fn env(&self, key: &str) -> Option<&str> {
        self.overrides
            .get(key)
            .or_else(|| self.baseline.get(key))
            .map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.overrides.contains_key(key) || self.baseline.contains_key(key)
    }

    /// Materialize the full effective environment.
    pub fn to_map(&self) -> EnvMap {
        let mut env = (*self.baseline).clone();
        env.extend(self.overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_overlay_precedence() {
        let baseline = Environment::from_map(map(&[("A", "1")]));
        let seen = with_overlay(&baseline, map(&[("A", "2"), ("B", "3")]), |ctx| ctx.to_map());

        assert_eq!(seen, map(&[("A", "2"), ("B", "3")]));
        assert_eq!(baseline.snapshot(), map(&[("A", "1")]));
        assert_eq!(baseline.get("B"), None);
    }

    #[test]
    fn test_unspecified_keys_keep_baseline() {
        let baseline = Environment::from_map(map(&[("A", "1"), ("C", "keep")]));
        let ctx = baseline.overlay(map(&[("A", "2")]));

        assert_eq!(ctx.env("A"), Some("2"));
        assert_eq!(ctx.env("C"), Some("keep"));
        assert!(!ctx.contains("missing"));
    }

    #[test]
    fn test_baseline_survives_panicking_body() {
        let baseline = Environment::from_map(map(&[("A", "1")]));
        let before = baseline.snapshot();

        let result = std::panic::catch_unwind(|| {
            with_overlay::<()>(&baseline, map(&[("A", "boom")]), |_ctx| panic!("tool blew up"))
        });

        assert!(result.is_err());
        assert_eq!(baseline.snapshot(), before);
    }

    #[test]
    fn test_layered_merges_in_order() {
        let baked = map(&[("REGION", "eu"), ("MODE", "baked")]);
        let runtime = map(&[("MODE", "runtime")]);
        let env = Environment::from_map(map(&[("PATH", "/bin")]))
            .layered(&baked)
            .layered(&runtime);

        assert_eq!(env.get("PATH"), Some("/bin"));
        assert_eq!(env.get("REGION"), Some("eu"));
        assert_eq!(env.get("MODE"), Some("runtime"));
        assert_eq!(env.len(), 3);
    }
}
