use std::time::Duration;

const ENV_PREFIX: &str = "TESSERA_HWPROF";
const DEFAULT_TIMEOUT_MS: u64 = 2000;
const MIN_TIMEOUT_MS: u64 = 200;

/// Probe knobs, normally read from `TESSERA_HWPROF_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Upper bound for each GPU query.
    pub timeout: Duration,
    /// Attach diagnostics to the resulting profile.
    pub debug: bool,
    /// Lowercase GPU query names to skip; `"gpu"` skips them all.
    pub disabled: Vec<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            debug: false,
            disabled: Vec::new(),
        }
    }
}

impl ProbeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ProbeConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> Self {
        let timeout_ms = get(&format!("{ENV_PREFIX}_TIMEOUT_MS"))
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|&v| v >= MIN_TIMEOUT_MS)
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        let debug = get(&format!("{ENV_PREFIX}_DEBUG"))
            .map(|v| truthy(&v))
            .unwrap_or(false);

        let disabled = ["gpu", "cuda", "nvidia_smi", "lspci"]
            .into_iter()
            .filter(|name| {
                let key = format!("{ENV_PREFIX}_DISABLE_{}", name.to_ascii_uppercase());
                get(&key).map(|v| truthy(&v)).unwrap_or(false)
            })
            .map(String::from)
            .collect();

        Self {
            timeout: Duration::from_millis(timeout_ms),
            debug,
            disabled,
        }
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled
            .iter()
            .any(|d| d == "gpu" || d.eq_ignore_ascii_case(name))
    }
}

fn truthy(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}
