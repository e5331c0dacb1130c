//! Run configuration.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use once_cell::sync::Lazy;

/// Number of logical CPUs, queried once.
static HOST_PARALLELISM: Lazy<NonZeroUsize> = Lazy::new(|| NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN));

/// Default number of fragments.
pub const DEFAULT_FRAGMENTS: usize = 2;

/// Default maximum forward timestamp jump, in seconds, accepted while locating boundaries.
pub const DEFAULT_MAX_GAP: u32 = 3600;


/// How many fragments are dispatched at the same time.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Parallelism {
    /// One per logical CPU of the host
    #[default]
    Auto,
    /// A fixed positive number
    Fixed(NonZeroUsize),
}

impl Parallelism {
    /// The concrete number of concurrent dispatches.
    pub fn resolve(self) -> NonZeroUsize {
        match self {
            Parallelism::Auto => *HOST_PARALLELISM,
            Parallelism::Fixed(n) => n,
        }
    }
}

impl FromStr for Parallelism {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Parallelism::Auto);
        }

        s.parse::<NonZeroUsize>()
            .map(Parallelism::Fixed)
            .map_err(|_| format!("expected a positive integer or \"auto\", got {s:?}"))
    }
}

impl fmt::Display for Parallelism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parallelism::Auto => f.write_str("auto"),
            Parallelism::Fixed(n) => write!(f, "{n}"),
        }
    }
}


/// How a rendered command is started.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ExecMode {
    /// Tokens are joined with spaces and run by `sh -c`.
    ///
    /// Shell metacharacters in the template (redirections, pipes) are interpreted.
    #[default]
    Shell,
    /// The first token is the program, the others its arguments. No shell is involved.
    Direct,
}


/// Everything a slicing run needs besides the capture and the command template.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SliceConfig {
    /// Number of fragments to produce
    pub fragments: usize,
    /// Maximum forward timestamp jump, in seconds, between consecutive located boundaries
    pub max_gap: u32,
    /// Bound on concurrently running commands
    pub parallelism: Parallelism,
    /// How commands are started
    pub exec_mode: ExecMode,
}

impl Default for SliceConfig {
    fn default() -> Self {
        SliceConfig {
            fragments: DEFAULT_FRAGMENTS,
            max_gap: DEFAULT_MAX_GAP,
            parallelism: Parallelism::Auto,
            exec_mode: ExecMode::Shell,
        }
    }
}
