use std::fmt::{self, Display, Formatter};

/// One selectable step of a run.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ProbeKind {
    /// Static topology display.
    CpuInfo,
    /// Pairwise compute benchmark.
    Hyperthreading,
    /// Per-core private memory benchmark.
    LocalMemory,
    /// Per-core shared memory benchmark.
    Numa,
}

/// What runs when no probe word is given.
pub const DEFAULT_PROBES: &[ProbeKind] = &[
    ProbeKind::CpuInfo,
    ProbeKind::Hyperthreading,
    ProbeKind::Numa,
];

impl ProbeKind {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "cpu" | "cpuinfo" => Some(Self::CpuInfo),
            "hyper" | "hyperthreading" | "cores" => Some(Self::Hyperthreading),
            "numa" | "socket" | "sockets" | "numanode" | "numanodes" => Some(Self::Numa),
            "local" | "baseline" => Some(Self::LocalMemory),
            _ => None,
        }
    }
}

impl Display for ProbeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::CpuInfo => write!(f, "cpuinfo"),
            Self::Hyperthreading => write!(f, "hyperthreading"),
            Self::LocalMemory => write!(f, "local"),
            Self::Numa => write!(f, "numa"),
        }
    }
}

/// The meaning of the positional words of a command line.
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    probes: Vec<ProbeKind>,
    seconds_per_phase: Option<f64>,
    show_usage: bool,
    exit: bool,
}

impl Invocation {
    /// Interprets the positional words.
    ///
    /// * Without words, usage is shown and the default probes run.
    /// * A number sets the seconds per measurement phase.
    /// * A probe name selects that probe; probes run in the order given.
    /// * A help word, a second number or an unknown word shows usage and runs nothing.
    #[must_use]
    pub fn from_words(words: &[String]) -> Self {
        if words.is_empty() {
            return Self {
                probes: DEFAULT_PROBES.to_vec(),
                seconds_per_phase: None,
                show_usage: true,
                exit: false,
            };
        }

        let mut probes = Vec::new();
        let mut seconds_per_phase = None;
        let mut exit = false;

        for word in words {
            // Numbers are taken as written; "-1" is a (negative, later rejected) number.
            if let Ok(seconds) = word.parse::<f64>() {
                if seconds_per_phase.is_some() {
                    exit = true;
                }

                seconds_per_phase = Some(seconds);
                continue;
            }

            let word = word
                .trim_start_matches(['-', '/', '\\'])
                .to_ascii_lowercase();

            if matches!(word.as_str(), "?" | "h" | "help") {
                exit = true;
                continue;
            }

            if let Some(probe) = ProbeKind::from_word(&word) {
                probes.push(probe);
                continue;
            }

            exit = true;
            break;
        }

        if probes.is_empty() {
            probes.extend_from_slice(DEFAULT_PROBES);
        }

        Self {
            probes,
            seconds_per_phase,
            show_usage: exit,
            exit,
        }
    }

    /// Probes to run, in order.
    #[must_use]
    pub fn probes(&self) -> &[ProbeKind] {
        &self.probes
    }

    /// Seconds per measurement phase, if given.
    #[must_use]
    pub fn seconds_per_phase(&self) -> Option<f64> {
        self.seconds_per_phase
    }

    /// Whether to print usage.
    #[must_use]
    pub fn show_usage(&self) -> bool {
        self.show_usage
    }

    /// Whether to stop after printing usage.
    #[must_use]
    pub fn exit(&self) -> bool {
        self.exit
    }
}
