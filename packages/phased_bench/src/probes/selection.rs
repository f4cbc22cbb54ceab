use std::str::FromStr;

use hw_topology::{ProcessorId, Topology};

use crate::BenchmarkError;

/// Which of the processors allowed for the current process a probe runs on.
///
/// Parses from `all`, `even`, `odd` or a cpulist such as `0-3,8`.
///
/// ```
/// use phased_bench::CoreSelection;
///
/// let selection: CoreSelection = "0-2,6".parse().unwrap();
/// assert_eq!(selection, CoreSelection::Explicit(vec![0, 1, 2, 6]));
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum CoreSelection {
    /// Every allowed processor.
    #[default]
    All,
    /// Allowed processors with an even ID.
    Even,
    /// Allowed processors with an odd ID.
    Odd,
    /// The listed processors, where allowed.
    Explicit(Vec<ProcessorId>),
}

impl CoreSelection {
    /// Whether `processor_id` is selected, ignoring process affinity.
    #[must_use]
    pub fn matches(&self, processor_id: ProcessorId) -> bool {
        match self {
            Self::All => true,
            Self::Even => processor_id % 2 == 0,
            Self::Odd => processor_id % 2 == 1,
            Self::Explicit(list) => list.contains(&processor_id),
        }
    }

    /// The selected processors among those `topology` allows for the process, in ascending
    /// order.
    #[must_use]
    pub fn resolve(&self, topology: &Topology) -> Vec<ProcessorId> {
        topology
            .allowed_processors()
            .into_iter()
            .filter(|&id| self.matches(id))
            .collect()
    }
}

impl FromStr for CoreSelection {
    type Err = BenchmarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "even" => Ok(Self::Even),
            "odd" => Ok(Self::Odd),
            list => cpulist::parse(list).map(Self::Explicit).map_err(|e| {
                BenchmarkError::InvalidConfiguration(format!("invalid core selection '{s}': {e}"))
            }),
        }
    }
}
