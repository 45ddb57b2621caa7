//! The energy-system view that diagram jobs draw from.
//!
//! [`EnergySystem`] is the read-only query surface: which processes exist,
//! what each consumes and produces, and the solved quantities (capacities,
//! activities, flows) that result diagrams annotate. [`SparseSystem`] is the
//! in-memory implementation, assembled through [`SparseSystemBuilder`] from
//! whatever dataset loader the caller has.
//!
//! All enumeration methods return sorted vectors so two runs over the same
//! system visit entries in the same order.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// A model period (year).
pub type Period = u32;
/// A build vintage (year).
pub type Vintage = u32;

/// Identifies one installed process: a technology of a given vintage
/// operating in a given period.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProcessKey {
    pub period: Period,
    pub tech: String,
    pub vintage: Vintage,
}

impl ProcessKey {
    pub fn new(period: Period, tech: impl Into<String>, vintage: Vintage) -> Self {
        Self {
            period,
            tech: tech.into(),
            vintage,
        }
    }
}

/// One intra-period time slice, e.g. ("winter", "day").
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeSlice {
    pub season: String,
    pub time_of_day: String,
}

impl TimeSlice {
    pub fn new(season: impl Into<String>, time_of_day: impl Into<String>) -> Self {
        Self {
            season: season.into(),
            time_of_day: time_of_day.into(),
        }
    }

    /// Render as the `"season, time_of_day"` label used for slice nodes.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}, {}", self.season, self.time_of_day)
    }
}

/// Consumed/produced totals for one flow query.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowTotals {
    pub consumed: f64,
    pub produced: f64,
}

impl FlowTotals {
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.consumed == 0.0 && self.produced == 0.0
    }
}

/// Read-only queries over a solved (or merely structural) energy system.
///
/// Structural queries (`active_processes`, `process_inputs`, ...) describe
/// the conversion topology and are enough for the overview and per-scope
/// structural diagrams. Quantitative queries (`capacity`, `flow_in`, ...)
/// return solved values and default to zero/`None` when a dataset carries no
/// solution; result diagrams then come out empty and their jobs skip.
pub trait EnergySystem: Send + Sync {
    /// Every (period, tech, vintage) process in the system, sorted.
    fn active_processes(&self) -> Vec<ProcessKey>;

    /// All declared technologies, including ones no process uses.
    fn technologies(&self) -> Vec<String>;

    /// All declared energy carriers, including unconsumed ones.
    fn carriers(&self) -> Vec<String>;

    /// All declared emission commodities.
    fn emissions(&self) -> Vec<String>;

    /// The model's periods, sorted ascending.
    fn periods(&self) -> Vec<Period>;

    /// The model's time slices, sorted.
    fn time_slices(&self) -> Vec<TimeSlice>;

    /// Carriers the process consumes.
    fn process_inputs(&self, key: &ProcessKey) -> Vec<String>;

    /// Carriers the process produces.
    fn process_outputs(&self, key: &ProcessKey) -> Vec<String>;

    /// Carriers the process produces *from the given input*.
    fn outputs_for_input(&self, key: &ProcessKey, input: &str) -> Vec<String>;

    /// Technologies that consume the carrier anywhere in the system.
    fn consumers_of(&self, carrier: &str) -> Vec<String>;

    /// Technologies that produce the carrier anywhere in the system.
    fn producers_of(&self, carrier: &str) -> Vec<String>;

    /// Vintages of `tech` operating in `period`, sorted ascending.
    fn vintages(&self, period: Period, tech: &str) -> Vec<Vintage>;

    /// Installed capacity of a (tech, vintage) build, if solved.
    fn capacity(&self, tech: &str, vintage: Vintage) -> Option<f64>;

    /// Capacity of `tech` still available in `period`, if solved. `None`
    /// means the pair never entered the solution; `Some(0.0)` means it did
    /// but nothing survives.
    fn available_capacity(&self, period: Period, tech: &str) -> Option<f64>;

    /// Total activity of the process across all slices.
    fn activity(&self, key: &ProcessKey) -> f64;

    /// Energy of `input` consumed by `tech` across all vintages and slices
    /// in `period`.
    fn flow_in(&self, period: Period, input: &str, tech: &str) -> f64;

    /// Energy of `output` produced by `tech` across all vintages and slices
    /// in `period`.
    fn flow_out(&self, period: Period, tech: &str, output: &str) -> f64;

    /// Flow through one process along one input→output conversion, summed
    /// over slices.
    fn vintage_flow(&self, key: &ProcessKey, input: &str, output: &str) -> FlowTotals;

    /// Flow through one process along one conversion within one slice.
    fn slice_flow(
        &self,
        key: &ProcessKey,
        input: &str,
        output: &str,
        slice: &TimeSlice,
    ) -> FlowTotals;

    /// Every (tech, emission) pair with recorded emission activity, sorted.
    fn emission_links(&self) -> Vec<(String, String)>;

    /// Emission quantity of `emission` from `tech` in `period`.
    fn emission_activity(&self, period: Period, tech: &str, emission: &str) -> f64;
}

/// In-memory [`EnergySystem`] backed by hash maps, built once and then
/// shared read-only across jobs.
#[derive(Debug, Clone, Default)]
pub struct SparseSystem {
    conversions: FxHashMap<ProcessKey, BTreeSet<(String, String)>>,
    technologies: BTreeSet<String>,
    carriers: BTreeSet<String>,
    emissions: BTreeSet<String>,
    periods: BTreeSet<Period>,
    slices: BTreeSet<TimeSlice>,
    capacity: FxHashMap<(String, Vintage), f64>,
    available: FxHashMap<(Period, String), f64>,
    activity: FxHashMap<ProcessKey, f64>,
    slice_flows: FxHashMap<(ProcessKey, String, String, TimeSlice), FlowTotals>,
    emission_activity: FxHashMap<(Period, String, String), f64>,
}

impl SparseSystem {
    #[must_use]
    pub fn builder() -> SparseSystemBuilder {
        SparseSystemBuilder::default()
    }
}

/// Fluent builder for [`SparseSystem`].
///
/// Declaring a conversion implicitly registers its process, technology,
/// carriers, and period, so small fixtures stay terse:
///
/// ```
/// use fluxdot::model::SparseSystem;
///
/// let system = SparseSystem::builder()
///     .conversion(2025, "coal_plant", 2020, "coal", "electricity")
///     .capacity("coal_plant", 2020, 4.0)
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct SparseSystemBuilder {
    system: SparseSystem,
}

impl SparseSystemBuilder {
    /// Register an input→output conversion for a process.
    #[must_use]
    pub fn conversion(
        mut self,
        period: Period,
        tech: &str,
        vintage: Vintage,
        input: &str,
        output: &str,
    ) -> Self {
        let key = ProcessKey::new(period, tech, vintage);
        self.system
            .conversions
            .entry(key)
            .or_default()
            .insert((input.to_owned(), output.to_owned()));
        self.system.technologies.insert(tech.to_owned());
        self.system.carriers.insert(input.to_owned());
        self.system.carriers.insert(output.to_owned());
        self.system.periods.insert(period);
        self
    }

    /// Record solved flow through one conversion in one time slice. Also
    /// registers the conversion and the slice.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn slice_flow(
        mut self,
        period: Period,
        tech: &str,
        vintage: Vintage,
        input: &str,
        output: &str,
        slice: TimeSlice,
        consumed: f64,
        produced: f64,
    ) -> Self {
        self = self.conversion(period, tech, vintage, input, output);
        self.system.slices.insert(slice.clone());
        let key = (
            ProcessKey::new(period, tech, vintage),
            input.to_owned(),
            output.to_owned(),
            slice,
        );
        let entry = self.system.slice_flows.entry(key).or_default();
        entry.consumed += consumed;
        entry.produced += produced;
        self
    }

    /// Record installed capacity for a (tech, vintage) build.
    #[must_use]
    pub fn capacity(mut self, tech: &str, vintage: Vintage, value: f64) -> Self {
        self.system
            .capacity
            .insert((tech.to_owned(), vintage), value);
        self
    }

    /// Record capacity of `tech` still available in `period`.
    #[must_use]
    pub fn available_capacity(mut self, period: Period, tech: &str, value: f64) -> Self {
        self.system.available.insert((period, tech.to_owned()), value);
        self
    }

    /// Record total activity for a process.
    #[must_use]
    pub fn activity(mut self, period: Period, tech: &str, vintage: Vintage, value: f64) -> Self {
        self.system
            .activity
            .insert(ProcessKey::new(period, tech, vintage), value);
        self
    }

    /// Record emission activity of `tech` in `period`.
    #[must_use]
    pub fn emission(mut self, period: Period, tech: &str, emission: &str, value: f64) -> Self {
        self.system.emissions.insert(emission.to_owned());
        self.system
            .emission_activity
            .insert((period, tech.to_owned(), emission.to_owned()), value);
        self
    }

    /// Declare a technology that may appear in no conversion.
    #[must_use]
    pub fn technology(mut self, tech: &str) -> Self {
        self.system.technologies.insert(tech.to_owned());
        self
    }

    /// Declare a carrier that may appear in no conversion.
    #[must_use]
    pub fn carrier(mut self, carrier: &str) -> Self {
        self.system.carriers.insert(carrier.to_owned());
        self
    }

    /// Declare an emission commodity with no recorded activity.
    #[must_use]
    pub fn emission_commodity(mut self, emission: &str) -> Self {
        self.system.emissions.insert(emission.to_owned());
        self
    }

    /// Declare a period with no processes.
    #[must_use]
    pub fn period(mut self, period: Period) -> Self {
        self.system.periods.insert(period);
        self
    }

    #[must_use]
    pub fn build(self) -> SparseSystem {
        self.system
    }
}

impl EnergySystem for SparseSystem {
    fn active_processes(&self) -> Vec<ProcessKey> {
        let mut keys: Vec<ProcessKey> = self.conversions.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn technologies(&self) -> Vec<String> {
        self.technologies.iter().cloned().collect()
    }

    fn carriers(&self) -> Vec<String> {
        self.carriers.iter().cloned().collect()
    }

    fn emissions(&self) -> Vec<String> {
        self.emissions.iter().cloned().collect()
    }

    fn periods(&self) -> Vec<Period> {
        self.periods.iter().copied().collect()
    }

    fn time_slices(&self) -> Vec<TimeSlice> {
        self.slices.iter().cloned().collect()
    }

    fn process_inputs(&self, key: &ProcessKey) -> Vec<String> {
        let Some(pairs) = self.conversions.get(key) else {
            return Vec::new();
        };
        let inputs: BTreeSet<&String> = pairs.iter().map(|(input, _)| input).collect();
        inputs.into_iter().cloned().collect()
    }

    fn process_outputs(&self, key: &ProcessKey) -> Vec<String> {
        let Some(pairs) = self.conversions.get(key) else {
            return Vec::new();
        };
        let outputs: BTreeSet<&String> = pairs.iter().map(|(_, output)| output).collect();
        outputs.into_iter().cloned().collect()
    }

    fn outputs_for_input(&self, key: &ProcessKey, input: &str) -> Vec<String> {
        let Some(pairs) = self.conversions.get(key) else {
            return Vec::new();
        };
        pairs
            .iter()
            .filter(|(i, _)| i == input)
            .map(|(_, output)| output.clone())
            .collect()
    }

    fn consumers_of(&self, carrier: &str) -> Vec<String> {
        let techs: BTreeSet<&String> = self
            .conversions
            .iter()
            .filter(|(_, pairs)| pairs.iter().any(|(input, _)| input == carrier))
            .map(|(key, _)| &key.tech)
            .collect();
        techs.into_iter().cloned().collect()
    }

    fn producers_of(&self, carrier: &str) -> Vec<String> {
        let techs: BTreeSet<&String> = self
            .conversions
            .iter()
            .filter(|(_, pairs)| pairs.iter().any(|(_, output)| output == carrier))
            .map(|(key, _)| &key.tech)
            .collect();
        techs.into_iter().cloned().collect()
    }

    fn vintages(&self, period: Period, tech: &str) -> Vec<Vintage> {
        let vintages: BTreeSet<Vintage> = self
            .conversions
            .keys()
            .filter(|key| key.period == period && key.tech == tech)
            .map(|key| key.vintage)
            .collect();
        vintages.into_iter().collect()
    }

    fn capacity(&self, tech: &str, vintage: Vintage) -> Option<f64> {
        self.capacity.get(&(tech.to_owned(), vintage)).copied()
    }

    fn available_capacity(&self, period: Period, tech: &str) -> Option<f64> {
        self.available.get(&(period, tech.to_owned())).copied()
    }

    fn activity(&self, key: &ProcessKey) -> f64 {
        self.activity.get(key).copied().unwrap_or_default()
    }

    fn flow_in(&self, period: Period, input: &str, tech: &str) -> f64 {
        self.slice_flows
            .iter()
            .filter(|((key, i, _, _), _)| {
                key.period == period && key.tech == tech && i == input
            })
            .map(|(_, totals)| totals.consumed)
            .sum()
    }

    fn flow_out(&self, period: Period, tech: &str, output: &str) -> f64 {
        self.slice_flows
            .iter()
            .filter(|((key, _, o, _), _)| {
                key.period == period && key.tech == tech && o == output
            })
            .map(|(_, totals)| totals.produced)
            .sum()
    }

    fn vintage_flow(&self, key: &ProcessKey, input: &str, output: &str) -> FlowTotals {
        let mut totals = FlowTotals::default();
        for ((k, i, o, _), flow) in &self.slice_flows {
            if k == key && i == input && o == output {
                totals.consumed += flow.consumed;
                totals.produced += flow.produced;
            }
        }
        totals
    }

    fn slice_flow(
        &self,
        key: &ProcessKey,
        input: &str,
        output: &str,
        slice: &TimeSlice,
    ) -> FlowTotals {
        self.slice_flows
            .get(&(
                key.clone(),
                input.to_owned(),
                output.to_owned(),
                slice.clone(),
            ))
            .copied()
            .unwrap_or_default()
    }

    fn emission_links(&self) -> Vec<(String, String)> {
        let links: BTreeSet<(String, String)> = self
            .emission_activity
            .keys()
            .map(|(_, tech, emission)| (tech.clone(), emission.clone()))
            .collect();
        links.into_iter().collect()
    }

    fn emission_activity(&self, period: Period, tech: &str, emission: &str) -> f64 {
        self.emission_activity
            .get(&(period, tech.to_owned(), emission.to_owned()))
            .copied()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_stage_system() -> SparseSystem {
        SparseSystem::builder()
            .conversion(2025, "mine", 2020, "reserves", "coal")
            .conversion(2025, "coal_plant", 2020, "coal", "electricity")
            .conversion(2025, "coal_plant", 2015, "coal", "electricity")
            .slice_flow(
                2025,
                "coal_plant",
                2020,
                "coal",
                "electricity",
                TimeSlice::new("winter", "day"),
                2.0,
                0.8,
            )
            .slice_flow(
                2025,
                "coal_plant",
                2020,
                "coal",
                "electricity",
                TimeSlice::new("winter", "night"),
                1.0,
                0.4,
            )
            .build()
    }

    #[test]
    fn conversion_registers_process_and_commodities() {
        let system = two_stage_system();
        assert_eq!(system.active_processes().len(), 3);
        assert_eq!(
            system.carriers(),
            vec!["coal", "electricity", "reserves"]
        );
        assert_eq!(system.consumers_of("coal"), vec!["coal_plant"]);
        assert_eq!(system.producers_of("coal"), vec!["mine"]);
    }

    #[test]
    fn vintages_are_sorted_per_period_and_tech() {
        let system = two_stage_system();
        assert_eq!(system.vintages(2025, "coal_plant"), vec![2015, 2020]);
        assert!(system.vintages(2030, "coal_plant").is_empty());
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn flows_aggregate_over_slices() {
        let system = two_stage_system();
        assert_eq!(system.flow_in(2025, "coal", "coal_plant"), 3.0);
        // 0.8 + 0.4 accumulates float error, so compare with a tolerance.
        assert!(close(system.flow_out(2025, "coal_plant", "electricity"), 1.2));

        let key = ProcessKey::new(2025, "coal_plant", 2020);
        let totals = system.vintage_flow(&key, "coal", "electricity");
        assert_eq!(totals.consumed, 3.0);
        assert!(close(totals.produced, 1.2));
    }

    #[test]
    fn unsolved_quantities_default_to_zero_or_none() {
        let system = two_stage_system();
        assert_eq!(system.capacity("coal_plant", 2020), None);
        assert_eq!(system.available_capacity(2025, "mine"), None);
        assert_eq!(system.flow_in(2025, "reserves", "mine"), 0.0);
        let key = ProcessKey::new(2025, "mine", 2020);
        assert_eq!(system.activity(&key), 0.0);
    }

    #[test]
    fn declared_but_unused_entities_survive() {
        let system = SparseSystem::builder()
            .technology("fusion")
            .carrier("tritium")
            .emission_commodity("co2")
            .build();
        assert_eq!(system.technologies(), vec!["fusion"]);
        assert_eq!(system.carriers(), vec!["tritium"]);
        assert_eq!(system.emissions(), vec!["co2"]);
        assert!(system.active_processes().is_empty());
    }
}
