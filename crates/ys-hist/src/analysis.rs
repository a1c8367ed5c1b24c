//! Analysis lifecycle: book, fill per event, finalize.
//!
//! An [`Analysis`] books its objects in `init`, fills them in `analyze` once
//! per event and rescales them in `finalize`. The [`AnalysisHandler`] owns
//! the [`Registry`] the objects live in and drives the three phases.
//! Analyses are made available by name through an explicit
//! [`AnalysisFactory`] filled at startup.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use ys_core::{Error, Result, ResultExt};

use crate::convert;
use crate::edges::DEFAULT_EDGE_TOLERANCE;
use crate::histo1d::Histo1D;
use crate::object::AnalysisObject;
use crate::profile1d::Profile1D;
use crate::registry::{Registry, validate_path};
use crate::scatter2d::Scatter2D;

/// What the handler does when a fill is rejected for non-finite input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidFillPolicy {
    /// Drop the fill, count it and carry on with the run.
    #[default]
    Skip,
    /// Propagate the error and stop the run.
    Abort,
}

/// Handler configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Policy for rejected fills and non-finite event weights.
    pub invalid_fill: InvalidFillPolicy,
    /// Cross-section of the generated sample, made available to `finalize`.
    pub cross_section: Option<f64>,
    /// Relative tolerance for merging edges when booking from reference data.
    pub edge_tolerance: Option<f64>,
}

impl HandlerConfig {
    /// Parse a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Set the fill policy.
    pub fn invalid_fill(mut self, policy: InvalidFillPolicy) -> Self {
        self.invalid_fill = policy;
        self
    }

    /// Set the cross-section.
    pub fn cross_section(mut self, xs: f64) -> Self {
        self.cross_section = Some(xs);
        self
    }
}

/// An event as seen by analyses. Only the weight is needed by the handler.
pub trait Event {
    /// Event weight.
    fn weight(&self) -> f64;
}

/// A user analysis.
pub trait Analysis<E> {
    /// Unique name; objects are booked under `/<name>/`.
    fn name(&self) -> &str;

    /// Book objects.
    fn init(&mut self, booker: &mut Booker<'_>) -> Result<()>;

    /// Fill objects from one event.
    fn analyze(&mut self, event: &E, filler: &mut Filler<'_>) -> Result<()>;

    /// Rescale and derive final objects.
    fn finalize(&mut self, finalizer: &mut Finalizer<'_>) -> Result<()>;
}

fn object_path(prefix: &str, name: &str) -> String {
    format!("/{prefix}/{name}")
}

/// Booking access during `init`.
pub struct Booker<'a> {
    registry: &'a mut Registry,
    prefix: &'a str,
    reference: &'a Registry,
    edge_tolerance: f64,
}

impl Booker<'_> {
    /// Full path of object `name`.
    pub fn path(&self, name: &str) -> String {
        object_path(self.prefix, name)
    }

    /// Book a uniform histogram.
    pub fn histo1d(&mut self, name: &str, n_bins: usize, lower: f64, upper: f64) -> Result<()> {
        let h = Histo1D::uniform(self.path(name), n_bins, lower, upper)?;
        self.registry.register(h)
    }

    /// Book a histogram with explicit edges.
    pub fn histo1d_edges(&mut self, name: &str, edges: &[f64]) -> Result<()> {
        let h = Histo1D::with_edges(self.path(name), edges)?;
        self.registry.register(h)
    }

    /// Book a log-binned histogram.
    pub fn histo1d_log(&mut self, name: &str, n_bins: usize, lower: f64, upper: f64) -> Result<()> {
        let h = Histo1D::log(self.path(name), n_bins, lower, upper)?;
        self.registry.register(h)
    }

    /// Book a uniform profile.
    pub fn profile1d(&mut self, name: &str, n_bins: usize, lower: f64, upper: f64) -> Result<()> {
        let p = Profile1D::uniform(self.path(name), n_bins, lower, upper)?;
        self.registry.register(p)
    }

    /// Book an empty scatter.
    pub fn scatter2d(&mut self, name: &str) -> Result<()> {
        self.registry.register(Scatter2D::new(self.path(name)))
    }

    /// Book a histogram binned like the reference scatter `/REF/<prefix>/<name>`.
    pub fn histo1d_from_reference(&mut self, name: &str) -> Result<()> {
        let path = self.path(name);
        let ref_path = format!("/REF{path}");
        let reference = self.reference_scatter(&ref_path)?;
        let h = convert::histo_from_reference(&path, reference, self.edge_tolerance)?;
        self.registry.register(h)
    }

    /// Book a profile binned like the reference scatter `/REF/<prefix>/<name>`.
    pub fn profile1d_from_reference(&mut self, name: &str) -> Result<()> {
        let path = self.path(name);
        let ref_path = format!("/REF{path}");
        let reference = self.reference_scatter(&ref_path)?;
        let p = convert::profile_from_reference(&path, reference, self.edge_tolerance)?;
        self.registry.register(p)
    }

    fn reference_scatter(&self, ref_path: &str) -> Result<&Scatter2D> {
        let obj = self.reference.find(ref_path)?;
        obj.as_scatter2d().ok_or_else(|| Error::Object {
            path: ref_path.to_string(),
            op: "book",
            source: Box::new(Error::ShapeMismatch(format!(
                "reference must be a Scatter2D, found {}",
                obj.kind()
            ))),
        })
    }
}

/// Per-path count of rejected fills.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillStats {
    rejected: BTreeMap<String, u64>,
}

impl FillStats {
    fn record(&mut self, path: &str, err: &Error) {
        let n = self.rejected.entry(path.to_string()).or_insert(0);
        *n += 1;
        if *n == 1 {
            log::warn!("rejected fill: {err}");
        } else {
            log::debug!("rejected fill #{n} on {path}: {err}");
        }
    }

    /// Rejected fills for `path`.
    pub fn rejected(&self, path: &str) -> u64 {
        self.rejected.get(path).copied().unwrap_or(0)
    }

    /// Rejected fills over all objects.
    pub fn total_rejected(&self) -> u64 {
        self.rejected.values().sum()
    }

    /// Paths with at least one rejected fill, with their counts.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.rejected.iter().map(|(k, v)| (k.as_str(), *v))
    }

    fn merge(&mut self, other: FillStats) {
        for (path, n) in other.rejected {
            *self.rejected.entry(path).or_insert(0) += n;
        }
    }
}

/// Fill access during `analyze`.
pub struct Filler<'a> {
    registry: &'a mut Registry,
    prefix: &'a str,
    weight: f64,
    policy: InvalidFillPolicy,
    stats: &'a mut FillStats,
}

impl Filler<'_> {
    /// Weight of the current event.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    fn handle(&mut self, path: &str, res: Result<()>) -> Result<()> {
        match res {
            Err(e) if matches!(e.root(), Error::InvalidInput(_)) => match self.policy {
                InvalidFillPolicy::Skip => {
                    self.stats.record(path, &e);
                    Ok(())
                }
                InvalidFillPolicy::Abort => Err(e),
            },
            other => other,
        }
    }

    /// Fill histogram `name` at `x` with the event weight.
    pub fn fill(&mut self, name: &str, x: f64) -> Result<()> {
        self.fill_with(name, x, self.weight)
    }

    /// Fill histogram `name` at `x` with the event weight times `factor`.
    pub fn fill_weighted(&mut self, name: &str, x: f64, factor: f64) -> Result<()> {
        self.fill_with(name, x, self.weight * factor)
    }

    fn fill_with(&mut self, name: &str, x: f64, weight: f64) -> Result<()> {
        let path = object_path(self.prefix, name);
        let res = self.registry.histo1d_mut(&path)?.fill(x, weight).map(|_| ());
        self.handle(&path, res)
    }

    /// Fill profile `name` with `y` at `x`, using the event weight.
    pub fn fill_profile(&mut self, name: &str, x: f64, y: f64) -> Result<()> {
        let path = object_path(self.prefix, name);
        let res = self.registry.profile1d_mut(&path)?.fill(x, y, self.weight).map(|_| ());
        self.handle(&path, res)
    }
}

/// Access during `finalize`.
pub struct Finalizer<'a> {
    registry: &'a mut Registry,
    prefix: &'a str,
    sum_of_weights: f64,
    num_events: u64,
    cross_section: Option<f64>,
}

impl Finalizer<'_> {
    /// Full path of object `name`.
    pub fn path(&self, name: &str) -> String {
        object_path(self.prefix, name)
    }

    /// Sum of accepted event weights.
    pub fn sum_of_weights(&self) -> f64 {
        self.sum_of_weights
    }

    /// Number of accepted events.
    pub fn num_events(&self) -> u64 {
        self.num_events
    }

    /// Configured cross-section, if any.
    pub fn cross_section(&self) -> Option<f64> {
        self.cross_section
    }

    /// Object `name`.
    pub fn get(&self, name: &str) -> Result<&AnalysisObject> {
        self.registry.find(&self.path(name))
    }

    /// Multiply the weights of object `name` by `factor`.
    pub fn scale(&mut self, name: &str, factor: f64) -> Result<()> {
        let path = self.path(name);
        self.registry.find_mut(&path)?.scale_w(factor)
    }

    /// Normalize histogram `name` to `target`.
    ///
    /// Returns `Ok(false)` and leaves the histogram unscaled if its integral
    /// is zero; the histogram already logged a warning.
    pub fn normalize(&mut self, name: &str, target: f64) -> Result<bool> {
        let path = self.path(name);
        match self.registry.histo1d_mut(&path)?.normalize(target) {
            Ok(()) => Ok(true),
            Err(e) if e.is_zero_integral() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Scale histogram `name` to a cross-section: `cross_section / sum_of_weights`.
    pub fn scale_to_cross_section(&mut self, name: &str) -> Result<()> {
        let path = self.path(name);
        let xs = self.cross_section.ok_or_else(|| {
            Error::InvalidInput("no cross-section configured".into())
        });
        let xs = xs.in_object(&path, "scale")?;
        if self.sum_of_weights == 0.0 {
            return Err(Error::ZeroIntegral).in_object(&path, "scale");
        }
        let factor = xs / self.sum_of_weights;
        self.scale(name, factor)
    }

    /// Replace object `name` by `object` (e.g. a scatter derived from it).
    pub fn replace(&mut self, name: &str, mut object: AnalysisObject) -> Result<()> {
        let path = self.path(name);
        if self.registry.contains(&path) {
            self.registry.remove(&path)?;
        }
        object.set_path(path);
        self.registry.register(object)
    }

    /// Register an additional object under this analysis.
    pub fn register(&mut self, name: &str, mut object: AnalysisObject) -> Result<()> {
        object.set_path(self.path(name));
        self.registry.register(object)
    }
}

/// Name-keyed table of analysis constructors, filled during startup.
pub struct AnalysisFactory<E> {
    builders: BTreeMap<String, Box<dyn Fn() -> Box<dyn Analysis<E>>>>,
}

impl<E: Event> Default for AnalysisFactory<E> {
    fn default() -> Self {
        Self { builders: BTreeMap::new() }
    }
}

impl<E: Event> AnalysisFactory<E> {
    /// Empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `name` constructible through `build`.
    pub fn register<F>(&mut self, name: &str, build: F) -> Result<()>
    where
        F: Fn() -> Box<dyn Analysis<E>> + 'static,
    {
        if self.builders.contains_key(name) {
            return Err(Error::DuplicatePath(format!("/{name}")));
        }
        self.builders.insert(name.to_string(), Box::new(build));
        Ok(())
    }

    /// Construct analysis `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn Analysis<E>>> {
        let build = self.builders.get(name).ok_or_else(|| Error::NotFound(name.to_string()))?;
        Ok(build())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Setup,
    Running,
    Finalized,
}

/// Drives analyses through init, event processing and finalize.
pub struct AnalysisHandler<E> {
    config: HandlerConfig,
    analyses: Vec<Box<dyn Analysis<E>>>,
    registry: Registry,
    reference: Registry,
    stats: FillStats,
    sum_of_weights: f64,
    num_events: u64,
    skipped_events: u64,
    stage: Stage,
}

impl<E: Event> AnalysisHandler<E> {
    /// Handler with no analyses.
    pub fn new(config: HandlerConfig) -> Self {
        Self {
            config,
            analyses: Vec::new(),
            registry: Registry::new(),
            reference: Registry::new(),
            stats: FillStats::default(),
            sum_of_weights: 0.0,
            num_events: 0,
            skipped_events: 0,
            stage: Stage::Setup,
        }
    }

    /// Provide reference objects (paths under `/REF/`) for booking.
    pub fn with_reference(mut self, reference: Registry) -> Self {
        self.reference = reference;
        self
    }

    /// Add an analysis. Names must be unique and usable as a path segment.
    pub fn add_analysis(&mut self, analysis: Box<dyn Analysis<E>>) -> Result<()> {
        if self.stage != Stage::Setup {
            return Err(Error::InvalidInput("analyses must be added before the run starts".into()));
        }
        let name = analysis.name().to_string();
        validate_path(&format!("/{name}"))?;
        if name.contains('/') {
            return Err(Error::InvalidPath(format!("/{name}")));
        }
        if self.analyses.iter().any(|a| a.name() == name) {
            return Err(Error::DuplicatePath(format!("/{name}")));
        }
        self.analyses.push(analysis);
        Ok(())
    }

    /// Add analysis `name` built by `factory`.
    pub fn add_from_factory(&mut self, factory: &AnalysisFactory<E>, name: &str) -> Result<()> {
        self.add_analysis(factory.create(name)?)
    }

    /// Book all analyses' objects. Called automatically by the first
    /// [`analyze`](Self::analyze).
    ///
    /// Booking is all or nothing: if any analysis fails, no object is kept
    /// and the next call starts over.
    pub fn init(&mut self) -> Result<()> {
        if self.stage != Stage::Setup {
            return Ok(());
        }
        let tolerance = self.config.edge_tolerance.unwrap_or(DEFAULT_EDGE_TOLERANCE);
        let mut booked = Registry::new();
        for a in &mut self.analyses {
            let prefix = a.name().to_string();
            let mut booker = Booker {
                registry: &mut booked,
                prefix: &prefix,
                reference: &self.reference,
                edge_tolerance: tolerance,
            };
            a.init(&mut booker)?;
            log::debug!("initialized analysis {prefix}");
        }
        self.registry.merge(booked)?;
        self.stage = Stage::Running;
        Ok(())
    }

    /// Run every analysis on `event`.
    pub fn analyze(&mut self, event: &E) -> Result<()> {
        match self.stage {
            Stage::Setup => self.init()?,
            Stage::Running => {}
            Stage::Finalized => {
                return Err(Error::InvalidInput("run already finalized".into()));
            }
        }
        let weight = event.weight();
        if !weight.is_finite() {
            let err = Error::InvalidInput(format!("non-finite event weight {weight}"));
            return match self.config.invalid_fill {
                InvalidFillPolicy::Skip => {
                    self.skipped_events += 1;
                    log::warn!("skipping event: {err}");
                    Ok(())
                }
                InvalidFillPolicy::Abort => Err(err),
            };
        }
        self.num_events += 1;
        self.sum_of_weights += weight;
        for a in &mut self.analyses {
            let prefix = a.name().to_string();
            let mut filler = Filler {
                registry: &mut self.registry,
                prefix: &prefix,
                weight,
                policy: self.config.invalid_fill,
                stats: &mut self.stats,
            };
            a.analyze(event, &mut filler)?;
        }
        Ok(())
    }

    /// Fold a worker handler that processed a disjoint set of events into
    /// this one. Neither may be finalized.
    pub fn merge(&mut self, other: AnalysisHandler<E>) -> Result<()> {
        if self.stage == Stage::Finalized || other.stage == Stage::Finalized {
            return Err(Error::InvalidInput("cannot merge finalized runs".into()));
        }
        self.registry.merge(other.registry)?;
        self.stats.merge(other.stats);
        self.sum_of_weights += other.sum_of_weights;
        self.num_events += other.num_events;
        self.skipped_events += other.skipped_events;
        if self.stage == Stage::Setup && other.stage == Stage::Running {
            self.stage = Stage::Running;
        }
        Ok(())
    }

    /// Run every analysis's `finalize` once.
    pub fn finalize(&mut self) -> Result<()> {
        if self.stage == Stage::Finalized {
            return Ok(());
        }
        self.init()?;
        for a in &mut self.analyses {
            let prefix = a.name().to_string();
            let mut finalizer = Finalizer {
                registry: &mut self.registry,
                prefix: &prefix,
                sum_of_weights: self.sum_of_weights,
                num_events: self.num_events,
                cross_section: self.config.cross_section,
            };
            a.finalize(&mut finalizer)?;
        }
        if self.stats.total_rejected() > 0 {
            log::warn!("{} fills rejected during the run", self.stats.total_rejected());
        }
        self.stage = Stage::Finalized;
        Ok(())
    }

    /// The objects.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Take the objects.
    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Rejected-fill counts.
    pub fn fill_stats(&self) -> &FillStats {
        &self.stats
    }

    /// Sum of accepted event weights.
    pub fn sum_of_weights(&self) -> f64 {
        self.sum_of_weights
    }

    /// Number of accepted events.
    pub fn num_events(&self) -> u64 {
        self.num_events
    }

    /// Events dropped for a non-finite weight.
    pub fn skipped_events(&self) -> u64 {
        self.skipped_events
    }

    /// Names of the loaded analyses.
    pub fn analysis_names(&self) -> Vec<&str> {
        self.analyses.iter().map(|a| a.name()).collect()
    }
}
