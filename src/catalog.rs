//! Immutable, filterable catalog of audio endpoints.
//!
//! [`Catalog::probe`] walks every host system and device the backend knows
//! about and produces one [`Binding`] per supported
//! (system, device, direction) combination. Filters are compositional: each
//! returns a new catalog, an empty argument list is the identity, and a
//! non-empty list retains bindings matching any entry.

use std::ops::Index;

use crate::binding::{Binding, IoType};
use crate::error::{string_contains, AudioError};
use crate::host::cpal_backend::CpalBackend;
use crate::host::HostBackend;

/// An immutable list of bindings with compositional filters.
///
/// Thread-safe for reads after construction; the probe pass itself is
/// single-threaded.
///
/// # Example
///
/// ```no_run
/// use duplex_audio::{Catalog, IoType};
///
/// let catalog = Catalog::probe()?;
/// let choices = catalog.system("alsa").io_type(IoType::Duplex).sample_rate(48000.0);
/// for binding in &choices {
///     println!("{} / {}", binding.system(), binding.device());
/// }
/// # Ok::<(), duplex_audio::AudioError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    bindings: Vec<Binding>,
    default_input: Option<Binding>,
    default_output: Option<Binding>,
}

impl Catalog {
    /// Probes the platform audio library.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend refuses enumeration entirely.
    pub fn probe() -> Result<Self, AudioError> {
        Self::probe_backend(&CpalBackend::new())
    }

    /// Probes an explicit backend; used with the mock host in tests.
    ///
    /// # Errors
    ///
    /// Returns an error when the backend refuses enumeration entirely.
    pub fn probe_backend(backend: &dyn HostBackend) -> Result<Self, AudioError> {
        let infos = backend.probe()?;
        let mut catalog = Self::default();

        for info in &infos {
            if info.max_input_channels > 0 && !info.input_rates.is_empty() {
                catalog.bindings.push(Binding::from_device(
                    info,
                    IoType::Input,
                    info.input_rates.clone(),
                ));
                if info.default_input {
                    catalog.default_input = Some(Binding::from_device(
                        info,
                        IoType::Input,
                        vec![info.default_sample_rate],
                    ));
                }
            }
            if info.max_output_channels > 0 && !info.output_rates.is_empty() {
                catalog.bindings.push(Binding::from_device(
                    info,
                    IoType::Output,
                    info.output_rates.clone(),
                ));
                if info.default_output {
                    catalog.default_output = Some(Binding::from_device(
                        info,
                        IoType::Output,
                        vec![info.default_sample_rate],
                    ));
                }
            }
            if info.max_input_channels > 0 && info.max_output_channels > 0 {
                // Duplex runs both directions at one rate, so only rates
                // both sides support qualify.
                let shared: Vec<f64> = info
                    .input_rates
                    .iter()
                    .copied()
                    .filter(|rate| info.output_rates.contains(rate))
                    .collect();
                if !shared.is_empty() {
                    catalog
                        .bindings
                        .push(Binding::from_device(info, IoType::Duplex, shared));
                }
            }
        }

        tracing::debug!(
            backend = backend.name(),
            bindings = catalog.bindings.len(),
            "probed audio catalog"
        );
        Ok(catalog)
    }

    /// Builds a catalog from explicit bindings, without probing.
    #[must_use]
    pub fn from_bindings(bindings: Vec<Binding>) -> Self {
        Self {
            bindings,
            default_input: None,
            default_output: None,
        }
    }

    fn with_bindings(&self, bindings: Vec<Binding>) -> Self {
        Self {
            bindings,
            default_input: self.default_input.clone(),
            default_output: self.default_output.clone(),
        }
    }

    /// Retains bindings whose system name contains `pattern`
    /// (case-insensitive).
    #[must_use]
    pub fn system(&self, pattern: &str) -> Self {
        self.system_in(&[pattern])
    }

    /// Retains bindings whose system name contains any of `patterns`.
    /// An empty list is the identity filter.
    #[must_use]
    pub fn system_in(&self, patterns: &[&str]) -> Self {
        if patterns.is_empty() {
            return self.clone();
        }
        let bindings = self
            .bindings
            .iter()
            .filter(|b| patterns.iter().any(|p| string_contains(b.system(), p)))
            .cloned()
            .collect();
        self.with_bindings(bindings)
    }

    /// Retains bindings whose device name contains `pattern`
    /// (case-insensitive).
    #[must_use]
    pub fn device(&self, pattern: &str) -> Self {
        self.device_in(&[pattern])
    }

    /// Retains bindings whose device name contains any of `patterns`.
    /// An empty list is the identity filter.
    #[must_use]
    pub fn device_in(&self, patterns: &[&str]) -> Self {
        if patterns.is_empty() {
            return self.clone();
        }
        let bindings = self
            .bindings
            .iter()
            .filter(|b| patterns.iter().any(|p| string_contains(b.device(), p)))
            .cloned()
            .collect();
        self.with_bindings(bindings)
    }

    /// Retains bindings supporting exactly `rate`, narrowed to that rate.
    #[must_use]
    pub fn sample_rate(&self, rate: f64) -> Self {
        self.sample_rate_in(&[rate])
    }

    /// Retains bindings supporting any of `rates`; each retained binding's
    /// rate list is narrowed to the rates that matched. An empty list is
    /// the identity filter.
    ///
    /// Matching is exact IEEE-754 equality, which is reliable because both
    /// sides draw from the standard rate table.
    #[must_use]
    pub fn sample_rate_in(&self, rates: &[f64]) -> Self {
        if rates.is_empty() {
            return self.clone();
        }
        let mut bindings = Vec::new();
        for binding in &self.bindings {
            let kept: Vec<f64> = binding
                .sample_rates()
                .iter()
                .copied()
                .filter(|rate| rates.contains(rate))
                .collect();
            if !kept.is_empty() {
                bindings.push(binding.clone().with_sample_rates(kept));
            }
        }
        self.with_bindings(bindings)
    }

    /// Retains bindings with exactly the given direction.
    #[must_use]
    pub fn io_type(&self, io_type: IoType) -> Self {
        self.io_type_in(&[io_type])
    }

    /// Retains bindings matching any of the given directions. An empty list
    /// is the identity filter.
    #[must_use]
    pub fn io_type_in(&self, io_types: &[IoType]) -> Self {
        if io_types.is_empty() {
            return self.clone();
        }
        let bindings = self
            .bindings
            .iter()
            .filter(|b| io_types.contains(&b.io_type()))
            .cloned()
            .collect();
        self.with_bindings(bindings)
    }

    /// The host's default capture device, captured at probe time.
    #[must_use]
    pub fn default_input(&self) -> Option<&Binding> {
        self.default_input.as_ref()
    }

    /// The host's default playback device, captured at probe time.
    #[must_use]
    pub fn default_output(&self) -> Option<&Binding> {
        self.default_output.as_ref()
    }

    /// Sorted, deduplicated system names in the catalog.
    #[must_use]
    pub fn systems(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.iter().map(|b| b.system().to_string()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// Sorted, deduplicated device names in the catalog.
    #[must_use]
    pub fn devices(&self) -> Vec<String> {
        let mut names: Vec<String> = self.bindings.iter().map(|b| b.device().to_string()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// Sorted, deduplicated sample rates across the catalog.
    #[must_use]
    pub fn sample_rates(&self) -> Vec<f64> {
        let mut rates: Vec<f64> = self
            .bindings
            .iter()
            .flat_map(|b| b.sample_rates().iter().copied())
            .collect();
        rates.sort_by(f64::total_cmp);
        rates.dedup();
        rates
    }

    /// All bindings in the catalog.
    #[must_use]
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the catalog holds no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The first binding, if any. Filters preserve probe order, so after
    /// narrowing, this is the natural pick.
    #[must_use]
    pub fn first(&self) -> Option<&Binding> {
        self.bindings.first()
    }

    /// Iterates over the bindings.
    pub fn iter(&self) -> std::slice::Iter<'_, Binding> {
        self.bindings.iter()
    }
}

impl Index<usize> for Catalog {
    type Output = Binding;

    fn index(&self, index: usize) -> &Binding {
        &self.bindings[index]
    }
}

impl IntoIterator for Catalog {
    type Item = Binding;
    type IntoIter = std::vec::IntoIter<Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.into_iter()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Binding;
    type IntoIter = std::slice::Iter<'a, Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.bindings.iter()
    }
}
