//! Selectable audio endpoints.
//!
//! A [`Binding`] fully qualifies one choice an application can make: a host
//! system, a device on it, a direction, and the sample rates that
//! combination supports. Bindings are produced by the catalog's probe pass
//! and are immutable values; filters copy them.

use crate::host::DeviceInfo;

/// Direction of an audio stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoType {
    /// Capture only.
    Input,
    /// Playback only.
    Output,
    /// Capture and playback on the same device.
    Duplex,
}

impl IoType {
    /// Human-readable direction name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Output => "Output",
            Self::Duplex => "Duplex",
        }
    }
}

impl std::fmt::Display for IoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Capability snapshot taken from the device at probe time.
///
/// Carried for the envelope calculations; deliberately excluded from
/// [`Binding`] equality.
#[derive(Debug, Clone, Default)]
pub struct DeviceCaps {
    /// Maximum capture channel count.
    pub max_input_channels: u16,
    /// Maximum playback channel count.
    pub max_output_channels: u16,
    /// Lowest usable capture latency, in seconds.
    pub low_input_latency: f64,
    /// Highest usable capture latency, in seconds.
    pub high_input_latency: f64,
    /// Lowest usable playback latency, in seconds.
    pub low_output_latency: f64,
    /// Highest usable playback latency, in seconds.
    pub high_output_latency: f64,
}

impl DeviceCaps {
    fn from_info(info: &DeviceInfo) -> Self {
        Self {
            max_input_channels: info.max_input_channels,
            max_output_channels: info.max_output_channels,
            low_input_latency: info.low_input_latency,
            high_input_latency: info.high_input_latency,
            low_output_latency: info.low_output_latency,
            high_output_latency: info.high_output_latency,
        }
    }
}

/// One selectable endpoint: system, device, direction, and supported rates.
#[derive(Debug, Clone)]
pub struct Binding {
    system: String,
    device: String,
    io_type: IoType,
    sample_rates: Vec<f64>,
    default_sample_rate: f64,
    device_index: usize,
    latency: f64,
    caps: DeviceCaps,
}

impl Binding {
    /// Builds a binding for one direction of a probed device.
    ///
    /// `sample_rates` is the subset of the standard rates this direction
    /// supports; for duplex bindings the caller passes the intersection of
    /// both directions' subsets.
    #[must_use]
    pub fn from_device(info: &DeviceInfo, io_type: IoType, sample_rates: Vec<f64>) -> Self {
        Self {
            system: info.system.clone(),
            device: info.device.clone(),
            io_type,
            sample_rates,
            default_sample_rate: info.default_sample_rate,
            device_index: info.index,
            latency: 0.0,
            caps: DeviceCaps::from_info(info),
        }
    }

    /// Returns the binding with its current latency set, for catalogs that
    /// want to carry a chosen figure through filters.
    #[must_use]
    pub fn with_latency(mut self, latency: f64) -> Self {
        self.latency = latency;
        self
    }

    /// Returns the binding with its rate list replaced. Used by the
    /// catalog's sample-rate filter to narrow retained bindings to the
    /// rates that matched.
    #[must_use]
    pub fn with_sample_rates(mut self, sample_rates: Vec<f64>) -> Self {
        self.sample_rates = sample_rates;
        self
    }

    /// The host system name.
    #[must_use]
    pub fn system(&self) -> &str {
        &self.system
    }

    /// The device name.
    #[must_use]
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Direction of this binding.
    #[must_use]
    pub fn io_type(&self) -> IoType {
        self.io_type
    }

    /// Human-readable direction name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.io_type.name()
    }

    /// Position of the device in the backend's enumeration order.
    #[must_use]
    pub fn device_index(&self) -> usize {
        self.device_index
    }

    /// Supported sample rates, ascending.
    #[must_use]
    pub fn sample_rates(&self) -> &[f64] {
        &self.sample_rates
    }

    /// The device's preferred sample rate.
    #[must_use]
    pub fn default_sample_rate(&self) -> f64 {
        self.default_sample_rate
    }

    /// Currently selected latency in seconds; 0 until one is chosen.
    #[must_use]
    pub fn latency(&self) -> f64 {
        self.latency
    }

    /// Capability snapshot taken at probe time.
    #[must_use]
    pub fn caps(&self) -> &DeviceCaps {
        &self.caps
    }

    /// Maximum capture channel count.
    #[must_use]
    pub fn max_input_channels(&self) -> u16 {
        self.caps.max_input_channels
    }

    /// Maximum playback channel count.
    #[must_use]
    pub fn max_output_channels(&self) -> u16 {
        self.caps.max_output_channels
    }

    /// Channel envelope for this binding's direction.
    ///
    /// Input and output use their own maxima; a duplex binding is limited by
    /// the smaller of the two sides.
    #[must_use]
    pub fn max_channels(&self) -> u16 {
        match self.io_type {
            IoType::Input => self.caps.max_input_channels,
            IoType::Output => self.caps.max_output_channels,
            IoType::Duplex => self
                .caps
                .max_input_channels
                .min(self.caps.max_output_channels),
        }
    }

    /// Lowest usable latency for this binding's direction, in seconds.
    ///
    /// The duplex window is the intersection of the two sides, so its low
    /// edge is the larger of the two lows.
    #[must_use]
    pub fn min_latency(&self) -> f64 {
        match self.io_type {
            IoType::Input => self.caps.low_input_latency,
            IoType::Output => self.caps.low_output_latency,
            IoType::Duplex => self.caps.low_input_latency.max(self.caps.low_output_latency),
        }
    }

    /// Highest usable latency for this binding's direction, in seconds.
    ///
    /// For duplex, the smaller of the two highs.
    #[must_use]
    pub fn max_latency(&self) -> f64 {
        match self.io_type {
            IoType::Input => self.caps.high_input_latency,
            IoType::Output => self.caps.high_output_latency,
            IoType::Duplex => self
                .caps
                .high_input_latency
                .min(self.caps.high_output_latency),
        }
    }
}

/// Identity comparison: the capability snapshot is excluded.
impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        self.system == other.system
            && self.device == other.device
            && self.io_type == other.io_type
            && self.sample_rates == other.sample_rates
            && self.default_sample_rate == other.default_sample_rate
            && self.device_index == other.device_index
            && self.latency == other.latency
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::mock_device;

    fn info() -> DeviceInfo {
        let mut info = mock_device("ALSA", "Loop", 2, 8, &[44100.0, 48000.0]);
        info.low_input_latency = 0.010;
        info.high_input_latency = 0.150;
        info.low_output_latency = 0.020;
        info.high_output_latency = 0.100;
        info
    }

    #[test]
    fn test_direction_accessors() {
        let binding = Binding::from_device(&info(), IoType::Input, vec![44100.0, 48000.0]);
        assert_eq!(binding.system(), "ALSA");
        assert_eq!(binding.device(), "Loop");
        assert_eq!(binding.io_type(), IoType::Input);
        assert_eq!(binding.type_name(), "Input");
        assert_eq!(binding.sample_rates(), &[44100.0, 48000.0]);
        assert_eq!(binding.default_sample_rate(), 44100.0);
    }

    #[test]
    fn test_latency_envelope_per_direction() {
        let input = Binding::from_device(&info(), IoType::Input, vec![48000.0]);
        assert_eq!(input.min_latency(), 0.010);
        assert_eq!(input.max_latency(), 0.150);

        let output = Binding::from_device(&info(), IoType::Output, vec![48000.0]);
        assert_eq!(output.min_latency(), 0.020);
        assert_eq!(output.max_latency(), 0.100);
    }

    #[test]
    fn test_duplex_envelope_is_intersection() {
        let duplex = Binding::from_device(&info(), IoType::Duplex, vec![48000.0]);
        // max of the lows, min of the highs
        assert_eq!(duplex.min_latency(), 0.020);
        assert_eq!(duplex.max_latency(), 0.100);
        // min of the channel maxima
        assert_eq!(duplex.max_channels(), 2);
    }

    #[test]
    fn test_channel_envelope_per_direction() {
        let input = Binding::from_device(&info(), IoType::Input, vec![48000.0]);
        assert_eq!(input.max_channels(), 2);
        let output = Binding::from_device(&info(), IoType::Output, vec![48000.0]);
        assert_eq!(output.max_channels(), 8);
    }

    #[test]
    fn test_equality_ignores_caps() {
        let a = Binding::from_device(&info(), IoType::Input, vec![48000.0]);
        let mut altered = info();
        altered.high_input_latency = 99.0;
        let b = Binding::from_device(&altered, IoType::Input, vec![48000.0]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_compares_identity() {
        let a = Binding::from_device(&info(), IoType::Input, vec![48000.0]);
        let b = Binding::from_device(&info(), IoType::Output, vec![48000.0]);
        assert_ne!(a, b);

        let c = Binding::from_device(&info(), IoType::Input, vec![44100.0]);
        assert_ne!(a, c);

        let d = a.clone().with_latency(0.05);
        assert_ne!(a, d);
    }

    #[test]
    fn test_io_type_display() {
        assert_eq!(IoType::Duplex.to_string(), "Duplex");
    }
}
