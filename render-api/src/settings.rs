//! Runtime-tunable settings, read by the render loop each tick.
//! No persistence; the host GUI or key handler mutates these directly.

/// One channel of the probe atlas set. Fixed tag type indexing fixed
/// resources; there is no by-name lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeChannel {
    Radiance,
    Normals,
    DistanceHigh,
    DistanceLow,
    Irradiance,
    FilteredDistance,
}

impl ProbeChannel {
    pub const ALL: [ProbeChannel; 6] = [
        ProbeChannel::Radiance,
        ProbeChannel::Normals,
        ProbeChannel::DistanceHigh,
        ProbeChannel::DistanceLow,
        ProbeChannel::Irradiance,
        ProbeChannel::FilteredDistance,
    ];

    /// Distance-like channels are tone-scaled by the debug viewer.
    pub fn is_distance(self) -> bool {
        matches!(
            self,
            ProbeChannel::DistanceHigh | ProbeChannel::DistanceLow | ProbeChannel::FilteredDistance
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            ProbeChannel::Radiance => "radiance",
            ProbeChannel::Normals => "normals",
            ProbeChannel::DistanceHigh => "distanceHigh",
            ProbeChannel::DistanceLow => "distanceLow",
            ProbeChannel::Irradiance => "irradiance",
            ProbeChannel::FilteredDistance => "filteredDistance",
        }
    }
}

/// Tunables exposed to the host. Defaults match the reference scene.
#[derive(Clone, Debug)]
pub struct RenderSettings {
    pub target_fps: u32,
    pub environment_brightness: f32,
    /// Draw marker spheres at every probe location.
    pub render_probe_locations: bool,
    /// Debug viewer: blit one probe atlas layer instead of the scene.
    pub show_probe: bool,
    pub probe_index: u32,
    pub probe_channel: ProbeChannel,
    pub irradiance_num_samples: u32,
    pub irradiance_lobe_size: f32,
    pub filtered_distance_lobe_size: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            target_fps: 60,
            environment_brightness: 1.5,
            render_probe_locations: true,
            show_probe: false,
            probe_index: 0,
            probe_channel: ProbeChannel::Radiance,
            irradiance_num_samples: 512,
            irradiance_lobe_size: 0.99,
            filtered_distance_lobe_size: 0.08,
        }
    }
}
