//! Layer lifecycle state machine.
//!
//! ```text
//! Uninitialized ──Attached──► ContainerReady{style_loaded}
//!                                 │ Ready (style_loaded = false)
//!                                 ▼
//!                             SurfaceLoaded ──StyleLoaded──► StyleReady
//!        (Ready with style_loaded = true) ─────────────────►    │ view
//!                                                               ▼
//!                                        LayersCreated ◄──── DataReady
//! ```
//!
//! Transitions only move forward. Signals that do not apply to the current
//! state are ignored. [`LayerState::Uninitialized`] is only re-entered by a
//! full reset.

use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LayerState {
    #[default]
    Uninitialized,
    /// Container has a non-zero size. `style_loaded` records a style signal
    /// that arrived before the surface finished loading.
    ContainerReady { style_loaded: bool },
    SurfaceLoaded,
    StyleReady,
    /// Style is ready and a view is available; layer creation is scheduled
    DataReady,
    LayersCreated,
}

impl LayerState {
    fn rank(&self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::ContainerReady { .. } => 1,
            Self::SurfaceLoaded => 2,
            Self::StyleReady => 3,
            Self::DataReady => 4,
            Self::LayersCreated => 5,
        }
    }

    /// True if `self` is at or past `other` in the lifecycle.
    pub fn has_reached(&self, other: LayerState) -> bool {
        self.rank() >= other.rank()
    }

    pub fn on_container_ready(self) -> Self {
        match self {
            Self::Uninitialized => Self::ContainerReady {
                style_loaded: false,
            },
            other => other,
        }
    }

    pub fn on_surface_ready(self) -> Self {
        match self {
            Self::ContainerReady { style_loaded: true } => Self::StyleReady,
            Self::ContainerReady { style_loaded: false } => Self::SurfaceLoaded,
            other => other,
        }
    }

    pub fn on_style_loaded(self) -> Self {
        match self {
            Self::ContainerReady { .. } => Self::ContainerReady { style_loaded: true },
            Self::SurfaceLoaded => Self::StyleReady,
            other => other,
        }
    }

    pub fn on_data_available(self) -> Self {
        match self {
            Self::StyleReady => Self::DataReady,
            other => other,
        }
    }

    pub fn on_layers_created(self) -> Self {
        match self {
            Self::DataReady => Self::LayersCreated,
            other => other,
        }
    }
}

impl fmt::Display for LayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "uninitialized"),
            Self::ContainerReady { style_loaded } => {
                write!(f, "container-ready (style loaded: {})", style_loaded)
            }
            Self::SurfaceLoaded => write!(f, "surface-loaded"),
            Self::StyleReady => write!(f, "style-ready"),
            Self::DataReady => write!(f, "data-ready"),
            Self::LayersCreated => write!(f, "layers-created"),
        }
    }
}
