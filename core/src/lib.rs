pub mod analyze;
pub mod buhlmann;
pub mod deco;
pub mod densify;
pub mod describe;
pub mod error;
pub mod ffi;
pub mod gas;
pub mod models;
pub mod plot_data;
pub mod preferences;
pub mod pressure;
pub mod profile;
pub mod units;
pub mod usage;

uniffi::include_scaffolding!("divelog");

pub use buhlmann::Buhlmann;
pub use deco::TissueModel;
pub use describe::{compare_entries, describe_entry_at_time};
pub use error::PlotError;
pub use ffi::{dive_event_names, ProfilePoint, ProfileSession, ProfileSummary};
pub use models::{Cylinder, CylinderRole, Dive, DiveComputer, Event, GasMix, Sample};
pub use plot_data::{CylinderUse, PlotEntry, PlotInfo, Velocity};
pub use preferences::{PartialPressureGraphs, Preferences, UnitSystem};
pub use profile::{build_plot_info, max_plot_depth, max_plot_time, AxisRange, PlotSession};
