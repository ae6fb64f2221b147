pub mod pi;
pub mod saturation_monitor;

pub use pi::PiController;
pub use saturation_monitor::SaturationMonitor;
