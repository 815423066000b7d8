// Application layer - Use case interactors

pub mod container;
pub mod hardware_interactor;
pub mod job_gate;
pub mod render_interactor;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use hardware_interactor::{HardwareInteractor, HardwareReport};
pub use job_gate::{JobGate, JobPermit};
pub use render_interactor::RenderInteractor;
