pub mod analysis;
pub mod booking;
pub mod settings;
pub mod subscription;

pub use analysis::ToolAnalysis;
pub use booking::ConsultationBooking;
pub use settings::OrganizationSettings;
pub use subscription::{OrganizationSubscription, ReportAccess};
