//! Status types of the Kf resources whose children are rolled up here

pub mod app;
pub mod build;
pub mod service_instance;
pub mod service_instance_binding;

pub use app::{AppCondition, AppStatus, ObservedBinding};
pub use build::{BuildCondition, BuildStatus, IMAGE_RESULT};
pub use service_instance::{ServiceInstanceCondition, ServiceInstanceStatus};
pub use service_instance_binding::{BindingCondition, ServiceInstanceBindingStatus};
