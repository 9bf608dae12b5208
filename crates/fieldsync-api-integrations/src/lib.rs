//! HTTP surface for CRM integration management.
//!
//! Mounts under the company-scoped API: credential configuration,
//! connection testing, sync settings, sync triggering, integration
//! listing, and run history. Company scope arrives as a
//! [`CompanyContext`] request extension installed by the authentication
//! layer.

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use router::{router, ApiDoc};
pub use state::{CompanyContext, IntegrationsState};
