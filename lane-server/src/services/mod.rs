//! Business operations shared by HTTP handlers and background tasks

pub mod checkout;
pub mod closure;
pub mod drafts;
pub mod orders;
pub mod payment;
