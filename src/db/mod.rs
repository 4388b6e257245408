pub mod cache;
pub mod catalogdb;
#[allow(clippy::module_inception)]
pub mod db;
pub mod documentdb;
#[cfg(test)]
pub mod memory;
pub mod reportdb;
pub mod requestdb;
pub mod reviewdb;
pub mod userdb;

use self::{
    catalogdb::CatalogExt, documentdb::DocumentExt, reportdb::ReportExt, requestdb::RequestExt,
    reviewdb::ReviewExt, userdb::UserExt,
};

/// Every persistence capability the services need.
pub trait Store:
    UserExt + DocumentExt + CatalogExt + RequestExt + ReviewExt + ReportExt + Send + Sync + std::fmt::Debug
{
}

impl<T> Store for T where
    T: UserExt + DocumentExt + CatalogExt + RequestExt + ReviewExt + ReportExt + Send + Sync + std::fmt::Debug
{
}
