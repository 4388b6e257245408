pub mod approval_service;
pub mod auth_service;
pub mod background_jobs;
pub mod catalog_service;
pub mod document_service;
pub mod error;
pub mod lifecycle;
pub mod report_service;
pub mod request_service;
pub mod review_service;
pub mod storage;
