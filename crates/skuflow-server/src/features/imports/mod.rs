pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{EnqueueImportCommand, EnqueueImportError, EnqueueImportResponse};

pub use queries::{
    GetImportStatusError, GetImportStatusQuery, ImportStatusDetails, ImportStatusResponse,
};

pub use routes::imports_routes;
