pub mod get_status;

pub use get_status::{
    GetImportStatusError, GetImportStatusQuery, ImportStatusDetails, ImportStatusResponse,
};
