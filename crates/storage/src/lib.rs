pub mod db;
pub mod registry;

pub use db::{
    count_issued, create_db, digest_exists, find_by_digest, insert_issued, list_issued, DbPool,
    IssuedCertificate, NewIssued,
};
pub use registry::LocalRegistry;
