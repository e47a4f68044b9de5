mod error;
mod traits;
mod types;

pub use error::{PageRequestError, RepositoryError, Result};
pub use traits::OrderRepository;
pub use types::{Page, PageMeta, PageRequest, MAX_PAGE_SIZE};
