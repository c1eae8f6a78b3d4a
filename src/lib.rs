//! A reader and query engine for StarDict-format dictionaries.
//!
//! A dictionary is made up of an `.ifo` metadata file, an `.idx` paged
//! offset index, and a `.dict`/`.dict.dz` article-body file. [`Single`]
//! wraps one such dictionary; [`DictionarySet`] loads and queries many of
//! them together. [`backend::StarDictBackend`] ties lookup, similar-word
//! fallback and rendering into the one surface a caller drives.
//!
//! ```no_run
//! use stardict::backend::{Backend, StarDictBackend};
//!
//! let mut backend = StarDictBackend::new(vec!["/usr/share/stardict/dic".into()]);
//! let translation = backend.translate("FreeDict", "ferrugo").unwrap();
//! println!("{}", translation.body);
//! ```

pub mod article;
pub mod backend;
pub mod dictionary;
pub mod dictzip;
pub mod dispatch;
pub mod distance;
pub mod error;
pub mod ifo;
pub mod index;
pub mod query;
pub mod reader;
pub mod set;
pub mod uncompressed;

pub mod render;

pub use backend::{Backend, DictionaryInfo, StarDictBackend, Translation};
pub use dictionary::Single;
pub use dispatch::{analyze_query, dispatch, DispatchResult, QueryKind};
pub use error::DictError;
pub use index::Location;
pub use query::FuzzyMatch;
pub use set::{DictionarySet, LoadPolicy};
