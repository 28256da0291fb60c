//! Resident format loaders.
//!
//! The per-format zoo lives outside this crate; these two loaders ship with
//! the dispatcher so the probing and decoding machinery is exercised end to
//! end, and as reference implementations of the [`SceneLoader`] contract.
//!
//! [`SceneLoader`]: crate::importer::SceneLoader

pub mod obj;
pub mod stl;

pub use obj::ObjLoader;
pub use stl::StlLoader;
