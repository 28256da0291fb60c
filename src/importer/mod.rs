//! Import Front End
//!
//! - [`Importer`]: the dispatcher owning loaders, pipeline, IO, properties,
//!   and the current scene
//! - [`SceneLoader`]: the contract every per-format decoder satisfies
//! - Probing helpers shared by loader implementations: extension checks,
//!   bounded header token search, magic token comparison
//!
//! Format selection is two-phase: a cheap extension pass over all registered
//! loaders first, then (only when that fails and the path has an extension
//! at all) a signature pass where loaders may sniff a bounded prefix of the
//! file contents.

pub mod dispatcher;
pub mod loaders;
pub mod preprocess;
pub mod properties;

pub use dispatcher::Importer;
pub use properties::{config, PropertyStore};

use std::io::{Read, Seek};

use crate::errors::Result;
use crate::io::{read_prefix, IoSystem};
use crate::scene::Scene;

/// Hard ceiling on how many bytes a signature probe may inspect.
pub const MAX_HEADER_SEARCH_BYTES: usize = 200;

/// Per-format decoder plugin.
pub trait SceneLoader {
    /// Stable identifier, used for unregistration and logging.
    fn name(&self) -> &'static str;

    /// Extensions this loader handles, lowercase, without the leading dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Whether this loader wants to handle `path`.
    ///
    /// With `io` absent the answer must come from the path string alone.
    /// With `check_sig` false only cheap checks (extension) are allowed;
    /// with it true the loader may read a small file prefix (bounded by
    /// [`MAX_HEADER_SEARCH_BYTES`]) looking for magic tokens.
    fn can_read(&self, path: &str, io: Option<&dyn IoSystem>, check_sig: bool) -> bool;

    /// Snapshots configuration from the dispatcher's store; called once
    /// immediately before [`SceneLoader::intern_read`].
    fn setup_properties(&mut self, _props: &PropertyStore) {}

    /// Decodes `path` into a fresh scene satisfying the canonical
    /// invariants, or fails with a message. Must not leak partial state on
    /// error.
    fn intern_read(&self, path: &str, io: &dyn IoSystem) -> Result<Scene>;

    /// Appends this loader's extensions to `out` in `*.ext;*.ext2` form,
    /// without a trailing delimiter.
    fn append_extension_list(&self, out: &mut String) {
        for (i, ext) in self.extensions().iter().enumerate() {
            if i > 0 || !out.is_empty() {
                out.push(';');
            }
            out.push_str("*.");
            out.push_str(ext);
        }
    }
}

// ============================================================================
// Probing helpers
// ============================================================================

/// Lowercase extension of `path` without the dot; empty if there is none.
#[must_use]
pub fn get_extension(path: &str) -> String {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    match name.rfind('.') {
        Some(pos) if pos + 1 < name.len() => name[pos + 1..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Case-insensitive extension match; extensions given without leading dot.
#[must_use]
pub fn simple_extension_check(path: &str, extensions: &[&str]) -> bool {
    let ext = get_extension(path);
    !ext.is_empty() && extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
}

/// Case-insensitive token presence test in the first `search_bytes` bytes of
/// the file (clamped to [`MAX_HEADER_SEARCH_BYTES`]).
///
/// NUL bytes are skipped before matching, which makes the test tolerant of
/// UTF-16 encoded text headers.
pub fn search_file_header_for_token(
    io: &dyn IoSystem,
    path: &str,
    tokens: &[&str],
    search_bytes: usize,
) -> Result<bool> {
    let mut stream = io.open(path)?;
    let prefix = read_prefix(&mut *stream, search_bytes.min(MAX_HEADER_SEARCH_BYTES))?;

    let haystack: String = prefix
        .iter()
        .filter(|&&b| b != 0)
        .map(|&b| (b as char).to_ascii_lowercase())
        .collect();

    Ok(tokens
        .iter()
        .any(|token| haystack.contains(&token.to_ascii_lowercase())))
}

/// Compares a file slice at `offset` against each of the given magic tokens.
///
/// Token sizes of 2 and 4 bytes are additionally tested in byte-swapped
/// form, so endian-ambiguous magics match either way.
pub fn check_magic_token(
    io: &dyn IoSystem,
    path: &str,
    magics: &[&[u8]],
    offset: u64,
) -> Result<bool> {
    let mut stream = io.open(path)?;
    stream.seek(std::io::SeekFrom::Start(offset))?;

    let longest = magics.iter().map(|m| m.len()).max().unwrap_or(0);
    let mut buffer = vec![0u8; longest];
    let available = (stream.size().saturating_sub(offset)) as usize;
    let readable = longest.min(available);
    stream.read_exact(&mut buffer[..readable])?;

    for magic in magics {
        debug_assert!(matches!(magic.len(), 1 | 2 | 4 | 8 | 16));
        if magic.len() > readable {
            continue;
        }
        let slice = &buffer[..magic.len()];
        if slice == *magic {
            return Ok(true);
        }
        if matches!(magic.len(), 2 | 4) {
            let swapped: Vec<u8> = magic.iter().rev().copied().collect();
            if slice == swapped.as_slice() {
                return Ok(true);
            }
        }
    }
    Ok(false)
}
