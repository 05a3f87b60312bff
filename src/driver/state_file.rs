// The JSON snapshot of the store, read before and written after each command.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs2::FileExt;
use gamevote_core::MemoryStore;

use crate::driver::*;

/// An exclusive hold on a state file. Released when dropped.
pub struct StateLock {
    _file: File,
}

/// Blocks until no other command works on the state file.
///
/// The lock lives in a `.lock` file next to the state file, since the state
/// file itself is replaced on every save.
pub fn lock_state(path: &str) -> CliResult<StateLock> {
    let lock_path = format!("{}.lock", path);
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .context(LockingFileSnafu { path: &lock_path })?;
    FileExt::lock_exclusive(&file).context(LockingFileSnafu { path: &lock_path })?;
    debug!("Locked {:?}", lock_path);
    Ok(StateLock { _file: file })
}

/// Loads the store, or starts from an empty one if the file does not exist yet.
pub fn load_state(path: &str) -> CliResult<MemoryStore> {
    if !Path::new(path).exists() {
        info!("State file {:?} not found, starting from an empty state", path);
        return Ok(MemoryStore::new());
    }
    let contents = fs::read_to_string(path).context(ReadingFileSnafu { path })?;
    let store: MemoryStore =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    debug!("Loaded state from {:?}", path);
    Ok(store)
}

/// Writes the store to a temporary file and renames it over the state file.
pub fn save_state(path: &str, store: &MemoryStore) -> CliResult<()> {
    let js = serde_json::to_string_pretty(store).context(ParsingJsonSnafu { path })?;
    let parent = match Path::new(path).parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut temp = tempfile::NamedTempFile::new_in(parent).context(WritingFileSnafu { path })?;
    temp.write_all(js.as_bytes()).context(WritingFileSnafu { path })?;
    temp.as_file().sync_all().context(WritingFileSnafu { path })?;
    temp.persist(path).context(PersistingFileSnafu { path })?;
    debug!("Saved state to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        let state = state.to_str().unwrap();
        let held = lock_state(state).unwrap();

        let other = File::open(format!("{}.lock", state)).unwrap();
        assert!(FileExt::try_lock_exclusive(&other).is_err());
        drop(held);
        assert!(FileExt::try_lock_exclusive(&other).is_ok());
    }

    #[test]
    fn save_replaces_the_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        let state = state.to_str().unwrap();
        fs::write(state, "{ not json").unwrap();

        let mut store = load_state(dir.path().join("missing.json").to_str().unwrap()).unwrap();
        store.insert_candidate("Azul", true).unwrap();
        save_state(state, &store).unwrap();

        let reloaded = load_state(state).unwrap();
        assert_eq!(reloaded.candidates().unwrap().len(), 1);
        // Only the state file is left, no temporary file.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
