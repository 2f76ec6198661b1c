//! Disk persistence (§6, §5/§9 atomic-write discipline): reads and writes
//! the five per-level cache files (`cost_table.dat`, `penalty_list.dat`,
//! `ida_cost.dat`, `solution.dat`, `deductive_positions.dat`) under a
//! `--cache-dir` root, keyed by a hash of the level text rather than a
//! pack/level-index pair (per spec.md's Non-goals: no multi-level pack
//! format). Every write goes to a sibling temp file first and is renamed
//! into place, so a process killed mid-write never leaves a half-written
//! file for the next run to trip over — `persistence_error`s from a
//! corrupt or partial read are logged and treated as a cache miss (§7),
//! never propagated as a hard failure.

use crate::costtable::CostTable;
use crate::error::SolverError;
use crate::level::Level;
use crate::penalty::PenaltyDatabase;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Derives a stable cache key from a level's text so the same level
/// always maps to the same cache subdirectory, without needing a
/// pack/level-index identity.
pub fn cache_key(level: &Level) -> String {
    let mut hasher = DefaultHasher::new();
    level.to_string().hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

pub struct CacheDir {
    root: PathBuf,
}

impl CacheDir {
    pub fn new(root: impl Into<PathBuf>, level: &Level) -> Self {
        CacheDir {
            root: root.into().join(cache_key(level)),
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<(), SolverError> {
        std::fs::create_dir_all(&self.root).map_err(|source| SolverError::Io {
            path: self.root.clone(),
            source,
        })?;
        let target = self.path(name);
        let tmp = self.path(&format!("{name}.tmp"));
        write_file(&tmp, bytes)?;
        std::fs::rename(&tmp, &target).map_err(|source| SolverError::Io { path: target, source })
    }

    fn read(&self, name: &str) -> Option<Vec<u8>> {
        match std::fs::read(self.path(name)) {
            Ok(bytes) => Some(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                log::warn!("cache: failed to read {name}: {err}");
                None
            }
        }
    }

    pub fn load_cost_table(&self) -> Option<CostTable> {
        let bytes = self.read("cost_table.dat")?;
        match CostTable::from_bytes(&bytes) {
            Some(table) => Some(table),
            None => {
                log::warn!("cache: cost_table.dat is corrupt, discarding");
                None
            }
        }
    }

    pub fn save_cost_table(&self, table: &CostTable) -> Result<(), SolverError> {
        self.write_atomic("cost_table.dat", &table.to_bytes())
    }

    pub fn load_penalty_database(&self) -> Option<PenaltyDatabase> {
        let bytes = self.read("penalty_list.dat")?;
        let entries = decode_penalty_entries(&bytes)?;
        Some(PenaltyDatabase::from_entries(entries))
    }

    pub fn save_penalty_database(&self, db: &PenaltyDatabase) -> Result<(), SolverError> {
        let bytes = encode_penalty_entries(&db.to_sorted_entries());
        self.write_atomic("penalty_list.dat", &bytes)
    }

    pub fn load_ida_cost(&self) -> Option<u64> {
        let bytes = self.read("ida_cost.dat")?;
        let arr: [u8; 8] = bytes.try_into().ok()?;
        Some(u64::from_le_bytes(arr))
    }

    pub fn save_ida_cost(&self, cost: u64) -> Result<(), SolverError> {
        self.write_atomic("ida_cost.dat", &cost.to_le_bytes())
    }

    pub fn load_solution(&self) -> Option<String> {
        let bytes = self.read("solution.dat")?;
        String::from_utf8(bytes).ok()
    }

    pub fn save_solution(&self, compressed: &str) -> Result<(), SolverError> {
        self.write_atomic("solution.dat", compressed.as_bytes())
    }

    /// Loads the deductive opening book: a list of `(k, cells)` seed
    /// positions fed into `penalty::discover` before its general sweep.
    /// Absent or corrupt files are treated as "no seeds", not an error.
    pub fn load_deductive_seeds(&self) -> Vec<(usize, Vec<usize>)> {
        let Some(bytes) = self.read("deductive_positions.dat") else {
            return Vec::new();
        };
        decode_seeds(&bytes).unwrap_or_else(|| {
            log::warn!("cache: deductive_positions.dat is corrupt, ignoring");
            Vec::new()
        })
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), SolverError> {
    let mut file = std::fs::File::create(path).map_err(|source| SolverError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    file.write_all(bytes).map_err(|source| SolverError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn encode_penalty_entries(entries: &[(crate::bits::Zone, usize, u64)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(entries.len() as u32).to_le_bytes());
    for (boxes, pusher_cell, extra) in entries {
        let zone_bytes = boxes.to_bytes();
        out.extend_from_slice(&(zone_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&zone_bytes);
        out.extend_from_slice(&(*pusher_cell as u64).to_le_bytes());
        out.extend_from_slice(&extra.to_le_bytes());
    }
    out
}

fn decode_penalty_entries(bytes: &[u8]) -> Option<Vec<(crate::bits::Zone, usize, u64)>> {
    let mut pos = 0usize;
    let read_u32 = |bytes: &[u8], pos: &mut usize| -> Option<u32> {
        let v = u32::from_le_bytes(bytes.get(*pos..*pos + 4)?.try_into().ok()?);
        *pos += 4;
        Some(v)
    };
    let read_u64 = |bytes: &[u8], pos: &mut usize| -> Option<u64> {
        let v = u64::from_le_bytes(bytes.get(*pos..*pos + 8)?.try_into().ok()?);
        *pos += 8;
        Some(v)
    };

    let count = read_u32(bytes, &mut pos)?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let len = read_u32(bytes, &mut pos)? as usize;
        let zone_bytes = bytes.get(pos..pos + len)?;
        pos += len;
        let zone = crate::bits::Zone::from_bytes(zone_bytes)?;
        let pusher_cell = read_u64(bytes, &mut pos)? as usize;
        let extra = read_u64(bytes, &mut pos)?;
        out.push((zone, pusher_cell, extra));
    }
    Some(out)
}

fn decode_seeds(bytes: &[u8]) -> Option<Vec<(usize, Vec<usize>)>> {
    let text = std::str::from_utf8(bytes).ok()?;
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split(',');
        let k: usize = parts.next()?.trim().parse().ok()?;
        let cells: Vec<usize> = parts.map(|p| p.trim().parse().ok()).collect::<Option<_>>()?;
        out.push((k, cells));
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::PositionMap;

    fn sample_level() -> Level {
        Level::from_text("#####\n#@$.#\n#####").unwrap()
    }

    #[test]
    fn test_cache_key_is_stable() {
        let level = sample_level();
        assert_eq!(cache_key(&level), cache_key(&level));
    }

    #[test]
    fn test_cost_table_roundtrip() {
        let dir = std::env::temp_dir().join(format!("pushida-test-{}", std::process::id()));
        let level = sample_level();
        let positions = PositionMap::build(&level);
        let table = CostTable::build(&positions);

        let cache = CacheDir::new(&dir, &level);
        cache.save_cost_table(&table).unwrap();
        let loaded = cache.load_cost_table().unwrap();
        assert_eq!(loaded.to_bytes(), table.to_bytes());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = std::env::temp_dir().join(format!("pushida-test-missing-{}", std::process::id()));
        let level = sample_level();
        let cache = CacheDir::new(&dir, &level);
        assert!(cache.load_ida_cost().is_none());
        assert!(cache.load_deductive_seeds().is_empty());
    }

    #[test]
    fn test_decode_seeds_parses_lines() {
        let bytes = b"2,5,9\n3,1,2,3\n";
        let seeds = decode_seeds(bytes).unwrap();
        assert_eq!(seeds, vec![(2, vec![5, 9]), (3, vec![1, 2, 3])]);
    }
}
