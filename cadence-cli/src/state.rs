use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// `$CADENCE_HOME`, else `~/.cadence`.
pub fn cadence_home() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("CADENCE_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".cadence"))
}

pub fn ensure_cadence_home() -> Result<PathBuf> {
    let dir = cadence_home()?;
    ensure_dir(&dir)?;
    Ok(dir)
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))
}

/// Resolve a configured path: absolute paths are kept, relative ones live under `base`.
pub fn resolve_path(base: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        base.join(configured)
    }
}

pub const SAMPLE_TEMPLATE: &str = "\
Day,Time,Category,Energy,Scope
Monday,09:00 - 11:00,writing,8,work
Monday,11:00 - 12:30,emails,5,work
Monday,14:00 - 16:00,,4,work
Tuesday,09:00 - 11:00,data_analysis,8,work
Tuesday,13:30 - 15:30,reading_searching,5,work
Wednesday,09:00 - 11:00,thinking_planning,7,work
Wednesday,14:00 - 16:00,admin,3,work
Thursday,09:00 - 11:00,writing,8,work
Thursday,14:00 - 16:00,,5,work
Friday,09:00 - 10:30,giving_talks,7,work
Friday,13:00 - 15:00,admin,3,work
Saturday,10:00 - 12:00,,6,personal
";

/// Write the sample template to `path` unless a file is already there.
pub fn write_sample_template(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, SAMPLE_TEMPLATE).with_context(|| format!("write {}", path.display()))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let base = Path::new("/srv/cadence");
        assert_eq!(resolve_path(base, Path::new("tasks.json")), PathBuf::from("/srv/cadence/tasks.json"));
        assert_eq!(resolve_path(base, Path::new("/tmp/t.csv")), PathBuf::from("/tmp/t.csv"));
    }

    #[test]
    fn test_sample_template_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("templates").join("standard.csv");
        assert!(write_sample_template(&p).unwrap());
        fs::write(&p, "Day,Time\n").unwrap();
        assert!(!write_sample_template(&p).unwrap());
        assert_eq!(fs::read_to_string(&p).unwrap(), "Day,Time\n");
    }

    #[test]
    fn test_sample_template_parses() {
        let rows = cadence_ingest::parse_template_csv(SAMPLE_TEMPLATE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 12);
    }
}
