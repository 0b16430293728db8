use std::{
    fmt::Debug,
    io::{self, BufWriter},
    path::PathBuf,
};

use anyhow::Context;
use fs_err::File;
use serde::{Deserialize, Serialize};

pub fn write_json<P: Into<PathBuf>, T: Serialize>(path: P, value: &T) -> anyhow::Result<()> {
    Ok(serde_json::to_writer_pretty(
        BufWriter::new(File::create(path)?),
        value,
    )?)
}

pub fn read_toml<P: Into<PathBuf> + Debug, T: for<'de> Deserialize<'de>>(
    path: P,
) -> anyhow::Result<T> {
    let path = path.into();
    (|| toml::from_str(&fs_err::read_to_string(&path)?).map_err(anyhow::Error::new))().with_context(
        || {
            format!(
                "While trying to parse {path:?} as {}",
                std::any::type_name::<T>()
            )
        },
    )
}

/// Same as [`read_toml`], but a missing file yields `T::default()`.
/// Returns whether the file was actually read.
pub fn read_toml_or_default<P: Into<PathBuf> + Debug, T: Default + for<'de> Deserialize<'de>>(
    path: P,
) -> anyhow::Result<(T, bool)> {
    let path = path.into();
    match fs_err::metadata(&path) {
        Ok(_) => Ok((read_toml(path)?, true)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok((T::default(), false)),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::read_toml_or_default;

    #[test]
    fn missing_toml_is_default() {
        let path = std::env::temp_dir().join("soil-report-utils-no-such-file.toml");
        let (value, found) = read_toml_or_default::<_, BTreeMap<String, u32>>(path).unwrap();
        assert!(value.is_empty());
        assert!(!found);
    }
}
