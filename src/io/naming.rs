use std::path::{Path, PathBuf};

/// Base name of a source dataset without its extension. Names with more than one
/// dot lose their last two parts (`dem.tif.ovr` -> `dem`).
pub fn dataset_stem(source: &Path) -> String {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parts: Vec<&str> = name.split('.').collect();
    match parts.len() {
        0 | 1 => name,
        2 => parts[0].to_string(),
        n => parts[..n - 2].join("."),
    }
}

/// Output raster path: `<workspace>/<prefix><stem><suffix><extension>`.
/// `extension` is the normalized raster format, e.g. `".TIFF"`, or `""` for the
/// native format.
pub fn make_raster_name(
    source: &Path,
    workspace: &Path,
    extension: &str,
    prefix: &str,
    suffix: &str,
) -> PathBuf {
    let stem = dataset_stem(source);
    workspace.join(format!("{}{}{}{}", prefix, stem, suffix, extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems() {
        assert_eq!(dataset_stem(Path::new("/data/dem.tif")), "dem");
        assert_eq!(dataset_stem(Path::new("/data/dem")), "dem");
        assert_eq!(dataset_stem(Path::new("/data/a.b.tif")), "a");
        assert_eq!(dataset_stem(Path::new("/data/x.y.z.tif")), "x.y");
    }

    #[test]
    fn raster_names_carry_affixes_and_extension() {
        let out = make_raster_name(
            Path::new("/in/dem.tif"),
            Path::new("/out"),
            ".TIFF",
            "p_",
            "_s",
        );
        assert_eq!(out, PathBuf::from("/out/p_dem_s.TIFF"));

        let native = make_raster_name(Path::new("/in/dem.tif"), Path::new("/out"), "", "", "");
        assert_eq!(native, PathBuf::from("/out/dem"));
    }
}
