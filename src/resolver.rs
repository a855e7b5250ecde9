//! Module reference resolution: map a dotted module reference plus the
//! importing file to a concrete path and a language tag.

use std::path::{Path, PathBuf};

/// Source languages by extension.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Language {
    Jac,
    Py,
    Pyi,
    Js,
    Ts,
    Jsx,
    Tsx,
}

impl Language {
    /// Search-order extension list; Jac wins over bindings and stubs.
    pub const ALL: [Language; 7] = [
        Language::Jac,
        Language::Py,
        Language::Pyi,
        Language::Js,
        Language::Ts,
        Language::Jsx,
        Language::Tsx,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            Language::Jac => "jac",
            Language::Py => "py",
            Language::Pyi => "pyi",
            Language::Js => "js",
            Language::Ts => "ts",
            Language::Jsx => "jsx",
            Language::Tsx => "tsx",
        }
    }

    pub fn from_path(path: &Path) -> Option<Language> {
        let ext = path.extension()?.to_str()?;
        Some(match ext {
            "jac" => Language::Jac,
            "py" => Language::Py,
            "pyi" => Language::Pyi,
            "js" => Language::Js,
            "ts" => Language::Ts,
            "jsx" => Language::Jsx,
            "tsx" => Language::Tsx,
            _ => return None,
        })
    }
}

/// Resolve a dotted module reference relative to the importing file.
///
/// Search order inside each candidate directory: a package directory with
/// an `__init__` file of any known language, then a plain-named file of
/// each language. When nothing matches next to the importer, the
/// configured library paths are searched the same way.
pub fn resolve_module(
    name: &str,
    importer: &Path,
    lib_paths: &[PathBuf],
) -> Option<(PathBuf, Language)> {
    let (dots, rest) = split_dots(name);
    let base = if dots > 0 {
        resolve_relative_dir(dots, importer)?
    } else {
        importer.parent()?.to_path_buf()
    };

    let segments: Vec<&str> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split('.').collect()
    };

    if segments.is_empty() {
        // Dots with no name segment: the package directory's init file.
        return init_file_in(&base);
    }

    if let Some(hit) = resolve_in(&base, &segments) {
        return Some(hit);
    }
    for lib in lib_paths {
        if let Some(hit) = resolve_in(lib, &segments) {
            return Some(hit);
        }
    }
    None
}

fn resolve_in(base: &Path, segments: &[&str]) -> Option<(PathBuf, Language)> {
    let mut dir = base.to_path_buf();
    for segment in &segments[..segments.len() - 1] {
        dir = dir.join(segment);
    }
    let last = segments[segments.len() - 1];

    // Package directory first.
    let package = dir.join(last);
    if package.is_dir() {
        if let Some(hit) = init_file_in(&package) {
            return Some(hit);
        }
    }
    // Plain file of each language.
    for lang in Language::ALL {
        let candidate = dir.join(format!("{}.{}", last, lang.extension()));
        if candidate.is_file() {
            return Some((candidate, lang));
        }
    }
    None
}

fn init_file_in(dir: &Path) -> Option<(PathBuf, Language)> {
    for lang in Language::ALL {
        let candidate = dir.join(format!("__init__.{}", lang.extension()));
        if candidate.is_file() {
            return Some((candidate, lang));
        }
    }
    None
}

fn split_dots(name: &str) -> (usize, &str) {
    let dots = name.chars().take_while(|c| *c == '.').count();
    (dots, &name[dots..])
}

/// Walk up from the importer's directory: one leading dot stays in it,
/// each further dot climbs one level.
fn resolve_relative_dir(dots: usize, importer: &Path) -> Option<PathBuf> {
    let mut dir = importer.parent()?.to_path_buf();
    for _ in 1..dots {
        dir = dir.parent()?.to_path_buf();
    }
    Some(dir)
}

/// Public form of relative resolution for callers that carry the pieces
/// separately.
pub fn resolve_relative_path(dots: usize, rest: &str, importer: &Path) -> Option<PathBuf> {
    let dir = resolve_relative_dir(dots.max(1), importer)?;
    if rest.is_empty() {
        return Some(dir);
    }
    let mut path = dir;
    for segment in rest.split('.') {
        path = path.join(segment);
    }
    Some(path)
}

/// Convert a dotted module reference into a JS import path: a `./` or
/// `../…/` prefix matching the dot count, slashes between segments, and a
/// `.js` suffix appended unless an explicit known extension is present.
pub fn convert_to_js_import_path(spec: &str) -> String {
    let (dots, rest) = split_dots(spec);
    let mut out = String::new();
    match dots {
        0 => {}
        1 => out.push_str("./"),
        n => {
            for _ in 1..n {
                out.push_str("../");
            }
        }
    }
    let body = rest.replace('.', "/");
    out.push_str(&body);

    let has_known_ext = ["js", "ts", "jsx", "tsx", "json"]
        .iter()
        .any(|ext| rest.ends_with(&format!(".{ext}")));
    if has_known_ext {
        // Undo the slash that replaced the extension dot.
        let idx = out.rfind('/').unwrap_or(0);
        let fixed = format!("{}.{}", &out[..idx], &out[idx + 1..]);
        return fixed;
    }
    out.push_str(".js");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn resolves_sibling_file_and_identity() {
        let tmp = tempfile::tempdir().unwrap();
        let importer = tmp.path().join("main.jac");
        fs::write(&importer, "").unwrap();
        let target = tmp.path().join("util.jac");
        fs::write(&target, "").unwrap();

        let (path, lang) = resolve_module("util", &importer, &[]).unwrap();
        assert_eq!(lang, Language::Jac);
        assert_eq!(path.canonicalize().unwrap(), target.canonicalize().unwrap());
    }

    #[test]
    fn package_init_wins_over_plain_file() {
        let tmp = tempfile::tempdir().unwrap();
        let importer = tmp.path().join("main.jac");
        fs::write(&importer, "").unwrap();
        fs::create_dir(tmp.path().join("pkg")).unwrap();
        fs::write(tmp.path().join("pkg/__init__.jac"), "").unwrap();
        fs::write(tmp.path().join("pkg.py"), "").unwrap();

        let (path, lang) = resolve_module("pkg", &importer, &[]).unwrap();
        assert_eq!(lang, Language::Jac);
        assert!(path.ends_with("pkg/__init__.jac"));
    }

    #[test]
    fn language_detected_by_extension() {
        let tmp = tempfile::tempdir().unwrap();
        let importer = tmp.path().join("main.jac");
        fs::write(&importer, "").unwrap();
        fs::write(tmp.path().join("binding.pyi"), "").unwrap();

        let (_, lang) = resolve_module("binding", &importer, &[]).unwrap();
        assert_eq!(lang, Language::Pyi);
    }

    #[test]
    fn dotted_path_descends_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let importer = tmp.path().join("main.jac");
        fs::write(&importer, "").unwrap();
        fs::create_dir_all(tmp.path().join("a/b")).unwrap();
        fs::write(tmp.path().join("a/b/c.jac"), "").unwrap();

        let (path, _) = resolve_module("a.b.c", &importer, &[]).unwrap();
        assert!(path.ends_with("a/b/c.jac"));
    }

    #[test]
    fn relative_dots_climb() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("pkg/sub")).unwrap();
        let importer = tmp.path().join("pkg/sub/main.jac");
        fs::write(&importer, "").unwrap();
        fs::write(tmp.path().join("pkg/helper.jac"), "").unwrap();

        let (path, _) = resolve_module("..helper", &importer, &[]).unwrap();
        assert!(path.ends_with("pkg/helper.jac"));
    }

    #[test]
    fn dots_without_name_yield_package_init() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("pkg")).unwrap();
        let importer = tmp.path().join("pkg/main.jac");
        fs::write(&importer, "").unwrap();
        fs::write(tmp.path().join("pkg/__init__.jac"), "").unwrap();

        let (path, _) = resolve_module(".", &importer, &[]).unwrap();
        assert!(path.ends_with("pkg/__init__.jac"));
    }

    #[test]
    fn lib_paths_are_fallback() {
        let tmp = tempfile::tempdir().unwrap();
        let libs = tempfile::tempdir().unwrap();
        let importer = tmp.path().join("main.jac");
        fs::write(&importer, "").unwrap();
        fs::write(libs.path().join("stdmod.pyi"), "").unwrap();

        assert!(resolve_module("stdmod", &importer, &[]).is_none());
        let (path, lang) =
            resolve_module("stdmod", &importer, &[libs.path().to_path_buf()]).unwrap();
        assert_eq!(lang, Language::Pyi);
        assert!(path.ends_with("stdmod.pyi"));
    }

    #[test]
    fn js_import_path_conversion() {
        assert_eq!(convert_to_js_import_path("utils"), "utils.js");
        assert_eq!(convert_to_js_import_path(".utils"), "./utils.js");
        assert_eq!(convert_to_js_import_path("..pkg.mod"), "../pkg/mod.js");
        assert_eq!(convert_to_js_import_path("...a.b"), "../../a/b.js");
        assert_eq!(convert_to_js_import_path(".view.tsx"), "./view.tsx");
    }
}
