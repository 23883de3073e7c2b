use std::path::{Path, PathBuf};

use fauxgen_core::{Node, parse_ast_json, validate_ast};
use fauxgen_eval::loader::normalize;
use fauxgen_eval::{EvalError, SourceLoader};

/// Reads imported programs as JSON ASTs from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFileLoader;

impl SourceLoader for JsonFileLoader {
    fn resolve(&self, path: &str, importer: Option<&Path>) -> Result<PathBuf, EvalError> {
        let base = match importer.and_then(Path::parent) {
            Some(parent) => parent.to_path_buf(),
            None => std::env::current_dir().map_err(|err| {
                EvalError::ParseDelegation(format!("cannot resolve {path:?}: {err}"))
            })?,
        };
        Ok(normalize(&base, Path::new(path)))
    }

    fn load(&self, resolved: &Path) -> Result<Node, EvalError> {
        let source = std::fs::read_to_string(resolved).map_err(|err| {
            EvalError::ParseDelegation(format!("cannot read {}: {err}", resolved.display()))
        })?;
        let program = parse_ast_json(&source)?;
        validate_ast(&program)?;
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_programs_next_to_the_importer() {
        let dir = std::env::temp_dir().join(format!("fauxgen-loader-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("lib")).expect("dir");
        std::fs::write(
            dir.join("lib/people.json"),
            r#"{"kind":"root","children":[{"kind":"variable","name":"n","value":{"kind":"literal-int","value":3}}]}"#,
        )
        .expect("write");

        let loader = JsonFileLoader;
        let resolved = loader
            .resolve("./lib/people.json", Some(&dir.join("main.json")))
            .expect("resolve");
        assert_eq!(resolved, dir.join("lib/people.json"));

        let program = loader.load(&resolved).expect("load");
        assert_eq!(program.children.len(), 1);

        let missing = loader.load(&dir.join("lib/absent.json"));
        assert!(matches!(missing, Err(EvalError::ParseDelegation(_))));

        std::fs::remove_dir_all(&dir).ok();
    }
}
