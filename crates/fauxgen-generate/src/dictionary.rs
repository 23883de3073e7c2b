use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use fake::Fake;
use rand::{Rng, RngCore};
use tracing::debug;

use crate::errors::GenerationError;
use crate::model::GeneratedValue;

/// Categories served by the bundled fake-data backend.
pub const BUILTIN_CATEGORIES: &[&str] = &[
    "city",
    "company",
    "country",
    "email",
    "first_name",
    "full_name",
    "job_title",
    "last_name",
    "phone_number",
    "sentence",
    "state",
    "street_address",
    "username",
    "word",
    "zip_code",
];

#[derive(Debug, Clone)]
enum DictionaryEntry {
    Lines(Vec<String>),
    Missing,
}

/// Named word lists sampled by `dict` fields.
///
/// A custom directory, when configured, is consulted first: a category maps to
/// a file named `<category>` or `<category>.txt` holding one value per line.
/// Categories without a file fall back to the built-in generators.
#[derive(Debug, Default)]
pub struct Dictionary {
    root: Option<PathBuf>,
    cache: RwLock<BTreeMap<String, DictionaryEntry>>,
}

impl Dictionary {
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            cache: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Fail early when a category has no source.
    pub fn ensure_category(&self, category: &str) -> Result<(), GenerationError> {
        match self.custom_lines(category)? {
            Some(lines) if lines.is_empty() => Err(GenerationError::InvalidFieldArguments(
                format!("dictionary category '{category}' is empty"),
            )),
            Some(_) => Ok(()),
            None if BUILTIN_CATEGORIES.contains(&category) => Ok(()),
            None => Err(GenerationError::InvalidFieldArguments(format!(
                "unknown dictionary category '{category}'"
            ))),
        }
    }

    pub fn sample(
        &self,
        category: &str,
        rng: &mut dyn RngCore,
    ) -> Result<GeneratedValue, GenerationError> {
        if let Some(lines) = self.custom_lines(category)? {
            if lines.is_empty() {
                return Err(GenerationError::InvalidFieldArguments(format!(
                    "dictionary category '{category}' is empty"
                )));
            }
            let index = rng.random_range(0..lines.len());
            return Ok(GeneratedValue::Text(lines[index].clone()));
        }

        builtin_value(category, rng).ok_or_else(|| {
            GenerationError::InvalidFieldArguments(format!(
                "unknown dictionary category '{category}'"
            ))
        })
    }

    fn custom_lines(&self, category: &str) -> Result<Option<Vec<String>>, GenerationError> {
        let Some(root) = self.root.as_deref() else {
            return Ok(None);
        };

        if let Some(entry) = self.cached(category) {
            return Ok(match entry {
                DictionaryEntry::Lines(lines) => Some(lines),
                DictionaryEntry::Missing => None,
            });
        }

        let entry = read_category(root, category)?;
        let mut cache = self
            .cache
            .write()
            .map_err(|_| GenerationError::Dictionary("dictionary cache poisoned".to_string()))?;
        cache.insert(category.to_string(), entry.clone());

        Ok(match entry {
            DictionaryEntry::Lines(lines) => Some(lines),
            DictionaryEntry::Missing => None,
        })
    }

    fn cached(&self, category: &str) -> Option<DictionaryEntry> {
        let cache = self.cache.read().ok()?;
        cache.get(category).cloned()
    }
}

fn read_category(root: &Path, category: &str) -> Result<DictionaryEntry, GenerationError> {
    if category.contains(['/', '\\']) || category.starts_with('.') {
        return Err(GenerationError::InvalidFieldArguments(format!(
            "invalid dictionary category '{category}'"
        )));
    }

    let candidates = [root.join(category), root.join(format!("{category}.txt"))];
    for path in &candidates {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => {
                return Err(GenerationError::Dictionary(format!(
                    "failed to read {}: {}",
                    path.display(),
                    err
                )));
            }
        };

        let lines: Vec<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        debug!(category, path = %path.display(), entries = lines.len(), "dictionary loaded");
        return Ok(DictionaryEntry::Lines(lines));
    }

    Ok(DictionaryEntry::Missing)
}

fn builtin_value(category: &str, rng: &mut dyn RngCore) -> Option<GeneratedValue> {
    use fake::faker::{address, company, internet, job, lorem, name, phone_number};

    let value: String = match category {
        "first_name" => name::en::FirstName().fake_with_rng(rng),
        "last_name" => name::en::LastName().fake_with_rng(rng),
        "full_name" => name::en::Name().fake_with_rng(rng),
        "email" => internet::en::SafeEmail().fake_with_rng(rng),
        "username" => internet::en::Username().fake_with_rng(rng),
        "city" => address::en::CityName().fake_with_rng(rng),
        "country" => address::en::CountryName().fake_with_rng(rng),
        "state" => address::en::StateName().fake_with_rng(rng),
        "street_address" => {
            let number: String = address::en::BuildingNumber().fake_with_rng(rng);
            let street: String = address::en::StreetName().fake_with_rng(rng);
            format!("{number} {street}")
        }
        "zip_code" => address::en::ZipCode().fake_with_rng(rng),
        "phone_number" => phone_number::en::PhoneNumber().fake_with_rng(rng),
        "company" => company::en::CompanyName().fake_with_rng(rng),
        "job_title" => job::en::Title().fake_with_rng(rng),
        "word" => lorem::en::Word().fake_with_rng(rng),
        "sentence" => lorem::en::Sentence(3..8).fake_with_rng(rng),
        _ => return None,
    };
    Some(GeneratedValue::Text(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "fauxgen-dict-{}-{}",
            tag,
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn builtin_categories_produce_text() {
        let dictionary = Dictionary::builtin();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for category in BUILTIN_CATEGORIES {
            let value = dictionary.sample(category, &mut rng).expect("sample");
            let text = value.as_str().expect("text value");
            assert!(!text.is_empty(), "{category} produced empty text");
        }
    }

    #[test]
    fn custom_files_take_precedence() {
        let dir = temp_dir("custom");
        fs::write(dir.join("first_name"), "Ada\n\n  Grace \n").expect("write list");
        fs::write(dir.join("colors.txt"), "teal\n").expect("write list");

        let dictionary = Dictionary::with_root(&dir);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..20 {
            let value = dictionary.sample("first_name", &mut rng).expect("sample");
            assert!(matches!(value.as_str(), Some("Ada") | Some("Grace")));
        }
        assert_eq!(
            dictionary.sample("colors", &mut rng).expect("sample"),
            GeneratedValue::Text("teal".to_string())
        );
        // no file, falls back to the built-in backend
        assert!(dictionary.sample("city", &mut rng).is_ok());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unknown_category_is_rejected() {
        let dictionary = Dictionary::builtin();
        let err = dictionary
            .ensure_category("spaceship_names")
            .expect_err("unknown category");
        assert!(err.to_string().contains("spaceship_names"));
    }
}
